use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Persisted viewer configuration: camera and light state plus the render
/// parameters the host needs before the first frame. Stored as JSON next to
/// the executable; every field falls back to its default when missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerSettings {
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub light: LightSettings,
    #[serde(default = "ViewerSettings::default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "ViewerSettings::default_shadow_map_size")]
    pub shadow_map_size: u32,
    #[serde(default)]
    pub resolution: Resolution,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            light: LightSettings::default(),
            frame_rate: Self::default_frame_rate(),
            shadow_map_size: Self::default_shadow_map_size(),
            resolution: Resolution::default(),
        }
    }
}

impl ViewerSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ViewerSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded viewer settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default settings.",
                        path, err
                    );
                    ViewerSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("Settings file {:?} not found. Using defaults.", path);
                ViewerSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default settings.",
                    path, err
                );
                ViewerSettings::default()
            }
        }
    }

    pub fn save(&self) {
        self.save_to_path("settings.json");
    }

    pub fn save_to_path<P: AsRef<std::path::Path>>(&self, path: P) {
        let path = path.as_ref();
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(err) = std::fs::write(path, json) {
                    warn!("Failed to write settings to {:?}: {}", path, err);
                } else {
                    info!("Saved viewer settings to {:?}", path);
                }
            }
            Err(err) => warn!("Failed to serialize settings: {}", err),
        }
    }

    fn validate(mut self) -> Self {
        if self.frame_rate == 0 {
            warn!("Frame rate must be greater than zero. Using default.");
            self.frame_rate = Self::default_frame_rate();
        }

        if self.shadow_map_size == 0 {
            warn!("Shadow map size must be greater than zero. Using default.");
            self.shadow_map_size = Self::default_shadow_map_size();
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default.");
            self.resolution = Resolution::default();
        }

        if !(1.0..=179.0).contains(&self.camera.lens_angle) {
            warn!("Lens angle out of range. Using default.");
            self.camera.lens_angle = CameraSettings::default().lens_angle;
        }

        if self.light.position == self.light.target {
            warn!("Light position equals its target. Using default light pose.");
            let defaults = LightSettings::default();
            self.light.position = defaults.position;
            self.light.target = defaults.target;
        }

        self
    }

    const fn default_frame_rate() -> u32 {
        60
    }

    const fn default_shadow_map_size() -> u32 {
        1024
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub zoom: f32,
    pub lens_angle: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 3.0, 12.0],
            yaw: 0.0,
            pitch: -0.2,
            roll: 0.0,
            zoom: 0.0,
            lens_angle: 45.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            position: [20.0, 40.0, 20.0],
            target: [0.0, 0.0, 0.0],
            ambient: [0.15, 0.15, 0.15],
            diffuse: [0.9, 0.9, 0.85],
            specular: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_settings() -> ViewerSettings {
        ViewerSettings {
            frame_rate: 0,
            shadow_map_size: 0,
            resolution: Resolution {
                width: 0,
                height: 0,
            },
            camera: CameraSettings {
                lens_angle: 720.0,
                ..CameraSettings::default()
            },
            light: LightSettings {
                position: [1.0, 1.0, 1.0],
                target: [1.0, 1.0, 1.0],
                ..LightSettings::default()
            },
        }
    }

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let validated = invalid_settings().validate();
        let defaults = ViewerSettings::default();

        assert_eq!(validated.frame_rate, defaults.frame_rate);
        assert_eq!(validated.shadow_map_size, defaults.shadow_map_size);
        assert_eq!(validated.resolution, defaults.resolution);
        assert_eq!(validated.camera.lens_angle, defaults.camera.lens_angle);
        assert_ne!(validated.light.position, validated.light.target);
    }

    #[test]
    fn validate_preserves_valid_values() {
        let valid = ViewerSettings {
            frame_rate: 30,
            shadow_map_size: 2048,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            ..ViewerSettings::default()
        };

        let validated = valid.clone().validate();
        assert_eq!(validated.frame_rate, 30);
        assert_eq!(validated.shadow_map_size, 2048);
        assert_eq!(validated.resolution.width, 1920);
    }

    #[test]
    fn json_round_trip_preserves_all_fields() {
        let mut settings = ViewerSettings::default();
        settings.camera.zoom = 1.25;
        settings.light.position = [5.0, 9.0, -2.0];
        settings.frame_rate = 144;

        let json = serde_json::to_string(&settings).unwrap();
        let restored: ViewerSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.camera, settings.camera);
        assert_eq!(restored.light, settings.light);
        assert_eq!(restored.frame_rate, settings.frame_rate);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let restored: ViewerSettings = serde_json::from_str("{\"frame_rate\": 75}").unwrap();
        assert_eq!(restored.frame_rate, 75);
        assert_eq!(restored.camera, CameraSettings::default());
        assert_eq!(
            restored.shadow_map_size,
            ViewerSettings::default().shadow_map_size
        );
    }
}
