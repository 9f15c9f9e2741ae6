use bitflags::bitflags;

bitflags! {
    /// Which per-vertex fields a mesh carries. Fields are always laid out in
    /// declaration order: position, normal, tangent, bitangent, texcoord, color.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VertexFields: u8 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const TANGENT = 1 << 2;
        const BITANGENT = 1 << 3;
        const TEXCOORD = 1 << 4;
        const COLOR = 1 << 5;
    }
}

/// Field order doubles as the shader-location convention: the index of a
/// field in this table is the `@location` the scene shaders expect it at.
const FIELD_ORDER: [VertexFields; 6] = [
    VertexFields::POSITION,
    VertexFields::NORMAL,
    VertexFields::TANGENT,
    VertexFields::BITANGENT,
    VertexFields::TEXCOORD,
    VertexFields::COLOR,
];

/// Runtime vertex-layout descriptor. Offsets are computed here, once, from
/// the flag set; both the CPU-side packing (`VertexRecord`) and the GPU
/// attribute layout (`attributes`/`buffer_layout`) derive from the same
/// computation, so the two cannot drift apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexFormat {
    fields: VertexFields,
    color_channels: u32,
}

impl VertexFormat {
    pub fn new(fields: VertexFields, color_channels: u32) -> Self {
        let color_channels = if (3..=4).contains(&color_channels) {
            color_channels
        } else {
            log::warn!(
                "Unsupported color channel count {}, using 4",
                color_channels
            );
            4
        };
        Self {
            fields,
            color_channels,
        }
    }

    pub fn fields(&self) -> VertexFields {
        self.fields
    }

    /// Size of one field in floats; zero when the field is disabled.
    pub fn field_size(&self, field: VertexFields) -> u32 {
        if !self.fields.contains(field) {
            return 0;
        }
        match field {
            VertexFields::POSITION
            | VertexFields::NORMAL
            | VertexFields::TANGENT
            | VertexFields::BITANGENT => 3,
            VertexFields::TEXCOORD => 2,
            VertexFields::COLOR => self.color_channels,
            _ => 0,
        }
    }

    /// Offset of a field in floats: the running sum of all preceding enabled
    /// fields. `None` for disabled fields.
    pub fn offset(&self, field: VertexFields) -> Option<u32> {
        if !self.fields.contains(field) {
            return None;
        }
        let mut offset = 0;
        for &f in &FIELD_ORDER {
            if f == field {
                return Some(offset);
            }
            offset += self.field_size(f);
        }
        None
    }

    /// Total record size in floats. Tightly packed, no padding.
    pub fn stride(&self) -> u32 {
        FIELD_ORDER.iter().map(|&f| self.field_size(f)).sum()
    }

    pub fn stride_bytes(&self) -> u64 {
        self.stride() as u64 * 4
    }

    /// One attribute per enabled field, locations fixed by `FIELD_ORDER`.
    pub fn attributes(&self) -> Vec<wgpu::VertexAttribute> {
        let mut attrs = Vec::new();
        for (location, &field) in FIELD_ORDER.iter().enumerate() {
            let Some(offset) = self.offset(field) else {
                continue;
            };
            attrs.push(wgpu::VertexAttribute {
                format: component_format(self.field_size(field)),
                offset: offset as u64 * 4,
                shader_location: location as u32,
            });
        }
        attrs
    }

    pub fn buffer_layout<'a>(
        &self,
        attributes: &'a [wgpu::VertexAttribute],
    ) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride_bytes(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

impl Default for VertexFormat {
    fn default() -> Self {
        Self::new(
            VertexFields::POSITION | VertexFields::NORMAL | VertexFields::TEXCOORD,
            4,
        )
    }
}

fn component_format(floats: u32) -> wgpu::VertexFormat {
    match floats {
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// One vertex packed against a `VertexFormat`.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexRecord {
    format: VertexFormat,
    data: Vec<f32>,
}

impl VertexRecord {
    pub fn new(format: VertexFormat) -> Self {
        Self {
            format,
            data: vec![0.0; format.stride() as usize],
        }
    }

    /// Builds a record from a flat float slice of exactly `stride()` values,
    /// interpreted as the enabled fields in declaration order.
    pub fn from_floats(format: VertexFormat, floats: &[f32]) -> Result<Self, String> {
        if floats.len() != format.stride() as usize {
            return Err(format!(
                "Vertex data has {} floats, format expects {}",
                floats.len(),
                format.stride()
            ));
        }
        Ok(Self {
            format,
            data: floats.to_vec(),
        })
    }

    pub fn format(&self) -> VertexFormat {
        self.format
    }

    pub fn floats(&self) -> &[f32] {
        &self.data
    }

    /// The slice backing one field, or `None` when the field is disabled.
    pub fn field(&self, field: VertexFields) -> Option<&[f32]> {
        let offset = self.format.offset(field)? as usize;
        let size = self.format.field_size(field) as usize;
        Some(&self.data[offset..offset + size])
    }

    pub fn set_field(&mut self, field: VertexFields, values: &[f32]) -> bool {
        let Some(offset) = self.format.offset(field) else {
            return false;
        };
        let size = self.format.field_size(field) as usize;
        if values.len() != size {
            log::warn!(
                "Field {:?} expects {} floats, got {}",
                field,
                size,
                values.len()
            );
            return false;
        }
        self.data[offset as usize..offset as usize + size].copy_from_slice(values);
        true
    }

    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.set_field(VertexFields::POSITION, &position);
        self
    }

    pub fn with_normal(mut self, normal: [f32; 3]) -> Self {
        self.set_field(VertexFields::NORMAL, &normal);
        self
    }

    pub fn with_texcoord(mut self, texcoord: [f32; 2]) -> Self {
        self.set_field(VertexFields::TEXCOORD, &texcoord);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_formats() -> Vec<VertexFormat> {
        let mut formats = Vec::new();
        for bits in 0..64u8 {
            let fields = VertexFields::from_bits_truncate(bits);
            for channels in [3, 4] {
                formats.push(VertexFormat::new(fields, channels));
            }
        }
        formats
    }

    #[test]
    fn offsets_are_running_sums_of_preceding_fields() {
        for format in all_formats() {
            let mut expected = 0;
            for &field in &FIELD_ORDER {
                if let Some(offset) = format.offset(field) {
                    assert_eq!(offset, expected, "{:?} {:?}", format, field);
                }
                expected += format.field_size(field);
            }
            assert_eq!(format.stride(), expected);
        }
    }

    #[test]
    fn disabled_fields_have_no_offset_and_zero_size() {
        let format = VertexFormat::new(VertexFields::POSITION | VertexFields::TEXCOORD, 4);
        assert_eq!(format.offset(VertexFields::NORMAL), None);
        assert_eq!(format.field_size(VertexFields::NORMAL), 0);
        assert_eq!(format.stride(), 5);
    }

    #[test]
    fn attributes_match_format_offsets() {
        for format in all_formats() {
            let attrs = format.attributes();
            assert_eq!(attrs.len() as u32, format.fields().bits().count_ones());
            for attr in &attrs {
                let field = FIELD_ORDER[attr.shader_location as usize];
                assert_eq!(attr.offset, format.offset(field).unwrap() as u64 * 4);
            }
            let layout = format.buffer_layout(&attrs);
            assert_eq!(layout.array_stride, format.stride_bytes());
        }
    }

    #[test]
    fn color_channel_count_changes_stride() {
        let rgb = VertexFormat::new(VertexFields::POSITION | VertexFields::COLOR, 3);
        let rgba = VertexFormat::new(VertexFields::POSITION | VertexFields::COLOR, 4);
        assert_eq!(rgb.stride(), 6);
        assert_eq!(rgba.stride(), 7);
    }

    #[test]
    fn flat_array_round_trips_per_field() {
        let format = VertexFormat::new(
            VertexFields::POSITION | VertexFields::NORMAL | VertexFields::TEXCOORD,
            4,
        );
        let floats = [1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.25, 0.75];
        let record = VertexRecord::from_floats(format, &floats).unwrap();
        assert_eq!(record.field(VertexFields::POSITION), Some(&floats[0..3]));
        assert_eq!(record.field(VertexFields::NORMAL), Some(&floats[3..6]));
        assert_eq!(record.field(VertexFields::TEXCOORD), Some(&floats[6..8]));
        assert_eq!(record.field(VertexFields::COLOR), None);
        assert_eq!(record.floats(), &floats);
    }

    #[test]
    fn from_floats_rejects_wrong_length() {
        let format = VertexFormat::default();
        assert!(VertexRecord::from_floats(format, &[0.0; 3]).is_err());
    }

    #[test]
    fn set_field_on_disabled_field_is_refused() {
        let format = VertexFormat::new(VertexFields::POSITION, 4);
        let mut record = VertexRecord::new(format);
        assert!(!record.set_field(VertexFields::COLOR, &[1.0, 1.0, 1.0, 1.0]));
        assert!(record.set_field(VertexFields::POSITION, &[1.0, 2.0, 3.0]));
    }
}
