use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// The simulated world advanced on the background thread. The built-in scene
/// ships a no-op model; embedders supply their own.
pub trait WorldModel: Send {
    fn step(&mut self, dt: f32);
}

/// A model that advances nothing, for running the viewer standalone.
pub struct IdleWorld;

impl WorldModel for IdleWorld {
    fn step(&mut self, _dt: f32) {}
}

/// Drives a `WorldModel` at a fixed rate on its own thread. Stopping is
/// cooperative: the flag is checked every step and the thread is joined on
/// `stop` or drop.
pub struct SimulationRunner {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulationRunner {
    pub fn start(mut model: Box<dyn WorldModel>, steps_per_second: u32) -> Self {
        let interval = Duration::from_secs_f64(1.0 / steps_per_second.max(1) as f64);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = std::thread::Builder::new()
            .name("simulation".to_string())
            .spawn(move || {
                let mut last = Instant::now();
                while !stop_flag.load(Ordering::Relaxed) {
                    let now = Instant::now();
                    model.step(now.duration_since(last).as_secs_f32());
                    last = now;
                    std::thread::sleep(interval);
                }
            });

        match handle {
            Ok(handle) => Self {
                stop,
                handle: Some(handle),
            },
            Err(err) => {
                log::error!("Failed to spawn simulation thread: {err}");
                Self { stop, handle: None }
            }
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Simulation thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
