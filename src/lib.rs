pub mod app;
pub mod host;
pub mod paths;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod viewer;

use app::App;
use paths::ResourcePaths;
use settings::ViewerSettings;
use viewer::Viewer;
use winit::event_loop::EventLoop;

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

pub fn run() -> Result<(), winit::error::EventLoopError> {
    init_logging();

    let settings = ViewerSettings::load();
    log::info!(
        "Starting simulation viewer at {}x{} / {} fps",
        settings.resolution.width,
        settings.resolution.height,
        settings.frame_rate
    );

    let event_loop = EventLoop::new()?;
    let frame_rate = settings.frame_rate;
    let width = settings.resolution.width;
    let height = settings.resolution.height;
    let viewer = Viewer::new(settings, ResourcePaths::default());
    let mut app = App::new(Box::new(viewer), frame_rate, width, height, "simulation viewer");

    let result = event_loop.run_app(&mut app);

    if let Err(ref err) = result {
        log::error!("Application error: {}", err);
    }

    log::info!("Application shutdown complete");

    result
}
