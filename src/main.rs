fn main() -> Result<(), winit::error::EventLoopError> {
    sim_viewer::run()
}
