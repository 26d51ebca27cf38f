// Anilamp: an animated desk lamp in a small room

// Module declarations
mod error;
mod lamp;
mod math;
mod renderer;
mod room;
mod scene;
mod world;

use winit::event_loop::EventLoop;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    if let Err(err) = run().await {
        log::error!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> error::Result<()> {
    // Create event loop
    let event_loop = EventLoop::new()?;

    let world = world::World::new(room::Layout::default())?;
    log::info!("keys: 1/R random pose, 2/E reset, 3/Space jump, L spotlight, +/- light, WASD camera");

    // Create renderer
    let renderer = renderer::Renderer::new(&event_loop, world).await?;

    // Run the renderer
    renderer.run(event_loop)
}
