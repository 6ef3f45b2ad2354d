use anyhow::Result;

mod asset_loader;
mod asset_pipeline;
mod camera;
mod car;
mod car_context;
mod clock;
mod color;
mod configurator;
mod engine;
mod error;
mod material_manager;
mod math;
mod model;
mod orbit_controls;
mod rendering;
mod scene_graph;
mod ui;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    pollster::block_on(window::run())?;

    Ok(())
}
