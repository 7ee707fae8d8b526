use anyhow::Result;

mod animation;
mod asset_pipeline;
mod camera;
mod config;
mod controls;
mod lights;
mod loader;
mod material;
mod math;
mod model;
mod render_loop;
mod rendering;
mod scene_graph;
mod viewer;
mod window;

#[cfg(test)]
mod test_util;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = config::ViewerConfig::from_args(std::env::args());
    log::info!("Viewing {}", config.model_path.display());

    pollster::block_on(window::run(config))?;

    Ok(())
}
