mod app;
mod cli;

use anyhow::Context;
use clap::Parser;
use cli::CliArgs;
use mirrorpass_gpu_shared::scene_format::SceneDescription;

fn load_description(args: &CliArgs) -> anyhow::Result<SceneDescription> {
    let mut description = match &args.scene {
        Some(path) => SceneDescription::load(path)
            .with_context(|| format!("loading scene {}", path.display()))?,
        None => {
            log::info!("No --scene given, using the built-in scene");
            SceneDescription::default()
        }
    };

    if let Some(width) = args.width {
        description.window.width = width;
    }
    if let Some(height) = args.height {
        description.window.height = height;
    }
    description
        .validate()
        .context("invalid window size override")?;
    Ok(description)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();

    if args.print_default_scene {
        print!("{}", SceneDescription::default().to_toml_string()?);
        return Ok(());
    }

    log::info!("mirrorpass v{}", env!("CARGO_PKG_VERSION"));
    let description = load_description(&args)?;

    let event_loop = winit::event_loop::EventLoop::new().context("creating event loop")?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut viewer = app::Viewer::new(description).context("loading scene assets")?;
    event_loop
        .run_app(&mut viewer)
        .context("event loop error")?;

    viewer.into_result()
}
