//! AR overlay: live camera feed blended with a desktop screen grab

use std::path::PathBuf;
use std::sync::Arc;

use ar_overlay::capture::{open_primary, probe_secondary};
use ar_overlay::control::{self, ControlSurface};
use ar_overlay::display::Sdl2Display;
use ar_overlay::pipeline::{stop_channel, LoopSettings, Orchestrator, ParameterStore};
use ar_overlay::{Config, PrimaryKind};
use clap::Parser;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use a synthetic pattern instead of the camera
    #[arg(long)]
    pattern_camera: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "ar_overlay=info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter)),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("AR overlay launching...");

    let mut config = Config::load(args.config.as_deref())?;
    if args.pattern_camera {
        config.camera.source = PrimaryKind::Pattern;
    }

    let store = Arc::new(ParameterStore::new(config.controls.parameters()));
    let (stop, stop_signal) = stop_channel();

    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            ctrl_c.stop();
        }
    });

    let surface = ControlSurface::new(Arc::clone(&store));
    tokio::spawn(control::run_terminal(surface, stop, control::stdin_lines()));

    info!("Controls: 'q' or ESC to quit, '{}' to toggle side-by-side view", config.display.toggle_key);

    // SDL and the capture devices stay on this one thread for the whole run
    let settings = LoopSettings::from_config(&config);
    let summary = tokio::task::spawn_blocking(move || {
        let mut orchestrator = Orchestrator::new(store, stop_signal, settings);
        orchestrator.run(
            || open_primary(&config.camera),
            || probe_secondary(&config.screen),
            Sdl2Display::new,
        )
    })
    .await??;

    info!(
        "AR overlay shutting down after {} frames ({:.1} fps)",
        summary.frames, summary.fps
    );
    Ok(())
}
