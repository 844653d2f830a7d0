use anyhow::{Context, Result};
use frameconfig::FrameConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::resolve_config_file;
use crate::settings::Launch;
use crate::window::run_window;

pub fn run(args: RunArgs) -> Result<()> {
    let config = match resolve_config_file(args.config.as_deref())? {
        Some(path) => {
            let config = FrameConfig::from_path(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            config
        }
        None => FrameConfig::default(),
    };

    let launch = Launch::resolve(&args, &config)?;
    tracing::info!(
        buffer = ?launch.descriptor.buffer_size(),
        screen = ?launch.descriptor.screen_rect(),
        format = launch.descriptor.resolved().format.name(),
        settings = ?launch.settings,
        "bootstrapping retroview"
    );
    run_window(launch)
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
