//! nowplaying-watch: follow a Discord user's live presence from the terminal.
//!
//! Subscribes to the user on the Lanyard relay and prints every presence
//! update, either as plain text or as escaped HTML fragments.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nowplaying_common::NowPlayingError;
use nowplaying_config::{config_to_json, LogLevel, NowPlayingConfig};
use nowplaying_presence::{render, PresenceClient};
use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

#[derive(Parser)]
#[command(
    name = "nowplaying-watch",
    about = "Watch a Discord user's presence through the Lanyard relay"
)]
struct Args {
    /// Config file to use instead of the platform default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Discord user id to watch. Overrides `presence.user_id`.
    #[arg(short, long)]
    user_id: Option<String>,

    /// Relay WebSocket URL. Overrides `presence.relay_url`.
    #[arg(long)]
    url: Option<String>,

    /// Print each update as an HTML fragment.
    #[arg(long)]
    html: bool,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_filter = init_tracing();

    let loaded = match &args.config {
        Some(path) => nowplaying_config::load_config_from(path),
        None => nowplaying_config::load_config(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    if let Some(handle) = log_filter {
        let filter = EnvFilter::new(default_directives(config.logging.level));
        if let Err(e) = handle.reload(filter) {
            tracing::warn!(error = %e, "failed to apply configured log level");
        }
    }

    if args.print_config {
        println!("{}", config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    match run(config, args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "nowplaying-watch failed");
            ExitCode::FAILURE
        }
    }
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the subscriber before anything logs. `RUST_LOG` pins the filter;
/// otherwise the returned handle swaps in the configured level once the
/// config has loaded.
fn init_tracing() -> Option<FilterHandle> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let pinned = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(default_directives(LogLevel::Info)));
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    (!pinned).then_some(handle)
}

fn default_directives(level: LogLevel) -> String {
    let level = level.as_directive();
    format!("nowplaying_watch={level},nowplaying_presence={level},nowplaying_config={level}")
}

async fn run(config: NowPlayingConfig, args: Args) -> Result<ExitCode, NowPlayingError> {
    let settings = settings::resolve(config, args.user_id, args.url)?;

    let client = PresenceClient::new(settings.presence);

    let html = args.html;
    client.on_presence_update(move |snapshot| {
        if html {
            println!("{}", render::snapshot_html(&snapshot));
        } else {
            for line in render::snapshot_lines(&snapshot, render::now_millis()) {
                println!("{line}");
            }
            println!();
        }
    });

    let (failed_tx, mut failed_rx) = mpsc::unbounded_channel();
    client.on_status_change(move |status| {
        tracing::info!(status = %status, "connection status");
        if status.is_terminal() {
            let _ = failed_tx.send(status.clone());
        }
    });

    tracing::info!(user_id = %settings.user_id, "watching presence");
    client.start(settings.user_id).await;

    let code = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("interrupted, shutting down");
            ExitCode::SUCCESS
        }
        Some(status) = failed_rx.recv() => {
            tracing::error!(status = %status, "gave up reconnecting to the relay");
            ExitCode::FAILURE
        }
    };

    client.stop().await;
    Ok(code)
}
