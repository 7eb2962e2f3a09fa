//! wscapture demo recorder entry point.
//!
//! ```text
//! wscapture-demo                  Record using wscapture-demo.toml (or defaults)
//! wscapture-demo --url <ws-url>   Override the consumer endpoint
//! wscapture-demo --config <path>  Load a custom config TOML
//! wscapture-demo --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wscapture_demo::config::DemoConfig;
use wscapture_demo::recorder::Recorder;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "wscapture-demo", about = "Stream a test pattern to a wscapture consumer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "wscapture-demo.toml")]
    config: PathBuf,

    /// Consumer WebSocket URL (overrides the config file).
    #[arg(short, long)]
    url: Option<String>,

    /// Read frames back bottom row first and flip them.
    #[arg(long)]
    bottom_up: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&DemoConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = DemoConfig::load(&cli.config);
    if let Some(url) = cli.url {
        config.network.url = url;
    }
    if cli.bottom_up {
        config.capture.bottom_up = true;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("wscapture-demo v{}", env!("CARGO_PKG_VERSION"));
    info!("consumer: {}", config.network.url);
    info!(
        "surface: {}x{} @ {} Hz",
        config.capture.width,
        config.capture.height,
        config.tick_hz()
    );
    info!("window: {} frames", config.capture.max_outstanding);

    let recorder = Recorder::new(config);
    let stop = recorder.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, stopping recording");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    recorder.run().await?;

    Ok(())
}
