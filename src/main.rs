//! Gündem - a personal news dashboard
//!
//! Gathers every source once and writes the dashboard data as JSON, to stdout or
//! to the file given with `--output`.

use std::fs;
use std::io::{self, Write};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gundem::cli::Cli;
use gundem::config::DashboardConfig;
use gundem::dashboard::Dashboard;

/// Installs the log subscriber; logs go to stderr so stdout stays valid JSON
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let config = DashboardConfig::from_cli(&cli)?;
    info!(cache_dir = %config.cache_dir.display(), "starting dashboard run");

    let dashboard = Dashboard::new(config);
    let data = dashboard.gather().await;
    let json = serde_json::to_string_pretty(&data)?;

    match &cli.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)?;
            info!(path = %path.display(), "dashboard written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }

    Ok(())
}
