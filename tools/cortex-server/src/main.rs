//! Cortex Server
//!
//! Runs the bridge between the synthesis engine and browser clients until
//! interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use cortex_bridge::{Bridge, BridgeConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cortex-server")]
#[command(about = "OSC <-> WebSocket bridge for the synthesis engine")]
#[command(version)]
struct Cli {
    /// Config file (TOML); flags override its values
    #[arg(short, long, env = "CORTEX_CONFIG")]
    config: Option<PathBuf>,

    /// UDP address the engine broadcasts to
    #[arg(long, env = "CORTEX_OSC_LISTEN")]
    osc_listen: Option<String>,

    /// UDP address of the engine
    #[arg(short, long, env = "CORTEX_ENGINE")]
    engine: Option<String>,

    /// WebSocket listen address
    #[arg(long, env = "CORTEX_WS_LISTEN")]
    ws_listen: Option<String>,

    /// HTTP listen address
    #[arg(long, env = "CORTEX_HTTP_LISTEN", conflicts_with = "no_http")]
    http_listen: Option<String>,

    /// Disable the HTTP surface
    #[arg(long)]
    no_http: bool,

    /// Directory of UI assets served over HTTP
    #[arg(long, env = "CORTEX_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Allowed address prefix (repeatable; replaces the configured list)
    #[arg(short, long = "allow")]
    allow: Vec<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(addr) = &self.osc_listen {
            config.osc_listen = addr.clone();
        }
        if let Some(addr) = &self.engine {
            config.engine_addr = addr.clone();
        }
        if let Some(addr) = &self.ws_listen {
            config.ws_listen = addr.clone();
        }
        if let Some(addr) = &self.http_listen {
            config.http_listen = Some(addr.clone());
        }
        if self.no_http {
            config.http_listen = None;
        }
        if let Some(dir) = &self.static_dir {
            config.static_dir = Some(dir.clone());
        }
        if !self.allow.is_empty() {
            config.allowed_prefixes = self.allow.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level, cli.json_logs)?;

    let config = cli.config()?;
    let prefixes = config.allowed_prefixes.join(" ");

    let handle = Bridge::new(config)
        .start()
        .await
        .context("Failed to start bridge")?;

    println!(
        "{} bridge running ({})",
        "CORTEX".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("  OSC in:     udp://{}", handle.osc_addr());
    println!("  OSC out:    udp://{}", handle.upstream_addr());
    println!("  WebSocket:  ws://{}", handle.ws_addr());
    match handle.http_addr() {
        Some(addr) => println!("  HTTP:       http://{}", addr),
        None => println!("  HTTP:       {}", "disabled".dimmed()),
    }
    println!("  Allowed:    {}", prefixes);
    println!("  Press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    println!("\n{}", "Shutting down...".yellow());
    handle.shutdown().await;
    println!("{}", "Bridge stopped".yellow());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "cortex-server",
            "--engine",
            "10.0.0.2:57120",
            "--no-http",
            "--allow",
            "/daemon/",
            "--allow",
            "/golem/",
        ]);
        let config = cli.config().unwrap();

        assert_eq!(config.engine_addr, "10.0.0.2:57120");
        assert_eq!(config.http_listen, None);
        assert_eq!(config.allowed_prefixes, vec!["/daemon/", "/golem/"]);
        assert_eq!(config.ws_listen, "0.0.0.0:3001");
    }

    #[test]
    fn test_invalid_flag_value_rejected() {
        let cli = Cli::parse_from(["cortex-server", "--ws-listen", "nowhere"]);
        assert!(cli.config().is_err());
    }

    #[test]
    fn test_http_flags_conflict() {
        let result = Cli::try_parse_from([
            "cortex-server",
            "--http-listen",
            "0.0.0.0:8080",
            "--no-http",
        ]);
        assert!(result.is_err());
    }
}
