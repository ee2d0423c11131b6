//! portal-proxy
//!
//! Reverse proxy serving a configured set of upstream routes under one
//! mount point.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ credentials gate ──▶ proxy dispatcher
//!                                                              │
//!                                              RouteTable (ArcSwap snapshot)
//!                                                              │
//!                                                              ▼
//!     Client Response                                    ProxyRoute
//!     ◀────────────── response headers stripped ◀── rewrite, strip, forward ──▶ Upstream
//!
//!     config file ──▶ watcher / SIGHUP ──▶ reload task ──▶ rebuild + swap
//! ```

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "portal-proxy")]
#[command(about = "Configurable reverse proxy with hot-reloaded routes", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "portal-proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    portal_proxy::lifecycle::run(&cli.config).await?;
    Ok(())
}
