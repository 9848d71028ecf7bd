// SPDX-License-Identifier: GPL-3.0-only

//! volman - dock-style hot-plug volume manager
//!
//! Watches the UDisks2 service for storage volumes, keeps an ordered
//! registry with a selection cursor, and survives service restarts and
//! bus drops. The actual dock rendering and input handling live in an
//! external collaborator; this binary wires the watcher to a logging
//! view.

mod config;
mod view;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};
use volman_core::{BackendConnector, Watcher};
use volman_types::should_display;
use volman_udisks::UdisksConnector;

use view::DockView;

#[derive(Debug, Parser)]
#[command(name = "volman", version, about = "Hot-plug volume manager")]
struct Args {
    /// Configuration file (default: $XDG_CONFIG_HOME/volman/config.toml)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Icon theme name, overriding the configured one
    #[arg(long, short)]
    theme: Option<String>,

    /// Print the currently visible volumes as JSON and exit
    #[arg(long)]
    enumerate: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("volman=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = config::load(args.config.as_deref())?;
    let theme = args
        .theme
        .or(config.theme)
        .unwrap_or_else(|| "default".to_owned());

    let connector = Arc::new(UdisksConnector);

    if args.enumerate {
        return enumerate(connector.as_ref()).await;
    }

    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let (mut watcher, _controls) = Watcher::new(connector, frames_tx);

    let link = match watcher.bootstrap().await {
        Ok(link) => link,
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    };

    tokio::spawn(DockView::new(theme).run(frames_rx));

    // The windowing collaborator would feed `_controls`; until one is
    // attached the dock is display-only.
    watcher.run(link).await;
    Ok(())
}

async fn enumerate(connector: &UdisksConnector) -> Result<()> {
    let transport = connector.connect().await?;
    let link = transport.attach().await?;

    let visible: Vec<_> = link
        .ops
        .enumerate()
        .await?
        .into_iter()
        .filter(|snapshot| should_display(&snapshot.block, snapshot.drive.as_ref()))
        .collect();

    println!("{}", serde_json::to_string_pretty(&visible)?);
    Ok(())
}
