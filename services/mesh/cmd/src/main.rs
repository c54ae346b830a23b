//! Social mesh binary.
//!
//! `bootstrap` runs the HTTP liveness listener; `simulate` grows an
//! in-process mesh and lets two hidden nodes find each other through it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[macro_use]
mod logging;
mod bootstrap;
mod config;
mod simulate;

use config::MeshConfig;
use logging::MeshLogFormatter;

/// Decentralized peer discovery and rendezvous mesh
#[derive(Parser, Debug)]
#[command(name = "social-mesh", version, about = "Decentralized peer discovery and rendezvous mesh")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP bootstrap listener
    Bootstrap {
        /// Port to listen on (overrides config and environment)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run an in-process mesh with two hidden nodes
    Simulate {
        /// Number of public base nodes
        #[arg(long)]
        base_nodes: Option<usize>,

        /// How long to wait for the hidden nodes to meet, e.g. 30s
        #[arg(long)]
        timeout: Option<humantime::Duration>,

        /// Handshake timeout, e.g. 30s
        #[arg(long)]
        handshake_timeout: Option<humantime::Duration>,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut env_filter = EnvFilter::new("info");
    for target in [
        "social_mesh",
        "mesh_node",
        "mesh_session",
        "mesh_storage",
        "mesh_identity",
        "mesh_wire",
    ] {
        env_filter = env_filter.add_directive(format!("{}={}", target, args.log_level).parse()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(true)
        .event_format(MeshLogFormatter::new("social-mesh"))
        .init();

    info!("Starting social mesh v{}", env!("CARGO_PKG_VERSION"));

    let mut mesh_config = MeshConfig::load_from_file(&args.config)?;

    match args.command {
        Command::Bootstrap { port } => {
            let port = port.unwrap_or(mesh_config.bootstrap.port);
            bootstrap::serve(port).await
        }
        Command::Simulate {
            base_nodes,
            timeout,
            handshake_timeout,
        } => {
            if let Some(count) = base_nodes {
                mesh_config.simulation.base_nodes = count;
            }
            if let Some(timeout) = timeout {
                mesh_config.simulation.timeout_secs = Duration::from(timeout).as_secs().max(1);
            }
            if let Some(timeout) = handshake_timeout {
                mesh_config.node.handshake_timeout_secs = Duration::from(timeout).as_secs().max(1);
            }

            let report = simulate::run(&mesh_config).await?;
            if !report.hidden_connected {
                anyhow::bail!("Hidden nodes did not meet within {}s", mesh_config.simulation.timeout_secs);
            }
            Ok(())
        }
    }
}
