//! # katib-ui-operator
//!
//! Entry point for the katib-ui sidecar operator.
//!
//! ## Invocation model
//!
//! One process invocation handles exactly one hook: negotiation runs at
//! startup, the observation table is built (or gated shut), the named
//! signal is delivered, and the resulting unit status is printed. There is
//! no internal retry timer — a gated unit stays gated until the next
//! invocation re-attempts negotiation.
//!
//! ## Collaborators
//!
//! Process-supervision internals and relation-data transport are external
//! collaborators behind traits; this binary wires the in-memory
//! implementations, seeded from flags, so a dispatch run is scriptable.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use katib_charm::{Charm, CharmConfig, Signal, StoredState, LAST_STATUS_KEY, NAMESPACE_ENV};
use katib_interfaces::{InMemoryRelations, INGRESS_INTERFACE};
use katib_pebble::InMemoryPebble;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Dispatch {
            hook,
            port,
            remote_versions,
            state_file,
        } => dispatch(&hook, port, remote_versions, &state_file).await,
        Commands::Status { state_file } => status(&state_file),
    }
}

/// Run one hook invocation end to end and print the resulting status.
async fn dispatch(
    hook: &str,
    port: Option<u16>,
    remote_versions: Vec<String>,
    state_file: &Path,
) -> Result<()> {
    let signal = Signal::from_hook(hook).context("unrecognized hook name")?;

    let namespace =
        std::env::var(NAMESPACE_ENV).unwrap_or_else(|_| "default".to_string());
    let config = port
        .map(|port| CharmConfig { port })
        .unwrap_or_default();

    let pebble = InMemoryPebble::new_arc();
    let relations = InMemoryRelations::new_arc();
    if !remote_versions.is_empty() {
        relations
            .set_remote_versions(INGRESS_INTERFACE, remote_versions)
            .await;
    }

    let stored = StoredState::load(state_file).context("failed to load persisted state")?;

    info!(hook, namespace = %namespace, "dispatching");
    let mut charm = Charm::startup(config, namespace, pebble, relations, stored).await;
    let status = charm.handle(signal).await;

    println!("{status}");
    Ok(())
}

/// Print the last persisted unit status.
fn status(state_file: &Path) -> Result<()> {
    let stored = StoredState::load(state_file).context("failed to load persisted state")?;
    let last = stored
        .get(LAST_STATUS_KEY)
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    println!("{last}");
    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
