//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// katib-ui-operator - sidecar operator for the katib-ui workload
#[derive(Parser, Debug)]
#[command(name = "katib-ui-operator")]
#[command(version)]
#[command(about = "Reconciles katib-ui configuration against its Pebble supervisor")]
#[command(
    long_about = "The operator negotiates the ingress relation, applies a declarative \
service layer to the Pebble supervisor, and reports unit health as a single status value."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one hook invocation end to end
    Dispatch {
        /// Hook name (katib-ui-pebble-ready, config-changed, ingress-relation-changed)
        #[arg(long)]
        hook: String,

        /// Workload port from config
        #[arg(long)]
        port: Option<u16>,

        /// Versions the remote ingress side lists, in order
        #[arg(long = "remote-version")]
        remote_versions: Vec<String>,

        /// Path of the persisted state file
        #[arg(long, default_value = "katib-ui-state.json")]
        state_file: PathBuf,
    },

    /// Print the last persisted unit status
    Status {
        /// Path of the persisted state file
        #[arg(long, default_value = "katib-ui-state.json")]
        state_file: PathBuf,
    },
}
