//! # Tempo Controller
//!
//! Kubernetes controller that deploys and supervises multi-component Tempo
//! distributed-tracing stacks.
//!
//! ## Usage
//!
//! ```bash
//! # Run the controller (default)
//! tempo-controller
//!
//! # Print the TempoStack CRD
//! tempo-controller crd | kubectl apply -f -
//! ```
//!
//! Configuration is read from environment variables; see `config::ControllerConfig`
//! and `config::FeatureGates`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use tempo_controller::crd::TempoStack;
use tempo_controller::runtime::{initialization, watch_loop};

#[derive(Parser)]
#[command(name = "tempo-controller", version, about = "Tempo distributed-tracing stack controller")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller (default)
    Run,
    /// Print the TempoStack CustomResourceDefinition as YAML
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Crd => {
            let yaml = serde_yaml::to_string(&TempoStack::crd())
                .context("Failed to serialize TempoStack CRD")?;
            print!("{yaml}");
            Ok(())
        }
        Commands::Run => {
            let init = initialization::initialize().await?;
            watch_loop::run_watch_loop(
                init.client,
                init.stacks,
                init.reconciler,
                init.server_state,
                init.config,
            )
            .await
        }
    }
}
