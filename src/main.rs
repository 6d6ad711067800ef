use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use onboard_pilot::{Harness, HarnessConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "onboard-pilot",
    version,
    about = "Resumable automation harness for the onboarding wizard"
)]
struct Cli {
    /// Path to a config file; defaults to onboard-pilot.toml when present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Run the browser with a visible window.
    #[arg(long, global = true)]
    headed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authenticate if needed and drive the wizard to completion.
    Run {
        /// Skip the identity-verification step when the wizard offers it.
        #[arg(long)]
        skip_verification: bool,
    },
    /// Print the resolved onboarding state as JSON.
    Status,
    /// Print a fresh page snapshot as JSON.
    Snapshot,
    /// List the wizard components the current page renders.
    Components,
    /// Capture a screenshot of the current wizard state.
    Screenshot {
        #[arg(short, long, default_value = "onboarding.png")]
        out: PathBuf,
    },
}

fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("onboard_pilot=info,step_flow=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry();
    let cli = Cli::parse();

    let mut config =
        HarnessConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.headed {
        config.headless = false;
    }
    if let Command::Run { skip_verification } = &cli.command {
        config.skip_verification |= *skip_verification;
    }

    let harness = Harness::start(config).await.context("starting browser")?;
    let outcome = dispatch(&cli.command, &harness).await;
    harness.shutdown().await;
    outcome
}

async fn dispatch(command: &Command, harness: &Harness) -> Result<()> {
    match command {
        Command::Run { .. } => {
            let report = harness.authenticate_and_onboard().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.needs_authentication {
                bail!("run stopped: authentication required");
            }
            if !report.success {
                bail!("run finished without verified completion");
            }
            info!(run_id = %report.run_id, "onboarding complete");
            Ok(())
        }
        Command::Status => {
            let state = harness.current_state().await;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Command::Snapshot => {
            let snapshot = harness.snapshot().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        Command::Components => {
            let result = harness.surface().get_components().await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                bail!("component read failed");
            }
            Ok(())
        }
        Command::Screenshot { out } => {
            harness.screenshot(out).await?;
            Ok(())
        }
    }
}
