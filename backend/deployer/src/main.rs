//! Reactive subscription deployer entry point.
//!
//! Deploys the `SubscriptionReactive` contract to the Reactive Network, funds
//! it, initializes it against the subscription contracts on the target chain,
//! subscribes it to payment events and hourly CRON ticks, then writes a
//! deployment record. One run, no retries: a failure stops the sequence and
//! reports what is already on-chain.

mod artifact;
mod config;
mod errors;
mod ledger;
mod orchestrator;
mod record;
mod recorder;
mod summary;

use std::process::ExitCode;

use tracing::{error, info};

use artifact::FileArtifactLoader;
use config::DeploymentConfig;
use ledger::AlloyLedger;
use orchestrator::Orchestrator;
use recorder::JsonFileRecorder;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load optional .env file first so a RUST_LOG set there applies.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(config::log_filter(|key| std::env::var(key).ok()))
        .init();

    let config = DeploymentConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("{}", summary::banner(&config));

    let ledger = AlloyLedger::connect(&config)?;
    let recorder = JsonFileRecorder::new(&config.deployment_path);
    let orchestrator = Orchestrator::new(ledger, FileArtifactLoader, recorder);

    let outcome = orchestrator.run(&config).await;
    match &outcome {
        Ok(record) => {
            info!("Deployment complete: {}", record.deployed_address);
            println!("{}", summary::success(record, &config));
        }
        // Already logged by the orchestrator.
        Err(err) if err.is_precondition() => {
            println!("Nothing was deployed. Fund {} and run again.", config.deployer());
        }
        Err(err) => {
            error!("{err}");
            eprintln!("{}", summary::failure(err));
        }
    }

    Ok(if summary::exits_cleanly(&outcome) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
