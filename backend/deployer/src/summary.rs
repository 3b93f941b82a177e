//! Operator-facing text printed at the start and end of a run.

use std::fmt::Write;

use crate::config::DeploymentConfig;
use crate::errors::OrchestrationError;
use crate::record::DeploymentRecord;

pub fn banner(config: &DeploymentConfig) -> String {
    let mut out = String::from("=== DEPLOYING SUBSCRIPTION REACTIVE CONTRACT ===\n\n");
    let _ = writeln!(out, "Deployer:             {}", config.deployer());
    let _ = writeln!(out, "Network:              {}", config.network_label);
    let _ = writeln!(out, "Target Chain ID:      {}", config.target_chain_id);
    let _ = writeln!(out, "Subscription Manager: {}", config.monitored_contract);
    let _ = writeln!(out, "Subscription NFT:     {}", config.nft_contract);
    out
}

/// Deployment summary plus the manual step left on the target chain.
pub fn success(record: &DeploymentRecord, config: &DeploymentConfig) -> String {
    let mut out = String::from("=== DEPLOYMENT SUMMARY ===\n");
    let _ = writeln!(out, "SubscriptionReactive: {}", record.deployed_address);
    let _ = writeln!(out, "Target Chain:         {}", record.target_chain_id);
    let _ = writeln!(out, "Monitoring:           {}", record.monitored_contract_address);
    let _ = writeln!(out, "NFT Contract:         {}", record.nft_contract_address);
    let _ = writeln!(out, "Record:               {}", config.deployment_path.display());
    out.push('\n');
    out.push_str(&next_steps(record, &config.target_rpc_url));
    out
}

fn next_steps(record: &DeploymentRecord, target_rpc_url: &str) -> String {
    let mut out = String::from("NEXT STEPS:\n");
    let _ = writeln!(
        out,
        "1. Update SubscriptionNFT on chain {} with the reactive address:",
        record.target_chain_id
    );
    let _ = writeln!(out, "   cast send {} \\", record.nft_contract_address);
    let _ = writeln!(
        out,
        "     \"setReactiveContract(address)\" {} \\",
        record.deployed_address
    );
    let _ = writeln!(out, "     --rpc-url {target_rpc_url} \\");
    let _ = writeln!(out, "     --private-key <YOUR_KEY>");
    out
}

/// What failed and what is left on-chain.
pub fn failure(err: &OrchestrationError) -> String {
    let mut out = format!("Deployment failed: {err}\n");
    match err {
        OrchestrationError::Transaction {
            step,
            completed,
            contract,
            source,
        } => {
            let _ = writeln!(out, "Failed step:       {step} ({})", step.failure_kind());
            let _ = writeln!(out, "Last confirmed:    {completed}");
            if contract.is_none() {
                let _ = writeln!(out, "No contract was left on-chain");
            }
            if let Some(data) = &source.data {
                let _ = writeln!(out, "Error data:        {data}");
            }
        }
        OrchestrationError::BalanceQuery(source) => {
            if let Some(data) = &source.data {
                let _ = writeln!(out, "Error data:        {data}");
            }
        }
        OrchestrationError::Storage { record, .. } => {
            let _ = writeln!(
                out,
                "All on-chain steps confirmed; contract is live at {}",
                record.deployed_address
            );
        }
        OrchestrationError::InsufficientFunds { .. } | OrchestrationError::Artifact(_) => {}
    }
    if let Some(address) = err.live_contract() {
        let _ = writeln!(out, "Live contract:     {address}");
    }
    out
}

/// Whether the process should report success. Stopping at the balance gate is
/// an expected outcome: nothing was sent, so there is nothing to recover.
pub fn exits_cleanly(outcome: &Result<DeploymentRecord, OrchestrationError>) -> bool {
    match outcome {
        Ok(_) => true,
        Err(err) => err.is_precondition(),
    }
}
