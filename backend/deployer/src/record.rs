//! Values produced by a deployment run.

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contract instance whose creation has been confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContract {
    address: Address,
    creation_tx: TxHash,
}

impl DeployedContract {
    pub fn new(address: Address, creation_tx: TxHash) -> Self {
        Self {
            address,
            creation_tx,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn creation_tx(&self) -> TxHash {
        self.creation_tx
    }
}

/// Terminal artifact of a fully successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub network_label: String,
    pub deployed_address: Address,
    pub target_chain_id: u64,
    pub monitored_contract_address: Address,
    pub nft_contract_address: Address,
    #[serde(rename = "timestampUTC")]
    pub timestamp_utc: DateTime<Utc>,
}
