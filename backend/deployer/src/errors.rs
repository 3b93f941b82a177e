//! Error taxonomy for a deployment run.

use std::path::PathBuf;

use alloy::primitives::{utils::format_ether, Address, U256};
use thiserror::Error;

use crate::orchestrator::{Stage, Step};
use crate::record::DeploymentRecord;

/// Invalid or missing configuration. Raised before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// The compiled contract descriptor could not be used.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Contract artifact not found at {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Contract artifact at {} is malformed: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Contract interface has no `{method}` method taking {arity} argument(s)")]
    MissingMethod { method: String, arity: usize },

    #[error("Could not encode arguments for `{method}`: {reason}")]
    Encoding { method: String, reason: String },
}

/// A failed ledger operation: the node's message plus any raw diagnostic
/// payload it attached (revert data, for instance).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct LedgerError {
    pub reason: String,
    pub data: Option<String>,
}

impl LedgerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// The deployment record could not be persisted.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a run stopped before reaching [`Stage::Recorded`].
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The signing account cannot cover the minimum. Nothing was sent.
    #[error(
        "Insufficient balance: {} available, at least {} required",
        format_ether(*balance),
        format_ether(*required)
    )]
    InsufficientFunds { balance: U256, required: U256 },

    #[error("Balance query failed: {0}")]
    BalanceQuery(#[source] LedgerError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// A transaction did not confirm. `completed` is the last state that did,
    /// and `contract` is the live instance once creation went through.
    #[error("Step `{step}` failed after reaching {completed}: {source}")]
    Transaction {
        step: Step,
        completed: Stage,
        contract: Option<Address>,
        #[source]
        source: LedgerError,
    },

    /// Every on-chain step confirmed but the record was not written.
    #[error("Deployment of {} succeeded but the record was not saved: {source}", record.deployed_address)]
    Storage {
        record: Box<DeploymentRecord>,
        #[source]
        source: StorageError,
    },
}

impl OrchestrationError {
    /// Whether the run ended at the balance gate, which is an expected outcome.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. })
    }

    /// Address of the contract left on-chain by this run, if any.
    pub fn live_contract(&self) -> Option<Address> {
        match self {
            Self::Transaction { contract, .. } => *contract,
            Self::Storage { record, .. } => Some(record.deployed_address),
            _ => None,
        }
    }
}
