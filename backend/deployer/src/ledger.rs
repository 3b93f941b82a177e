//! Ledger client: balance queries, transaction submission and confirmation
//! against an EVM JSON-RPC endpoint.
//!
//! Submission and confirmation are separate calls so the orchestrator can log
//! each transaction hash before it starts waiting on it.

use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::http::{reqwest, Http};
use alloy::transports::TransportError;
use async_trait::async_trait;
use tracing::debug;

use crate::config::DeploymentConfig;
use crate::errors::LedgerError;

/// Outcome of one ledger operation.
pub type StepResult<T> = Result<T, LedgerError>;

/// A contract method invocation, already ABI-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub calldata: Bytes,
}

/// Remote ledger operations a deployment needs.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current balance of `account`, in wei.
    async fn balance(&self, account: Address) -> StepResult<U256>;

    /// Submit a contract-creation transaction carrying `bytecode`.
    async fn create_contract(&self, bytecode: Bytes) -> StepResult<TxHash>;

    /// Wait for a creation transaction and return the new contract's address.
    async fn confirm_creation(&self, tx: TxHash) -> StepResult<Address>;

    /// Submit a plain value transfer.
    async fn transfer(&self, to: Address, amount: U256) -> StepResult<TxHash>;

    /// Submit a call to `contract`.
    async fn invoke(&self, contract: Address, call: &MethodCall) -> StepResult<TxHash>;

    /// Wait until `tx` is mined with a successful status.
    async fn confirm(&self, tx: TxHash) -> StepResult<()>;
}

impl From<TransportError> for LedgerError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => {
                let ledger = LedgerError::new(payload.message.to_string());
                match &payload.data {
                    Some(data) => ledger.with_data(data.get()),
                    None => ledger,
                }
            }
            None => LedgerError::new(err.to_string()),
        }
    }
}

/// [`LedgerClient`] backed by an alloy provider holding the deployer's key.
pub struct AlloyLedger {
    provider: DynProvider,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl AlloyLedger {
    /// Build the HTTP transport and attach the signer as the provider's wallet.
    /// Nonce, gas and chain id are filled by the provider for every send.
    pub fn connect(config: &DeploymentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.ledger.request_timeout)
            .build()?;
        let transport = Http::with_client(client, config.rpc_url.clone());
        let is_local = transport.guess_local();
        let rpc = RpcClient::new(transport, is_local);

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(config.signer.clone()))
            .connect_client(rpc)
            .erased();

        Ok(Self {
            provider,
            poll_interval: config.ledger.poll_interval,
            confirmation_timeout: config.ledger.confirmation_timeout,
        })
    }

    async fn send(&self, tx: TransactionRequest) -> StepResult<TxHash> {
        let pending = self.provider.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }

    /// Poll for the receipt of `tx` until it shows up or the confirmation
    /// timeout elapses. A reverted receipt is an error.
    async fn wait_for_receipt(&self, tx: TxHash) -> StepResult<TransactionReceipt> {
        let poll = async {
            loop {
                if let Some(receipt) = self.provider.get_transaction_receipt(tx).await? {
                    return Ok::<_, LedgerError>(receipt);
                }
                debug!("Receipt for {tx} not available yet");
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| {
                LedgerError::new(format!(
                    "Transaction {tx} was not confirmed within {:?}",
                    self.confirmation_timeout
                ))
            })??;

        if !ReceiptResponse::status(&receipt) {
            let block = ReceiptResponse::block_number(&receipt)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(LedgerError::new(format!(
                "Transaction {tx} reverted in block {block}"
            )));
        }
        Ok(receipt)
    }
}

#[async_trait]
impl LedgerClient for AlloyLedger {
    async fn balance(&self, account: Address) -> StepResult<U256> {
        Ok(self.provider.get_balance(account).await?)
    }

    async fn create_contract(&self, bytecode: Bytes) -> StepResult<TxHash> {
        debug!("Submitting creation of {} bytes of bytecode", bytecode.len());
        self.send(TransactionRequest::default().with_deploy_code(bytecode))
            .await
    }

    async fn confirm_creation(&self, tx: TxHash) -> StepResult<Address> {
        let receipt = self.wait_for_receipt(tx).await?;
        ReceiptResponse::contract_address(&receipt).ok_or_else(|| {
            LedgerError::new(format!("Receipt of {tx} carries no contract address"))
        })
    }

    async fn transfer(&self, to: Address, amount: U256) -> StepResult<TxHash> {
        self.send(TransactionRequest::default().with_to(to).with_value(amount))
            .await
    }

    async fn invoke(&self, contract: Address, call: &MethodCall) -> StepResult<TxHash> {
        debug!("Submitting {} on {contract}", call.method);
        self.send(
            TransactionRequest::default()
                .with_to(contract)
                .with_input(call.calldata.clone()),
        )
        .await
    }

    async fn confirm(&self, tx: TxHash) -> StepResult<()> {
        self.wait_for_receipt(tx).await.map(|_| ())
    }
}
