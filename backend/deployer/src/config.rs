//! Deployment parameters loaded from environment variables.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{utils::parse_ether, Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use tracing_subscriber::EnvFilter;

use crate::errors::ConfigError;

const DEFAULT_RPC_URL: &str = "https://lasna-rpc.rnk.dev/";
const DEFAULT_TARGET_CHAIN_ID: &str = "11155111";
const DEFAULT_MIN_BALANCE: &str = "0.01";
const DEFAULT_INITIAL_DEPOSIT: &str = "0.01";
const DEFAULT_CRON_INTERVAL_SECS: &str = "3600";
const DEFAULT_ARTIFACT_PATH: &str = "./out/SubscriptionReactive.sol/SubscriptionReactive.json";
const DEFAULT_DEPLOYMENT_PATH: &str = "./deployments/reactive-deployment.json";
const DEFAULT_NETWORK_LABEL: &str = "reactive-testnet";
const DEFAULT_TARGET_RPC_URL: &str = "https://sepolia.gateway.tenderly.co";
const DEFAULT_CURRENCY_SYMBOL: &str = "REACT";
const DEFAULT_LOG_FILTER: &str = "info";

/// Immutable parameters of one run.
#[derive(Clone)]
pub struct DeploymentConfig {
    /// Key of the deploying account; also pays for every step.
    pub signer: PrivateKeySigner,
    /// JSON-RPC endpoint of the network the contract is deployed to.
    pub rpc_url: Url,
    /// Chain the deployed contract watches (Sepolia by default).
    pub target_chain_id: u64,
    /// Subscription manager on the target chain whose payment events are observed.
    pub monitored_contract: Address,
    /// Subscription NFT on the target chain.
    pub nft_contract: Address,
    /// Balance the deployer must hold before anything is sent, in wei.
    pub minimum_balance: U256,
    /// Value transferred to the new contract right after creation, in wei.
    pub initial_deposit: U256,
    pub cron_interval_secs: u64,
    pub artifact_path: PathBuf,
    pub deployment_path: PathBuf,
    pub network_label: String,
    /// Native token symbol of the deployment network, used when logging amounts.
    pub currency_symbol: String,
    /// Only used in the follow-up instructions printed after a success.
    pub target_rpc_url: String,
    pub ledger: LedgerSettings,
}

/// Polling and timeout policy of the ledger client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            confirmation_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for DeploymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentConfig")
            .field("signer", &self.signer.address())
            .field("rpc_url", &self.rpc_url.as_str())
            .field("target_chain_id", &self.target_chain_id)
            .field("monitored_contract", &self.monitored_contract)
            .field("nft_contract", &self.nft_contract)
            .field("minimum_balance", &self.minimum_balance)
            .field("initial_deposit", &self.initial_deposit)
            .field("cron_interval_secs", &self.cron_interval_secs)
            .field("artifact_path", &self.artifact_path)
            .field("deployment_path", &self.deployment_path)
            .field("network_label", &self.network_label)
            .field("currency_symbol", &self.currency_symbol)
            .field("target_rpc_url", &self.target_rpc_url)
            .field("ledger", &self.ledger)
            .finish()
    }
}

impl DeploymentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse and validate every parameter, reading raw values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let or_default = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let signer = PrivateKeySigner::from_str(required("DEPLOYER_PRIVATE_KEY")?.trim())
            .map_err(|e| invalid("DEPLOYER_PRIVATE_KEY", e))?;

        let rpc_url = parse_endpoint("RPC_URL", &or_default("RPC_URL", DEFAULT_RPC_URL))?;

        let target_chain_id: u64 = parse_number(
            "TARGET_CHAIN_ID",
            &or_default("TARGET_CHAIN_ID", DEFAULT_TARGET_CHAIN_ID),
        )?;
        if target_chain_id == 0 {
            return Err(invalid("TARGET_CHAIN_ID", "must be greater than zero"));
        }

        let monitored_contract =
            parse_address("SUBSCRIPTION_MANAGER", &required("SUBSCRIPTION_MANAGER")?)?;
        let nft_contract = parse_address("SUBSCRIPTION_NFT", &required("SUBSCRIPTION_NFT")?)?;

        let minimum_balance =
            parse_amount("MIN_BALANCE", &or_default("MIN_BALANCE", DEFAULT_MIN_BALANCE))?;
        let initial_deposit = parse_amount(
            "INITIAL_DEPOSIT",
            &or_default("INITIAL_DEPOSIT", DEFAULT_INITIAL_DEPOSIT),
        )?;

        let cron_interval_secs: u64 = parse_number(
            "CRON_INTERVAL_SECS",
            &or_default("CRON_INTERVAL_SECS", DEFAULT_CRON_INTERVAL_SECS),
        )?;
        if cron_interval_secs == 0 {
            return Err(invalid("CRON_INTERVAL_SECS", "must be greater than zero"));
        }

        let defaults = LedgerSettings::default();
        let ledger = LedgerSettings {
            poll_interval: Duration::from_millis(parse_positive(
                "CONFIRMATION_POLL_MS",
                lookup("CONFIRMATION_POLL_MS"),
                defaults.poll_interval.as_millis() as u64,
            )?),
            confirmation_timeout: Duration::from_secs(parse_positive(
                "CONFIRMATION_TIMEOUT_SECS",
                lookup("CONFIRMATION_TIMEOUT_SECS"),
                defaults.confirmation_timeout.as_secs(),
            )?),
            request_timeout: Duration::from_secs(parse_positive(
                "RPC_TIMEOUT_SECS",
                lookup("RPC_TIMEOUT_SECS"),
                defaults.request_timeout.as_secs(),
            )?),
        };

        Ok(DeploymentConfig {
            signer,
            rpc_url,
            target_chain_id,
            monitored_contract,
            nft_contract,
            minimum_balance,
            initial_deposit,
            cron_interval_secs,
            artifact_path: PathBuf::from(or_default("ARTIFACT_PATH", DEFAULT_ARTIFACT_PATH)),
            deployment_path: PathBuf::from(or_default("DEPLOYMENT_PATH", DEFAULT_DEPLOYMENT_PATH)),
            network_label: or_default("NETWORK_LABEL", DEFAULT_NETWORK_LABEL),
            currency_symbol: or_default("CURRENCY_SYMBOL", DEFAULT_CURRENCY_SYMBOL)
                .trim()
                .to_string(),
            target_rpc_url: or_default("TARGET_RPC_URL", DEFAULT_TARGET_RPC_URL),
            ledger,
        })
    }

    /// Address of the deploying account.
    pub fn deployer(&self) -> Address {
        self.signer.address()
    }
}

/// Log filter from `RUST_LOG`, falling back to `info` when unset or unparsable.
/// Call after `.env` is loaded so a value from that file applies.
pub fn log_filter<F>(lookup: F) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    lookup("RUST_LOG")
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn invalid(key: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}

fn parse_endpoint(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| invalid(key, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(key, format!("unsupported scheme `{other}`"))),
    }
}

fn parse_address(key: &'static str, raw: &str) -> Result<Address, ConfigError> {
    Address::from_str(raw.trim()).map_err(|e| invalid(key, e))
}

fn parse_amount(key: &'static str, raw: &str) -> Result<U256, ConfigError> {
    parse_ether(raw.trim()).map_err(|e| invalid(key, e))
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e| invalid(key, e))
}

fn parse_positive(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let value = match raw.filter(|v| !v.trim().is_empty()) {
        Some(raw) => parse_number(key, &raw)?,
        None => default,
    };
    if value == 0 {
        return Err(invalid(key, "must be greater than zero"));
    }
    Ok(value)
}
