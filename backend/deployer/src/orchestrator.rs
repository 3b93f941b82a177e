//! Drives one deployment of the subscription reactive contract.
//!
//! The run is strictly sequential: balance gate, creation, funding,
//! initialization, payment-event subscription, CRON subscription, record.
//! Every transaction is confirmed before the next one is submitted, and the
//! first failure ends the run. Nothing is retried: whatever was confirmed
//! before the failure stays on-chain and is reported through [`Stage`].

use std::fmt;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{utils::format_ether, Address, TxHash, U256};
use chrono::Utc;
use tracing::{info, warn};

use crate::artifact::{ArtifactLoader, ContractArtifact};
use crate::config::DeploymentConfig;
use crate::errors::{LedgerError, OrchestrationError};
use crate::ledger::{LedgerClient, MethodCall};
use crate::record::{DeployedContract, DeploymentRecord};
use crate::recorder::DeploymentRecorder;

pub const INITIALIZE: &str = "initialize";
pub const SUBSCRIBE_PAYMENT_EVENTS: &str = "subscribeToPaymentEvents";
pub const SUBSCRIBE_CRON: &str = "subscribeToCron";

/// Last state a run has confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Balance gate passed; nothing on-chain yet.
    Gated,
    Created,
    Funded,
    Initialized,
    EventSubscribed,
    CronSubscribed,
    Recorded,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gated => "gated",
            Self::Created => "created",
            Self::Funded => "funded",
            Self::Initialized => "initialized",
            Self::EventSubscribed => "event_subscribed",
            Self::CronSubscribed => "cron_subscribed",
            Self::Recorded => "recorded",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmation-gated on-chain step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Create,
    Fund,
    Initialize,
    SubscribeEvents,
    SubscribeCron,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Fund => "fund",
            Self::Initialize => "initialize",
            Self::SubscribeEvents => "subscribeEvents",
            Self::SubscribeCron => "subscribeCron",
        }
    }

    /// Name of the failure this step produces when it does not confirm.
    pub fn failure_kind(&self) -> &'static str {
        match self {
            Self::Create => "CreationFailed",
            Self::Fund => "FundingFailed",
            Self::Initialize => "InitializationFailed",
            Self::SubscribeEvents => "SubscriptionFailed",
            Self::SubscribeCron => "CronSubscriptionFailed",
        }
    }

    /// Last confirmed state when this step is submitted.
    pub fn follows(&self) -> Stage {
        match self {
            Self::Create => Stage::Gated,
            Self::Fund => Stage::Created,
            Self::Initialize => Stage::Funded,
            Self::SubscribeEvents => Stage::Initialized,
            Self::SubscribeCron => Stage::EventSubscribed,
        }
    }

    /// State reached once this step confirms.
    pub fn reaches(&self) -> Stage {
        match self {
            Self::Create => Stage::Created,
            Self::Fund => Stage::Funded,
            Self::Initialize => Stage::Initialized,
            Self::SubscribeEvents => Stage::EventSubscribed,
            Self::SubscribeCron => Stage::CronSubscribed,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The three post-creation calls, encoded against the artifact's ABI.
struct PlannedCalls {
    initialize: MethodCall,
    subscribe_events: MethodCall,
    subscribe_cron: MethodCall,
}

impl PlannedCalls {
    fn encode(
        artifact: &ContractArtifact,
        config: &DeploymentConfig,
    ) -> Result<Self, OrchestrationError> {
        let chain_id = DynSolValue::Uint(U256::from(config.target_chain_id), 256);
        let monitored = DynSolValue::Address(config.monitored_contract);

        Ok(Self {
            initialize: artifact.encode_call(
                INITIALIZE,
                &[
                    monitored.clone(),
                    DynSolValue::Address(config.nft_contract),
                    chain_id.clone(),
                ],
            )?,
            subscribe_events: artifact
                .encode_call(SUBSCRIBE_PAYMENT_EVENTS, &[chain_id, monitored])?,
            subscribe_cron: artifact.encode_call(
                SUBSCRIBE_CRON,
                &[DynSolValue::Uint(U256::from(config.cron_interval_secs), 256)],
            )?,
        })
    }
}

/// Runs the deployment workflow against its three collaborators.
pub struct Orchestrator<L, A, R> {
    ledger: L,
    loader: A,
    recorder: R,
}

impl<L, A, R> Orchestrator<L, A, R>
where
    L: LedgerClient,
    A: ArtifactLoader,
    R: DeploymentRecorder,
{
    pub fn new(ledger: L, loader: A, recorder: R) -> Self {
        Self {
            ledger,
            loader,
            recorder,
        }
    }

    /// Execute the workflow once. Each call deploys a new, independent contract.
    pub async fn run(
        &self,
        config: &DeploymentConfig,
    ) -> Result<DeploymentRecord, OrchestrationError> {
        let deployer = config.deployer();
        let balance = self
            .ledger
            .balance(deployer)
            .await
            .map_err(OrchestrationError::BalanceQuery)?;
        let symbol = &config.currency_symbol;
        info!("Deployer {deployer} balance: {} {symbol}", format_ether(balance));

        if balance < config.minimum_balance {
            warn!(
                "Insufficient balance, need at least {} {symbol}",
                format_ether(config.minimum_balance)
            );
            return Err(OrchestrationError::InsufficientFunds {
                balance,
                required: config.minimum_balance,
            });
        }

        info!("Reading contract artifact {}", config.artifact_path.display());
        let artifact = self.loader.load(&config.artifact_path).await?;
        let calls = PlannedCalls::encode(&artifact, config)?;

        let contract = self.create(&artifact).await?;
        let address = contract.address();
        info!(
            "Contract deployed at {address} (transaction {})",
            contract.creation_tx()
        );

        self.step(Step::Fund, address, async {
            info!(
                "Sending initial deposit of {} {symbol}",
                format_ether(config.initial_deposit)
            );
            self.ledger.transfer(address, config.initial_deposit).await
        })
        .await?;

        for (step, call) in [
            (Step::Initialize, &calls.initialize),
            (Step::SubscribeEvents, &calls.subscribe_events),
            (Step::SubscribeCron, &calls.subscribe_cron),
        ] {
            self.step(step, address, async {
                info!("Calling {} on {address}", call.method);
                self.ledger.invoke(address, call).await
            })
            .await?;
        }

        let record = DeploymentRecord {
            network_label: config.network_label.clone(),
            deployed_address: address,
            target_chain_id: config.target_chain_id,
            monitored_contract_address: config.monitored_contract,
            nft_contract_address: config.nft_contract,
            timestamp_utc: Utc::now(),
        };

        if let Err(source) = self.recorder.save(&record).await {
            return Err(OrchestrationError::Storage {
                record: Box::new(record),
                source,
            });
        }
        info!("Reached {}", Stage::Recorded);
        Ok(record)
    }

    async fn create(
        &self,
        artifact: &ContractArtifact,
    ) -> Result<DeployedContract, OrchestrationError> {
        let abort = |source: LedgerError| OrchestrationError::Transaction {
            step: Step::Create,
            completed: Step::Create.follows(),
            contract: None,
            source,
        };

        info!("Deploying contract");
        let tx = self
            .ledger
            .create_contract(artifact.bytecode.clone())
            .await
            .map_err(abort)?;
        info!("Creation transaction {tx}, waiting for confirmation");
        let address = self.ledger.confirm_creation(tx).await.map_err(abort)?;
        Ok(DeployedContract::new(address, tx))
    }

    /// Submit one post-creation transaction and wait for it to confirm.
    async fn step<F>(
        &self,
        step: Step,
        contract: Address,
        submit: F,
    ) -> Result<TxHash, OrchestrationError>
    where
        F: std::future::Future<Output = Result<TxHash, LedgerError>>,
    {
        let abort = |source: LedgerError| OrchestrationError::Transaction {
            step,
            completed: step.follows(),
            contract: Some(contract),
            source,
        };

        let tx = submit.await.map_err(abort)?;
        info!("{step} transaction {tx}, waiting for confirmation");
        self.ledger.confirm(tx).await.map_err(abort)?;
        info!("{step} confirmed, reached {}", step.reaches());
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use alloy::json_abi::JsonAbi;
    use alloy::primitives::{utils::parse_ether, Bytes};
    use alloy::transports::http::reqwest::Url;
    use async_trait::async_trait;
    use tracing_test::traced_test;

    use crate::artifact::MockArtifactLoader;
    use crate::config::LedgerSettings;
    use crate::errors::{ArtifactError, StorageError};
    use crate::ledger::StepResult;
    use crate::recorder::MockDeploymentRecorder;

    const TARGET_CHAIN_ID: u64 = 11_155_111;
    const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    const ABI: &str = r#"[
        {"type":"function","name":"initialize","stateMutability":"nonpayable",
         "inputs":[{"name":"_manager","type":"address"},{"name":"_nft","type":"address"},{"name":"_chainId","type":"uint256"}],"outputs":[]},
        {"type":"function","name":"subscribeToPaymentEvents","stateMutability":"nonpayable",
         "inputs":[{"name":"chainId","type":"uint256"},{"name":"manager","type":"address"}],"outputs":[]},
        {"type":"function","name":"subscribeToCron","stateMutability":"nonpayable",
         "inputs":[{"name":"interval","type":"uint256"}],"outputs":[]}
    ]"#;

    fn monitored() -> Address {
        "0x82b069578ae3dA9ea740D24934334208b83E530E".parse().unwrap()
    }

    fn nft() -> Address {
        "0x404cb817FA393D3689D1405DB0B76a20eDE72d43".parse().unwrap()
    }

    fn config(minimum: &str) -> DeploymentConfig {
        DeploymentConfig {
            signer: KEY.parse().unwrap(),
            rpc_url: Url::parse("http://localhost:8545").unwrap(),
            target_chain_id: TARGET_CHAIN_ID,
            monitored_contract: monitored(),
            nft_contract: nft(),
            minimum_balance: parse_ether(minimum).unwrap(),
            initial_deposit: parse_ether("0.01").unwrap(),
            cron_interval_secs: 3600,
            artifact_path: PathBuf::from("out/SubscriptionReactive.json"),
            deployment_path: PathBuf::from("deployments/reactive-deployment.json"),
            network_label: "reactive-testnet".to_string(),
            currency_symbol: "REACT".to_string(),
            target_rpc_url: "https://sepolia.gateway.tenderly.co".to_string(),
            ledger: LedgerSettings::default(),
        }
    }

    fn artifact() -> ContractArtifact {
        ContractArtifact {
            bytecode: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]),
            abi: serde_json::from_str(ABI).unwrap(),
        }
    }

    fn loader() -> MockArtifactLoader {
        let mut loader = MockArtifactLoader::new();
        loader.expect_load().returning(|_| Ok(artifact()));
        loader
    }

    fn recorder(times: usize) -> MockDeploymentRecorder {
        let mut recorder = MockDeploymentRecorder::new();
        recorder.expect_save().times(times).returning(|_| Ok(()));
        recorder
    }

    /// Every interaction with the fake ledger, in the order it happened.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Balance(Address),
        Create,
        ConfirmCreation(TxHash),
        Transfer(Address, U256),
        Invoke(Address, String),
        Confirm(TxHash),
    }

    /// In-memory ledger that records calls, hands out a fresh address per
    /// creation and fails the confirmation of a chosen operation.
    struct FakeLedger {
        balance: U256,
        calls: Mutex<Vec<Call>>,
        addresses: Mutex<VecDeque<Address>>,
        next_tx: Mutex<u8>,
        pending: Mutex<Vec<(TxHash, String)>>,
        fail_confirm_of: Option<(&'static str, LedgerError)>,
        fail_submit_of: Option<(&'static str, LedgerError)>,
    }

    impl FakeLedger {
        fn with_balance(balance: &str) -> Self {
            Self {
                balance: parse_ether(balance).unwrap(),
                calls: Mutex::new(Vec::new()),
                addresses: Mutex::new(VecDeque::from([
                    Address::repeat_byte(0xaa),
                    Address::repeat_byte(0xbb),
                ])),
                next_tx: Mutex::new(0),
                pending: Mutex::new(Vec::new()),
                fail_confirm_of: None,
                fail_submit_of: None,
            }
        }

        fn failing_confirmation(mut self, op: &'static str, err: LedgerError) -> Self {
            self.fail_confirm_of = Some((op, err));
            self
        }

        fn failing_submission(mut self, op: &'static str, err: LedgerError) -> Self {
            self.fail_submit_of = Some((op, err));
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn submit(&self, op: &str, call: Call) -> StepResult<TxHash> {
            self.calls.lock().unwrap().push(call);
            if let Some((failing, err)) = &self.fail_submit_of {
                if *failing == op {
                    return Err(err.clone());
                }
            }
            let mut next = self.next_tx.lock().unwrap();
            *next += 1;
            let tx = TxHash::repeat_byte(*next);
            self.pending.lock().unwrap().push((tx, op.to_string()));
            Ok(tx)
        }

        fn settle(&self, tx: TxHash) -> StepResult<()> {
            let op = self
                .pending
                .lock()
                .unwrap()
                .iter()
                .find(|(hash, _)| *hash == tx)
                .map(|(_, op)| op.clone())
                .expect("confirmation of an unknown transaction");
            match &self.fail_confirm_of {
                Some((failing, err)) if *failing == op => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        async fn balance(&self, account: Address) -> StepResult<U256> {
            self.calls.lock().unwrap().push(Call::Balance(account));
            Ok(self.balance)
        }

        async fn create_contract(&self, _bytecode: Bytes) -> StepResult<TxHash> {
            self.submit("create", Call::Create)
        }

        async fn confirm_creation(&self, tx: TxHash) -> StepResult<Address> {
            self.calls.lock().unwrap().push(Call::ConfirmCreation(tx));
            self.settle(tx)?;
            Ok(self
                .addresses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no addresses left"))
        }

        async fn transfer(&self, to: Address, amount: U256) -> StepResult<TxHash> {
            self.submit("transfer", Call::Transfer(to, amount))
        }

        async fn invoke(&self, contract: Address, call: &MethodCall) -> StepResult<TxHash> {
            self.submit(&call.method, Call::Invoke(contract, call.method.clone()))
        }

        async fn confirm(&self, tx: TxHash) -> StepResult<()> {
            self.calls.lock().unwrap().push(Call::Confirm(tx));
            self.settle(tx)
        }
    }

    fn submissions(calls: &[Call]) -> Vec<String> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::Create => Some("create".to_string()),
                Call::Transfer(..) => Some("transfer".to_string()),
                Call::Invoke(_, method) => Some(method.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn full_run_saves_and_returns_record() {
        let ledger = FakeLedger::with_balance("0.02");
        let mut recorder = MockDeploymentRecorder::new();
        recorder
            .expect_save()
            .withf(|record| record.deployed_address == Address::repeat_byte(0xaa))
            .times(1)
            .returning(|_| Ok(()));
        let orchestrator = Orchestrator::new(ledger, loader(), recorder);
        let config = config("0.01");

        let record = orchestrator.run(&config).await.unwrap();

        assert_eq!(record.deployed_address, Address::repeat_byte(0xaa));
        assert_eq!(record.target_chain_id, TARGET_CHAIN_ID);
        assert_eq!(record.monitored_contract_address, monitored());
        assert_eq!(record.nft_contract_address, nft());
        assert_eq!(record.network_label, "reactive-testnet");

        let address = Address::repeat_byte(0xaa);
        let tx = |n: u8| TxHash::repeat_byte(n);
        assert_eq!(
            orchestrator.ledger.calls(),
            vec![
                Call::Balance(config.deployer()),
                Call::Create,
                Call::ConfirmCreation(tx(1)),
                Call::Transfer(address, parse_ether("0.01").unwrap()),
                Call::Confirm(tx(2)),
                Call::Invoke(address, INITIALIZE.to_string()),
                Call::Confirm(tx(3)),
                Call::Invoke(address, SUBSCRIBE_PAYMENT_EVENTS.to_string()),
                Call::Confirm(tx(4)),
                Call::Invoke(address, SUBSCRIBE_CRON.to_string()),
                Call::Confirm(tx(5)),
            ]
        );
    }

    #[test]
    fn calls_carry_configured_arguments() {
        let config = config("0.01");
        let calls = PlannedCalls::encode(&artifact(), &config).unwrap();
        let abi: JsonAbi = serde_json::from_str(ABI).unwrap();

        let init = &abi.function(INITIALIZE).unwrap()[0];
        assert_eq!(&calls.initialize.calldata[..4], init.selector().as_slice());
        let args = &calls.initialize.calldata[4..];
        assert_eq!(Address::from_slice(&args[12..32]), monitored());
        assert_eq!(Address::from_slice(&args[44..64]), nft());
        assert_eq!(U256::from_be_slice(&args[64..96]), U256::from(TARGET_CHAIN_ID));

        let args = &calls.subscribe_events.calldata[4..];
        assert_eq!(U256::from_be_slice(&args[..32]), U256::from(TARGET_CHAIN_ID));
        assert_eq!(Address::from_slice(&args[44..64]), monitored());

        let args = &calls.subscribe_cron.calldata[4..];
        assert_eq!(U256::from_be_slice(args), U256::from(3600));
    }

    #[tokio::test]
    async fn low_balance_stops_after_the_gate() {
        let ledger = FakeLedger::with_balance("0.005");
        let mut loader = MockArtifactLoader::new();
        loader.expect_load().times(0);
        let orchestrator = Orchestrator::new(ledger, loader, recorder(0));
        let config = config("0.01");

        let err = orchestrator.run(&config).await.unwrap_err();

        match err {
            OrchestrationError::InsufficientFunds { balance, required } => {
                assert_eq!(balance, parse_ether("0.005").unwrap());
                assert_eq!(required, parse_ether("0.01").unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            orchestrator.ledger.calls(),
            vec![Call::Balance(config.deployer())]
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn low_balance_warns_once_in_native_units() {
        let mut loader = MockArtifactLoader::new();
        loader.expect_load().times(0);
        let orchestrator =
            Orchestrator::new(FakeLedger::with_balance("0.005"), loader, recorder(0));

        orchestrator.run(&config("0.01")).await.unwrap_err();

        assert!(logs_contain("balance: 0.005000000000000000 REACT"));
        assert!(logs_contain("need at least 0.010000000000000000 REACT"));
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|l| l.contains("Insufficient balance")).count() {
                1 => Ok(()),
                n => Err(format!("expected one insufficient balance warning, got {n}")),
            }
        });
    }

    #[tokio::test]
    async fn balance_equal_to_minimum_passes_the_gate() {
        let ledger = FakeLedger::with_balance("0.01");
        let orchestrator = Orchestrator::new(ledger, loader(), recorder(1));

        orchestrator.run(&config("0.01")).await.unwrap();
    }

    #[tokio::test]
    async fn failed_creation_sends_nothing_else() {
        let ledger = FakeLedger::with_balance("1")
            .failing_confirmation("create", LedgerError::new("out of gas"));
        let orchestrator = Orchestrator::new(ledger, loader(), recorder(0));

        let err = orchestrator.run(&config("0.01")).await.unwrap_err();

        match err {
            OrchestrationError::Transaction {
                step,
                completed,
                contract,
                source,
            } => {
                assert_eq!(step, Step::Create);
                assert_eq!(step.failure_kind(), "CreationFailed");
                assert_eq!(completed, Stage::Gated);
                assert_eq!(contract, None);
                assert_eq!(source.reason, "out of gas");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(submissions(&orchestrator.ledger.calls()), vec!["create"]);
    }

    #[tokio::test]
    async fn failed_funding_reports_the_live_contract() {
        let ledger = FakeLedger::with_balance("1")
            .failing_submission("transfer", LedgerError::new("insufficient funds"));
        let orchestrator = Orchestrator::new(ledger, loader(), recorder(0));

        let err = orchestrator.run(&config("0.01")).await.unwrap_err();

        match err {
            OrchestrationError::Transaction {
                step,
                completed,
                contract,
                ..
            } => {
                assert_eq!(step, Step::Fund);
                assert_eq!(completed, Stage::Created);
                assert_eq!(contract, Some(Address::repeat_byte(0xaa)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            submissions(&orchestrator.ledger.calls()),
            vec!["create", "transfer"]
        );
    }

    #[tokio::test]
    async fn reverted_initialize_stops_before_subscriptions() {
        let revert = LedgerError::new("execution reverted: Already initialized")
            .with_data("0x08c379a0");
        let ledger = FakeLedger::with_balance("0.02")
            .failing_confirmation(INITIALIZE, revert.clone());
        let orchestrator = Orchestrator::new(ledger, loader(), recorder(0));

        let err = orchestrator.run(&config("0.01")).await.unwrap_err();

        match err {
            OrchestrationError::Transaction {
                step,
                completed,
                source,
                ..
            } => {
                assert_eq!(step.name(), "initialize");
                assert_eq!(completed, Stage::Funded);
                assert_eq!(source, revert);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            submissions(&orchestrator.ledger.calls()),
            vec!["create", "transfer", INITIALIZE]
        );
    }

    #[tokio::test]
    async fn failed_event_subscription_skips_cron() {
        let ledger = FakeLedger::with_balance("1").failing_confirmation(
            SUBSCRIBE_PAYMENT_EVENTS,
            LedgerError::new("reverted"),
        );
        let orchestrator = Orchestrator::new(ledger, loader(), recorder(0));

        let err = orchestrator.run(&config("0.01")).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Transaction {
                step: Step::SubscribeEvents,
                completed: Stage::Initialized,
                ..
            }
        ));
        assert_eq!(
            submissions(&orchestrator.ledger.calls()),
            vec!["create", "transfer", INITIALIZE, SUBSCRIBE_PAYMENT_EVENTS]
        );
    }

    #[tokio::test]
    async fn failed_cron_subscription_is_not_recorded() {
        let ledger = FakeLedger::with_balance("1")
            .failing_confirmation(SUBSCRIBE_CRON, LedgerError::new("reverted"));
        let orchestrator = Orchestrator::new(ledger, loader(), recorder(0));

        let err = orchestrator.run(&config("0.01")).await.unwrap_err();

        match err {
            OrchestrationError::Transaction {
                step, completed, ..
            } => {
                assert_eq!(step.failure_kind(), "CronSubscriptionFailed");
                assert_eq!(completed, Stage::EventSubscribed);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn artifact_without_required_method_aborts_before_creation() {
        let mut loader = MockArtifactLoader::new();
        loader.expect_load().returning(|_| {
            let mut artifact = artifact();
            artifact.abi = serde_json::from_str(
                r#"[{"type":"function","name":"initialize","stateMutability":"nonpayable",
                     "inputs":[{"name":"a","type":"address"},{"name":"b","type":"address"},{"name":"c","type":"uint256"}],"outputs":[]}]"#,
            )
            .unwrap();
            Ok(artifact)
        });
        let ledger = FakeLedger::with_balance("1");
        let orchestrator = Orchestrator::new(ledger, loader, recorder(0));

        let err = orchestrator.run(&config("0.01")).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Artifact(ArtifactError::MissingMethod { .. })
        ));
        assert!(submissions(&orchestrator.ledger.calls()).is_empty());
    }

    #[tokio::test]
    async fn missing_artifact_is_an_artifact_error() {
        let mut loader = MockArtifactLoader::new();
        loader.expect_load().returning(|path: &Path| {
            Err(ArtifactError::NotFound {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });
        let orchestrator = Orchestrator::new(FakeLedger::with_balance("1"), loader, recorder(0));

        let err = orchestrator.run(&config("0.01")).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Artifact(ArtifactError::NotFound { .. })
        ));
        assert!(submissions(&orchestrator.ledger.calls()).is_empty());
    }

    #[tokio::test]
    async fn storage_failure_keeps_the_record() {
        let mut recorder = MockDeploymentRecorder::new();
        recorder.expect_save().times(1).returning(|_| {
            Err(StorageError::Io {
                path: PathBuf::from("deployments/reactive-deployment.json"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        });
        let orchestrator = Orchestrator::new(FakeLedger::with_balance("1"), loader(), recorder);

        let err = orchestrator.run(&config("0.01")).await.unwrap_err();

        match err {
            OrchestrationError::Storage { record, .. } => {
                assert_eq!(record.deployed_address, Address::repeat_byte(0xaa));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(submissions(&orchestrator.ledger.calls()).len(), 5);
    }

    #[tokio::test]
    async fn two_runs_deploy_two_contracts() {
        let orchestrator = Orchestrator::new(FakeLedger::with_balance("1"), loader(), recorder(2));
        let config = config("0.01");

        let first = orchestrator.run(&config).await.unwrap();
        let second = orchestrator.run(&config).await.unwrap();

        assert_ne!(first.deployed_address, second.deployed_address);
    }

    #[test]
    fn steps_advance_one_stage_at_a_time() {
        let steps = [
            Step::Create,
            Step::Fund,
            Step::Initialize,
            Step::SubscribeEvents,
            Step::SubscribeCron,
        ];
        let mut previous = Stage::Gated;
        for step in steps {
            assert_eq!(step.follows(), previous);
            assert!(step.reaches() > previous);
            previous = step.reaches();
        }
        assert!(Stage::Recorded > previous);
    }
}
