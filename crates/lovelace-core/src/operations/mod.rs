//! Operation library
//!
//! Each operation queries the wallet, picks inputs, assembles a fee-free
//! [`TxDraft`] and hands it to the [`DraftBuilder`]. The `draft_*` methods
//! stop before costing so callers can inspect or price a draft without
//! submitting it; the plain methods run the whole flow and wrap the outcome
//! in an [`OperationResult`].

mod distribute;
mod mint;
mod transfer;

pub use distribute::{
    AssetRecipient, DistributeAssets, DistributeRandom, DistributeToken, RandomRecipient,
    TokenRecipient,
};
pub use mint::{BurnTokens, MintTokens};
pub use transfer::{
    FeePaidBy, Refund, TransferAda, TransferAllTokens, TransferLovelace, TransferToken, WipeWallet,
};

use crate::address::{validate_address, validate_stake_address};
use crate::builder::{DraftBuilder, Submission};
use crate::config::EngineConfig;
use crate::draft::{TxDraft, TxOutput};
use crate::error::ErrorCategory;
use crate::metadata::MessageMetadata;
use crate::script::MintScript;
use crate::toolchain::{ChainTip, LedgerToolchain, StakeInfo, WalletProvisioner};
use crate::utxo::{SigningKeyRef, WalletBalance, WalletHandle};
use crate::value::{quantity, AssetId, Value};
use crate::{Error, Result};
use lovelace_params::Network;
use serde::{Deserialize, Serialize};

/// Outcome of an operation, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult<T> {
    /// Whether the operation completed
    pub success: bool,
    /// Result payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error text if failed, including the toolchain's own reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Plain-language summary for user-facing failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error category if failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

impl<T> OperationResult<T> {
    /// Wrap a result, logging failures
    pub fn from_result(operation: &str, result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
                message: None,
                category: None,
            },
            Err(e) => {
                tracing::error!("{} failed ({}): {}", operation, e.category(), e);
                Self {
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                    message: e.is_user_error().then(|| e.user_message()),
                    category: Some(e.category()),
                }
            }
        }
    }

    /// Payload, or the error message
    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| "operation failed".to_string())),
        }
    }
}

/// An assembled, fee-free draft and the keys that must sign it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTx {
    /// Fee-free draft
    pub draft: TxDraft,
    /// Signing keys, one per declared witness
    pub signers: Vec<SigningKeyRef>,
}

impl PlannedTx {
    fn signed_by(draft: TxDraft, wallet: &WalletHandle) -> Self {
        Self {
            draft,
            signers: vec![wallet.signing_key.clone()],
        }
    }
}

/// Transaction flows over an injected toolchain
pub struct Operations<T> {
    toolchain: T,
    config: EngineConfig,
    network: Network,
}

impl<T> Operations<T> {
    /// Create the operation library
    pub fn new(toolchain: T, config: EngineConfig) -> Self {
        let network = config.network_params();
        Self {
            toolchain,
            config,
            network,
        }
    }

    /// Underlying toolchain
    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Network parameters addresses are validated against
    pub fn network(&self) -> &Network {
        &self.network
    }
}

impl<T: LedgerToolchain> Operations<T> {
    /// Fee-balancing driver configured with the engine's fee limit
    pub fn builder(&self) -> DraftBuilder<'_, T> {
        DraftBuilder::new(&self.toolchain).with_max_fee(self.config.max_fee)
    }

    /// Run pass one on a planned transaction without signing it
    pub fn preview(&self, planned: &PlannedTx) -> Result<TxDraft> {
        self.builder().prepare(planned.draft.clone())
    }

    /// Current balance of a wallet
    pub fn wallet_balance(&self, wallet: &WalletHandle) -> OperationResult<WalletBalance> {
        OperationResult::from_result("wallet_balance", self.balance(wallet))
    }

    /// Current chain tip
    pub fn query_tip(&self) -> OperationResult<ChainTip> {
        OperationResult::from_result("query_tip", self.toolchain.query_tip())
    }

    /// Delegation and rewards of a wallet's reward address
    pub fn query_stake_info(&self, wallet: &WalletHandle) -> OperationResult<Vec<StakeInfo>> {
        let result = wallet
            .stake_address
            .as_deref()
            .ok_or_else(|| {
                Error::MissingField(format!("stake address of wallet '{}'", wallet.name))
            })
            .and_then(|stake| {
                validate_stake_address(stake, &self.network)?;
                self.toolchain.query_stake_info(stake)
            });
        OperationResult::from_result("query_stake_info", result)
    }

    pub(crate) fn balance(&self, wallet: &WalletHandle) -> Result<WalletBalance> {
        let balance = self.toolchain.wallet_balance(wallet)?;
        tracing::debug!(
            "Wallet {} holds {} UTXOs, {} lovelace",
            wallet.name,
            balance.utxos.len(),
            balance.value.lovelace()
        );
        Ok(balance)
    }

    pub(crate) fn validate_recipient(&self, address: &str) -> Result<()> {
        validate_address(address, &self.network)
    }

    /// Output carrying `assets`, priced by the oracle unless the caller
    /// supplies the lovelace.
    ///
    /// The oracle sees the assets plus the provisional floor, so its answer
    /// reflects an output of the final shape.
    pub(crate) fn priced_output(
        &self,
        address: &str,
        assets: Value,
        lovelace: Option<u64>,
    ) -> Result<TxOutput> {
        let mut value = assets;
        if let Some(lovelace) = lovelace {
            if lovelace == 0 {
                return Err(Error::InvalidAmount(format!(
                    "lovelace override for {} must be positive",
                    address
                )));
            }
            value.set_lovelace(lovelace)?;
            return Ok(TxOutput::explicit(address, value));
        }

        value.set_lovelace(self.config.token_output_floor)?;
        let minimum = self.toolchain.minimum_lovelace(address, &value)?;
        value.set_lovelace(minimum)?;
        tracing::debug!("Output to {} needs {} lovelace", address, minimum);
        Ok(TxOutput::payment(address, value))
    }

    /// Fail when a time-locked policy can no longer mint
    pub(crate) fn ensure_policy_open(&self, script: &MintScript) -> Result<()> {
        if let Some(slot) = script.lock_slot() {
            let tip = self.toolchain.query_tip()?;
            if tip.slot >= slot {
                return Err(Error::InvalidScript(format!(
                    "policy locked at slot {}, chain is at slot {}",
                    slot, tip.slot
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn submit(
        &self,
        operation: &str,
        planned: Result<PlannedTx>,
    ) -> OperationResult<Submission> {
        let result = planned.and_then(|planned| {
            tracing::info!(
                "{}: {} inputs, {} outputs, {} mint actions",
                operation,
                planned.draft.tx_in.len(),
                planned.draft.tx_out.len(),
                planned.draft.mint.len()
            );
            self.builder().submit(planned.draft, &planned.signers)
        });
        OperationResult::from_result(operation, result)
    }
}

impl<T: LedgerToolchain + WalletProvisioner> Operations<T> {
    /// Provision a new wallet
    pub fn create_wallet(&self, name: &str) -> OperationResult<WalletHandle> {
        let result = validate_wallet_name(name).and_then(|_| {
            let wallet = self.toolchain.create_wallet(name)?;
            validate_address(&wallet.payment_address, &self.network)?;
            tracing::info!("Created wallet {} at {}", name, wallet.payment_address);
            Ok(wallet)
        });
        OperationResult::from_result("create_wallet", result)
    }

    /// Load an existing wallet by name
    pub fn load_wallet(&self, name: &str) -> Result<WalletHandle> {
        validate_wallet_name(name)?;
        self.toolchain.load_wallet(name)
    }
}

fn validate_wallet_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::MissingField("wallet name".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidConfig(format!(
            "wallet name '{}' may only contain letters, digits, '-' and '_'",
            name
        )));
    }
    Ok(())
}

/// Optional message, chunked into metadata
pub(crate) fn message_metadata(message: Option<&str>) -> Result<Option<MessageMetadata>> {
    match message.and_then(MessageMetadata::from_message) {
        Some(metadata) => {
            metadata.validate()?;
            Ok(Some(metadata))
        }
        None => Ok(None),
    }
}

/// Take `amount` of `asset` out of `value`, reporting a shortfall
pub(crate) fn spend(value: &mut Value, asset: &AssetId, amount: u64) -> Result<()> {
    let held = value.get(asset);
    value.subtract(asset, quantity(amount)?).map_err(|_| {
        Error::InsufficientFunds(format!("need {} {}, wallet holds {}", amount, asset, held))
    })
}

/// Take every entry of `other` out of `value`
pub(crate) fn spend_value(value: &mut Value, other: &Value) -> Result<()> {
    for (asset, qty) in other.iter() {
        let held = value.get(asset);
        value.subtract(asset, qty).map_err(|_| {
            Error::InsufficientFunds(format!("need {} {}, wallet holds {}", qty, asset, held))
        })?;
    }
    Ok(())
}

/// Positive amount or a validation error
pub(crate) fn require_positive(amount: u64, what: &str) -> Result<u64> {
    if amount == 0 {
        return Err(Error::InvalidAmount(format!("{} must be positive", what)));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        lovelace_utxo, test_address, test_stake_address, test_wallet, FailStage, MockLedger,
    };
    use lovelace_params::NetworkType;

    fn operations(ledger: MockLedger) -> Operations<MockLedger> {
        Operations::new(ledger, EngineConfig::for_network(NetworkType::Preprod))
    }

    #[test]
    fn test_operation_result_failure() {
        let result: OperationResult<u64> =
            OperationResult::from_result("test", Err(Error::InsufficientFunds("x".to_string())));
        assert!(!result.success);
        assert_eq!(result.category, Some(ErrorCategory::Arithmetic));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"], "Insufficient funds: x");
        assert!(json["message"].as_str().unwrap().contains("enough funds"));
    }

    #[test]
    fn test_toolchain_reason_is_kept() {
        let wallet = test_wallet("alice", 0);
        let ledger = MockLedger::new()
            .failing_at(FailStage::Submit)
            .with_utxos(&wallet.payment_address, vec![lovelace_utxo("aa", 0, 5_000_000)]);
        let ops = operations(ledger);
        let request = TransferLovelace {
            recipient: test_address(1),
            lovelace: 1_000_000,
            utxo: None,
            fee_paid_by: FeePaidBy::Sender,
            message: None,
        };

        let result = ops.transfer_lovelace(&wallet, &request);

        assert!(!result.success);
        assert_eq!(result.category, Some(ErrorCategory::Toolchain));
        let error = result.error.unwrap();
        assert!(error.contains("injected failure at Submit"), "{}", error);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_wallet_balance() {
        let wallet = test_wallet("alice", 0);
        let ledger = MockLedger::new().with_utxos(
            &wallet.payment_address,
            vec![lovelace_utxo("aa", 0, 2_000_000), lovelace_utxo("bb", 1, 3_000_000)],
        );
        let balance = operations(ledger).wallet_balance(&wallet).into_result().unwrap();
        assert_eq!(balance.value.lovelace(), 5_000_000);
        assert_eq!(balance.utxos.len(), 2);
    }

    #[test]
    fn test_query_failure_reported() {
        let ops = operations(MockLedger::new().failing_at(FailStage::Query));
        let result = ops.query_tip();
        assert!(!result.success);
        assert_eq!(result.category, Some(ErrorCategory::Toolchain));
    }

    #[test]
    fn test_stake_info_requires_stake_address() {
        let ops = operations(MockLedger::new());
        let wallet = test_wallet("alice", 0);
        assert_eq!(
            ops.query_stake_info(&wallet).category,
            Some(ErrorCategory::Validation)
        );

        let wallet = wallet.with_stake_address(test_stake_address(0));
        let info = ops.query_stake_info(&wallet).into_result().unwrap();
        assert_eq!(info[0].address, test_stake_address(0));
    }

    #[test]
    fn test_create_wallet() {
        let ops = operations(MockLedger::new());
        let wallet = ops.create_wallet("treasury").into_result().unwrap();
        assert!(wallet.payment_address.starts_with("addr_test"));
        assert_eq!(ops.load_wallet("treasury").unwrap(), wallet);

        let again = ops.create_wallet("treasury");
        assert_eq!(again.category, Some(ErrorCategory::Wallet));
        assert!(!ops.create_wallet("../escape").success);
    }

    #[test]
    fn test_priced_output_uses_floor() {
        let ops = operations(
            MockLedger::new()
                .with_min_lovelace(1_000_000)
                .with_min_per_asset(300_000),
        );
        let assets = Value::from_entries([(AssetId::native("policy1", "tokenA"), 4)]).unwrap();

        let output = ops.priced_output(&test_address(1), assets.clone(), None).unwrap();
        assert_eq!(output.value.lovelace(), 1_300_000);
        assert_eq!(output.role, crate::draft::OutputRole::Payment);

        let output = ops
            .priced_output(&test_address(1), assets.clone(), Some(2_000_000))
            .unwrap();
        assert_eq!(output.value.lovelace(), 2_000_000);
        assert_eq!(output.role, crate::draft::OutputRole::Explicit);

        assert!(ops.priced_output(&test_address(1), assets, Some(0)).is_err());
    }

    #[test]
    fn test_spend_reports_shortfall() {
        let mut value = Value::from_lovelace(10).unwrap();
        let err = spend(&mut value, &AssetId::Lovelace, 11).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));
        assert_eq!(value.lovelace(), 10);
    }
}
