//! Transfers, wallet wipes and refunds

use super::{
    message_metadata, require_positive, spend, spend_value, OperationResult, Operations, PlannedTx,
};
use crate::builder::Submission;
use crate::draft::{TxDraft, TxOutput};
use crate::metadata::MessageMetadata;
use crate::toolchain::LedgerToolchain;
use crate::utxo::{Utxo, UtxoRef, UtxoSelection, WalletHandle};
use crate::value::{quantity, unsigned, AssetId, Value};
use crate::{Error, Result};
use lovelace_params::parse_ada;
use serde::{Deserialize, Serialize};

/// Which side of a lovelace transfer pays the fee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePaidBy {
    /// Fee comes out of the change
    #[default]
    Sender,
    /// Fee comes out of the transferred amount
    Recipient,
}

/// Send lovelace to one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLovelace {
    /// Destination address
    pub recipient: String,
    /// Amount in lovelace
    pub lovelace: u64,
    /// Spend only this output instead of the whole wallet
    #[serde(default)]
    pub utxo: Option<UtxoRef>,
    /// Fee payer
    #[serde(default)]
    pub fee_paid_by: FeePaidBy,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

/// Send a decimal ADA amount to one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAda {
    /// Destination address
    pub recipient: String,
    /// Amount in ADA, up to six decimals
    pub ada: String,
    /// Fee payer
    #[serde(default)]
    pub fee_paid_by: FeePaidBy,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

/// Send units of one native asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferToken {
    /// Destination address
    pub recipient: String,
    /// Asset to send
    pub asset: AssetId,
    /// Units to send
    pub quantity: u64,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

/// Send every native asset the wallet holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAllTokens {
    /// Destination address
    pub recipient: String,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

/// Move the entire wallet to one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeWallet {
    /// Destination address
    pub target: String,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

/// Return the outputs of an incoming transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    /// Incoming transaction whose outputs are returned
    pub tx_hash: String,
    /// Address the value goes back to
    pub refund_address: String,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

impl<T: LedgerToolchain> Operations<T> {
    /// Send lovelace
    pub fn transfer_lovelace(
        &self,
        wallet: &WalletHandle,
        request: &TransferLovelace,
    ) -> OperationResult<Submission> {
        self.submit(
            "transfer_lovelace",
            self.draft_transfer_lovelace(wallet, request),
        )
    }

    /// Send a decimal ADA amount
    pub fn transfer_ada(
        &self,
        wallet: &WalletHandle,
        request: &TransferAda,
    ) -> OperationResult<Submission> {
        let planned = parse_ada(&request.ada).map_err(Error::from).and_then(|lovelace| {
            let request = TransferLovelace {
                recipient: request.recipient.clone(),
                lovelace,
                utxo: None,
                fee_paid_by: request.fee_paid_by,
                message: request.message.clone(),
            };
            self.draft_transfer_lovelace(wallet, &request)
        });
        self.submit("transfer_ada", planned)
    }

    /// Send native asset units
    pub fn transfer_token(
        &self,
        wallet: &WalletHandle,
        request: &TransferToken,
    ) -> OperationResult<Submission> {
        self.submit("transfer_token", self.draft_transfer_token(wallet, request))
    }

    /// Send every native asset
    pub fn transfer_all_tokens(
        &self,
        wallet: &WalletHandle,
        request: &TransferAllTokens,
    ) -> OperationResult<Submission> {
        self.submit(
            "transfer_all_tokens",
            self.draft_transfer_all_tokens(wallet, request),
        )
    }

    /// Empty the wallet
    pub fn wipe_wallet(
        &self,
        wallet: &WalletHandle,
        request: &WipeWallet,
    ) -> OperationResult<Submission> {
        self.submit("wipe_wallet", self.draft_wipe_wallet(wallet, request))
    }

    /// Return an incoming payment
    pub fn refund(&self, wallet: &WalletHandle, request: &Refund) -> OperationResult<Submission> {
        self.submit("refund", self.draft_refund(wallet, request))
    }

    /// Change first, recipient second. An explicit input that the wallet
    /// does not hold is rejected before anything is assembled.
    pub fn draft_transfer_lovelace(
        &self,
        wallet: &WalletHandle,
        request: &TransferLovelace,
    ) -> Result<PlannedTx> {
        let amount = require_positive(request.lovelace, "transfer amount")?;
        self.validate_recipient(&request.recipient)?;
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let selection = match &request.utxo {
            Some(reference) => UtxoSelection::Only(vec![reference.clone()]),
            None => UtxoSelection::All,
        };
        let inputs = selection.select(&balance.utxos)?;

        let mut change = Value::sum(inputs.iter().map(|utxo| &utxo.value))?;
        spend(&mut change, &AssetId::Lovelace, amount)?;

        let mut draft = TxDraft::new(inputs);
        let change_index = draft.push_change(&wallet.payment_address, change);
        let recipient_index = draft.push_output(TxOutput::explicit(
            request.recipient.as_str(),
            Value::from_lovelace(amount)?,
        ));
        match request.fee_paid_by {
            FeePaidBy::Sender => draft.pay_fee_from(change_index.ok_or_else(|| {
                Error::InsufficientFunds("nothing left over to pay the fee".to_string())
            })?),
            FeePaidBy::Recipient => draft.pay_fee_from(recipient_index),
        }
        draft.set_metadata(metadata);

        Ok(PlannedTx::signed_by(draft, wallet))
    }

    /// Change first, then the oracle-priced token output
    pub fn draft_transfer_token(
        &self,
        wallet: &WalletHandle,
        request: &TransferToken,
    ) -> Result<PlannedTx> {
        if request.asset.is_lovelace() {
            return Err(Error::InvalidAsset(
                "lovelace is sent with transfer_lovelace".to_string(),
            ));
        }
        let amount = require_positive(request.quantity, "token quantity")?;
        self.validate_recipient(&request.recipient)?;
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let inputs = UtxoSelection::All.select(&balance.utxos)?;
        let mut change = Value::sum(inputs.iter().map(|utxo| &utxo.value))?;
        spend(&mut change, &request.asset, amount)?;

        let mut tokens = Value::new();
        tokens.add(&request.asset, quantity(amount)?)?;
        let output = self.priced_output(&request.recipient, tokens, None)?;
        spend(
            &mut change,
            &AssetId::Lovelace,
            unsigned(output.value.lovelace())?,
        )?;

        self.change_first(wallet, inputs, change, vec![output], metadata)
    }

    /// Change first, then one output holding every native asset
    pub fn draft_transfer_all_tokens(
        &self,
        wallet: &WalletHandle,
        request: &TransferAllTokens,
    ) -> Result<PlannedTx> {
        self.validate_recipient(&request.recipient)?;
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let inputs = UtxoSelection::All.select(&balance.utxos)?;
        let total = Value::sum(inputs.iter().map(|utxo| &utxo.value))?;
        let tokens = total.native_assets();
        if tokens.is_empty() {
            return Err(Error::InsufficientFunds(format!(
                "wallet '{}' holds no native assets",
                wallet.name
            )));
        }

        let output = self.priced_output(&request.recipient, tokens, None)?;
        let mut change = total;
        spend_value(&mut change, &output.value)?;

        self.change_first(wallet, inputs, change, vec![output], metadata)
    }

    /// One output holding everything, less the fee
    pub fn draft_wipe_wallet(
        &self,
        wallet: &WalletHandle,
        request: &WipeWallet,
    ) -> Result<PlannedTx> {
        self.validate_recipient(&request.target)?;
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let inputs = UtxoSelection::All.select(&balance.utxos)?;
        self.sweep(wallet, inputs, &request.target, metadata)
    }

    /// One output returning the incoming transaction's outputs, less the fee
    pub fn draft_refund(&self, wallet: &WalletHandle, request: &Refund) -> Result<PlannedTx> {
        if request.tx_hash.trim().is_empty() {
            return Err(Error::MissingField("refund transaction hash".to_string()));
        }
        self.validate_recipient(&request.refund_address)?;
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let inputs = UtxoSelection::FromTransaction(request.tx_hash.trim().to_string())
            .select(&balance.utxos)?;
        self.sweep(wallet, inputs, &request.refund_address, metadata)
    }

    fn sweep(
        &self,
        wallet: &WalletHandle,
        inputs: Vec<Utxo>,
        target: &str,
        metadata: Option<MessageMetadata>,
    ) -> Result<PlannedTx> {
        let total = Value::sum(inputs.iter().map(|utxo| &utxo.value))?;
        let mut draft = TxDraft::new(inputs);
        let index = draft.push_output(TxOutput::change(target, total));
        draft.pay_fee_from(index);
        draft.set_metadata(metadata);
        Ok(PlannedTx::signed_by(draft, wallet))
    }

    /// Draft with the change output first and the fee taken from it
    pub(crate) fn change_first(
        &self,
        wallet: &WalletHandle,
        inputs: Vec<Utxo>,
        change: Value,
        outputs: Vec<TxOutput>,
        metadata: Option<MessageMetadata>,
    ) -> Result<PlannedTx> {
        let mut draft = TxDraft::new(inputs);
        let change_index = draft
            .push_change(&wallet.payment_address, change)
            .ok_or_else(|| Error::InsufficientFunds("no change left to pay the fee".to_string()))?;
        for output in outputs {
            draft.push_output(output);
        }
        draft.pay_fee_from(change_index);
        draft.set_metadata(metadata);
        Ok(PlannedTx::signed_by(draft, wallet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::draft::OutputRole;
    use crate::error::ErrorCategory;
    use crate::testing::{asset_utxo, lovelace_utxo, test_address, test_wallet, MockLedger};
    use lovelace_params::NetworkType;

    fn operations(ledger: MockLedger) -> Operations<MockLedger> {
        Operations::new(ledger, EngineConfig::for_network(NetworkType::Preprod))
    }

    fn funded(utxos: Vec<Utxo>) -> (Operations<MockLedger>, WalletHandle) {
        let wallet = test_wallet("alice", 0);
        let ledger = MockLedger::new().with_utxos(&wallet.payment_address, utxos);
        (operations(ledger), wallet)
    }

    fn lovelace_request(lovelace: u64) -> TransferLovelace {
        TransferLovelace {
            recipient: test_address(1),
            lovelace,
            utxo: None,
            fee_paid_by: FeePaidBy::Sender,
            message: None,
        }
    }

    #[test]
    fn test_transfer_lovelace() {
        let (ops, wallet) = funded(vec![lovelace_utxo("aa", 0, 5_000_000)]);

        let submission = ops
            .transfer_lovelace(&wallet, &lovelace_request(1_000_000))
            .into_result()
            .unwrap();

        let draft = submission.draft;
        assert_eq!(draft.fee, 170_000);
        assert_eq!(draft.tx_out.len(), 2);
        assert_eq!(draft.tx_out[0].address, wallet.payment_address);
        assert_eq!(draft.tx_out[0].value.lovelace(), 3_830_000);
        assert_eq!(draft.tx_out[1].value.lovelace(), 1_000_000);
        assert!(draft.check_balance().is_ok());
    }

    #[test]
    fn test_fee_paid_by_recipient() {
        let (ops, wallet) = funded(vec![lovelace_utxo("aa", 0, 5_000_000)]);
        let mut request = lovelace_request(2_000_000);
        request.fee_paid_by = FeePaidBy::Recipient;

        let planned = ops.draft_transfer_lovelace(&wallet, &request).unwrap();
        let draft = ops.preview(&planned).unwrap();
        assert_eq!(draft.tx_out[0].value.lovelace(), 3_000_000);
        assert_eq!(draft.tx_out[1].value.lovelace(), 1_830_000);
    }

    #[test]
    fn test_explicit_utxo_must_exist() {
        let (ops, wallet) = funded(vec![lovelace_utxo("aa", 0, 5_000_000)]);
        let mut request = lovelace_request(1_000_000);
        request.utxo = Some(UtxoRef::new("bb", 0));

        let result = ops.transfer_lovelace(&wallet, &request);
        assert!(!result.success);
        assert_eq!(result.category, Some(ErrorCategory::Validation));
        assert!(ops.toolchain().built_drafts().is_empty());
    }

    #[test]
    fn test_transfer_everything_fails_without_change() {
        let (ops, wallet) = funded(vec![lovelace_utxo("aa", 0, 5_000_000)]);
        let result = ops.draft_transfer_lovelace(&wallet, &lovelace_request(5_000_000));
        assert!(matches!(result, Err(Error::InsufficientFunds(_))));
    }

    #[test]
    fn test_invalid_recipient() {
        let (ops, wallet) = funded(vec![lovelace_utxo("aa", 0, 5_000_000)]);
        let mut request = lovelace_request(1_000_000);
        request.recipient = "addr1notanaddress".to_string();
        assert!(matches!(
            ops.draft_transfer_lovelace(&wallet, &request),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_transfer_ada_parses_decimal() {
        let (ops, wallet) = funded(vec![lovelace_utxo("aa", 0, 5_000_000)]);
        let request = TransferAda {
            recipient: test_address(1),
            ada: "1.5".to_string(),
            fee_paid_by: FeePaidBy::Sender,
            message: None,
        };
        let submission = ops.transfer_ada(&wallet, &request).into_result().unwrap();
        assert_eq!(submission.draft.tx_out[1].value.lovelace(), 1_500_000);

        let bad = TransferAda {
            ada: "1.2345678".to_string(),
            ..request
        };
        assert_eq!(
            ops.transfer_ada(&wallet, &bad).category,
            Some(ErrorCategory::Validation)
        );
    }

    #[test]
    fn test_transfer_token() {
        let wallet = test_wallet("alice", 0);
        let ledger = MockLedger::new().with_min_lovelace(1_300_000).with_utxos(
            &wallet.payment_address,
            vec![asset_utxo("aa", 0, 3_000_000, &[("policy1.tokenA", 10)])],
        );
        let ops = operations(ledger);
        let token: AssetId = "policy1.tokenA".parse().unwrap();
        let request = TransferToken {
            recipient: test_address(1),
            asset: token.clone(),
            quantity: 4,
            message: None,
        };

        let submission = ops.transfer_token(&wallet, &request).into_result().unwrap();
        let draft = submission.draft;

        assert_eq!(draft.tx_out[0].value.lovelace(), 3_000_000 - 1_300_000 - 170_000);
        assert_eq!(draft.tx_out[0].value.get(&token), 6);
        assert_eq!(draft.tx_out[1].value.lovelace(), 1_300_000);
        assert_eq!(draft.tx_out[1].value.get(&token), 4);
        assert_eq!(draft.tx_out[1].role, OutputRole::Payment);
        assert!(draft.check_balance().is_ok());
    }

    #[test]
    fn test_transfer_token_shortfall() {
        let (ops, wallet) = funded(vec![asset_utxo(
            "aa",
            0,
            3_000_000,
            &[("policy1.tokenA", 3)],
        )]);
        let request = TransferToken {
            recipient: test_address(1),
            asset: "policy1.tokenA".parse().unwrap(),
            quantity: 4,
            message: None,
        };
        assert!(matches!(
            ops.draft_transfer_token(&wallet, &request),
            Err(Error::InsufficientFunds(_))
        ));
    }

    #[test]
    fn test_transfer_all_tokens() {
        let (ops, wallet) = funded(vec![
            asset_utxo("aa", 0, 2_000_000, &[("policy1.tokenA", 10)]),
            asset_utxo("bb", 0, 2_000_000, &[("policy2.tokenB", 1)]),
        ]);
        let request = TransferAllTokens {
            recipient: test_address(1),
            message: Some("all yours".to_string()),
        };

        let submission = ops.transfer_all_tokens(&wallet, &request).into_result().unwrap();
        let draft = submission.draft;

        assert!(!draft.tx_out[0].value.has_native_assets());
        assert_eq!(draft.tx_out[1].value.native_assets().len(), 2);
        assert_eq!(draft.metadata.unwrap().msg, vec!["all yours".to_string()]);
    }

    #[test]
    fn test_wipe_wallet() {
        let (ops, wallet) = funded(vec![
            lovelace_utxo("aa", 0, 2_000_000),
            asset_utxo("bb", 1, 1_500_000, &[("policy1.tokenA", 7)]),
        ]);
        let request = WipeWallet {
            target: test_address(2),
            message: None,
        };

        let draft = ops.wipe_wallet(&wallet, &request).into_result().unwrap().draft;
        assert_eq!(draft.tx_in.len(), 2);
        assert_eq!(draft.tx_out.len(), 1);
        assert_eq!(draft.tx_out[0].value.lovelace(), 3_330_000);
        assert_eq!(draft.tx_out[0].value.get(&"policy1.tokenA".parse().unwrap()), 7);
    }

    #[test]
    fn test_refund_spends_only_that_transaction() {
        let (ops, wallet) = funded(vec![
            lovelace_utxo("aa", 0, 2_000_000),
            lovelace_utxo("bb", 0, 3_000_000),
            lovelace_utxo("bb", 1, 1_000_000),
        ]);
        let request = Refund {
            tx_hash: "bb".to_string(),
            refund_address: test_address(3),
            message: Some("refund".to_string()),
        };

        let draft = ops.refund(&wallet, &request).into_result().unwrap().draft;
        assert_eq!(draft.tx_in.len(), 2);
        assert_eq!(draft.tx_out[0].address, test_address(3));
        assert_eq!(draft.tx_out[0].value.lovelace(), 3_830_000);

        let missing = Refund {
            tx_hash: "cc".to_string(),
            ..request
        };
        assert!(matches!(
            ops.draft_refund(&wallet, &missing),
            Err(Error::InputNotFound(_))
        ));
    }
}
