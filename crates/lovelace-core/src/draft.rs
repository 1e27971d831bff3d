//! Transaction drafts
//!
//! A [`TxDraft`] is the work object every operation assembles: inputs,
//! outputs, mint actions, metadata, witness count and validity end. Fee
//! correction is the pure [`TxDraft::rebalance`]; the conservation and
//! output audits run before every body build.

use crate::metadata::MessageMetadata;
use crate::script::MintScript;
use crate::utxo::Utxo;
use crate::value::{quantity, AssetId, Quantity, Value};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// How an output's lovelace was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputRole {
    /// Remainder returned to the sender; exempt from the minimum-output check
    Change,
    /// Lovelace taken from the minimum-output oracle
    Payment,
    /// Lovelace supplied by the caller
    Explicit,
}

/// Transaction output descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Destination address
    pub address: String,
    /// Value carried
    pub value: Value,
    /// How the lovelace was decided
    pub role: OutputRole,
}

impl TxOutput {
    /// Change output
    pub fn change(address: impl Into<String>, value: Value) -> Self {
        Self {
            address: address.into(),
            value,
            role: OutputRole::Change,
        }
    }

    /// Oracle-priced output
    pub fn payment(address: impl Into<String>, value: Value) -> Self {
        Self {
            address: address.into(),
            value,
            role: OutputRole::Payment,
        }
    }

    /// Caller-priced output
    pub fn explicit(address: impl Into<String>, value: Value) -> Self {
        Self {
            address: address.into(),
            value,
            role: OutputRole::Explicit,
        }
    }
}

/// Mint action kind. Burns are mints with a negative quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MintActionKind {
    /// Mint (positive) or burn (negative)
    Mint,
}

/// Mint or burn of one asset under a native script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintAction {
    /// Always `mint`; the sign of `quantity` gives the direction
    pub action: MintActionKind,
    /// Signed quantity
    pub quantity: Quantity,
    /// Asset minted or burned
    pub asset: AssetId,
    /// Authorizing policy script
    pub script: MintScript,
}

impl MintAction {
    /// Mint `amount` units
    pub fn mint(asset: AssetId, amount: u64, script: MintScript) -> Result<Self> {
        Ok(Self {
            action: MintActionKind::Mint,
            quantity: quantity(amount)?,
            asset,
            script,
        })
    }

    /// Burn `amount` units
    pub fn burn(asset: AssetId, amount: u64, script: MintScript) -> Result<Self> {
        Ok(Self {
            action: MintActionKind::Mint,
            quantity: -quantity(amount)?,
            asset,
            script,
        })
    }
}

/// Transaction draft
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxDraft {
    /// Inputs, in spend order
    pub tx_in: Vec<Utxo>,
    /// Outputs, in creation order
    pub tx_out: Vec<TxOutput>,
    /// Mint and burn actions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mint: Vec<MintAction>,
    /// Message metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    /// Declared number of signatures
    pub witness_count: usize,
    /// Validity end slot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_after: Option<u64>,
    /// Fee in lovelace (zero until rebalanced)
    pub fee: u64,
    /// Index of the output the fee is taken from
    pub fee_payer: usize,
}

impl TxDraft {
    /// Empty fee-free draft spending `inputs` with one witness
    pub fn new(inputs: Vec<Utxo>) -> Self {
        Self {
            tx_in: inputs,
            witness_count: 1,
            ..Default::default()
        }
    }

    /// Append an output, returning its index
    pub fn push_output(&mut self, output: TxOutput) -> usize {
        self.tx_out.push(output);
        self.tx_out.len() - 1
    }

    /// Append a change output unless it would be empty
    pub fn push_change(&mut self, address: &str, value: Value) -> Option<usize> {
        if value.is_empty() {
            tracing::debug!("No change left for {}", address);
            return None;
        }
        Some(self.push_output(TxOutput::change(address, value)))
    }

    /// Append a mint or burn action
    pub fn push_mint(&mut self, action: MintAction) {
        self.mint.push(action);
    }

    /// Designate the fee-paying output
    pub fn pay_fee_from(&mut self, index: usize) {
        self.fee_payer = index;
    }

    /// Attach message metadata
    pub fn set_metadata(&mut self, metadata: Option<MessageMetadata>) {
        self.metadata = metadata;
    }

    /// Sum of all inputs
    pub fn input_value(&self) -> Result<Value> {
        Value::sum(self.tx_in.iter().map(|utxo| &utxo.value))
    }

    /// Sum of all outputs
    pub fn output_value(&self) -> Result<Value> {
        Value::sum(self.tx_out.iter().map(|output| &output.value))
    }

    /// Net minted (positive) and burned (negative) quantities
    pub fn mint_delta(&self) -> Result<Value> {
        let mut delta = Value::new();
        for action in &self.mint {
            delta.add(&action.asset, action.quantity)?;
        }
        Ok(delta)
    }

    /// `inputs + mint - outputs - fee`, per asset; empty when balanced
    pub fn imbalance(&self) -> Result<Value> {
        let mut delta = self.input_value()?;
        delta.merge(&self.mint_delta()?)?;
        for output in &self.tx_out {
            for (asset, qty) in output.value.iter() {
                delta.add(asset, -qty)?;
            }
        }
        delta.add(&AssetId::Lovelace, -quantity(self.fee)?)?;
        Ok(delta)
    }

    /// Verify per-asset conservation
    pub fn check_balance(&self) -> Result<()> {
        let imbalance = self.imbalance()?;
        if imbalance.is_empty() {
            return Ok(());
        }

        let details: Vec<String> = imbalance
            .iter()
            .map(|(asset, qty)| format!("{} {:+}", asset, qty))
            .collect();
        Err(Error::Unbalanced(details.join(", ")))
    }

    /// Verify every output carries lovelace and only positive entries
    pub fn check_outputs(&self) -> Result<()> {
        if self.tx_out.is_empty() {
            return Err(Error::TransactionBuild("draft has no outputs".to_string()));
        }
        for (index, output) in self.tx_out.iter().enumerate() {
            if !output.value.is_strictly_positive() {
                return Err(Error::NegativeQuantity(format!(
                    "output #{} to {} has a non-positive entry",
                    index, output.address
                )));
            }
            if output.value.lovelace() <= 0 {
                return Err(Error::BelowMinimumOutput(format!(
                    "output #{} to {} carries no lovelace",
                    index, output.address
                )));
            }
        }
        if let Some(metadata) = &self.metadata {
            metadata.validate()?;
        }
        Ok(())
    }

    /// Return a new draft with `fee` taken from the fee-paying output.
    ///
    /// A change output left with exactly zero lovelace and no tokens is
    /// dropped. Anything below zero is insufficient funds.
    pub fn rebalance(&self, fee: u64) -> Result<TxDraft> {
        if self.fee != 0 {
            return Err(Error::FeeCalculation(format!(
                "draft already carries a fee of {}",
                self.fee
            )));
        }

        let mut next = self.clone();
        let index = next.fee_payer;
        let payer = next.tx_out.get_mut(index).ok_or_else(|| {
            Error::TransactionBuild(format!("fee payer output #{} does not exist", index))
        })?;

        let remaining = payer
            .value
            .lovelace()
            .checked_sub(quantity(fee)?)
            .ok_or_else(|| Error::AmountOverflow(format!("fee {} underflows", fee)))?;

        if remaining < 0 {
            return Err(Error::InsufficientFunds(format!(
                "output #{} holds {} lovelace, fee is {}",
                index,
                payer.value.lovelace(),
                fee
            )));
        }

        if remaining == 0 {
            if payer.role != OutputRole::Change || payer.value.has_native_assets() {
                return Err(Error::InsufficientFunds(format!(
                    "fee of {} leaves output #{} without lovelace",
                    fee, index
                )));
            }
            tracing::warn!("Dropping change output #{}; fee consumed it", index);
            next.tx_out.remove(index);
            next.fee_payer = 0;
        } else {
            payer.value.insert(AssetId::Lovelace, remaining);
        }

        next.fee = fee;
        tracing::debug!("Rebalanced draft with fee {}", fee);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utxo::UtxoRef;

    fn utxo(lovelace: u64) -> Utxo {
        Utxo::new(UtxoRef::new("aa", 0), Value::from_lovelace(lovelace).unwrap())
    }

    fn transfer_draft() -> TxDraft {
        let mut draft = TxDraft::new(vec![utxo(5_000_000)]);
        draft.push_change("sender", Value::from_lovelace(4_000_000).unwrap());
        draft.push_output(TxOutput::explicit(
            "recipient",
            Value::from_lovelace(1_000_000).unwrap(),
        ));
        draft
    }

    #[test]
    fn test_fee_free_draft_is_balanced() {
        let draft = transfer_draft();
        assert!(draft.check_balance().is_ok());
        assert!(draft.check_outputs().is_ok());
    }

    #[test]
    fn test_rebalance_from_change() {
        let draft = transfer_draft();
        let balanced = draft.rebalance(170_000).unwrap();

        assert_eq!(balanced.fee, 170_000);
        assert_eq!(balanced.tx_out[0].value.lovelace(), 3_830_000);
        assert_eq!(balanced.tx_out[1].value.lovelace(), 1_000_000);
        assert!(balanced.check_balance().is_ok());
        // original untouched
        assert_eq!(draft.tx_out[0].value.lovelace(), 4_000_000);
        assert_eq!(draft.fee, 0);
    }

    #[test]
    fn test_rebalance_from_recipient() {
        let mut draft = transfer_draft();
        draft.pay_fee_from(1);
        let balanced = draft.rebalance(200_000).unwrap();
        assert_eq!(balanced.tx_out[1].value.lovelace(), 800_000);
        assert!(balanced.check_balance().is_ok());
    }

    #[test]
    fn test_rebalance_twice_rejected() {
        let balanced = transfer_draft().rebalance(1).unwrap();
        assert!(balanced.rebalance(1).is_err());
    }

    #[test]
    fn test_change_dropped_at_zero() {
        let mut draft = TxDraft::new(vec![utxo(1_200_000)]);
        draft.push_output(TxOutput::explicit(
            "recipient",
            Value::from_lovelace(1_000_000).unwrap(),
        ));
        let change = draft.push_change("sender", Value::from_lovelace(200_000).unwrap());
        draft.pay_fee_from(change.unwrap());

        let balanced = draft.rebalance(200_000).unwrap();
        assert_eq!(balanced.tx_out.len(), 1);
        assert_eq!(balanced.tx_out[0].address, "recipient");
        assert!(balanced.check_balance().is_ok());
    }

    #[test]
    fn test_fee_exceeding_payer() {
        let draft = transfer_draft();
        assert!(matches!(
            draft.rebalance(4_000_001),
            Err(Error::InsufficientFunds(_))
        ));
    }

    #[test]
    fn test_token_change_never_dropped() {
        let token = AssetId::native("policy1", "tokenA");
        let mut value = Value::from_lovelace(100).unwrap();
        value.add(&token, 2).unwrap();
        let mut draft = TxDraft::new(vec![Utxo::new(UtxoRef::new("aa", 0), value.clone())]);
        draft.push_change("sender", value);

        assert!(matches!(
            draft.rebalance(100),
            Err(Error::InsufficientFunds(_))
        ));
    }

    #[test]
    fn test_unbalanced_detected() {
        let mut draft = transfer_draft();
        draft.tx_out[1].value.set_lovelace(1_000_001).unwrap();
        let err = draft.check_balance().unwrap_err();
        assert!(err.to_string().contains("lovelace -1"));
    }

    #[test]
    fn test_burn_conservation() {
        let token = AssetId::native("policy1", "tokenA");
        let mut held = Value::from_lovelace(2_000_000).unwrap();
        held.add(&token, 10).unwrap();

        let mut remaining = held.clone();
        remaining.subtract(&token, 5).unwrap();

        let mut draft = TxDraft::new(vec![Utxo::new(UtxoRef::new("aa", 0), held)]);
        draft.push_change("sender", remaining);
        draft.push_mint(MintAction::burn(token, 5, MintScript::single_signer("kh")).unwrap());

        assert!(draft.check_balance().is_ok());
        assert_eq!(draft.mint[0].quantity, -5);
    }

    #[test]
    fn test_zero_lovelace_output_rejected() {
        let mut draft = TxDraft::new(vec![utxo(1)]);
        draft.push_output(TxOutput::explicit(
            "x",
            Value::from_entries([(AssetId::native("p", "t"), 1)]).unwrap(),
        ));
        assert!(matches!(
            draft.check_outputs(),
            Err(Error::BelowMinimumOutput(_))
        ));
    }

    #[test]
    fn test_mint_action_json() {
        let action = MintAction::burn(
            AssetId::native("policy1", "tokenA"),
            5,
            MintScript::single_signer("kh"),
        )
        .unwrap();
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "mint");
        assert_eq!(json["quantity"], -5);
        assert_eq!(json["asset"], "policy1.tokenA");
    }
}
