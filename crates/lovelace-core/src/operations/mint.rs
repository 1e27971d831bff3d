//! Minting and burning under a policy wallet's native script

use super::{message_metadata, require_positive, spend, OperationResult, Operations, PlannedTx};
use crate::builder::Submission;
use crate::draft::{MintAction, TxDraft, TxOutput};
use crate::script::{build_script, MintScript};
use crate::toolchain::LedgerToolchain;
use crate::utxo::{SigningKeyRef, UtxoRef, UtxoSelection, WalletHandle};
use crate::value::{quantity, unsigned, AssetId, Value};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Destroy units of an asset issued under the policy wallet's script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnTokens {
    /// Asset name, hex encoded
    pub asset_name: String,
    /// Units to burn
    pub quantity: u64,
    /// Policy lock slot; absent, empty, `null` or `-1` for none
    #[serde(default)]
    pub lock_slot: Option<String>,
    /// Where the remaining value goes; defaults to the sender
    #[serde(default)]
    pub payout_address: Option<String>,
    /// Spend only these outputs
    #[serde(default)]
    pub utxos: Option<Vec<UtxoRef>>,
}

/// Issue units of an asset under the policy wallet's script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintTokens {
    /// Asset name, hex encoded
    pub asset_name: String,
    /// Units to mint
    pub quantity: u64,
    /// Policy lock slot; absent, empty, `null` or `-1` for none
    #[serde(default)]
    pub lock_slot: Option<String>,
    /// Receives the new units; they stay in the wallet when absent
    #[serde(default)]
    pub recipient: Option<String>,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

impl<T: LedgerToolchain> Operations<T> {
    /// Burn tokens
    pub fn burn_tokens(
        &self,
        wallet: &WalletHandle,
        policy_wallet: &WalletHandle,
        request: &BurnTokens,
    ) -> OperationResult<Submission> {
        self.submit(
            "burn_tokens",
            self.draft_burn_tokens(wallet, policy_wallet, request),
        )
    }

    /// Mint tokens
    pub fn mint_tokens(
        &self,
        wallet: &WalletHandle,
        policy_wallet: &WalletHandle,
        request: &MintTokens,
    ) -> OperationResult<Submission> {
        self.submit(
            "mint_tokens",
            self.draft_mint_tokens(wallet, policy_wallet, request),
        )
    }

    /// One output with everything left after the burn; signed by the
    /// wallet and the policy wallet
    pub fn draft_burn_tokens(
        &self,
        wallet: &WalletHandle,
        policy_wallet: &WalletHandle,
        request: &BurnTokens,
    ) -> Result<PlannedTx> {
        let amount = require_positive(request.quantity, "burn quantity")?;
        let script = build_script(policy_wallet.require_key_hash()?, request.lock_slot.as_deref())?;
        let payout = request
            .payout_address
            .as_deref()
            .unwrap_or(wallet.payment_address.as_str());
        self.validate_recipient(payout)?;

        let balance = self.balance(wallet)?;
        let selection = match &request.utxos {
            Some(refs) if !refs.is_empty() => UtxoSelection::Only(refs.clone()),
            _ => UtxoSelection::All,
        };
        let inputs = selection.select(&balance.utxos)?;

        self.ensure_policy_open(&script)?;
        let asset = self.policy_asset(&script, &request.asset_name)?;

        let mut remaining = Value::sum(inputs.iter().map(|utxo| &utxo.value))?;
        let mut draft = TxDraft::new(inputs);
        draft.push_mint(MintAction::burn(asset.clone(), amount, script.clone())?);
        spend(&mut remaining, &asset, amount)?;

        let index = draft.push_output(TxOutput::change(payout, remaining));
        draft.pay_fee_from(index);
        Ok(authorized(draft, &script, wallet, policy_wallet))
    }

    /// Change first, then the recipient output when one is named
    pub fn draft_mint_tokens(
        &self,
        wallet: &WalletHandle,
        policy_wallet: &WalletHandle,
        request: &MintTokens,
    ) -> Result<PlannedTx> {
        let amount = require_positive(request.quantity, "mint quantity")?;
        let script = build_script(policy_wallet.require_key_hash()?, request.lock_slot.as_deref())?;
        if let Some(recipient) = &request.recipient {
            self.validate_recipient(recipient)?;
        }
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let inputs = UtxoSelection::All.select(&balance.utxos)?;

        self.ensure_policy_open(&script)?;
        let asset = self.policy_asset(&script, &request.asset_name)?;
        let mut minted = Value::new();
        minted.add(&asset, quantity(amount)?)?;

        let mut change = Value::sum(inputs.iter().map(|utxo| &utxo.value))?;
        let mut outputs = Vec::new();
        match &request.recipient {
            Some(recipient) => {
                let output = self.priced_output(recipient, minted, None)?;
                spend(
                    &mut change,
                    &AssetId::Lovelace,
                    unsigned(output.value.lovelace())?,
                )?;
                outputs.push(output);
            }
            None => change.merge(&minted)?,
        }

        let mut planned = self.change_first(wallet, inputs, change, outputs, metadata)?;
        planned
            .draft
            .push_mint(MintAction::mint(asset, amount, script.clone())?);
        Ok(authorized(planned.draft, &script, wallet, policy_wallet))
    }

    fn policy_asset(&self, script: &MintScript, asset_name: &str) -> Result<AssetId> {
        let policy_id = self.toolchain().derive_policy_id(script)?;
        if policy_id.as_str().is_empty() {
            return Err(Error::PolicyDerivation(format!(
                "empty policy id for script {}",
                script
            )));
        }
        let asset = AssetId::native(policy_id.as_str(), asset_name);
        tracing::debug!(
            "Asset {} ({}) under policy {} for script {}",
            asset_name,
            asset.asset_name_utf8().unwrap_or_default(),
            policy_id,
            script
        );
        Ok(asset)
    }
}

/// Attach the policy's validity window and its signers. The policy wallet
/// signs only when the script asks for a signature; a wallet that owns its
/// own policy signs once.
fn authorized(
    mut draft: TxDraft,
    script: &MintScript,
    wallet: &WalletHandle,
    policy_wallet: &WalletHandle,
) -> PlannedTx {
    let mut signers: Vec<SigningKeyRef> = vec![wallet.signing_key.clone()];
    if script.required_signers() > 0 && policy_wallet.signing_key != wallet.signing_key {
        signers.push(policy_wallet.signing_key.clone());
    }
    draft.witness_count = signers.len();
    draft.invalid_after = script.lock_slot();
    PlannedTx { draft, signers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::ErrorCategory;
    use crate::testing::{asset_utxo, lovelace_utxo, test_address, test_wallet, MockLedger};
    use lovelace_params::NetworkType;

    const POLICY: &str = "policy1";

    fn setup(
        utxos: Vec<crate::utxo::Utxo>,
        script: MintScript,
    ) -> (Operations<MockLedger>, WalletHandle, WalletHandle) {
        let wallet = test_wallet("alice", 0);
        let policy_wallet = test_wallet("minter", 9);
        let ledger = MockLedger::new()
            .with_utxos(&wallet.payment_address, utxos)
            .with_policy_id(script, POLICY);
        let ops = Operations::new(ledger, EngineConfig::for_network(NetworkType::Preprod));
        (ops, wallet, policy_wallet)
    }

    fn burn(quantity: u64, lock_slot: Option<&str>) -> BurnTokens {
        BurnTokens {
            asset_name: "tokenA".to_string(),
            quantity,
            lock_slot: lock_slot.map(str::to_string),
            payout_address: None,
            utxos: None,
        }
    }

    #[test]
    fn test_burn_with_time_lock() {
        let minter = test_wallet("minter", 9);
        let script = MintScript::time_locked(minter.key_hash.clone().unwrap(), 12_345_678);
        let (ops, wallet, policy_wallet) = setup(
            vec![asset_utxo("aa", 0, 2_000_000, &[("policy1.tokenA", 10)])],
            script.clone(),
        );

        let submission = ops
            .burn_tokens(&wallet, &policy_wallet, &burn(5, Some("12345678")))
            .into_result()
            .unwrap();
        let draft = submission.draft;

        assert_eq!(draft.mint.len(), 1);
        assert_eq!(draft.mint[0].quantity, -5);
        assert_eq!(draft.mint[0].asset.to_string(), "policy1.tokenA");
        assert_eq!(draft.mint[0].script, script);
        assert_eq!(draft.invalid_after, Some(12_345_678));
        assert_eq!(draft.witness_count, 2);
        assert_eq!(draft.tx_out.len(), 1);
        assert_eq!(draft.tx_out[0].value.get(&draft.mint[0].asset), 5);
        assert_eq!(draft.tx_out[0].value.lovelace(), 1_830_000);
        assert!(draft.check_balance().is_ok());

        let signatures = ops.toolchain().signatures();
        assert_eq!(
            signatures[0],
            vec![wallet.signing_key.clone(), policy_wallet.signing_key.clone()]
        );

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["invalidAfter"], 12_345_678);
        assert_eq!(json["mint"][0]["action"], "mint");
    }

    #[test]
    fn test_burn_everything_prunes_asset() {
        let minter = test_wallet("minter", 9);
        let script = MintScript::single_signer(minter.key_hash.clone().unwrap());
        let (ops, wallet, policy_wallet) = setup(
            vec![asset_utxo("aa", 0, 2_000_000, &[("policy1.tokenA", 10)])],
            script,
        );

        let planned = ops
            .draft_burn_tokens(&wallet, &policy_wallet, &burn(10, Some("-1")))
            .unwrap();
        assert!(!planned.draft.tx_out[0].value.has_native_assets());
        assert_eq!(planned.draft.invalid_after, None);
        assert!(planned.draft.check_balance().is_ok());
    }

    #[test]
    fn test_burn_more_than_held() {
        let minter = test_wallet("minter", 9);
        let script = MintScript::single_signer(minter.key_hash.clone().unwrap());
        let (ops, wallet, policy_wallet) = setup(
            vec![asset_utxo("aa", 0, 2_000_000, &[("policy1.tokenA", 3)])],
            script,
        );

        let result = ops.burn_tokens(&wallet, &policy_wallet, &burn(5, None));
        assert_eq!(result.category, Some(ErrorCategory::Arithmetic));
        assert_eq!(ops.toolchain().submitted_count(), 0);
    }

    #[test]
    fn test_burn_after_lock_rejected() {
        let minter = test_wallet("minter", 9);
        let script = MintScript::time_locked(minter.key_hash.clone().unwrap(), 500);
        let (ops, wallet, policy_wallet) = setup(
            vec![asset_utxo("aa", 0, 2_000_000, &[("policy1.tokenA", 10)])],
            script,
        );
        assert!(matches!(
            ops.draft_burn_tokens(&wallet, &policy_wallet, &burn(1, Some("500"))),
            Err(Error::InvalidScript(_))
        ));
    }

    #[test]
    fn test_policy_wallet_needs_key_hash() {
        let (ops, wallet, _) = setup(
            vec![lovelace_utxo("aa", 0, 2_000_000)],
            MintScript::single_signer("x"),
        );
        let mut policy_wallet = test_wallet("minter", 9);
        policy_wallet.key_hash = None;
        assert!(matches!(
            ops.draft_burn_tokens(&wallet, &policy_wallet, &burn(1, None)),
            Err(Error::MissingField(_))
        ));
    }

    #[test]
    fn test_mint_to_recipient() {
        let minter = test_wallet("minter", 9);
        let script = MintScript::single_signer(minter.key_hash.clone().unwrap());
        let (ops, wallet, policy_wallet) =
            setup(vec![lovelace_utxo("aa", 0, 5_000_000)], script);
        let request = MintTokens {
            asset_name: "tokenB".to_string(),
            quantity: 1_000,
            lock_slot: None,
            recipient: Some(test_address(4)),
            message: Some("fresh".to_string()),
        };

        let draft = ops
            .mint_tokens(&wallet, &policy_wallet, &request)
            .into_result()
            .unwrap()
            .draft;

        let token: AssetId = "policy1.tokenB".parse().unwrap();
        assert_eq!(draft.mint[0].quantity, 1_000);
        assert_eq!(draft.tx_out[0].value.lovelace(), 5_000_000 - 1_000_000 - 170_000);
        assert_eq!(draft.tx_out[1].value.get(&token), 1_000);
        assert_eq!(draft.witness_count, 2);
        assert!(draft.check_balance().is_ok());
    }

    #[test]
    fn test_mint_into_own_wallet_signs_once() {
        let wallet = test_wallet("alice", 0);
        let script = MintScript::single_signer(wallet.key_hash.clone().unwrap());
        let (ops, wallet, _) = setup(vec![lovelace_utxo("aa", 0, 5_000_000)], script);
        let request = MintTokens {
            asset_name: "tokenC".to_string(),
            quantity: 1,
            lock_slot: None,
            recipient: None,
            message: None,
        };

        let planned = ops.draft_mint_tokens(&wallet, &wallet, &request).unwrap();
        assert_eq!(planned.signers.len(), 1);
        assert_eq!(planned.draft.witness_count, 1);
        assert_eq!(planned.draft.tx_out.len(), 1);
        assert_eq!(
            planned.draft.tx_out[0].value.get(&"policy1.tokenC".parse().unwrap()),
            1
        );
    }

    #[test]
    fn test_signature_free_policy_adds_no_signer() {
        let wallet = test_wallet("alice", 0);
        let policy_wallet = test_wallet("minter", 9);
        let draft = TxDraft::new(vec![lovelace_utxo("aa", 0, 5_000_000)]);

        let script = MintScript::Before { slot: 500 };
        let planned = authorized(draft.clone(), &script, &wallet, &policy_wallet);
        assert_eq!(planned.signers, vec![wallet.signing_key.clone()]);
        assert_eq!(planned.draft.witness_count, 1);
        assert_eq!(planned.draft.invalid_after, Some(500));

        let script = MintScript::time_locked(policy_wallet.key_hash.clone().unwrap(), 500);
        let planned = authorized(draft, &script, &wallet, &policy_wallet);
        assert_eq!(planned.signers.len(), 2);
        assert_eq!(planned.draft.witness_count, 2);
    }
}
