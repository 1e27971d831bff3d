//! Deterministic toolchain double for tests
//!
//! Returns fixed fees and minimum-output values, derives stable policy ids
//! and records every body build and signature so tests can assert on the
//! two-pass protocol.

use crate::draft::TxDraft;
use crate::script::{MintScript, PolicyId};
use crate::toolchain::{
    ChainTip, LedgerQuery, LedgerToolchain, MinOutputOracle, SignedTx, StakeInfo, TxBody, TxId,
    WalletProvisioner,
};
use crate::utxo::{SigningKeyRef, Utxo, UtxoRef, WalletHandle};
use crate::value::{AssetId, Value};
use crate::{Error, Result};
use bech32::{Bech32, Hrp};
use std::cell::RefCell;
use std::collections::HashMap;

/// A valid preprod payment address, distinct per index
pub fn test_address(index: u8) -> String {
    encode("addr_test", index, 57)
}

/// A valid preprod reward address, distinct per index
pub fn test_stake_address(index: u8) -> String {
    encode("stake_test", index, 29)
}

fn encode(hrp: &str, index: u8, len: usize) -> String {
    let mut payload = vec![index; len];
    payload[0] = 0x00;
    let hrp = Hrp::parse(hrp).expect("static hrp");
    bech32::encode::<Bech32>(hrp, &payload).expect("short payload")
}

/// Lovelace-only UTXO
pub fn lovelace_utxo(tx_hash: &str, index: u32, lovelace: u64) -> Utxo {
    Utxo::new(
        UtxoRef::new(tx_hash, index),
        Value::from_lovelace(lovelace).expect("test amount"),
    )
}

/// UTXO carrying lovelace and native assets given as `policy.name` text
pub fn asset_utxo(tx_hash: &str, index: u32, lovelace: u64, assets: &[(&str, i64)]) -> Utxo {
    let mut value = Value::from_lovelace(lovelace).expect("test amount");
    for (asset, qty) in assets {
        let asset: AssetId = asset.parse().expect("test asset id");
        value.add(&asset, *qty).expect("test quantity");
    }
    Utxo::new(UtxoRef::new(tx_hash, index), value)
}

/// Wallet handle at `test_address(index)`
pub fn test_wallet(name: &str, index: u8) -> WalletHandle {
    WalletHandle::new(
        name,
        test_address(index),
        SigningKeyRef::new(format!("{}/payment.skey", name)),
    )
    .with_key_hash(format!("{:0>56}", hex::encode([index])))
}

/// Stage at which the double fails on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailStage {
    /// `query_utxo`
    Query,
    /// `build_body`
    BuildBody,
    /// `minimum_fee`
    MinimumFee,
    /// `minimum_lovelace`
    MinimumOutput,
    /// `derive_policy_id`
    PolicyId,
    /// `sign`
    Sign,
    /// `submit`
    Submit,
}

/// In-memory ledger toolchain
pub struct MockLedger {
    fee: u64,
    min_lovelace: u64,
    min_per_asset: u64,
    tip_slot: u64,
    fail_at: Option<FailStage>,
    policy_ids: HashMap<MintScript, PolicyId>,
    utxos: HashMap<String, Vec<Utxo>>,
    built: RefCell<Vec<TxDraft>>,
    signatures: RefCell<Vec<Vec<SigningKeyRef>>>,
    submitted: RefCell<Vec<SignedTx>>,
    wallets: RefCell<HashMap<String, WalletHandle>>,
}

impl MockLedger {
    /// Fee 170,000; minimum output 1,000,000; tip at slot 10,000,000
    pub fn new() -> Self {
        Self {
            fee: 170_000,
            min_lovelace: 1_000_000,
            min_per_asset: 0,
            tip_slot: 10_000_000,
            fail_at: None,
            policy_ids: HashMap::new(),
            utxos: HashMap::new(),
            built: RefCell::new(Vec::new()),
            signatures: RefCell::new(Vec::new()),
            submitted: RefCell::new(Vec::new()),
            wallets: RefCell::new(HashMap::new()),
        }
    }

    /// Fixed fee
    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Base minimum output value
    pub fn with_min_lovelace(mut self, min_lovelace: u64) -> Self {
        self.min_lovelace = min_lovelace;
        self
    }

    /// Extra minimum per native asset in the output
    pub fn with_min_per_asset(mut self, min_per_asset: u64) -> Self {
        self.min_per_asset = min_per_asset;
        self
    }

    /// Slot reported by `query_tip`
    pub fn with_tip_slot(mut self, slot: u64) -> Self {
        self.tip_slot = slot;
        self
    }

    /// Fail at a stage
    pub fn failing_at(mut self, stage: FailStage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Fixed policy id for a script
    pub fn with_policy_id(mut self, script: MintScript, policy_id: &str) -> Self {
        self.policy_ids.insert(script, PolicyId(policy_id.to_string()));
        self
    }

    /// Unspent outputs at an address
    pub fn with_utxos(mut self, address: &str, utxos: Vec<Utxo>) -> Self {
        self.utxos.insert(address.to_string(), utxos);
        self
    }

    /// Every draft passed to `build_body`, in order
    pub fn built_drafts(&self) -> Vec<TxDraft> {
        self.built.borrow().clone()
    }

    /// Keys used for each signature
    pub fn signatures(&self) -> Vec<Vec<SigningKeyRef>> {
        self.signatures.borrow().clone()
    }

    /// Number of submitted transactions
    pub fn submitted_count(&self) -> usize {
        self.submitted.borrow().len()
    }

    fn check(&self, stage: FailStage) -> Result<()> {
        if self.fail_at == Some(stage) {
            let message = format!("injected failure at {:?}", stage);
            return Err(match stage {
                FailStage::Query => Error::Query(message),
                FailStage::BuildBody => Error::TransactionBuild(message),
                FailStage::MinimumFee => Error::FeeCalculation(message),
                FailStage::MinimumOutput => Error::MinimumOutput(message),
                FailStage::PolicyId => Error::PolicyDerivation(message),
                FailStage::Sign => Error::TransactionSigning(message),
                FailStage::Submit => Error::TransactionSubmit(message),
            });
        }
        Ok(())
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerQuery for MockLedger {
    fn query_tip(&self) -> Result<ChainTip> {
        self.check(FailStage::Query)?;
        Ok(ChainTip {
            slot: self.tip_slot,
            block: 1,
            epoch: 1,
            hash: "00".repeat(32),
            era: "Babbage".to_string(),
            sync_progress: Some("100.00".to_string()),
        })
    }

    fn query_stake_info(&self, stake_address: &str) -> Result<Vec<StakeInfo>> {
        self.check(FailStage::Query)?;
        Ok(vec![StakeInfo {
            address: stake_address.to_string(),
            delegation: None,
            reward_account_balance: 0,
        }])
    }

    fn query_utxo(&self, address: &str) -> Result<Vec<Utxo>> {
        self.check(FailStage::Query)?;
        Ok(self.utxos.get(address).cloned().unwrap_or_default())
    }
}

impl MinOutputOracle for MockLedger {
    fn minimum_lovelace(&self, _address: &str, value: &Value) -> Result<u64> {
        self.check(FailStage::MinimumOutput)?;
        let assets = value.native_assets().len() as u64;
        Ok(self.min_lovelace + assets * self.min_per_asset)
    }
}

impl LedgerToolchain for MockLedger {
    fn build_body(&self, draft: &TxDraft) -> Result<TxBody> {
        self.check(FailStage::BuildBody)?;
        let mut built = self.built.borrow_mut();
        built.push(draft.clone());
        Ok(TxBody(format!("body-{}", built.len())))
    }

    fn minimum_fee(&self, _draft: &TxDraft, _body: &TxBody) -> Result<u64> {
        self.check(FailStage::MinimumFee)?;
        Ok(self.fee)
    }

    fn derive_policy_id(&self, script: &MintScript) -> Result<PolicyId> {
        self.check(FailStage::PolicyId)?;
        if let Some(policy_id) = self.policy_ids.get(script) {
            return Ok(policy_id.clone());
        }
        let json = serde_json::to_string(script)?;
        let mut id = hex::encode(json.as_bytes());
        id.truncate(56);
        Ok(PolicyId(id))
    }

    fn sign(&self, body: &TxBody, keys: &[SigningKeyRef]) -> Result<SignedTx> {
        self.check(FailStage::Sign)?;
        self.signatures.borrow_mut().push(keys.to_vec());
        Ok(SignedTx(format!("signed-{}", body.0)))
    }

    fn submit(&self, signed: &SignedTx) -> Result<TxId> {
        self.check(FailStage::Submit)?;
        let mut submitted = self.submitted.borrow_mut();
        submitted.push(signed.clone());
        Ok(TxId(format!("{:064x}", submitted.len())))
    }
}

impl WalletProvisioner for MockLedger {
    fn create_wallet(&self, name: &str) -> Result<WalletHandle> {
        let mut wallets = self.wallets.borrow_mut();
        if wallets.contains_key(name) {
            return Err(Error::WalletAlreadyExists(name.to_string()));
        }
        let index = 100u8.wrapping_add(wallets.len() as u8);
        let wallet = test_wallet(name, index).with_stake_address(test_stake_address(index));
        wallets.insert(name.to_string(), wallet.clone());
        Ok(wallet)
    }

    fn load_wallet(&self, name: &str) -> Result<WalletHandle> {
        self.wallets
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::WalletNotFound(name.to_string()))
    }
}
