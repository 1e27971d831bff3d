//! External ledger toolchain capabilities
//!
//! Body serialization, fee and minimum-output computation, policy ids,
//! signing, submission and ledger queries all live outside the engine.
//! They are injected through these traits; all calls are synchronous.

use crate::draft::TxDraft;
use crate::script::{MintScript, PolicyId};
use crate::utxo::{SigningKeyRef, Utxo, WalletBalance, WalletHandle};
use crate::value::Value;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unsigned transaction body, opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody(pub String);

/// Signed transaction, opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx(pub String);

/// Transaction identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current chain tip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTip {
    /// Absolute slot
    pub slot: u64,
    /// Block number
    #[serde(default)]
    pub block: u64,
    /// Epoch number
    #[serde(default)]
    pub epoch: u64,
    /// Block hash
    #[serde(default)]
    pub hash: String,
    /// Ledger era
    #[serde(default)]
    pub era: String,
    /// Sync progress percentage, as reported
    #[serde(default)]
    pub sync_progress: Option<String>,
}

/// Delegation and rewards of a reward address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeInfo {
    /// Reward address
    pub address: String,
    /// Pool the address delegates to
    #[serde(default, alias = "stakeDelegation")]
    pub delegation: Option<String>,
    /// Withdrawable rewards (lovelace)
    #[serde(default)]
    pub reward_account_balance: u64,
}

/// Read-only ledger queries
pub trait LedgerQuery {
    /// Current chain tip
    fn query_tip(&self) -> Result<ChainTip>;

    /// Stake information for a reward address
    fn query_stake_info(&self, stake_address: &str) -> Result<Vec<StakeInfo>>;

    /// Unspent outputs at an address
    fn query_utxo(&self, address: &str) -> Result<Vec<Utxo>>;

    /// Unspent outputs of a wallet, folded into one value
    fn wallet_balance(&self, wallet: &WalletHandle) -> Result<WalletBalance> {
        let utxos = self.query_utxo(&wallet.payment_address)?;
        WalletBalance::from_utxos(utxos)
    }
}

/// Minimum lovelace an output must carry
pub trait MinOutputOracle {
    /// Minimum lovelace for `value` sent to `address`
    fn minimum_lovelace(&self, address: &str, value: &Value) -> Result<u64>;
}

/// Body construction, costing, policy ids, signing and submission
pub trait LedgerToolchain: LedgerQuery + MinOutputOracle {
    /// Build an unsigned body from the draft
    fn build_body(&self, draft: &TxDraft) -> Result<TxBody>;

    /// Minimum fee for a body, given the draft's witness count
    fn minimum_fee(&self, draft: &TxDraft, body: &TxBody) -> Result<u64>;

    /// Policy id of a native script
    fn derive_policy_id(&self, script: &MintScript) -> Result<PolicyId>;

    /// Sign a body with the given keys
    fn sign(&self, body: &TxBody, keys: &[SigningKeyRef]) -> Result<SignedTx>;

    /// Submit a signed transaction
    fn submit(&self, signed: &SignedTx) -> Result<TxId>;
}

/// Key generation and wallet materialization
pub trait WalletProvisioner {
    /// Generate keys and addresses for a new wallet
    fn create_wallet(&self, name: &str) -> Result<WalletHandle>;

    /// Load an existing wallet
    fn load_wallet(&self, name: &str) -> Result<WalletHandle>;
}
