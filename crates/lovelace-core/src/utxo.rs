//! Unspent outputs, wallet handles and input selection
//!
//! Every operation picks its inputs with one of the [`UtxoSelection`] rules
//! from the wallet's freshly queried balance.

use crate::value::Value;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Reference to a transaction output (`txHash#index`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtxoRef {
    /// Hash of the creating transaction
    pub tx_hash: String,
    /// Output index within that transaction
    pub output_index: u32,
}

impl UtxoRef {
    /// Create a reference
    pub fn new(tx_hash: impl Into<String>, output_index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            output_index,
        }
    }
}

impl fmt::Display for UtxoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.output_index)
    }
}

impl FromStr for UtxoRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (hash, index) = s
            .split_once('#')
            .ok_or_else(|| Error::InputNotFound(format!("'{}' is not <hash>#<index>", s)))?;
        if hash.is_empty() {
            return Err(Error::MissingField("input transaction hash".to_string()));
        }
        let output_index = index
            .parse::<u32>()
            .map_err(|e| Error::InputNotFound(format!("bad output index in '{}': {}", s, e)))?;
        Ok(Self::new(hash, output_index))
    }
}

/// An unspent output observed on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Output reference
    #[serde(flatten)]
    pub reference: UtxoRef,
    /// Value held by the output
    pub value: Value,
}

impl Utxo {
    /// Create an unspent output
    pub fn new(reference: UtxoRef, value: Value) -> Self {
        Self { reference, value }
    }

    /// Hash of the creating transaction
    pub fn tx_hash(&self) -> &str {
        &self.reference.tx_hash
    }
}

/// A wallet's unspent outputs and their aggregate value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    /// Unspent outputs
    pub utxos: Vec<Utxo>,
    /// Sum of all outputs
    pub value: Value,
}

impl WalletBalance {
    /// Fold outputs into a balance
    pub fn from_utxos(utxos: Vec<Utxo>) -> Result<Self> {
        let value = Value::sum(utxos.iter().map(|utxo| &utxo.value))?;
        Ok(Self { utxos, value })
    }

    /// Whether the wallet holds nothing
    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

/// Reference to externally held signing material
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigningKeyRef(pub PathBuf);

impl SigningKeyRef {
    /// Create a reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

/// A named wallet as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletHandle {
    /// Wallet name
    pub name: String,
    /// Payment address
    pub payment_address: String,
    /// Reward address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake_address: Option<String>,
    /// Payment key hash, needed when the wallet owns a minting policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_hash: Option<String>,
    /// Signing key capability
    pub signing_key: SigningKeyRef,
}

impl WalletHandle {
    /// Create a wallet handle
    pub fn new(
        name: impl Into<String>,
        payment_address: impl Into<String>,
        signing_key: SigningKeyRef,
    ) -> Self {
        Self {
            name: name.into(),
            payment_address: payment_address.into(),
            stake_address: None,
            key_hash: None,
            signing_key,
        }
    }

    /// Attach a reward address
    pub fn with_stake_address(mut self, stake_address: impl Into<String>) -> Self {
        self.stake_address = Some(stake_address.into());
        self
    }

    /// Attach a payment key hash
    pub fn with_key_hash(mut self, key_hash: impl Into<String>) -> Self {
        self.key_hash = Some(key_hash.into());
        self
    }

    /// Key hash or a validation error
    pub fn require_key_hash(&self) -> Result<&str> {
        self.key_hash
            .as_deref()
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| Error::MissingField(format!("key hash of wallet '{}'", self.name)))
    }
}

/// Input selection rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtxoSelection {
    /// Spend every output
    All,
    /// Spend exactly these outputs
    Only(Vec<UtxoRef>),
    /// Spend every output created by one transaction
    FromTransaction(String),
    /// Spend outputs created by the listed transactions plus every output
    /// carrying native assets
    AllowList(Vec<String>),
}

impl UtxoSelection {
    /// Pick inputs from the available outputs
    pub fn select(&self, available: &[Utxo]) -> Result<Vec<Utxo>> {
        let selected: Vec<Utxo> = match self {
            UtxoSelection::All => available.to_vec(),
            UtxoSelection::Only(refs) => {
                let mut picked = Vec::with_capacity(refs.len());
                for reference in refs {
                    let utxo = available
                        .iter()
                        .find(|utxo| &utxo.reference == reference)
                        .ok_or_else(|| Error::InputNotFound(reference.to_string()))?;
                    if !picked.contains(utxo) {
                        picked.push(utxo.clone());
                    }
                }
                picked
            }
            UtxoSelection::FromTransaction(hash) => {
                let picked: Vec<Utxo> = available
                    .iter()
                    .filter(|utxo| utxo.tx_hash() == hash)
                    .cloned()
                    .collect();
                if picked.is_empty() {
                    return Err(Error::InputNotFound(hash.clone()));
                }
                picked
            }
            UtxoSelection::AllowList(hashes) => available
                .iter()
                .filter(|utxo| {
                    utxo.value.has_native_assets()
                        || hashes.iter().any(|hash| hash == utxo.tx_hash())
                })
                .cloned()
                .collect(),
        };

        if selected.is_empty() {
            return Err(Error::InsufficientFunds(
                "no spendable outputs in wallet".to_string(),
            ));
        }

        tracing::debug!("Selected {} of {} outputs", selected.len(), available.len());
        Ok(selected)
    }
}
