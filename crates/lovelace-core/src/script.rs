//! Native minting scripts
//!
//! A policy is either a bare signature requirement or a signature plus a
//! `before` time lock. The policy id itself is derived by the ledger
//! toolchain.

use crate::{Error, Result};
use lovelace_params::NO_TIME_LOCK;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native script in the `cardano-cli` JSON layout
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MintScript {
    /// Requires a signature from the key
    Sig {
        /// Payment key hash
        #[serde(rename = "keyHash")]
        key_hash: String,
    },
    /// Valid only before the slot
    Before {
        /// Last slot (exclusive)
        slot: u64,
    },
    /// Every sub-script must hold
    All {
        /// Sub-scripts
        scripts: Vec<MintScript>,
    },
}

impl MintScript {
    /// Single-signer policy
    pub fn single_signer(key_hash: impl Into<String>) -> Self {
        MintScript::Sig {
            key_hash: key_hash.into(),
        }
    }

    /// Signer plus time-lock policy
    pub fn time_locked(key_hash: impl Into<String>, slot: u64) -> Self {
        MintScript::All {
            scripts: vec![Self::single_signer(key_hash), MintScript::Before { slot }],
        }
    }

    /// The `before` slot of the script, if it is time locked
    pub fn lock_slot(&self) -> Option<u64> {
        match self {
            MintScript::Sig { .. } => None,
            MintScript::Before { slot } => Some(*slot),
            MintScript::All { scripts } => scripts.iter().find_map(MintScript::lock_slot),
        }
    }

    /// Number of signatures the script requires
    pub fn required_signers(&self) -> usize {
        match self {
            MintScript::Sig { .. } => 1,
            MintScript::Before { .. } => 0,
            MintScript::All { scripts } => scripts.iter().map(MintScript::required_signers).sum(),
        }
    }
}

impl fmt::Display for MintScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintScript::Sig { key_hash } => write!(f, "sig({})", key_hash),
            MintScript::Before { slot } => write!(f, "before({})", slot),
            MintScript::All { scripts } => {
                let parts: Vec<String> = scripts.iter().map(ToString::to_string).collect();
                write!(f, "all[{}]", parts.join(", "))
            }
        }
    }
}

/// Opaque policy identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub String);

impl PolicyId {
    /// Hex text of the policy id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a minting script for a key hash.
///
/// A missing, empty, `"null"` or `"-1"` lock slot yields a bare
/// single-signer script; any other value must be a slot number.
pub fn build_script(key_hash: &str, lock_slot: Option<&str>) -> Result<MintScript> {
    if key_hash.trim().is_empty() {
        return Err(Error::MissingField("policy key hash".to_string()));
    }

    let slot = match lock_slot.map(str::trim) {
        None | Some("") | Some("null") | Some(NO_TIME_LOCK) => None,
        Some(text) => Some(
            text.parse::<u64>()
                .map_err(|e| Error::InvalidScript(format!("lock slot '{}': {}", text, e)))?,
        ),
    };

    Ok(match slot {
        None => MintScript::single_signer(key_hash),
        Some(slot) => MintScript::time_locked(key_hash, slot),
    })
}
