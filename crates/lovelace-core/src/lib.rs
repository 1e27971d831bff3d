//! Lovelace transaction engine core
//!
//! This crate drafts, balances and fee-corrects transactions against a
//! multi-asset UTXO ledger: value arithmetic, input selection, minting
//! scripts, message metadata, the two-pass fee protocol and the named
//! operations built on top of it. Serialization, fee and minimum-output
//! computation, signing and submission are delegated to an injected
//! [`LedgerToolchain`]; [`CardanoCli`] implements it over `cardano-cli`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod builder;
pub mod cli;
pub mod config;
pub mod draft;
pub mod error;
pub mod metadata;
pub mod operations;
pub mod script;
pub mod toolchain;
pub mod utxo;
pub mod value;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use address::{validate_address, validate_stake_address};
pub use builder::{DraftBuilder, Submission, DEFAULT_MAX_FEE};
pub use cli::CardanoCli;
pub use config::{CliConfig, EngineConfig};
pub use draft::{MintAction, MintActionKind, OutputRole, TxDraft, TxOutput};
pub use error::{Error, ErrorCategory, Result};
pub use metadata::{chunk, MessageMetadata};
pub use operations::{
    AssetRecipient, BurnTokens, DistributeAssets, DistributeRandom, DistributeToken, FeePaidBy,
    MintTokens, OperationResult, Operations, PlannedTx, RandomRecipient, Refund, TokenRecipient,
    TransferAda, TransferAllTokens, TransferLovelace, TransferToken, WipeWallet,
};
pub use script::{build_script, MintScript, PolicyId};
pub use toolchain::{
    ChainTip, LedgerQuery, LedgerToolchain, MinOutputOracle, SignedTx, StakeInfo, TxBody, TxId,
    WalletProvisioner,
};
pub use utxo::{SigningKeyRef, Utxo, UtxoRef, UtxoSelection, WalletBalance, WalletHandle};
pub use value::{AssetId, Quantity, Value};
