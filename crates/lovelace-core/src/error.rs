//! Error types for Lovelace Core
//!
//! Error taxonomy for drafting, balancing and submitting transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Lovelace Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required request field missing or empty
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed asset identifier
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Referenced input transaction is not in the wallet
    #[error("Input not found: {0}")]
    InputNotFound(String),

    /// Invalid native script or lock slot
    #[error("Invalid script: {0}")]
    InvalidScript(String),

    /// Invalid metadata
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Insufficient funds for transaction
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// A quantity went below zero
    #[error("Negative quantity: {0}")]
    NegativeQuantity(String),

    /// Amount overflow
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Inputs, mints, outputs and fee do not add up
    #[error("Unbalanced transaction: {0}")]
    Unbalanced(String),

    /// Output carries less lovelace than the ledger minimum
    #[error("Output below minimum: {0}")]
    BelowMinimumOutput(String),

    /// Transaction body building error
    #[error("Transaction build error: {0}")]
    TransactionBuild(String),

    /// Fee calculation error
    #[error("Fee calculation error: {0}")]
    FeeCalculation(String),

    /// Minimum output value oracle error
    #[error("Minimum output calculation error: {0}")]
    MinimumOutput(String),

    /// Policy id derivation error
    #[error("Policy derivation error: {0}")]
    PolicyDerivation(String),

    /// Transaction signing error
    #[error("Transaction signing error: {0}")]
    TransactionSigning(String),

    /// Transaction submission error
    #[error("Transaction submission error: {0}")]
    TransactionSubmit(String),

    /// Ledger query error
    #[error("Query error: {0}")]
    Query(String),

    /// External process failure
    #[error("Toolchain process error: {0}")]
    Process(String),

    /// Wallet not found
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Wallet already exists
    #[error("Wallet already exists: {0}")]
    WalletAlreadyExists(String),

    /// Network parameter error
    #[error("Parameter error: {0}")]
    Params(#[from] lovelace_params::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::Arithmetic
        ) || matches!(self, Error::WalletNotFound(_) | Error::WalletAlreadyExists(_))
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::InsufficientFunds(_) => {
                "The wallet does not hold enough funds for this transaction.".to_string()
            }
            Error::InvalidAddress(_) => {
                "The recipient address is invalid. Please check and try again.".to_string()
            }
            Error::InputNotFound(_) => {
                "The referenced transaction was not found among the wallet's unspent outputs."
                    .to_string()
            }
            Error::BelowMinimumOutput(_) => {
                "An output would carry less ADA than the ledger requires.".to_string()
            }
            Error::TransactionSubmit(_) => {
                "The node rejected the transaction. Please try again.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging and structured results
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingField(_)
            | Error::InvalidAddress(_)
            | Error::InvalidAsset(_)
            | Error::InvalidAmount(_)
            | Error::InputNotFound(_)
            | Error::InvalidScript(_)
            | Error::InvalidMetadata(_)
            | Error::InvalidConfig(_) => ErrorCategory::Validation,
            Error::InsufficientFunds(_)
            | Error::NegativeQuantity(_)
            | Error::AmountOverflow(_)
            | Error::Unbalanced(_)
            | Error::BelowMinimumOutput(_) => ErrorCategory::Arithmetic,
            Error::TransactionBuild(_)
            | Error::FeeCalculation(_)
            | Error::MinimumOutput(_)
            | Error::PolicyDerivation(_)
            | Error::TransactionSigning(_)
            | Error::TransactionSubmit(_)
            | Error::Query(_)
            | Error::Process(_) => ErrorCategory::Toolchain,
            Error::WalletNotFound(_) | Error::WalletAlreadyExists(_) => ErrorCategory::Wallet,
            Error::Params(lovelace_params::Error::InvalidAmount(_)) => ErrorCategory::Validation,
            Error::Params(_) | Error::Io(_) | Error::Serialization(_) | Error::Other(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Request rejected before any external call
    Validation,
    /// Value arithmetic or balance inconsistency
    Arithmetic,
    /// External ledger toolchain failure
    Toolchain,
    /// Wallet provisioning errors
    Wallet,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "Validation"),
            ErrorCategory::Arithmetic => write!(f, "Arithmetic"),
            ErrorCategory::Toolchain => write!(f, "Toolchain"),
            ErrorCategory::Wallet => write!(f, "Wallet"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
