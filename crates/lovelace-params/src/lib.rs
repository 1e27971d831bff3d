//! Cardano network parameters and protocol constants
//!
//! This crate provides network definitions, `cardano-cli` network flags,
//! address prefixes, and the fixed protocol constants used when drafting
//! transactions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod network;
pub mod protocol;

pub use network::{Network, NetworkType};
pub use protocol::{
    ada_to_lovelace, parse_ada, LOVELACE_PER_ADA, MAX_METADATA_CHUNK, MESSAGE_METADATA_LABEL,
    NO_TIME_LOCK, TOKEN_OUTPUT_FLOOR,
};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
