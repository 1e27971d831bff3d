//! Address validation
//!
//! Recipient addresses are checked before any toolchain call. Shelley
//! addresses are bech32 with a network-specific prefix; legacy Byron
//! addresses are base58.

use crate::{Error, Result};
use lovelace_params::Network;

/// Minimum decoded length of a Shelley address (header + payment credential)
const MIN_SHELLEY_PAYLOAD: usize = 29;

/// Validate a payment address for the given network
pub fn validate_address(address: &str, network: &Network) -> Result<()> {
    if address.is_empty() {
        return Err(Error::MissingField("address".to_string()));
    }

    if address.starts_with("addr") {
        let payload = decode_bech32(address, network.address_hrp)?;
        if payload.len() < MIN_SHELLEY_PAYLOAD {
            return Err(Error::InvalidAddress(format!(
                "address payload is {} bytes, expected at least {}",
                payload.len(),
                MIN_SHELLEY_PAYLOAD
            )));
        }
        return Ok(());
    }

    // Byron bootstrap addresses
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", address, e)))?;
    if bytes.len() < MIN_SHELLEY_PAYLOAD {
        return Err(Error::InvalidAddress(format!("{}: too short", address)));
    }
    Ok(())
}

/// Validate a reward address for the given network
pub fn validate_stake_address(address: &str, network: &Network) -> Result<()> {
    if address.is_empty() {
        return Err(Error::MissingField("stake address".to_string()));
    }
    decode_bech32(address, network.stake_hrp).map(|_| ())
}

fn decode_bech32(address: &str, expected_hrp: &str) -> Result<Vec<u8>> {
    let (hrp, payload) = bech32::decode(address)
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", address, e)))?;

    if hrp.to_lowercase() != expected_hrp {
        return Err(Error::InvalidAddress(format!(
            "prefix '{}' does not belong to this network (expected '{}')",
            hrp.to_lowercase(),
            expected_hrp
        )));
    }

    Ok(payload)
}
