//! Protocol constants and unit conversion

use crate::{Error, Result};

/// Lovelace in one ADA
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Decimal places of the ADA unit
pub const ADA_DECIMALS: usize = 6;

/// Metadata label used for free-text messages (CIP-20)
pub const MESSAGE_METADATA_LABEL: u64 = 674;

/// Maximum length of a single metadata text segment (bytes)
pub const MAX_METADATA_CHUNK: usize = 64;

/// Provisional lovelace placed on token outputs before the minimum-output
/// oracle is consulted
pub const TOKEN_OUTPUT_FLOOR: u64 = 1_500_000;

/// Lock slot value meaning "no time lock"
pub const NO_TIME_LOCK: &str = "-1";

/// Convert a whole number of ADA to lovelace.
pub fn ada_to_lovelace(ada: u64) -> Result<u64> {
    ada.checked_mul(LOVELACE_PER_ADA)
        .ok_or_else(|| Error::InvalidAmount(format!("{} ADA overflows lovelace", ada)))
}

/// Parse a decimal ADA amount ("12", "1.5", "0.000001") into lovelace.
///
/// The conversion is exact; more than six fractional digits is an error.
pub fn parse_ada(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAmount("empty ADA amount".to_string()));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(Error::InvalidAmount(format!("invalid ADA amount '{}'", text)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(Error::InvalidAmount(format!("invalid ADA amount '{}'", text)));
    }
    if fraction.len() > ADA_DECIMALS {
        return Err(Error::InvalidAmount(format!(
            "ADA amount '{}' has more than {} decimal places",
            text, ADA_DECIMALS
        )));
    }

    let whole_ada = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .map_err(|e| Error::InvalidAmount(format!("invalid ADA amount '{}': {}", text, e)))?
    };

    let mut fraction_digits = fraction.to_string();
    while fraction_digits.len() < ADA_DECIMALS {
        fraction_digits.push('0');
    }
    let fraction_lovelace = fraction_digits
        .parse::<u64>()
        .map_err(|e| Error::InvalidAmount(format!("invalid ADA amount '{}': {}", text, e)))?;

    ada_to_lovelace(whole_ada)?
        .checked_add(fraction_lovelace)
        .ok_or_else(|| Error::InvalidAmount(format!("{} ADA overflows lovelace", text)))
}
