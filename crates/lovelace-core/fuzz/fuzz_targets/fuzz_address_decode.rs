//! Fuzz test for address validation
//!
//! Ensures the bech32 and base58 paths reject malformed input without panicking

#![no_main]

use libfuzzer_sys::fuzz_target;
use lovelace_core::{validate_address, validate_stake_address};
use lovelace_params::Network;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        for network in [Network::mainnet(), Network::preprod()] {
            let _ = validate_address(s, &network);
            let _ = validate_stake_address(s, &network);
        }
    }
});
