//! Fuzz test for asset id and UTXO reference parsing

#![no_main]

use std::str::FromStr;

use libfuzzer_sys::fuzz_target;
use lovelace_core::{AssetId, UtxoRef};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(asset) = AssetId::from_str(s) {
            let _ = AssetId::from_str(&asset.to_string());
        }
        let _ = UtxoRef::from_str(s);
    }
});
