//! Fuzz test for decimal ADA parsing

#![no_main]

use libfuzzer_sys::fuzz_target;
use lovelace_params::parse_ada;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Overflow and excess precision must surface as Err
        let _ = parse_ada(s);
    }
});
