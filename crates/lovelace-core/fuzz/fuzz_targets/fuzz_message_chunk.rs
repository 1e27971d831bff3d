//! Fuzz test for message chunking

#![no_main]

use libfuzzer_sys::fuzz_target;
use lovelace_core::{chunk, MessageMetadata};
use lovelace_params::MAX_METADATA_CHUNK;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        for piece in chunk(s) {
            assert!(piece.len() <= MAX_METADATA_CHUNK);
        }
        if let Some(metadata) = MessageMetadata::from_message(s) {
            assert!(metadata.validate().is_ok());
        }
    }
});
