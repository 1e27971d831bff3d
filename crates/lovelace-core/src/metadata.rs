//! Message metadata
//!
//! Free-text messages are attached under label 674 as `{"msg": [...]}`.
//! Each segment is limited to 64 bytes by the metadata encoding, so longer
//! messages are split on word boundaries.

use crate::{Error, Result};
use lovelace_params::{MAX_METADATA_CHUNK, MESSAGE_METADATA_LABEL};
use serde::{Deserialize, Serialize};

/// Split text into segments of at most [`MAX_METADATA_CHUNK`] bytes.
///
/// The limit counts UTF-8 bytes, not characters: 40 copies of `é` are
/// 80 bytes and take two segments even though they are 40 characters.
/// Words are packed greedily with single spaces. A word longer than the
/// limit is hard-split first (never inside a UTF-8 character) and its
/// pieces are packed like ordinary words.
pub fn chunk(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        for piece in split_word(word, MAX_METADATA_CHUNK) {
            let needed = if current.is_empty() {
                piece.len()
            } else {
                current.len() + 1 + piece.len()
            };

            if needed <= MAX_METADATA_CHUNK {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(piece);
            } else {
                chunks.push(std::mem::take(&mut current));
                current.push_str(piece);
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_word(word: &str, limit: usize) -> Vec<&str> {
    if word.len() <= limit {
        return vec![word];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < word.len() {
        let mut end = (start + limit).min(word.len());
        while !word.is_char_boundary(end) {
            end -= 1;
        }
        pieces.push(&word[start..end]);
        start = end;
    }
    pieces
}

/// Message metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Metadata label
    pub label: u64,
    /// Message segments
    pub msg: Vec<String>,
}

impl MessageMetadata {
    /// Wrap a caller message. Returns `None` for a blank message.
    ///
    /// Messages within the segment limit (in bytes) are kept verbatim as a single
    /// segment; longer ones go through [`chunk`].
    pub fn from_message(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }

        let msg = if text.len() <= MAX_METADATA_CHUNK {
            vec![text.to_string()]
        } else {
            chunk(text)
        };

        Some(Self {
            label: MESSAGE_METADATA_LABEL,
            msg,
        })
    }

    /// Check the segment limit
    pub fn validate(&self) -> Result<()> {
        if self.msg.is_empty() {
            return Err(Error::InvalidMetadata("message has no segments".to_string()));
        }
        if let Some(long) = self.msg.iter().find(|segment| segment.len() > MAX_METADATA_CHUNK) {
            return Err(Error::InvalidMetadata(format!(
                "segment of {} bytes exceeds {}",
                long.len(),
                MAX_METADATA_CHUNK
            )));
        }
        Ok(())
    }

    /// Metadata JSON as the ledger toolchain consumes it
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            self.label.to_string(): { "msg": self.msg }
        })
    }

    /// Rejoin the segments
    pub fn text(&self) -> String {
        self.msg.join(" ")
    }
}
