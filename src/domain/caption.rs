// ============================================================
// Layer 3 — Caption Domain Type
// ============================================================
// A caption, as the model sees it: a fixed-length sequence of
// token ids. Four ids are reserved and never assigned to words:
//
//   <pad>   = 0   fills the tail up to the fixed max length
//   <start> = 1   always the first token of every caption
//   <end>   = 2   closes the caption (may be cut by truncation
//                 of the padded buffer, never by padding)
//   <unk>   = 3   stands in for out-of-vocabulary words
//
// Invariant enforced here: the non-padding tokens form a prefix
// of the buffer, and that prefix begins with <start>. Once a
// <pad> appears, everything after it is <pad> too.
//
// Reference: Rust Book §5 (Structs)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Padding id — contributes zero loss during training.
pub const PAD_ID: u32 = 0;
/// Start-of-sequence id — position 0 of every caption.
pub const START_ID: u32 = 1;
/// End-of-sequence id — terminates generation immediately.
pub const END_ID: u32 = 2;
/// Unknown-word id — fallback for words outside the vocabulary.
pub const UNK_ID: u32 = 3;

pub const PAD_TOKEN: &str = "<pad>";
pub const START_TOKEN: &str = "<start>";
pub const END_TOKEN: &str = "<end>";
pub const UNK_TOKEN: &str = "<unk>";

/// First id available for ordinary vocabulary words.
pub const RESERVED_TOKENS: usize = 4;

/// A tokenized caption, padded to a fixed length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caption {
    ids: Vec<u32>,
}

impl Caption {
    /// Build a Caption, checking the padded-prefix invariant:
    /// position 0 is <start>, and no real token follows a <pad>.
    pub fn new(ids: Vec<u32>) -> Result<Self> {
        match ids.first() {
            Some(&first) if first == START_ID => {}
            Some(&first) => bail!("caption must begin with <start>, found id {first}"),
            None => bail!("caption must not be empty"),
        }

        let mut padded = false;
        for &id in &ids {
            if id == PAD_ID {
                padded = true;
            } else if padded {
                bail!("caption has a real token after padding (id {id})");
            }
        }

        Ok(Self { ids })
    }

    /// The full padded id buffer.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Padded length — the unroll length of the training loop.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of real (non-padding) tokens at the front.
    pub fn token_count(&self) -> usize {
        self.ids.iter().take_while(|&&id| id != PAD_ID).count()
    }
}
