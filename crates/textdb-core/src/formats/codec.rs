//! # Flat Text Codec
//!
//! Serialization of a store mapping to a single delimited text blob.
//!
//! Format: one flat token stream, keys and values alternating, every token
//! separated by the separator token.
//!
//! ```text
//! key1 SEP value1 SEP key2 SEP value2
//! ```
//!
//! There is no escaping. The format is unambiguous only because the store
//! rejects keys and values containing the separator before they reach the map.
//!
//! An empty text is the empty mapping. A text whose token count is odd is
//! corrupt.

use crate::{Entries, Separator, TextDbError};

// =============================================================================
// ENCODE
// =============================================================================

/// Serialize a mapping to its flat text form.
///
/// Entries are written in key order, so encoding the same mapping always
/// produces the same text.
#[must_use]
pub fn encode(entries: &Entries, separator: &Separator) -> String {
    let sep = separator.as_str();
    let mut text = String::new();

    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            text.push_str(sep);
        }
        text.push_str(key);
        text.push_str(sep);
        text.push_str(value);
    }

    text
}

// =============================================================================
// DECODE
// =============================================================================

/// Split a flat text into its tokens.
///
/// Returns `TextDbError::CorruptedStore` if the token count is odd.
pub fn tokenize<'a>(text: &'a str, separator: &Separator) -> Result<Vec<&'a str>, TextDbError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let tokens: Vec<&str> = text.split(separator.as_str()).collect();
    if tokens.len() % 2 != 0 {
        return Err(TextDbError::CorruptedStore {
            tokens: tokens.len(),
        });
    }

    Ok(tokens)
}

/// Deserialize a flat text into a fresh mapping.
///
/// A key defined more than once keeps its last value.
pub fn decode(text: &str, separator: &Separator) -> Result<Entries, TextDbError> {
    let tokens = tokenize(text, separator)?;

    let mut entries = Entries::new();
    for pair in tokens.chunks_exact(2) {
        entries.insert(pair[0].to_string(), pair[1].to_string());
    }

    Ok(entries)
}

// =============================================================================
// TESTS
// =============================================================================
