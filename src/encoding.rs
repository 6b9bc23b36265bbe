//! Strict UTF-8 decoding for markdown input
//!
//! Markdown sources must be UTF-8. This module rejects anything else with
//! [`IngestError::InvalidEncoding`] rather than substituting replacement
//! characters, and strips a leading byte order mark.
//!
//! The streaming path reads fixed-size chunks whose boundaries can fall in
//! the middle of a multi-byte character. [`Utf8ChunkDecoder`] wraps an
//! `encoding_rs` decoder so a split character is carried over to the next
//! chunk while genuinely malformed bytes still fail.
//!
//! # Examples
//!
//! ```rust
//! use markdown_ingest::encoding::{decode_utf8, Utf8ChunkDecoder};
//!
//! assert_eq!(decode_utf8(b"\xEF\xBB\xBF# Title").unwrap(), "# Title");
//! assert!(decode_utf8(b"\xFF\xFE").is_err());
//!
//! // "é" split across two chunks
//! let mut decoder = Utf8ChunkDecoder::new();
//! let mut text = String::new();
//! decoder.decode(b"caf\xC3", &mut text, false).unwrap();
//! decoder.decode(b"\xA9", &mut text, true).unwrap();
//! assert_eq!(text, "café");
//! ```

use encoding_rs::{Decoder, DecoderResult, UTF_8};

use crate::error::{IngestError, Result};

/// UTF-8 byte order mark
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Length of the leading byte order mark, if any
pub fn bom_length(bytes: &[u8]) -> usize {
    if bytes.starts_with(UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    }
}

/// Decode a complete buffer as UTF-8, stripping a leading BOM
///
/// # Errors
///
/// Returns `IngestError::InvalidEncoding` with the byte offset of the first
/// invalid sequence.
pub fn decode_utf8(bytes: &[u8]) -> Result<&str> {
    let bom = bom_length(bytes);
    std::str::from_utf8(&bytes[bom..]).map_err(|e| IngestError::InvalidEncoding {
        offset: (bom + e.valid_up_to()) as u64,
    })
}

/// Incremental UTF-8 decoder for chunked reads
///
/// Malformed sequences are fatal. A multi-byte character split across two
/// `decode` calls is reassembled.
pub struct Utf8ChunkDecoder {
    decoder: Decoder,
    /// Absolute offset of the first byte fed to this decoder
    base_offset: u64,
    /// Bytes consumed so far
    consumed: u64,
}

impl Utf8ChunkDecoder {
    /// Create a decoder for a stream starting at offset 0
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a decoder for a stream whose first byte sits at `base_offset`
    ///
    /// The offset only affects error reporting.
    pub fn starting_at(base_offset: u64) -> Self {
        Self {
            decoder: UTF_8.new_decoder_without_bom_handling(),
            base_offset,
            consumed: 0,
        }
    }

    /// Decode `bytes` and append the text to `out`
    ///
    /// Pass `last = true` for the final chunk so an incomplete trailing
    /// sequence is reported instead of carried over.
    pub fn decode(&mut self, bytes: &[u8], out: &mut String, last: bool) -> Result<()> {
        let mut input = bytes;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .unwrap_or(input.len().saturating_mul(3).saturating_add(4));
            out.reserve(needed);

            let (result, read) = self
                .decoder
                .decode_to_string_without_replacement(input, out, last);
            self.consumed += read as u64;
            input = &input[read..];

            match result {
                DecoderResult::InputEmpty => return Ok(()),
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(bad, after) => {
                    let offset = self
                        .consumed
                        .saturating_sub(u64::from(bad) + u64::from(after));
                    return Err(IngestError::InvalidEncoding {
                        offset: self.base_offset + offset,
                    });
                }
            }
        }
    }

    /// Total bytes consumed so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

impl Default for Utf8ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}
