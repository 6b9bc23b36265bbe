//! YAML front matter extraction and decoding
//!
//! Front matter is a YAML block at the start of a markdown file, delimited
//! by lines consisting exactly of `---`:
//!
//! ```markdown
//! ---
//! title: My Post
//! tags:
//!   - rust
//! ---
//!
//! # Body starts here
//! ```
//!
//! Extraction is strict: an opening delimiter without a closing one within
//! `max_front_matter_size` bytes is an error, never "the rest of the file is
//! front matter". Decoded values are converted into the closed
//! [`FrontMatterValue`] type; YAML shapes outside it (custom tags, complex
//! keys) are rejected.
//!
//! # Usage
//!
//! ```rust
//! use markdown_ingest::frontmatter::{extract_front_matter, FrontMatterValue};
//! use markdown_ingest::limits::Limits;
//!
//! let split = extract_front_matter("---\ntitle: Test\n---\nBody", &Limits::default()).unwrap();
//! assert_eq!(split.body, "Body");
//! assert_eq!(
//!     split.front_matter.unwrap().get("title"),
//!     Some(&FrontMatterValue::String("Test".to_string()))
//! );
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::{IngestError, Result};
use crate::limits::Limits;

/// Delimiter line marking the start and end of front matter
pub const DELIMITER: &str = "---";

/// Decoded front matter: the top-level mapping
pub type FrontMatter = BTreeMap<String, FrontMatterValue>;

/// A decoded front matter value
///
/// The set of shapes is closed; anything YAML can express beyond these is
/// rejected while decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FrontMatterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    Sequence(Vec<FrontMatterValue>),
    Mapping(BTreeMap<String, FrontMatterValue>),
    /// A timestamp scalar (`2024-01-15`, `2024-01-15T10:00:00Z`) in its source form
    Date(String),
}

impl FrontMatterValue {
    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontMatterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FrontMatterValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean value, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FrontMatterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Elements, if this is a sequence
    pub fn as_sequence(&self) -> Option<&[FrontMatterValue]> {
        match self {
            FrontMatterValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Entries, if this is a mapping
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, FrontMatterValue>> {
        match self {
            FrontMatterValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Timestamp text, if this is a date
    pub fn as_date(&self) -> Option<&str> {
        match self {
            FrontMatterValue::Date(s) => Some(s),
            _ => None,
        }
    }

    /// Source text of a string or date scalar
    ///
    /// Date-shaped strings decode as [`FrontMatterValue::Date`] even when
    /// quoted, so fields read as prose (`title`, `excerpt`) accept both.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FrontMatterValue::String(s) | FrontMatterValue::Date(s) => Some(s),
            _ => None,
        }
    }
}

/// Result of splitting front matter from a document
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatterSplit<'a> {
    /// Decoded front matter, if delimiters were present
    pub front_matter: Option<FrontMatter>,
    /// Raw YAML payload between the delimiters
    pub raw: Option<&'a str>,
    /// Markdown body after the closing delimiter line
    pub body: &'a str,
}

/// Location of the YAML payload and body within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatterBounds {
    /// Byte range of the YAML payload
    pub payload_start: usize,
    pub payload_end: usize,
    /// Byte offset where the body starts
    pub body_start: usize,
}

/// Split and decode front matter
///
/// Text without a leading `---` line has no front matter and is returned
/// whole as the body.
///
/// # Errors
///
/// - `InvalidFrontMatter` when the closing delimiter is missing or the YAML
///   does not decode into a mapping of supported values
/// - `FrontMatterTooLarge` when the payload exceeds the limit
pub fn extract_front_matter<'a>(text: &'a str, limits: &Limits) -> Result<FrontMatterSplit<'a>> {
    let Some(bounds) = locate_front_matter(text, limits)? else {
        return Ok(FrontMatterSplit {
            front_matter: None,
            raw: None,
            body: text,
        });
    };

    let raw = &text[bounds.payload_start..bounds.payload_end];
    let front_matter = decode_front_matter(raw, limits)?;
    Ok(FrontMatterSplit {
        front_matter: Some(front_matter),
        raw: Some(raw),
        body: &text[bounds.body_start..],
    })
}

/// Find the front matter delimiters without decoding
///
/// Returns `Ok(None)` when the text does not open with a delimiter line.
pub fn locate_front_matter(text: &str, limits: &Limits) -> Result<Option<FrontMatterBounds>> {
    let Some(first_line_end) = text.find('\n') else {
        // A lone `---` with nothing after it cannot be closed.
        return if is_delimiter_line(text) {
            Err(IngestError::InvalidFrontMatter(
                "closing delimiter not found".to_string(),
            ))
        } else {
            Ok(None)
        };
    };
    if !is_delimiter_line(&text[..first_line_end]) {
        return Ok(None);
    }

    let payload_start = first_line_end + 1;
    let scan_limit = payload_start.saturating_add(limits.max_front_matter_size);
    let mut line_start = payload_start;

    while line_start <= text.len() && line_start <= scan_limit {
        let rest = &text[line_start..];
        let (line, next_start) = match rest.find('\n') {
            Some(pos) => (&rest[..pos], line_start + pos + 1),
            None => (rest, text.len()),
        };

        if is_delimiter_line(line) {
            // The newline before the closing delimiter belongs to neither side.
            let payload_end = if line_start > payload_start {
                line_start - 1
            } else {
                payload_start
            };
            return Ok(Some(FrontMatterBounds {
                payload_start,
                payload_end,
                body_start: next_start,
            }));
        }

        if next_start >= text.len() {
            break;
        }
        line_start = next_start;
    }

    Err(IngestError::InvalidFrontMatter(format!(
        "closing delimiter not found within {} bytes",
        limits.max_front_matter_size
    )))
}

/// Decode a YAML payload into front matter
///
/// The size limit is checked before the decoder runs. An empty payload
/// decodes to an empty mapping.
pub fn decode_front_matter(payload: &str, limits: &Limits) -> Result<FrontMatter> {
    if payload.len() > limits.max_front_matter_size {
        return Err(IngestError::FrontMatterTooLarge {
            size: payload.len(),
            limit: limits.max_front_matter_size,
        });
    }

    if payload.trim().is_empty() {
        return Ok(FrontMatter::new());
    }

    let value: Value = serde_yaml::from_str(payload)
        .map_err(|e| IngestError::InvalidFrontMatter(format!("YAML decode failed: {e}")))?;

    match value {
        Value::Mapping(mapping) => convert_mapping(mapping),
        Value::Null => Ok(FrontMatter::new()),
        _ => Err(IngestError::InvalidFrontMatter(
            "front matter must be a mapping".to_string(),
        )),
    }
}

fn is_delimiter_line(line: &str) -> bool {
    line.strip_suffix('\r').unwrap_or(line) == DELIMITER
}

fn timestamp_pattern() -> Option<&'static Regex> {
    static TIMESTAMP: OnceLock<Option<Regex>> = OnceLock::new();
    TIMESTAMP
        .get_or_init(|| {
            Regex::new(
                r"^\d{4}-\d{1,2}-\d{1,2}(?:(?:[Tt]|[ \t]+)\d{1,2}:\d{2}:\d{2}(?:\.\d*)?(?:[ \t]*(?:Z|[+-]\d{1,2}(?::\d{2})?))?)?$",
            )
            .ok()
        })
        .as_ref()
}

fn convert_mapping(mapping: serde_yaml::Mapping) -> Result<FrontMatter> {
    let mut out = FrontMatter::new();
    for (key, value) in mapping {
        out.insert(convert_key(key)?, convert_value(value)?);
    }
    Ok(out)
}

fn convert_key(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(IngestError::InvalidFrontMatter(
            "mapping keys must be scalars".to_string(),
        )),
    }
}

fn convert_value(value: Value) -> Result<FrontMatterValue> {
    Ok(match value {
        Value::Null => FrontMatterValue::Null,
        Value::Bool(b) => FrontMatterValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FrontMatterValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FrontMatterValue::Float(f)
            } else {
                return Err(IngestError::InvalidFrontMatter(
                    "unsupported numeric value".to_string(),
                ));
            }
        }
        Value::String(s) => {
            if timestamp_pattern().is_some_and(|re| re.is_match(&s)) {
                FrontMatterValue::Date(s)
            } else {
                FrontMatterValue::String(s)
            }
        }
        Value::Sequence(items) => FrontMatterValue::Sequence(
            items
                .into_iter()
                .map(convert_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Mapping(mapping) => FrontMatterValue::Mapping(convert_mapping(mapping)?),
        Value::Tagged(tagged) => {
            return Err(IngestError::InvalidFrontMatter(format!(
                "unsupported tagged value `{}`",
                tagged.tag
            )));
        }
    })
}
