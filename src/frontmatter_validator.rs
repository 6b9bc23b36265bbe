//! Recursive validation of decoded front matter
//!
//! Every key and value in the decoded mapping is checked against [`Limits`]
//! and a content blacklist before the document is accepted. Validation
//! fails on the first violation.
//!
//! # Checks
//!
//! - Keys: character length ≤ `max_front_matter_key_length`
//! - Strings: character length ≤ `max_front_matter_string_length` and no
//!   blacklisted substring (case-insensitive)
//! - Sequences: length ≤ `max_front_matter_array_length`
//! - Mappings: key count ≤ `max_front_matter_object_keys`
//! - Depth: top-level values sit at depth 0; a value at depth
//!   `max_front_matter_depth` or deeper is rejected
//!
//! Numbers, booleans, nulls and dates are always accepted.
//!
//! # Examples
//!
//! ```rust
//! use markdown_ingest::frontmatter::decode_front_matter;
//! use markdown_ingest::frontmatter_validator::FrontMatterValidator;
//! use markdown_ingest::limits::Limits;
//!
//! let limits = Limits::default();
//! let validator = FrontMatterValidator::new(&limits);
//!
//! let fm = decode_front_matter("title: Safe", &limits).unwrap();
//! assert!(validator.validate(&fm).is_ok());
//!
//! let fm = decode_front_matter("link: \"javascript:alert(1)\"", &limits).unwrap();
//! assert!(validator.validate(&fm).is_err());
//! ```

use crate::error::{IngestError, Result};
use crate::frontmatter::{FrontMatter, FrontMatterValue};
use crate::limits::Limits;

/// Substrings rejected in any front matter string value
pub const FRONT_MATTER_BLACKLIST: &[&str] = &[
    "<script",     // Inline script injection through templates
    "javascript:", // Script URLs in link-like fields
    "vbscript:",   // Legacy IE script URLs
    "file://",     // Local file references
    "ftp://",      // Off-site fetches from build tooling
];

/// Location reported for blacklist matches
const LOCATION: &str = "front matter";

/// Validator for decoded front matter
#[derive(Debug, Clone, Copy)]
pub struct FrontMatterValidator<'a> {
    limits: &'a Limits,
}

impl<'a> FrontMatterValidator<'a> {
    /// Create a validator bound to a set of limits
    pub fn new(limits: &'a Limits) -> Self {
        Self { limits }
    }

    /// Validate a complete front matter mapping
    ///
    /// # Errors
    ///
    /// - `FrontMatterValueTooLarge` for oversized keys, strings, sequences
    ///   or mappings
    /// - `DangerousContent` for blacklisted substrings in strings
    /// - `ExcessiveNesting` when values nest beyond the depth limit
    pub fn validate(&self, front_matter: &FrontMatter) -> Result<()> {
        self.check_mapping_size(front_matter.len())?;
        for (key, value) in front_matter {
            self.validate_key(key)?;
            self.validate_value(value, 0)?;
        }
        Ok(())
    }

    /// Validate a single value at the given depth
    pub fn validate_value(&self, value: &FrontMatterValue, depth: usize) -> Result<()> {
        if depth >= self.limits.max_front_matter_depth {
            return Err(IngestError::ExcessiveNesting {
                depth: depth + 1,
                limit: self.limits.max_front_matter_depth,
            });
        }

        match value {
            FrontMatterValue::String(s) => self.validate_string(s),
            FrontMatterValue::Sequence(items) => {
                if items.len() > self.limits.max_front_matter_array_length {
                    return Err(IngestError::FrontMatterValueTooLarge {
                        kind: "array",
                        size: items.len(),
                        limit: self.limits.max_front_matter_array_length,
                    });
                }
                items
                    .iter()
                    .try_for_each(|item| self.validate_value(item, depth + 1))
            }
            FrontMatterValue::Mapping(map) => {
                self.check_mapping_size(map.len())?;
                for (key, item) in map {
                    self.validate_key(key)?;
                    self.validate_value(item, depth + 1)?;
                }
                Ok(())
            }
            FrontMatterValue::Integer(_)
            | FrontMatterValue::Float(_)
            | FrontMatterValue::Bool(_)
            | FrontMatterValue::Null
            | FrontMatterValue::Date(_) => Ok(()),
        }
    }

    fn validate_key(&self, key: &str) -> Result<()> {
        let len = key.chars().count();
        if len > self.limits.max_front_matter_key_length {
            return Err(IngestError::FrontMatterValueTooLarge {
                kind: "key",
                size: len,
                limit: self.limits.max_front_matter_key_length,
            });
        }
        Ok(())
    }

    fn validate_string(&self, s: &str) -> Result<()> {
        let len = s.chars().count();
        if len > self.limits.max_front_matter_string_length {
            return Err(IngestError::FrontMatterValueTooLarge {
                kind: "string",
                size: len,
                limit: self.limits.max_front_matter_string_length,
            });
        }

        if let Some(pattern) = find_blacklisted(s) {
            return Err(IngestError::DangerousContent {
                pattern,
                location: LOCATION,
            });
        }
        Ok(())
    }

    fn check_mapping_size(&self, keys: usize) -> Result<()> {
        if keys > self.limits.max_front_matter_object_keys {
            return Err(IngestError::FrontMatterValueTooLarge {
                kind: "object",
                size: keys,
                limit: self.limits.max_front_matter_object_keys,
            });
        }
        Ok(())
    }
}

/// Find the first blacklisted substring in a string, case-insensitively
pub fn find_blacklisted(s: &str) -> Option<&'static str> {
    let lower = s.to_lowercase();
    FRONT_MATTER_BLACKLIST
        .iter()
        .copied()
        .find(|pattern| lower.contains(pattern))
}
