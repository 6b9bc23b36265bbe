//! Resource limits and ingestion options
//!
//! `Limits` holds the size and depth ceilings every validator consumes.
//! `IngestOptions` holds the knobs that select between the eager and
//! streaming paths and bound the excerpt.
//!
//! Both types deserialize with `#[serde(default)]`, so a host configuration
//! section only needs to name the fields it overrides:
//!
//! ```rust
//! use markdown_ingest::limits::Limits;
//!
//! let limits = Limits::default().with_max_front_matter_depth(4);
//! assert_eq!(limits.max_front_matter_depth, 4);
//! assert!(limits.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Default maximum markdown size (10 MiB)
pub const DEFAULT_MAX_MARKDOWN_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum front matter payload size (100 KiB)
pub const DEFAULT_MAX_FRONT_MATTER_SIZE: usize = 100 * 1024;

/// Default file size above which files are streamed (1 MiB)
pub const DEFAULT_EAGER_THRESHOLD: u64 = 1024 * 1024;

/// Default streaming read size (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default excerpt bound in characters
pub const DEFAULT_EXCERPT_LENGTH: usize = 300;

/// Size and depth ceilings applied to every document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum markdown size in bytes
    pub max_markdown_file_size: usize,
    /// Maximum front matter payload size in bytes
    pub max_front_matter_size: usize,
    /// Maximum front matter nesting depth
    pub max_front_matter_depth: usize,
    /// Maximum number of elements in a front matter sequence
    pub max_front_matter_array_length: usize,
    /// Maximum number of keys in a front matter mapping
    pub max_front_matter_object_keys: usize,
    /// Maximum front matter string length in characters
    pub max_front_matter_string_length: usize,
    /// Maximum front matter key length in characters
    pub max_front_matter_key_length: usize,
    /// Maximum markdown nesting depth (headings, quotes, indentation)
    pub max_markdown_nesting_depth: usize,
    /// Maximum run of a repeated structural character
    pub max_repeated_characters: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_markdown_file_size: DEFAULT_MAX_MARKDOWN_FILE_SIZE,
            max_front_matter_size: DEFAULT_MAX_FRONT_MATTER_SIZE,
            max_front_matter_depth: 10,
            max_front_matter_array_length: 1000,
            max_front_matter_object_keys: 100,
            max_front_matter_string_length: 10_000,
            max_front_matter_key_length: 100,
            max_markdown_nesting_depth: 20,
            max_repeated_characters: 1000,
        }
    }
}

impl Limits {
    /// Create limits with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum markdown size in bytes
    pub fn with_max_markdown_file_size(mut self, size: usize) -> Self {
        self.max_markdown_file_size = size;
        self
    }

    /// Set the maximum front matter payload size in bytes
    pub fn with_max_front_matter_size(mut self, size: usize) -> Self {
        self.max_front_matter_size = size;
        self
    }

    /// Set the maximum front matter nesting depth
    pub fn with_max_front_matter_depth(mut self, depth: usize) -> Self {
        self.max_front_matter_depth = depth;
        self
    }

    /// Set the maximum markdown nesting depth
    pub fn with_max_markdown_nesting_depth(mut self, depth: usize) -> Self {
        self.max_markdown_nesting_depth = depth;
        self
    }

    /// Set the maximum run of a repeated structural character
    pub fn with_max_repeated_characters(mut self, run: usize) -> Self {
        self.max_repeated_characters = run;
        self
    }

    /// Check that every limit is positive
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("max_markdown_file_size", self.max_markdown_file_size),
            ("max_front_matter_size", self.max_front_matter_size),
            ("max_front_matter_depth", self.max_front_matter_depth),
            (
                "max_front_matter_array_length",
                self.max_front_matter_array_length,
            ),
            (
                "max_front_matter_object_keys",
                self.max_front_matter_object_keys,
            ),
            (
                "max_front_matter_string_length",
                self.max_front_matter_string_length,
            ),
            (
                "max_front_matter_key_length",
                self.max_front_matter_key_length,
            ),
            (
                "max_markdown_nesting_depth",
                self.max_markdown_nesting_depth,
            ),
            ("max_repeated_characters", self.max_repeated_characters),
        ];
        match fields.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(IngestError::InvalidConfiguration(format!(
                "{name} must be positive"
            ))),
            None => Ok(()),
        }
    }
}

/// Knobs for eager/streaming selection and excerpt derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Files larger than this many bytes are streamed instead of loaded
    pub eager_threshold: u64,
    /// Streaming read size in bytes
    pub chunk_size: usize,
    /// Maximum excerpt length in characters
    pub excerpt_length: usize,
    /// Reject bodies containing script/event-handler markers before parsing
    ///
    /// Disable only for trusted content (fixtures, internal docs).
    pub check_dangerous_patterns: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            eager_threshold: DEFAULT_EAGER_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            check_dangerous_patterns: true,
        }
    }
}

impl IngestOptions {
    /// Create options with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the eager-load threshold in bytes
    pub fn with_eager_threshold(mut self, bytes: u64) -> Self {
        self.eager_threshold = bytes;
        self
    }

    /// Set the streaming chunk size in bytes
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set the excerpt bound in characters
    pub fn with_excerpt_length(mut self, chars: usize) -> Self {
        self.excerpt_length = chars;
        self
    }

    /// Skip the pre-parse dangerous pattern gate (trusted content only)
    pub fn trusted(mut self) -> Self {
        self.check_dangerous_patterns = false;
        self
    }

    /// Check that every size knob is positive
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidConfiguration(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.excerpt_length == 0 {
            return Err(IngestError::InvalidConfiguration(
                "excerpt_length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
