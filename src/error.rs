//! Error types for ingestion operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while ingesting a markdown document
///
/// Every variant is terminal for the current call: callers receive either a
/// fully validated document or one of these errors, never a partial result.
/// Messages name the limit or pattern that triggered the failure but never
/// echo the offending payload.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Markdown body exceeds the configured size limit
    #[error("content size {size} bytes exceeds maximum of {limit} bytes")]
    ContentTooLarge { size: u64, limit: u64 },

    /// Front matter payload exceeds the configured size limit
    #[error("front matter size {size} bytes exceeds maximum of {limit} bytes")]
    FrontMatterTooLarge { size: usize, limit: usize },

    /// A front matter key, string, sequence or mapping is too large
    #[error("front matter {kind} size {size} exceeds maximum of {limit}")]
    FrontMatterValueTooLarge {
        kind: &'static str,
        size: usize,
        limit: usize,
    },

    /// Structural or front matter nesting exceeds the configured depth
    #[error("nesting depth {depth} exceeds maximum of {limit}")]
    ExcessiveNesting { depth: usize, limit: usize },

    /// A blacklisted pattern was found
    #[error("dangerous content: pattern `{pattern}` is not allowed in {location}")]
    DangerousContent {
        pattern: &'static str,
        location: &'static str,
    },

    /// A structural character is repeated beyond the configured run length
    #[error("character `{character}` repeated more than {limit} times in a row")]
    ExcessiveRepetition { character: char, limit: usize },

    /// Front matter could not be delimited, decoded, or has an unsupported shape
    #[error("invalid front matter: {0}")]
    InvalidFrontMatter(String),

    /// Input is not valid UTF-8
    #[error("invalid UTF-8 at byte offset {offset}")]
    InvalidEncoding { offset: u64 },

    /// Source file does not exist
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Limits or options are not usable
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl IngestError {
    /// Get a stable numeric error code for build reports
    pub fn code(&self) -> u32 {
        match self {
            IngestError::ContentTooLarge { .. } => 1,
            IngestError::FrontMatterTooLarge { .. } => 2,
            IngestError::FrontMatterValueTooLarge { .. } => 3,
            IngestError::ExcessiveNesting { .. } => 4,
            IngestError::DangerousContent { .. } => 5,
            IngestError::ExcessiveRepetition { .. } => 6,
            IngestError::InvalidFrontMatter(_) => 7,
            IngestError::InvalidEncoding { .. } => 8,
            IngestError::FileNotFound(_) => 9,
            IngestError::Io(_) => 10,
            IngestError::InvalidConfiguration(_) => 11,
        }
    }

    /// Whether the error came from a security/DoS guard rather than malformed input
    pub fn is_security_rejection(&self) -> bool {
        matches!(
            self,
            IngestError::ContentTooLarge { .. }
                | IngestError::FrontMatterTooLarge { .. }
                | IngestError::FrontMatterValueTooLarge { .. }
                | IngestError::ExcessiveNesting { .. }
                | IngestError::DangerousContent { .. }
                | IngestError::ExcessiveRepetition { .. }
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, IngestError>;
