//! Pre-parse validation of markdown source
//!
//! This module rejects hostile markdown before it reaches the parser:
//! - Oversized bodies
//! - Pathological nesting (deep headings, blockquotes, indentation)
//! - Inline script and event-handler markers
//! - Long runs of structural characters used for renderer amplification
//!
//! # Threat Model
//!
//! Markdown bodies are **untrusted author input**. Besides XSS payloads
//! that the sanitizer removes after rendering, an attacker can submit input
//! that is cheap to write but expensive to parse. The checks here are
//! linear-time heuristics that fail closed; they deliberately over-estimate
//! nesting rather than parse it.
//!
//! # Check Order
//!
//! 1. **Size**: body length ≤ `max_markdown_file_size`
//! 2. **Nesting**: per line, the leading `#` run, `>` run, or whitespace
//!    run ÷ 2 must not exceed `max_markdown_nesting_depth`
//! 3. **Dangerous patterns**: case-insensitive search for the markers in
//!    [`DANGEROUS_MARKDOWN_PATTERNS`] (skippable for trusted content)
//! 4. **Repetition**: no run of a [`STRUCTURAL_CHARACTERS`] byte longer
//!    than `max_repeated_characters`
//!
//! Every check is an incremental tracker so the streaming path can feed
//! chunks as they are decoded. [`SourceScanner`] bundles the three content
//! trackers for that use.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{IngestError, Result};
use crate::limits::Limits;

/// Script and event-handler markers rejected in markdown bodies
pub const DANGEROUS_MARKDOWN_PATTERNS: &[&str] = &[
    "<script",     // Script element
    "</script>",   // Script element close
    "javascript:", // Script URLs
    "vbscript:",   // Legacy IE script URLs
    "onload=",
    "onerror=",
    "onclick=",
    "onmouseover=",
    "onfocus=",
    "onblur=",
    "onchange=",
    "onsubmit=",
];

/// Characters whose long runs drive markdown renderer amplification
pub const STRUCTURAL_CHARACTERS: &[u8] = b"-=*#`~";

/// Location reported for body pattern matches
const LOCATION: &str = "markdown body";

/// Validator for raw markdown bodies
///
/// # Examples
///
/// ```
/// use markdown_ingest::limits::Limits;
/// use markdown_ingest::security::SourceValidator;
///
/// let limits = Limits::default();
/// let validator = SourceValidator::new(&limits);
/// assert!(validator.validate("# Title\n\nSome *text*.").is_ok());
/// assert!(validator.validate("<script>alert(1)</script>").is_err());
/// assert!(validator.validate(&"-".repeat(1001)).is_err());
///
/// // Trusted content skips the pattern gate only
/// let trusted = SourceValidator::new(&limits).with_dangerous_patterns(false);
/// assert!(trusted.validate("<script>alert(1)</script>").is_ok());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SourceValidator<'a> {
    limits: &'a Limits,
    check_dangerous_patterns: bool,
}

impl<'a> SourceValidator<'a> {
    /// Create a validator with every check enabled
    pub fn new(limits: &'a Limits) -> Self {
        Self {
            limits,
            check_dangerous_patterns: true,
        }
    }

    /// Enable or disable the dangerous pattern gate
    pub fn with_dangerous_patterns(mut self, enabled: bool) -> Self {
        self.check_dangerous_patterns = enabled;
        self
    }

    /// Run every check against a complete body, in order
    ///
    /// # Errors
    ///
    /// `ContentTooLarge`, `ExcessiveNesting`, `DangerousContent` or
    /// `ExcessiveRepetition`, whichever check fails first.
    pub fn validate(&self, body: &str) -> Result<()> {
        self.check_size(body.len() as u64)?;

        NestingTracker::new(self.limits.max_markdown_nesting_depth).feed(body)?;
        if self.check_dangerous_patterns {
            PatternMatcher::new().feed(body)?;
        }
        RunTracker::new(self.limits.max_repeated_characters).feed(body)?;
        Ok(())
    }

    /// Size gate
    ///
    /// # Examples
    ///
    /// ```
    /// use markdown_ingest::limits::Limits;
    /// use markdown_ingest::security::SourceValidator;
    ///
    /// let limits = Limits::default().with_max_markdown_file_size(100);
    /// let validator = SourceValidator::new(&limits);
    /// assert!(validator.check_size(100).is_ok());
    /// assert!(validator.check_size(101).is_err());
    /// ```
    pub fn check_size(&self, size: u64) -> Result<()> {
        let limit = self.limits.max_markdown_file_size as u64;
        if size > limit {
            Err(IngestError::ContentTooLarge { size, limit })
        } else {
            Ok(())
        }
    }

    /// Create an incremental scanner with this validator's settings
    pub fn scanner(&self) -> SourceScanner {
        SourceScanner {
            nesting: NestingTracker::new(self.limits.max_markdown_nesting_depth),
            patterns: self.check_dangerous_patterns.then(PatternMatcher::new),
            runs: RunTracker::new(self.limits.max_repeated_characters),
        }
    }
}

/// Incremental body scanner for chunked input
///
/// Chunks may split lines, runs and patterns at any point; the result is
/// the same as scanning the concatenation, except that when a body violates
/// several checks the first one reported can differ from
/// [`SourceValidator::validate`].
#[derive(Debug, Clone)]
pub struct SourceScanner {
    nesting: NestingTracker,
    patterns: Option<PatternMatcher>,
    runs: RunTracker,
}

impl SourceScanner {
    /// Scan the next chunk of text
    pub fn feed(&mut self, text: &str) -> Result<()> {
        self.nesting.feed(text)?;
        if let Some(patterns) = self.patterns.as_mut() {
            patterns.feed(text)?;
        }
        self.runs.feed(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineMode {
    /// At the first byte of a line
    Start,
    Hash,
    Quote,
    Indent,
    /// Past the leading run
    Rest,
}

/// Tracks the nesting level implied by each line's leading run
#[derive(Debug, Clone)]
pub struct NestingTracker {
    max_depth: usize,
    mode: LineMode,
    run: usize,
}

impl NestingTracker {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            mode: LineMode::Start,
            run: 0,
        }
    }

    pub fn feed(&mut self, text: &str) -> Result<()> {
        for &byte in text.as_bytes() {
            if byte == b'\n' {
                self.mode = LineMode::Start;
                self.run = 0;
                continue;
            }

            self.mode = match (self.mode, byte) {
                (LineMode::Start, b'#') | (LineMode::Hash, b'#') => LineMode::Hash,
                (LineMode::Start, b'>') | (LineMode::Quote, b'>') => LineMode::Quote,
                (LineMode::Start, b' ' | b'\t') | (LineMode::Indent, b' ' | b'\t') => {
                    LineMode::Indent
                }
                _ => LineMode::Rest,
            };

            if self.mode == LineMode::Rest {
                continue;
            }
            self.run += 1;

            let level = if self.mode == LineMode::Indent {
                self.run / 2
            } else {
                self.run
            };
            if level > self.max_depth {
                return Err(IngestError::ExcessiveNesting {
                    depth: level,
                    limit: self.max_depth,
                });
            }
        }
        Ok(())
    }
}

/// Case-insensitive search for [`DANGEROUS_MARKDOWN_PATTERNS`]
///
/// Keeps the last few bytes of each chunk so a marker split across two
/// chunks is still found.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    tail: String,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, text: &str) -> Result<()> {
        let Some(regex) = dangerous_pattern_regex() else {
            return Ok(());
        };

        let mut window = std::mem::take(&mut self.tail);
        window.push_str(text);

        if let Some(caps) = regex.captures(&window) {
            let index = caps
                .iter()
                .skip(1)
                .position(|group| group.is_some())
                .unwrap_or(0);
            return Err(IngestError::DangerousContent {
                pattern: DANGEROUS_MARKDOWN_PATTERNS[index],
                location: LOCATION,
            });
        }

        let keep = longest_pattern_len().saturating_sub(1);
        let mut start = window.len().saturating_sub(keep);
        while !window.is_char_boundary(start) {
            start += 1;
        }
        self.tail = window[start..].to_string();
        Ok(())
    }
}

fn longest_pattern_len() -> usize {
    DANGEROUS_MARKDOWN_PATTERNS
        .iter()
        .map(|p| p.len())
        .max()
        .unwrap_or(0)
}

/// One capture group per pattern, in list order
fn dangerous_pattern_regex() -> Option<&'static Regex> {
    static DANGEROUS_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    DANGEROUS_REGEX
        .get_or_init(|| {
            let alternation = DANGEROUS_MARKDOWN_PATTERNS
                .iter()
                .map(|p| format!("({})", regex::escape(p)))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!("(?i){alternation}")).ok()
        })
        .as_ref()
}

/// Tracks runs of structural characters
#[derive(Debug, Clone)]
pub struct RunTracker {
    limit: usize,
    current: Option<u8>,
    run: usize,
}

impl RunTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            current: None,
            run: 0,
        }
    }

    pub fn feed(&mut self, text: &str) -> Result<()> {
        for &byte in text.as_bytes() {
            if !STRUCTURAL_CHARACTERS.contains(&byte) {
                self.current = None;
                self.run = 0;
                continue;
            }

            if self.current == Some(byte) {
                self.run += 1;
            } else {
                self.current = Some(byte);
                self.run = 1;
            }

            if self.run > self.limit {
                return Err(IngestError::ExcessiveRepetition {
                    character: char::from(byte),
                    limit: self.limit,
                });
            }
        }
        Ok(())
    }
}
