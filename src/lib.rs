//! Markdown Ingest - security-hardened markdown ingestion
//!
//! This library turns untrusted markdown with optional YAML front matter
//! into a structured document model and XSS-safe HTML, with resource limits
//! on every stage. It is the content core of a static site generator; the
//! build orchestrator, templates and file output live elsewhere.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `ingest`: In-memory pipeline and eager/streaming selection for files
//! - `streaming`: Chunked ingestion of large files and metadata-only reads
//! - `frontmatter`: YAML front matter splitting and decoding
//! - `frontmatter_validator`: Recursive size/depth/pattern checks on front matter
//! - `security`: Size, nesting, dangerous pattern and repetition checks on bodies
//! - `parser`: Markdown parsing using pulldown-cmark
//! - `walker`: Document model extraction from the parsed tree
//! - `sanitizer`: Whitelist HTML sanitizer built on the html5ever tokenizer
//! - `encoding`: Strict UTF-8 decoding, including across chunk boundaries
//! - `fingerprint`: Content fingerprints using BLAKE3
//! - `stats`: Word count and reading time
//!
//! # Example
//!
//! ```
//! use markdown_ingest::{IngestError, MarkdownIngestor};
//!
//! let ingestor = MarkdownIngestor::new();
//!
//! let rendered = ingestor
//!     .render("---\ntitle: Post\ntags: [rust]\n---\n# Post\n\nSee [docs](https://docs.rs).")
//!     .unwrap();
//! assert_eq!(rendered.document.links[0].url, "https://docs.rs");
//! assert!(rendered.document.links[0].is_external);
//!
//! let err = ingestor.render("<script>alert(1)</script>").unwrap_err();
//! assert!(matches!(err, IngestError::DangerousContent { .. }));
//! ```
//!
//! # Logging
//!
//! Pipeline milestones are logged at `debug` and rejected documents at
//! `warn` through the `log` facade. Document content is never logged.

pub mod document;
pub mod encoding;
pub mod error;
pub mod excerpt;
pub mod fingerprint;
pub mod frontmatter;
pub mod frontmatter_validator;
pub mod ingest;
pub mod limits;
pub mod parser;
pub mod sanitizer;
pub mod security;
pub mod stats;
pub mod streaming;
pub mod walker;

// Re-export main types for convenience
pub use document::{ContentElement, Image, Link, ParsedDocument, RenderedDocument};
pub use error::{IngestError, Result};
pub use frontmatter::{FrontMatter, FrontMatterValue};
pub use ingest::MarkdownIngestor;
pub use limits::{IngestOptions, Limits};
pub use sanitizer::sanitize_html;
pub use streaming::{DocumentSummary, StreamingIngestor};
