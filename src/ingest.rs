//! In-memory ingestion and eager/streaming selection for files
//!
//! [`MarkdownIngestor`] owns a set of [`Limits`] and [`IngestOptions`] and
//! runs the whole pipeline for one document per call:
//!
//! 1. Strip a leading byte order mark
//! 2. Split, decode and validate front matter
//! 3. Validate the body (size, nesting, dangerous patterns, repetition)
//! 4. Parse the body and walk it into a [`ParsedDocument`]
//! 5. Render and sanitise HTML, then fingerprint it
//!
//! Any failure aborts the call; no partial document is returned.

use std::io::Read;
use std::path::Path;

use log::{debug, warn};

use crate::document::{ParsedDocument, RenderedDocument};
use crate::encoding::decode_utf8;
use crate::error::Result;
use crate::fingerprint::ContentFingerprint;
use crate::frontmatter::extract_front_matter;
use crate::frontmatter_validator::FrontMatterValidator;
use crate::limits::{IngestOptions, Limits};
use crate::parser::{MarkdownTree, parse_markdown};
use crate::sanitizer::sanitize_html;
use crate::security::SourceValidator;
use crate::streaming::{DocumentSummary, StreamingIngestor, open_markdown};
use crate::walker::DocumentWalker;

/// Entry point for turning markdown into documents and HTML
///
/// Calls are independent; one ingestor can be shared across threads.
///
/// # Example
///
/// ```
/// use markdown_ingest::MarkdownIngestor;
///
/// let ingestor = MarkdownIngestor::new();
/// let rendered = ingestor
///     .render("---\ntitle: Hello\n---\n# Hello\n\nFirst paragraph.")
///     .unwrap();
///
/// assert_eq!(rendered.document.title(), Some("Hello"));
/// assert_eq!(rendered.document.excerpt.as_deref(), Some("First paragraph."));
/// assert!(rendered.html.contains("<h1>Hello</h1>"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MarkdownIngestor {
    limits: Limits,
    options: IngestOptions,
}

impl MarkdownIngestor {
    /// Create an ingestor with default limits and options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an ingestor with custom limits
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            limits,
            options: IngestOptions::default(),
        }
    }

    /// Replace the ingestion options
    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Streaming ingestor sharing this ingestor's configuration
    pub fn streaming(&self) -> StreamingIngestor<'_> {
        StreamingIngestor::new(&self.limits, &self.options)
    }

    /// Parse markdown into a document without rendering HTML
    pub fn parse(&self, text: &str) -> Result<ParsedDocument> {
        self.ingest(text, |_| Ok(()))
            .inspect_err(|e| warn!("rejected document: {e}"))
    }

    /// Parse markdown and render sanitised HTML
    ///
    /// # Errors
    ///
    /// Every validation error of the pipeline; see
    /// [`IngestError`](crate::IngestError).
    pub fn render(&self, text: &str) -> Result<RenderedDocument> {
        let mut html = String::new();
        let document = self
            .ingest(text, |tree| {
                html = sanitize_html(&tree.to_html());
                Ok(())
            })
            .inspect_err(|e| warn!("rejected document: {e}"))?;

        let fingerprint = ContentFingerprint::generate(html.as_bytes());
        Ok(RenderedDocument {
            document,
            html,
            fingerprint,
        })
    }

    /// Decode bytes as UTF-8 and render them
    ///
    /// # Errors
    ///
    /// `InvalidEncoding` with the offset of the first malformed sequence,
    /// then every error of [`MarkdownIngestor::render`].
    pub fn render_bytes(&self, bytes: &[u8]) -> Result<RenderedDocument> {
        let text = decode_utf8(bytes).inspect_err(|e| warn!("rejected document: {e}"))?;
        self.render(text)
    }

    /// Render a file, streaming it when it is larger than the eager threshold
    ///
    /// # Errors
    ///
    /// `FileNotFound` when the path does not exist, `ContentTooLarge` when
    /// the file is larger than the size limit, then every error of
    /// [`MarkdownIngestor::render_bytes`].
    pub fn render_file(&self, path: &Path) -> Result<RenderedDocument> {
        let (mut file, len) = open_markdown(path)?;
        if len > self.options.eager_threshold {
            debug!(
                "streaming {} ({len} bytes, threshold {})",
                path.display(),
                self.options.eager_threshold
            );
            drop(file);
            return self
                .streaming()
                .render_file(path)
                .inspect_err(|e| warn!("rejected {}: {e}", path.display()));
        }

        debug!("loading {} eagerly ({len} bytes)", path.display());
        let mut bytes = Vec::with_capacity(len as usize);
        file.read_to_end(&mut bytes)?;
        self.render_bytes(&bytes)
    }

    /// Read front matter and excerpt without rendering the body
    pub fn read_summary(&self, path: &Path) -> Result<DocumentSummary> {
        self.streaming().read_summary(path)
    }

    fn ingest<F>(&self, text: &str, on_tree: F) -> Result<ParsedDocument>
    where
        F: FnOnce(&MarkdownTree<'_>) -> Result<()>,
    {
        self.limits.validate()?;
        self.options.validate()?;

        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        let split = extract_front_matter(text, &self.limits)?;
        if let Some(front_matter) = &split.front_matter {
            FrontMatterValidator::new(&self.limits).validate(front_matter)?;
        }

        SourceValidator::new(&self.limits)
            .with_dangerous_patterns(self.options.check_dangerous_patterns)
            .validate(split.body)?;

        let tree = parse_markdown(split.body)?;
        let mut walker = DocumentWalker::new();
        walker.walk(&tree.root);
        on_tree(&tree)?;

        debug!(
            "ingested {} body bytes, front matter: {}",
            split.body.len(),
            split.front_matter.is_some()
        );
        Ok(walker.finish(split.front_matter, self.options.excerpt_length))
    }
}
