//! Bounded-memory ingestion of large markdown files
//!
//! The streaming path produces the same [`ParsedDocument`] and HTML as the
//! eager path without holding the whole file in memory.
//!
//! # Front Matter Detection
//!
//! A head buffer of at most `max_front_matter_size` bytes (plus room for the
//! delimiter lines and a byte order mark) is read first. Front matter is
//! present when the buffer starts with `---\n` or `---\r\n` and contains a
//! terminating `\n---\n` or `\n---\r\n`. A missing terminator means "no
//! front matter" here, not an error: callers with larger front matter must
//! raise the limit.
//!
//! # Full Mode
//!
//! The body is read in `chunk_size` pieces, decoded incrementally and fed to
//! the source validator's trackers. Decoded text accumulates until a
//! paragraph boundary is known: a blank line outside fenced code and raw
//! HTML blocks, followed by a line that does not continue a list item or
//! indented code. Everything before the last boundary is parsed, walked,
//! rendered, sanitised and written out. When no boundary appears within
//! twice the chunk size, the buffered lines are flushed anyway, which bounds
//! memory at the cost of splitting that paragraph.
//!
//! Output written before an error must be discarded by the caller.
//!
//! Link reference definitions only resolve within the segment that
//! contains them. An HTML comment or `script`/`style` element left open by
//! one segment stays open for the next, as it would in a single document.
//!
//! # Metadata Mode
//!
//! [`StreamingIngestor::read_summary`] decodes the front matter and reads
//! the body segment by segment until the first paragraph is complete, within
//! a window of [`SUMMARY_WINDOW_FACTOR`] bytes per excerpt character. A
//! first paragraph cut off by the window yields an excerpt ending in `…`.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use log::{debug, warn};

use crate::document::{ParsedDocument, RenderedDocument};
use crate::encoding::{Utf8ChunkDecoder, bom_length};
use crate::excerpt::{truncate_excerpt, truncate_partial_excerpt};
use crate::error::{IngestError, Result};
use crate::fingerprint::ContentFingerprint;
use crate::frontmatter::{FrontMatter, decode_front_matter};
use crate::frontmatter_validator::FrontMatterValidator;
use crate::limits::{IngestOptions, Limits};
use crate::parser::parse_markdown;
use crate::sanitizer::{Carry, sanitize_fragment};
use crate::security::SourceValidator;
use crate::walker::{DocumentWalker, declared_excerpt};

/// Head bytes allowed beyond the front matter limit for delimiter lines
const DELIMITER_ALLOWANCE: usize = 16;

/// Body bytes read per excerpt character in metadata mode
///
/// Twice the excerpt length in the widest UTF-8 encoding.
pub const SUMMARY_WINDOW_FACTOR: usize = 8;

/// Front matter and excerpt read without rendering the body
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub front_matter: Option<FrontMatter>,
    pub excerpt: Option<String>,
    /// Byte offset of the body within the file
    pub body_offset: u64,
}

/// Byte positions of front matter found in a head buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadSplit {
    pub payload_start: usize,
    pub payload_end: usize,
    pub body_offset: usize,
}

/// Find front matter delimiters in a head buffer
///
/// `at_eof` allows a terminator without a trailing newline when the buffer
/// holds the whole file.
///
/// # Examples
///
/// ```
/// use markdown_ingest::streaming::locate_front_matter_bytes;
///
/// let split = locate_front_matter_bytes(b"---\ntitle: X\n---\nBody", false).unwrap();
/// assert_eq!(split.payload_start, 4);
/// assert_eq!(split.payload_end, 12);
/// assert_eq!(split.body_offset, 17);
///
/// assert!(locate_front_matter_bytes(b"# No front matter", false).is_none());
/// assert!(locate_front_matter_bytes(b"---\nunterminated: true\n", false).is_none());
/// ```
pub fn locate_front_matter_bytes(head: &[u8], at_eof: bool) -> Option<HeadSplit> {
    let bom = bom_length(head);
    let text = &head[bom..];
    let prefix_len = if text.starts_with(b"---\n") {
        4
    } else if text.starts_with(b"---\r\n") {
        5
    } else {
        return None;
    };

    // Position of the newline before a candidate terminator; starts at the
    // opening delimiter's own newline so empty front matter is found.
    let mut newline = prefix_len - 1;
    loop {
        let rest = &text[newline + 1..];
        let terminator = if rest.starts_with(b"---\n") {
            Some(4)
        } else if rest.starts_with(b"---\r\n") {
            Some(5)
        } else if at_eof && (rest == b"---" || rest == b"---\r") {
            Some(rest.len())
        } else {
            None
        };

        if let Some(len) = terminator {
            return Some(HeadSplit {
                payload_start: bom + prefix_len,
                payload_end: bom + newline.max(prefix_len),
                body_offset: bom + newline + 1 + len,
            });
        }

        let next = rest.iter().position(|&b| b == b'\n')?;
        newline += 1 + next;
    }
}

/// Chunked ingestion bound to a set of limits and options
pub struct StreamingIngestor<'a> {
    limits: &'a Limits,
    options: &'a IngestOptions,
}

impl<'a> StreamingIngestor<'a> {
    pub fn new(limits: &'a Limits, options: &'a IngestOptions) -> Self {
        Self { limits, options }
    }

    /// Read front matter and excerpt from a file
    ///
    /// # Errors
    ///
    /// - `FileNotFound` if the path does not exist
    /// - `ContentTooLarge` if the body exceeds the size limit
    /// - `InvalidEncoding`, `InvalidFrontMatter` and the validation errors of
    ///   the eager path
    pub fn read_summary(&self, path: &Path) -> Result<DocumentSummary> {
        let (file, len) = open_markdown(path)?;
        self.summary_from(file, Some(len))
    }

    /// Read front matter and excerpt from any reader
    pub fn read_summary_from<R: Read>(&self, reader: R) -> Result<DocumentSummary> {
        self.summary_from(reader, None)
    }

    /// Render a file, writing sanitised HTML to `sink` as segments complete
    pub fn render_to<W: Write>(&self, path: &Path, sink: &mut W) -> Result<ParsedDocument> {
        let (file, len) = open_markdown(path)?;
        self.render_segments(file, Some(len), |html| {
            sink.write_all(html.as_bytes()).map_err(IngestError::from)
        })
    }

    /// Render from any reader, writing sanitised HTML to `sink`
    pub fn render_reader<R: Read, W: Write>(
        &self,
        reader: R,
        sink: &mut W,
    ) -> Result<ParsedDocument> {
        self.render_segments(reader, None, |html| {
            sink.write_all(html.as_bytes()).map_err(IngestError::from)
        })
    }

    /// Render a file into a [`RenderedDocument`]
    pub fn render_file(&self, path: &Path) -> Result<RenderedDocument> {
        let (file, len) = open_markdown(path)?;
        let mut html = String::new();
        let mut fingerprint = ContentFingerprint::incremental();
        let document = self.render_segments(file, Some(len), |segment| {
            fingerprint.update(segment.as_bytes());
            html.push_str(segment);
            Ok(())
        })?;
        Ok(RenderedDocument {
            document,
            html,
            fingerprint: fingerprint.finish(),
        })
    }

    fn head_limit(&self) -> usize {
        self.limits
            .max_front_matter_size
            .saturating_add(DELIMITER_ALLOWANCE + crate::encoding::UTF8_BOM.len())
    }

    fn source_validator(&self) -> SourceValidator<'a> {
        SourceValidator::new(self.limits)
            .with_dangerous_patterns(self.options.check_dangerous_patterns)
    }

    fn front_matter(&self, head: &Head) -> Result<Option<FrontMatter>> {
        let Some(split) = head.split else {
            return Ok(None);
        };
        let payload = &head.bytes[split.payload_start..split.payload_end];
        let text = std::str::from_utf8(payload).map_err(|e| IngestError::InvalidEncoding {
            offset: (split.payload_start + e.valid_up_to()) as u64,
        })?;
        let front_matter = decode_front_matter(text, self.limits)?;
        FrontMatterValidator::new(self.limits).validate(&front_matter)?;
        Ok(Some(front_matter))
    }

    fn summary_from<R: Read>(&self, mut reader: R, total_len: Option<u64>) -> Result<DocumentSummary> {
        self.limits.validate()?;
        self.options.validate()?;
        let head = Head::read(&mut reader, self.head_limit())?;
        let front_matter = self.front_matter(&head)?;
        let validator = self.source_validator();
        if let Some(total) = total_len {
            validator.check_size(total.saturating_sub(head.body_offset() as u64))?;
        }

        let excerpt_length = self.options.excerpt_length;
        let window_len = excerpt_length.saturating_mul(SUMMARY_WINDOW_FACTOR);
        let mut decoder = Utf8ChunkDecoder::starting_at(head.body_offset() as u64);
        let mut scanner = validator.scanner();
        let mut splitter = SegmentSplitter::new();
        let mut walker = DocumentWalker::new();
        let mut decoded = String::new();

        let body = head.body();
        let mut chunk: &[u8] = &body[..body.len().min(window_len)];
        let mut at_eof = head.at_eof && chunk.len() == body.len();
        let mut buf = vec![0u8; self.options.chunk_size.min(window_len)];
        let mut read = 0usize;
        loop {
            read += chunk.len();
            decoded.clear();
            decoder.decode(chunk, &mut decoded, at_eof)?;
            scanner.feed(&decoded)?;
            splitter.push(&decoded);

            if let Some(segment) = splitter.take_ready() {
                walker.walk(&parse_markdown(&segment)?.root);
                if walker.first_paragraph().is_some() {
                    break;
                }
            }
            if at_eof || read >= window_len {
                break;
            }
            let want = (window_len - read).min(buf.len());
            let n = read_chunk(&mut reader, &mut buf[..want])?;
            at_eof = n == 0;
            chunk = &buf[..n];
        }

        // Whatever is still buffered ends at the window, not at a boundary
        let mut cut = false;
        if walker.first_paragraph().is_none()
            && let Some(rest) = splitter.finish()
        {
            walker.walk(&parse_markdown(&rest)?.root);
            cut = !at_eof;
        }

        let excerpt = match (declared_excerpt(front_matter.as_ref()), walker.first_paragraph()) {
            (Some(declared), _) => Some(truncate_excerpt(&declared, excerpt_length)),
            (None, Some(paragraph)) if cut => Some(truncate_partial_excerpt(paragraph, excerpt_length)),
            (None, Some(paragraph)) => Some(truncate_excerpt(paragraph, excerpt_length)),
            (None, None) => None,
        };

        debug!(
            "read summary from {read} body bytes at offset {}",
            head.body_offset()
        );
        Ok(DocumentSummary {
            front_matter,
            excerpt,
            body_offset: head.body_offset() as u64,
        })
    }

    fn render_segments<R, F>(
        &self,
        mut reader: R,
        total_len: Option<u64>,
        mut emit: F,
    ) -> Result<ParsedDocument>
    where
        R: Read,
        F: FnMut(&str) -> Result<()>,
    {
        self.limits.validate()?;
        self.options.validate()?;
        let head = Head::read(&mut reader, self.head_limit())?;
        let front_matter = self.front_matter(&head)?;
        let validator = self.source_validator();
        if let Some(total) = total_len {
            validator.check_size(total.saturating_sub(head.body_offset() as u64))?;
        }

        let force_threshold = self.options.chunk_size.saturating_mul(2);
        let mut decoder = Utf8ChunkDecoder::starting_at(head.body_offset() as u64);
        let mut scanner = validator.scanner();
        let mut splitter = SegmentSplitter::new();
        let mut walker = DocumentWalker::new();
        let mut carry = Carry::Closed;
        let mut decoded = String::new();
        let mut body_size = 0u64;
        let mut segments = 0usize;

        let mut buf = vec![0u8; self.options.chunk_size];
        let mut chunk: &[u8] = head.body();
        let mut at_eof = head.at_eof;
        loop {
            body_size += chunk.len() as u64;
            validator.check_size(body_size)?;

            decoded.clear();
            decoder.decode(chunk, &mut decoded, at_eof)?;
            scanner.feed(&decoded)?;
            splitter.push(&decoded);

            if let Some(segment) = splitter.take_ready() {
                render_segment(&segment, &mut walker, &mut carry, &mut emit)?;
                segments += 1;
            }
            if splitter.len() > force_threshold {
                warn!(
                    "no paragraph boundary within {force_threshold} bytes; flushing {} buffered bytes",
                    splitter.len()
                );
                let segment = splitter.take_forced();
                render_segment(&segment, &mut walker, &mut carry, &mut emit)?;
                segments += 1;
            }

            if at_eof {
                break;
            }
            let n = read_chunk(&mut reader, &mut buf)?;
            at_eof = n == 0;
            chunk = &buf[..n];
        }

        if let Some(rest) = splitter.finish() {
            render_segment(&rest, &mut walker, &mut carry, &mut emit)?;
            segments += 1;
        }

        debug!("streamed {body_size} body bytes in {segments} segments");
        Ok(walker.finish(front_matter, self.options.excerpt_length))
    }
}

fn render_segment<F>(
    segment: &str,
    walker: &mut DocumentWalker,
    carry: &mut Carry,
    emit: &mut F,
) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    let tree = parse_markdown(segment)?;
    walker.walk(&tree.root);
    let (html, next) = sanitize_fragment(&tree.to_html(), *carry);
    *carry = next;
    emit(&html)
}

/// Open a markdown file and read its length
pub(crate) fn open_markdown(path: &Path) -> Result<(File, u64)> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            IngestError::FileNotFound(path.to_path_buf())
        } else {
            IngestError::Io(e)
        }
    })?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// First bytes of a file and the front matter found in them
struct Head {
    bytes: Vec<u8>,
    at_eof: bool,
    split: Option<HeadSplit>,
}

impl Head {
    fn read<R: Read>(reader: &mut R, limit: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        // One extra byte tells a full buffer apart from end of file
        reader
            .by_ref()
            .take(limit as u64 + 1)
            .read_to_end(&mut bytes)?;
        let at_eof = bytes.len() <= limit;
        let split = locate_front_matter_bytes(&bytes[..bytes.len().min(limit)], at_eof);
        Ok(Self {
            bytes,
            at_eof,
            split,
        })
    }

    fn body_offset(&self) -> usize {
        match self.split {
            Some(split) => split.body_offset,
            None => bom_length(&self.bytes),
        }
    }

    fn body(&self) -> &[u8] {
        &self.bytes[self.body_offset()..]
    }
}

/// Block that keeps blank lines from acting as boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    None,
    /// Fenced code opened under `quotes` blockquote markers, with its
    /// content starting at byte `indent` of the line
    Fence {
        marker: u8,
        len: usize,
        quotes: usize,
        indent: usize,
    },
    /// Raw HTML block closed by a line containing this marker
    Html(&'static str),
}

/// HTML blocks that run across blank lines, with their end markers
const RAW_HTML_BLOCKS: &[(&str, &str)] = &[
    ("<!--", "-->"),
    ("<?", "?>"),
    ("<![cdata[", "]]>"),
    ("<pre", "</pre>"),
    ("<script", "</script>"),
    ("<style", "</style>"),
    ("<textarea", "</textarea>"),
];

/// Accumulates decoded text and finds paragraph boundaries
///
/// Lines are classified once, as they complete, so the cost of a push is
/// proportional to the new text.
#[derive(Debug)]
pub struct SegmentSplitter {
    pending: String,
    /// Start of the first line not yet classified
    scanned: usize,
    /// Last safe cut position
    boundary: Option<usize>,
    /// Position just after the latest blank line, awaiting the next line
    after_blank: Option<usize>,
    block: OpenBlock,
}

impl SegmentSplitter {
    pub fn new() -> Self {
        Self {
            pending: String::new(),
            scanned: 0,
            boundary: None,
            after_blank: None,
            block: OpenBlock::None,
        }
    }

    /// Append decoded text
    pub fn push(&mut self, text: &str) {
        self.pending.push_str(text);
        self.scan();
    }

    /// Buffered bytes
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Text up to the last paragraph boundary, if one is known
    pub fn take_ready(&mut self) -> Option<String> {
        let cut = self.boundary.take()?;
        let segment: String = self.pending.drain(..cut).collect();
        self.scanned -= cut;
        self.after_blank = self.after_blank.map(|pos| pos - cut);
        Some(segment)
    }

    /// All complete lines, or everything when no line is complete
    pub fn take_forced(&mut self) -> String {
        let cut = if self.scanned > 0 {
            self.scanned
        } else {
            self.pending.len()
        };
        let segment: String = self.pending.drain(..cut).collect();
        self.scanned = 0;
        self.boundary = None;
        self.after_blank = None;
        segment
    }

    /// Whatever is left at end of input
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        self.scanned = 0;
        self.boundary = None;
        self.after_blank = None;
        Some(std::mem::take(&mut self.pending))
    }

    fn scan(&mut self) {
        while let Some(newline) = self.pending[self.scanned..].find('\n') {
            let start = self.scanned;
            let end = start + newline + 1;
            let line = &self.pending[start..start + newline];

            match self.block {
                OpenBlock::Fence {
                    marker,
                    len,
                    quotes,
                    indent,
                } => {
                    if closes_fence(line, marker, len, quotes, indent) {
                        self.block = OpenBlock::None;
                    }
                }
                OpenBlock::Html(end_marker) => {
                    if line.to_ascii_lowercase().contains(end_marker) {
                        self.block = OpenBlock::None;
                    }
                }
                OpenBlock::None => {
                    if line.trim().is_empty() {
                        self.after_blank = Some(end);
                    } else {
                        if let Some(pos) = self.after_blank.take()
                            && continues_block(line, true) == Some(false)
                        {
                            self.boundary = Some(pos);
                        }
                        self.block = opens_block(line);
                    }
                }
            }
            self.scanned = end;
        }

        // Decide on the line after a blank one as soon as its start is known
        if self.block == OpenBlock::None
            && let Some(pos) = self.after_blank
        {
            match continues_block(&self.pending[self.scanned..], false) {
                Some(true) => self.after_blank = None,
                Some(false) => {
                    self.boundary = Some(pos);
                    self.after_blank = None;
                }
                None => {}
            }
        }
    }
}

impl Default for SegmentSplitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a line following a blank line continues the previous block
///
/// Indented lines continue list items and indented code; list markers
/// continue a list. Returns `None` when a partial line is too short to tell.
fn continues_block(line: &str, complete: bool) -> Option<bool> {
    let undecided = if complete { Some(false) } else { None };
    let bytes = line.as_bytes();
    let Some(&first) = bytes.first() else {
        return undecided;
    };

    let after_marker = |pos: usize| match bytes.get(pos) {
        Some(b' ' | b'\t' | b'\r') => Some(true),
        Some(_) => Some(false),
        // A marker alone on a line is an empty list item
        None => complete.then_some(true),
    };

    match first {
        b' ' | b'\t' => Some(true),
        b'-' | b'*' | b'+' => after_marker(1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 {
                return Some(false);
            }
            match bytes.get(digits) {
                Some(b'.' | b')') => after_marker(digits + 1),
                Some(_) => Some(false),
                None => undecided,
            }
        }
        _ => Some(false),
    }
}

/// Strip up to three spaces of indentation; `None` for indented code
fn block_start(line: &str) -> Option<&str> {
    let indent = line.bytes().take_while(|&b| b == b' ').count();
    (indent <= 3).then(|| &line[indent..])
}

/// Skip blockquote and list item markers at the start of a line
///
/// Blocks opened inside a container (`- <!--`, `> ````) hold blank lines
/// just like top-level ones.
fn container_content(line: &str) -> &str {
    let mut rest = line;
    loop {
        let Some(start) = block_start(rest) else {
            return rest;
        };
        if let Some(inner) = start.strip_prefix('>') {
            rest = inner.strip_prefix(' ').unwrap_or(inner);
            continue;
        }
        let Some(marker) = list_marker_len(start) else {
            return rest;
        };
        let after = &start[marker..];
        let spaces = after.bytes().take_while(|&b| b == b' ').count();
        // Five or more spaces start indented code inside the item
        rest = if spaces > 4 { &after[1..] } else { &after[spaces..] };
    }
}

/// Length of a list item marker followed by a space or tab
fn list_marker_len(start: &str) -> Option<usize> {
    let bytes = start.as_bytes();
    let len = match bytes.first()? {
        b'-' | b'*' | b'+' => 1,
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(digits) {
                Some(b'.' | b')') if digits <= 9 => digits + 1,
                _ => return None,
            }
        }
        _ => return None,
    };
    matches!(bytes.get(len), Some(b' ' | b'\t')).then_some(len)
}

fn opens_block(line: &str) -> OpenBlock {
    let content = container_content(line);
    let Some(start) = block_start(content) else {
        return OpenBlock::None;
    };

    let marker = start.as_bytes().first().copied();
    if let Some(marker @ (b'`' | b'~')) = marker {
        let len = start.bytes().take_while(|&b| b == marker).count();
        let info = &start[len..];
        if len >= 3 && !(marker == b'`' && info.contains('`')) {
            let prefix = &line[..line.len() - start.len()];
            return OpenBlock::Fence {
                marker,
                len,
                quotes: prefix.matches('>').count(),
                indent: prefix.len(),
            };
        }
        return OpenBlock::None;
    }

    if marker != Some(b'<') {
        return OpenBlock::None;
    }
    let lower = start.to_ascii_lowercase();
    for &(open, close) in RAW_HTML_BLOCKS {
        let Some(rest) = lower.strip_prefix(open) else {
            continue;
        };
        let is_tag = open.chars().nth(1).is_some_and(|c| c.is_ascii_alphabetic());
        if is_tag && !rest.is_empty() && !rest.starts_with([' ', '\t', '>', '\r']) {
            continue;
        }
        if rest.contains(close) {
            return OpenBlock::None;
        }
        return OpenBlock::Html(close);
    }
    OpenBlock::None
}

/// Whether `line` closes a fence opened by [`opens_block`]
fn closes_fence(line: &str, marker: u8, len: usize, quotes: usize, indent: usize) -> bool {
    let mut rest = line;
    for _ in 0..quotes {
        match rest.trim_start_matches(' ').strip_prefix('>') {
            Some(inner) => rest = inner,
            None => break,
        }
    }
    let spaces = rest.bytes().take_while(|&b| b == b' ').count();
    if spaces > indent + 3 {
        return false;
    }
    let start = &rest[spaces..];
    let run = start.bytes().take_while(|&b| b == marker).count();
    run >= len && start[run..].trim().is_empty()
}
