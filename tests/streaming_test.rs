//! Tests for chunked ingestion of markdown files
//!
//! Most tests shrink `max_front_matter_size` so the head buffer is small and
//! the body really arrives in several chunks.

use std::io::{Cursor, Write};

use markdown_ingest::limits::{IngestOptions, Limits};
use markdown_ingest::{ContentElement, IngestError, MarkdownIngestor};
use tempfile::NamedTempFile;

const REPRESENTATIVE: &str = r#"---
title: Stream
---
# Streaming

First paragraph of text.

```rust
fn a() {}

fn b() {}
```

- one
- two

> A quote that
> spans two lines.

<!--
hidden

-->

| a | b |
|---|---|
| 1 | 2 |

1. first

2. second

Last [link](https://example.com).
"#;

fn write_temp(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

fn small_head_limits() -> Limits {
    Limits::default().with_max_front_matter_size(64)
}

fn streaming_ingestor(limits: Limits, chunk_size: usize) -> MarkdownIngestor {
    MarkdownIngestor::with_limits(limits).with_options(
        IngestOptions::new()
            .with_eager_threshold(0)
            .with_chunk_size(chunk_size),
    )
}

/// Test that streaming produces the same document and HTML as eager parsing
#[test]
fn test_streaming_matches_eager() {
    let file = write_temp(REPRESENTATIVE.as_bytes());
    let eager = MarkdownIngestor::with_limits(small_head_limits())
        .render(REPRESENTATIVE)
        .expect("eager render");

    for chunk_size in [64, 100, 256, 4096] {
        let streamed = streaming_ingestor(small_head_limits(), chunk_size)
            .render_file(file.path())
            .expect("streaming render");
        assert_eq!(streamed.html, eager.html, "chunk size {chunk_size}");
        assert_eq!(streamed.document, eager.document, "chunk size {chunk_size}");
        assert_eq!(streamed.fingerprint, eager.fingerprint);
    }
}

/// Test that files under the eager threshold give the same result as streaming
#[test]
fn test_render_file_paths_agree() {
    let file = write_temp(REPRESENTATIVE.as_bytes());

    let eager = MarkdownIngestor::new()
        .render_file(file.path())
        .expect("eager file render");
    let streamed = MarkdownIngestor::new()
        .with_options(IngestOptions::new().with_eager_threshold(0))
        .render_file(file.path())
        .expect("streaming file render");

    assert_eq!(streamed, eager);
    assert_eq!(eager.document.title(), Some("Stream"));
}

/// Test that writing to a sink gives the same HTML as collecting it
#[test]
fn test_render_to_sink() {
    let file = write_temp(REPRESENTATIVE.as_bytes());
    let ingestor = streaming_ingestor(small_head_limits(), 64);

    let mut sink = Vec::new();
    let document = ingestor
        .streaming()
        .render_to(file.path(), &mut sink)
        .expect("render to sink");
    let rendered = ingestor.render_file(file.path()).expect("render file");

    assert_eq!(String::from_utf8(sink).expect("utf-8 output"), rendered.html);
    assert_eq!(document, rendered.document);
}

/// Test rendering from an in-memory reader
#[test]
fn test_render_reader() {
    let ingestor = streaming_ingestor(small_head_limits(), 64);
    let mut sink = Vec::new();
    let document = ingestor
        .streaming()
        .render_reader(Cursor::new(REPRESENTATIVE.as_bytes()), &mut sink)
        .expect("render reader");

    assert_eq!(document.headings[0].text, "Streaming");
    assert!(!sink.is_empty());
}

/// Test that multi-byte characters split across chunks decode correctly
#[test]
fn test_multibyte_characters_across_chunks() {
    let line = "日本語のテキスト".repeat(20);
    let content = format!("---\ntitle: 日本\n---\n{line}");
    let file = write_temp(content.as_bytes());

    for chunk_size in 1..=8 {
        let rendered = streaming_ingestor(Limits::default().with_max_front_matter_size(32), chunk_size)
            .render_file(file.path())
            .expect("streaming render");

        assert_eq!(rendered.document.title(), Some("日本"));
        let text: String = rendered
            .document
            .elements
            .iter()
            .filter_map(|element| match element {
                ContentElement::Paragraph { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, line, "chunk size {chunk_size}");
    }
}

/// Test that invalid UTF-8 reports the absolute file offset
#[test]
fn test_invalid_utf8_offset() {
    let mut content = b"# Title\n\n".to_vec();
    content.extend(std::iter::repeat_n(b'a', 300));
    content.push(0xFF);
    let file = write_temp(&content);

    for limits in [Limits::default(), small_head_limits()] {
        let err = streaming_ingestor(limits, 16)
            .render_file(file.path())
            .unwrap_err();
        assert!(
            matches!(err, IngestError::InvalidEncoding { offset: 309 }),
            "{err:?}"
        );
    }
}

/// Test that a truncated character at end of file is rejected
#[test]
fn test_truncated_character_at_eof() {
    let mut content = "Text ".repeat(40).into_bytes();
    content.extend_from_slice(&[0xE6, 0x97]);
    let file = write_temp(&content);

    let err = streaming_ingestor(small_head_limits(), 16)
        .render_file(file.path())
        .unwrap_err();
    assert!(
        matches!(err, IngestError::InvalidEncoding { offset } if (200..202).contains(&offset)),
        "{err:?}"
    );
}

/// Test that dangerous patterns split across chunks are still found
#[test]
fn test_dangerous_pattern_across_chunks() {
    let content = format!("{}<script>alert(1)</script>\n", "safe text ".repeat(20));
    let file = write_temp(content.as_bytes());

    for chunk_size in [3, 5, 7] {
        let err = streaming_ingestor(small_head_limits(), chunk_size)
            .render_file(file.path())
            .unwrap_err();
        assert!(matches!(err, IngestError::DangerousContent { pattern: "<script", .. }));
    }
}

/// Test that repetition runs are counted across chunks
#[test]
fn test_repetition_across_chunks() {
    let content = format!("Intro\n\n{}\n", "=".repeat(1001));
    let file = write_temp(content.as_bytes());

    let err = streaming_ingestor(small_head_limits(), 10)
        .render_file(file.path())
        .unwrap_err();
    assert!(matches!(err, IngestError::ExcessiveRepetition { character: '=', .. }));
}

/// Test that the size gate uses file metadata
#[test]
fn test_size_limit_from_metadata() {
    let file = write_temp("word ".repeat(200).as_bytes());
    let limits = Limits::default().with_max_markdown_file_size(100);

    let err = streaming_ingestor(limits, 64)
        .render_file(file.path())
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::ContentTooLarge {
            size: 1000,
            limit: 100
        }
    ));
}

/// Test that invalid front matter fails the streaming path too
#[test]
fn test_streaming_front_matter_validation() {
    let file = write_temp(b"---\nlink: javascript:alert(1)\n---\nBody\n");
    let err = streaming_ingestor(Limits::default(), 64)
        .render_file(file.path())
        .unwrap_err();
    assert!(matches!(err, IngestError::DangerousContent { location: "front matter", .. }));

    let file = write_temp(b"---\ntitle: [broken\n---\nBody\n");
    let err = streaming_ingestor(Limits::default(), 64)
        .render_file(file.path())
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidFrontMatter(_)));
}

/// Test that a missing file is reported on every streaming entry point
#[test]
fn test_missing_file() {
    let ingestor = streaming_ingestor(Limits::default(), 64);
    let path = std::path::Path::new("/nonexistent/large.md");

    assert!(matches!(ingestor.render_file(path), Err(IngestError::FileNotFound(_))));
    assert!(matches!(ingestor.read_summary(path), Err(IngestError::FileNotFound(_))));
}

/// Test metadata-only reads
#[test]
fn test_read_summary() {
    let mut content = String::from("---\ntitle: Big\ntags: [a, b]\n---\n");
    let body_offset = content.len() as u64;
    content.push_str("# Heading\n\nOpening paragraph for the listing page.\n\n");
    for i in 0..2000 {
        content.push_str(&format!("Paragraph {i} of filler text.\n\n"));
    }
    let file = write_temp(content.as_bytes());

    let summary = MarkdownIngestor::new()
        .read_summary(file.path())
        .expect("read summary");

    assert_eq!(summary.body_offset, body_offset);
    let front_matter = summary.front_matter.expect("front matter");
    assert_eq!(front_matter["title"].as_str(), Some("Big"));
    assert_eq!(
        summary.excerpt.as_deref(),
        Some("Opening paragraph for the listing page.")
    );
}

/// Test that the front matter excerpt wins in metadata mode
#[test]
fn test_read_summary_front_matter_excerpt() {
    let file = write_temp(b"---\nexcerpt: Declared summary\n---\nBody paragraph.\n");
    let summary = MarkdownIngestor::new()
        .read_summary(file.path())
        .expect("read summary");
    assert_eq!(summary.excerpt.as_deref(), Some("Declared summary"));
}

/// Test that the excerpt window is bounded by the excerpt length
#[test]
fn test_read_summary_truncates_excerpt() {
    let file = write_temp(format!("{}\n", "longword ".repeat(100)).as_bytes());
    let summary = MarkdownIngestor::new()
        .with_options(IngestOptions::new().with_excerpt_length(30))
        .read_summary(file.path())
        .expect("read summary");

    let excerpt = summary.excerpt.expect("excerpt");
    assert!(excerpt.chars().count() <= 30);
    assert!(excerpt.ends_with('…'));
}

/// Test that an unterminated block at the start is treated as body text
#[test]
fn test_unterminated_front_matter_is_body() {
    let file = write_temp(b"---\nnot: closed\n\nBody paragraph.\n");
    let summary = MarkdownIngestor::new()
        .read_summary(file.path())
        .expect("read summary");

    assert!(summary.front_matter.is_none());
    assert_eq!(summary.body_offset, 0);
}

/// Test that a byte order mark is skipped in streaming mode
#[test]
fn test_bom_in_streaming_mode() {
    let file = write_temp(b"\xEF\xBB\xBF---\ntitle: Bom\n---\nText.\n");
    let rendered = streaming_ingestor(Limits::default(), 64)
        .render_file(file.path())
        .expect("streaming render");

    assert_eq!(rendered.document.title(), Some("Bom"));
    assert_eq!(rendered.html, "<p>Text.</p>\n");
}

/// Test that a paragraph with no boundary is flushed in pieces without loss
#[test]
fn test_forced_flush_keeps_all_text() {
    let words: Vec<String> = (0..200).map(|i| format!("w{i}")).collect();
    let content = words.join("\n");
    let file = write_temp(content.as_bytes());

    let rendered = streaming_ingestor(small_head_limits(), 32)
        .render_file(file.path())
        .expect("streaming render");

    let text: Vec<String> = rendered
        .document
        .elements
        .iter()
        .filter_map(|element| match element {
            ContentElement::Paragraph { text } => Some(text.clone()),
            _ => None,
        })
        .collect();
    let seen: Vec<&str> = text.iter().flat_map(|t| t.split_whitespace()).collect();
    assert_eq!(seen, words.iter().map(String::as_str).collect::<Vec<_>>());
}

/// Test that a comment opened in a list item hides the same text in both modes
#[test]
fn test_comment_in_list_item_matches_eager() {
    let content = "Intro.\n\n- <!--\n\nhidden\n-->\n\nAfter.\n";
    let file = write_temp(content.as_bytes());
    let eager = MarkdownIngestor::new().render(content).expect("eager render");

    for chunk_size in [4, 8, 64] {
        let streamed = streaming_ingestor(small_head_limits(), chunk_size)
            .render_file(file.path())
            .expect("streaming render");
        assert_eq!(streamed.html, eager.html, "chunk size {chunk_size}");
        assert_eq!(streamed.document, eager.document, "chunk size {chunk_size}");
    }
    assert!(!eager.html.contains("After."));
}

/// Test that a fenced block inside a list item keeps its blank lines
#[test]
fn test_fence_in_list_item_matches_eager() {
    let content = "Intro.\n\n- ```\n  one\n\n  two\n  ```\n\nAfter.\n";
    let file = write_temp(content.as_bytes());
    let eager = MarkdownIngestor::new().render(content).expect("eager render");

    let streamed = streaming_ingestor(small_head_limits(), 8)
        .render_file(file.path())
        .expect("streaming render");
    assert_eq!(streamed.html, eager.html);
    assert_eq!(streamed.document, eager.document);
}

/// Test that invalid limits are rejected before any input is read
#[test]
fn test_streaming_rejects_invalid_limits() {
    let ingestor = MarkdownIngestor::with_limits(Limits::default().with_max_front_matter_depth(0))
        .with_options(IngestOptions::new().with_eager_threshold(0));

    assert!(matches!(
        ingestor.parse("plain"),
        Err(IngestError::InvalidConfiguration(_))
    ));
    let mut sink = Vec::new();
    assert!(matches!(
        ingestor
            .streaming()
            .render_reader(Cursor::new(b"plain".as_slice()), &mut sink),
        Err(IngestError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        ingestor
            .streaming()
            .read_summary_from(Cursor::new(b"plain".as_slice())),
        Err(IngestError::InvalidConfiguration(_))
    ));
    assert!(sink.is_empty());
}

/// Test that a multi-byte first paragraph gives the eager excerpt
#[test]
fn test_read_summary_multibyte_excerpt_matches_eager() {
    let content = "日本語の文章".repeat(100);
    let file = write_temp(content.as_bytes());
    let ingestor = MarkdownIngestor::new();

    let summary = ingestor.read_summary(file.path()).expect("read summary");
    let eager = ingestor.parse(&content).expect("eager parse");

    assert_eq!(summary.excerpt, eager.excerpt);
    assert!(summary.excerpt.expect("excerpt").ends_with('…'));
}

/// Test that a long heading before the first paragraph does not hide the cut
#[test]
fn test_read_summary_window_after_long_heading() {
    let options = IngestOptions::new().with_excerpt_length(20);
    let ingestor = MarkdownIngestor::new().with_options(options);

    // The window reaches far enough into the paragraph to decide the excerpt
    let content = format!("# {}\n\n{}", "H".repeat(100), "word ".repeat(100));
    let file = write_temp(content.as_bytes());
    let summary = ingestor.read_summary(file.path()).expect("read summary");
    let eager = ingestor.parse(&content).expect("eager parse");
    assert_eq!(summary.excerpt, eager.excerpt);

    // The window ends a few bytes into the paragraph
    let content = format!("# {}\n\n{}", "H".repeat(150), "word ".repeat(100));
    let file = write_temp(content.as_bytes());
    let summary = ingestor.read_summary(file.path()).expect("read summary");
    assert_eq!(summary.excerpt.as_deref(), Some("word…"));
}
