//! Security validation tests
//!
//! This suite checks that untrusted markdown cannot smuggle script into the
//! rendered HTML and that the resource limits reject hostile documents
//! before any expensive work is done.

use markdown_ingest::limits::{IngestOptions, Limits};
use markdown_ingest::sanitizer::{sanitize_html, sanitize_url};
use markdown_ingest::{IngestError, MarkdownIngestor};
use proptest::prelude::*;

/// Ingestor that skips the pre-parse pattern gate, so the sanitizer alone
/// has to make the output safe
fn trusted() -> MarkdownIngestor {
    MarkdownIngestor::new().with_options(IngestOptions::new().trusted())
}

/// Test that script tags are removed together with their content
#[test]
fn test_xss_script_tag_removal() {
    let markdown = "Before dangerous element\n\n<script>alert('xss')</script>\n\nAfter dangerous element";

    let rendered = trusted().render(markdown).expect("Failed to render");

    assert!(!rendered.html.contains("<script"));
    assert!(!rendered.html.contains("alert"));
    assert!(rendered.html.contains("Before dangerous element"));
    assert!(rendered.html.contains("After dangerous element"));
}

/// Test that inline script tags inside a paragraph are removed
#[test]
fn test_xss_inline_script_removal() {
    let rendered = trusted()
        .render("Text <script>malicious()</script> more text")
        .expect("Failed to render");

    assert!(!rendered.html.contains("script"));
    assert!(!rendered.html.contains("malicious"));
    assert!(rendered.html.contains("Text"));
    assert!(rendered.html.contains("more text"));
}

/// Test that event handler attributes are removed from raw HTML
#[test]
fn test_xss_event_handler_removal() {
    let markdown = r#"<div onload="malicious()">Content</div>

Inline <span onmouseover="attack()">hover</span> and <a href="test.html" onclick="x()">Link</a>"#;

    let rendered = trusted().render(markdown).expect("Failed to render");

    assert!(!rendered.html.contains("onload"));
    assert!(!rendered.html.contains("onmouseover"));
    assert!(!rendered.html.contains("onclick"));
    assert!(!rendered.html.contains("malicious"));
    assert!(!rendered.html.contains("attack"));
    assert!(rendered.html.contains("Content"));
    assert!(rendered.html.contains(r#"<a href="test.html">Link</a>"#));
}

/// Test that markdown links with script URLs are neutralised
#[test]
fn test_xss_javascript_link_neutralised() {
    let cases = [
        "[click](javascript:alert(1))",
        "[click](JavaScript:alert(1))",
        "[click](&#106;avascript:alert(1))",
        "[click](vbscript:msgbox(1))",
        "[click](data:text/html;base64,PHNjcmlwdD4=)",
    ];

    for markdown in cases {
        let rendered = trusted().render(markdown).expect("Failed to render");
        assert!(
            rendered.html.contains(r##"<a href="#">click</a>"##),
            "{markdown} rendered as {}",
            rendered.html
        );
    }
}

/// Test that image sources are sanitised like links
#[test]
fn test_xss_image_source_neutralised() {
    let rendered = trusted()
        .render("![pic](javascript:alert(1))")
        .expect("Failed to render");
    assert!(rendered.html.contains(r##"src="#""##));
    assert!(!rendered.html.to_lowercase().contains("javascript"));
}

/// Test that script URL variants are all mapped to `#`
#[test]
fn test_url_variants_blocked() {
    let variants = [
        "javascript:alert(1)",
        "JAVASCRIPT:alert(1)",
        " javascript:alert(1)",
        "java\nscript:alert(1)",
        "java\u{0}script:alert(1)",
        "&#x6A;avascript:alert(1)",
        "&#106;&#97;vascript:alert(1)",
        "vbscript:msgbox(1)",
        "data:text/html,<script>alert(1)</script>",
        "file:///etc/passwd",
        "gopher://example.com",
        "1http://example.com",
    ];
    for url in variants {
        assert_eq!(sanitize_url(url), "#", "{url:?} was not blocked");
    }
}

/// Test that safe URLs pass through unchanged
#[test]
fn test_safe_urls_preserved() {
    let safe = [
        "https://example.com/a?b=c#d",
        "http://example.com",
        "mailto:someone@example.com",
        "ftp://files.example.com/pub",
        "/absolute/path",
        "#section",
        "?query=1",
        "relative/page.html",
        "page.html?next=/a:b",
    ];
    for url in safe {
        assert_eq!(sanitize_url(url), url);
    }
}

/// Test that embedding and form elements lose their markup
#[test]
fn test_dangerous_elements_removed() {
    let html = r#"<iframe src="https://evil.example"></iframe><object data="x.swf"></object><embed src="x"><form action="/steal"><input name="pw"><button>Go</button></form><p>Safe</p>"#;

    let sanitized = sanitize_html(html);

    for tag in ["<iframe", "<object", "<embed", "<form", "<input", "<button"] {
        assert!(!sanitized.contains(tag), "{tag} survived: {sanitized}");
    }
    assert!(sanitized.contains("Go"));
    assert!(sanitized.contains("<p>Safe</p>"));
}

/// Test that style blocks and meta refreshes are removed
#[test]
fn test_style_and_meta_removed() {
    let html = r#"<meta http-equiv="refresh" content="0;url=https://evil.example"><style>body { background: url(javascript:x) }</style><p>Text</p>"#;
    assert_eq!(sanitize_html(html), "<p>Text</p>");
}

/// Test that SVG payloads do not survive
#[test]
fn test_svg_payload_removed() {
    let sanitized = sanitize_html(r#"<svg onload="alert(1)"><circle r="1"/></svg><p>ok</p>"#);
    assert!(!sanitized.contains("svg"));
    assert!(!sanitized.contains("onload"));
    assert!(!sanitized.contains("alert"));
    assert!(sanitized.contains("<p>ok</p>"));
}

/// Test that a whitelisted table passes the sanitizer verbatim
#[test]
fn test_whitelisted_table_preserved() {
    let html = "<table><thead><tr><th>Name</th><th>Value</th></tr></thead><tbody>\n<tr><td>a</td><td>1</td></tr>\n</tbody></table>\n";
    assert_eq!(sanitize_html(html), html);
}

/// Test that the dangerous pattern gate rejects bodies before parsing
#[test]
fn test_dangerous_patterns_rejected() {
    let ingestor = MarkdownIngestor::new();
    let cases = [
        ("<script>alert(1)</script>", "<script"),
        ("[x](javascript:alert(1))", "javascript:"),
        ("<img src=x onerror=alert(1)>", "onerror="),
        ("<b onmouseover=go()>hover</b>", "onmouseover="),
    ];

    for (markdown, pattern) in cases {
        match ingestor.parse(markdown) {
            Err(IngestError::DangerousContent {
                pattern: found,
                location,
            }) => {
                assert_eq!(found, pattern);
                assert_eq!(location, "markdown body");
            }
            other => panic!("{markdown:?} was not rejected: {other:?}"),
        }
    }
}

/// Test that rejection messages never echo the payload
#[test]
fn test_error_messages_do_not_echo_payload() {
    let err = MarkdownIngestor::new()
        .parse("harmless prefix <script>steal_cookies()</script>")
        .unwrap_err();
    let message = err.to_string();
    assert!(!message.contains("steal_cookies"));
    assert!(!message.contains("harmless prefix"));
}

/// Test that dangerous front matter strings are rejected
#[test]
fn test_front_matter_blacklist() {
    let ingestor = MarkdownIngestor::new();
    let cases = [
        "---\ntitle: \"<script>alert(1)</script>\"\n---\nBody",
        "---\nlink: javascript:alert(1)\n---\nBody",
        "---\nnested:\n  deep:\n    - file:///etc/passwd\n---\nBody",
    ];
    for markdown in cases {
        let err = ingestor.parse(markdown).unwrap_err();
        match err {
            IngestError::DangerousContent { location, .. } => assert_eq!(location, "front matter"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

/// Test that long structural runs are rejected
#[test]
fn test_repetition_limit() {
    let ingestor = MarkdownIngestor::new();

    assert!(ingestor.parse(&"-".repeat(1000)).is_ok());

    let err = ingestor.parse(&"-".repeat(1001)).unwrap_err();
    assert!(matches!(
        err,
        IngestError::ExcessiveRepetition {
            character: '-',
            limit: 1000
        }
    ));
}

/// Test that deeply nested quotes are rejected
#[test]
fn test_blockquote_nesting_limit() {
    let ingestor = MarkdownIngestor::new();

    let ok = format!("{} quote", ">".repeat(20));
    assert!(ingestor.parse(&ok).is_ok());

    let too_deep = format!("{} quote", ">".repeat(21));
    assert!(matches!(
        ingestor.parse(&too_deep),
        Err(IngestError::ExcessiveNesting { .. })
    ));
}

/// Test that the body size limit is enforced
#[test]
fn test_content_size_limit() {
    let ingestor = MarkdownIngestor::with_limits(Limits::default().with_max_markdown_file_size(64));
    assert!(ingestor.parse(&"a".repeat(64)).is_ok());
    assert!(matches!(
        ingestor.parse(&"a".repeat(65)),
        Err(IngestError::ContentTooLarge {
            size: 65,
            limit: 64
        })
    ));
}

/// Test that every security rejection is classified as such
#[test]
fn test_rejections_are_security_errors() {
    let ingestor = MarkdownIngestor::new();
    let hostile = [
        "<script>x</script>".to_string(),
        "=".repeat(1001),
        ">".repeat(30),
    ];
    for markdown in hostile {
        let err = ingestor.parse(&markdown).unwrap_err();
        assert!(err.is_security_rejection(), "{err:?}");
    }
}

/// Fragments commonly found in XSS payloads
fn xss_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("<script>alert(1)</script>".to_string()),
        Just("<SCRIPT SRC=//evil.example/x.js></SCRIPT>".to_string()),
        Just("<img src=x onerror=alert(1)>".to_string()),
        Just("<a href=\"javascript:alert(1)\">x</a>".to_string()),
        Just("<iframe src=\"javascript:alert(1)\"></iframe>".to_string()),
        Just("<svg/onload=alert(1)>".to_string()),
        Just("<div style=\"background:url(javascript:x)\">".to_string()),
        Just("<scr<script>ipt>alert(1)</script>".to_string()),
        "[a-z <>/=\"']{0,20}",
    ]
}

proptest! {
    /// Sanitized output never contains a script tag
    #[test]
    fn prop_no_script_after_sanitizing(parts in prop::collection::vec(xss_fragment(), 1..6)) {
        let sanitized = sanitize_html(&parts.concat()).to_lowercase();
        prop_assert!(!sanitized.contains("<script"));
        prop_assert!(!sanitized.contains("javascript:"));
    }

    /// Sanitizing twice gives the same result as sanitizing once
    #[test]
    fn prop_sanitize_is_idempotent(parts in prop::collection::vec(xss_fragment(), 1..6)) {
        let once = sanitize_html(&parts.concat());
        prop_assert_eq!(sanitize_html(&once), once);
    }

    /// Rendering never produces script tags, whatever markdown comes in
    #[test]
    fn prop_render_never_emits_script(body in "[a-z#>*\\-\\[\\]()<>/ \n]{0,200}") {
        if let Ok(rendered) = trusted().render(&body) {
            prop_assert!(!rendered.html.to_lowercase().contains("<script"));
        }
    }
}
