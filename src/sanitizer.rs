//! Whitelist HTML sanitizer for rendered markdown
//!
//! This module turns rendered HTML into markup that is safe to embed in a
//! page. It runs html5ever's tokenizer over the input and re-serialises only
//! what the whitelist allows, so every decision is made on tag, attribute and
//! text events rather than on pattern replacement over raw markup.
//!
//! # Threat Model
//!
//! Markdown permits raw HTML, so the rendered output can carry anything an
//! author typed:
//! - Script and style blocks
//! - Event handler attributes (`onclick`, `onerror`, ...)
//! - Script URLs, including entity-encoded ones (`&#106;avascript:`)
//! - Embedding and form elements (`iframe`, `object`, `form`, ...)
//!
//! # Defense Layers
//!
//! 1. **Raw-content elements**: `script` and `style` are removed together
//!    with their content
//! 2. **Meta and dangerous elements**: `meta` and [`DANGEROUS_ELEMENTS`]
//!    lose their markup; text between them is kept as inert text
//! 3. **Tag whitelist**: tags outside [`ALLOWED_TAGS`] lose their markup
//! 4. **Attribute whitelist**: per tag, see [`allowed_attributes`]
//! 5. **URL sanitization**: `href`, `src` and `cite` values pass through
//!    [`sanitize_url`]
//! 6. **Residual sweep**: event handler attributes, `javascript:` and
//!    `data:…script…,` payloads are neutralised in the serialised output
//!
//! Comments, doctypes and processing instructions are dropped. Text and
//! attribute values are re-escaped on output, which makes the sanitizer
//! idempotent: `sanitize_html(&sanitize_html(x)) == sanitize_html(x)`.
//!
//! # Examples
//!
//! ```rust
//! use markdown_ingest::sanitizer::sanitize_html;
//!
//! let html = r#"<p onclick="x()">Hi <script>alert(1)</script><a href="javascript:go()">link</a></p>"#;
//! assert_eq!(sanitize_html(html), r##"<p>Hi <a href="#">link</a></p>"##);
//! ```

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::sync::OnceLock;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::TokenizerResult;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use regex::Regex;

/// Elements removed together with their content
const RAW_CONTENT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements whose markup is removed; their text content is kept as text
pub const DANGEROUS_ELEMENTS: &[&str] = &[
    "iframe",   // Can load external content
    "embed",    // Can execute plugins
    "object",   // Can execute plugins
    "link",     // Can load external stylesheets
    "svg",      // Script and event handlers in foreign content
    "math",     // Foreign content parsing differentials
    "form",     // Credential phishing
    "input",    // Form controls
    "button",   // Form controls
    "select",   // Form controls
    "textarea", // Form controls
];

/// Tags that survive sanitization
pub const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl", "dt", "dd", "a",
    "em", "strong", "i", "b", "u", "s", "strike", "code", "pre", "blockquote", "cite", "q",
    "table", "thead", "tbody", "tr", "td", "th", "img", "figure", "figcaption", "caption", "div",
    "span", "article", "section", "nav", "aside", "header", "footer", "main", "address",
];

/// Allowed tags that never have content
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img"];

/// Attributes holding URLs
const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

/// Schemes rejected before any other URL check
const BLOCKED_URL_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:", "file:"];

/// Schemes allowed for absolute URLs
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto", "ftp", "ftps"];

/// Replacement for rejected URLs
const BLOCKED_URL: &str = "#";

/// Attributes allowed on a tag
///
/// Tags without an entry lose every attribute.
///
/// # Examples
///
/// ```
/// use markdown_ingest::sanitizer::allowed_attributes;
///
/// assert!(allowed_attributes("a").contains(&"href"));
/// assert!(allowed_attributes("p").is_empty());
/// ```
pub fn allowed_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "title", "rel", "target"],
        "img" => &["src", "alt", "width", "height", "title"],
        "blockquote" | "q" => &["cite"],
        "td" | "th" => &["colspan", "rowspan", "scope"],
        "ol" => &["start"],
        "code" => &["class"],
        _ => &[],
    }
}

/// Check whether a tag survives sanitization
pub fn is_allowed_tag(tag: &str) -> bool {
    ALLOWED_TAGS.contains(&tag)
}

/// Sanitize a URL attribute value
///
/// The value is entity-decoded (again, to catch double encoding), stripped
/// of whitespace and control characters and lowercased before checking.
/// Safe values are returned unchanged; unsafe ones become `#`.
///
/// # Examples
///
/// ```
/// use markdown_ingest::sanitizer::sanitize_url;
///
/// assert_eq!(sanitize_url("javascript:alert(1)"), "#");
/// assert_eq!(sanitize_url("&#106;avascript:alert(1)"), "#");
/// assert_eq!(sanitize_url("java\tscript:alert(1)"), "#");
/// assert_eq!(sanitize_url("/docs/intro"), "/docs/intro");
/// assert_eq!(sanitize_url("https://example.com"), "https://example.com");
/// assert_eq!(sanitize_url("gopher://example.com"), "#");
/// ```
pub fn sanitize_url(value: &str) -> Cow<'_, str> {
    if is_safe_url(value) {
        Cow::Borrowed(value)
    } else {
        Cow::Borrowed(BLOCKED_URL)
    }
}

fn is_safe_url(value: &str) -> bool {
    let normalized: String = decode_entities(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();

    if BLOCKED_URL_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
    {
        return false;
    }

    if normalized.starts_with(['/', '#', '?']) {
        return true;
    }

    let Some(colon) = normalized.find(':') else {
        return true;
    };
    let candidate = &normalized[..colon];
    if candidate.contains(['/', '?', '#']) {
        // The colon belongs to a path, query or fragment
        return true;
    }

    let mut chars = candidate.chars();
    let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    valid_scheme && ALLOWED_URL_SCHEMES.contains(&candidate)
}

/// Decode numeric character references and a few named entities
///
/// Used only for URL checks, on values the tokenizer has already decoded
/// once. Unknown or malformed references are left as they are.
fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match decode_reference(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode one reference at the start of `s`, returning the character and
/// the number of bytes consumed
fn decode_reference(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix('&')?;

    if let Some(numeric) = body.strip_prefix('#') {
        let (digits, radix, prefix_len) = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 3),
            None => (numeric, 10, 2),
        };
        let len = digits
            .find(|c: char| !c.is_digit(radix))
            .unwrap_or(digits.len());
        if len == 0 || len > 8 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..len], radix).ok()?;
        let c = char::from_u32(code)?;
        let semicolon = usize::from(digits[len..].starts_with(';'));
        return Some((c, prefix_len + len + semicolon));
    }

    const NAMED: &[(&str, char)] = &[
        ("amp;", '&'),
        ("lt;", '<'),
        ("gt;", '>'),
        ("quot;", '"'),
        ("apos;", '\''),
        ("colon;", ':'),
        ("tab;", '\t'),
        ("newline;", '\n'),
        ("sol;", '/'),
        ("lpar;", '('),
        ("rpar;", ')'),
    ];
    NAMED.iter().find_map(|(name, c)| {
        let candidate = body.get(..name.len())?;
        candidate
            .eq_ignore_ascii_case(name)
            .then_some((*c, 1 + name.len()))
    })
}

/// Sanitize rendered HTML
///
/// # Arguments
///
/// * `html` - HTML produced by the markdown renderer (possibly containing
///   author-supplied raw HTML)
///
/// # Returns
///
/// Markup containing only whitelisted tags, attributes and URL schemes.
pub fn sanitize_html(html: &str) -> String {
    sanitize_fragment(html, Carry::Closed).0
}

/// Tokenizer state left open at the end of a fragment
///
/// An unterminated comment or `script`/`style` element swallows everything
/// after it. When HTML arrives in pieces, the next piece must start in the
/// same state to give the output a single document would.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Carry {
    #[default]
    Closed,
    Comment,
    RawContent(&'static str),
}

impl Carry {
    /// Markup that reopens this state
    fn reopen(self) -> &'static str {
        match self {
            Carry::Closed => "",
            Carry::Comment => "<!--",
            Carry::RawContent("style") => "<style>",
            Carry::RawContent(_) => "<script>",
        }
    }
}

/// Sanitize one piece of a larger HTML document
///
/// `carry` is the state the previous piece ended in; the returned state is
/// passed to the next piece.
///
/// # Examples
///
/// ```rust
/// use markdown_ingest::sanitizer::{Carry, sanitize_fragment};
///
/// let (first, carry) = sanitize_fragment("<p>a</p><!-- open", Carry::Closed);
/// assert_eq!(first, "<p>a</p>");
/// assert_eq!(carry, Carry::Comment);
///
/// let (second, carry) = sanitize_fragment("still hidden --><p>b</p>", carry);
/// assert_eq!(second, "<p>b</p>");
/// assert_eq!(carry, Carry::Closed);
/// ```
pub fn sanitize_fragment(html: &str, carry: Carry) -> (String, Carry) {
    if html.is_empty() {
        return (String::new(), carry);
    }

    let sink = SanitizingSink::new(html.len());
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    let input = BufferQueue::default();
    let reopen = carry.reopen();
    if !reopen.is_empty() {
        input.push_back(StrTendril::from_slice(reopen));
    }
    input.push_back(StrTendril::from_slice(html));
    // The sink never returns `TokenSinkResult::Script`, so feeding always
    // consumes the whole queue
    match tokenizer.feed(&input) {
        TokenizerResult::Done => {}
        TokenizerResult::Script(()) => log::warn!("sanitizer tokenizer paused on a script"),
    }

    let open_raw = tokenizer.sink.skip_until.get();
    tokenizer.sink.at_end.set(true);
    tokenizer.end();

    let next = match open_raw {
        Some(raw) => Carry::RawContent(raw),
        None if tokenizer.sink.comment_at_end.get() => Carry::Comment,
        None => Carry::Closed,
    };

    let removed = tokenizer.sink.removed.get();
    if removed > 0 {
        log::debug!("sanitizer removed {removed} tags or attributes");
    }

    let filtered = tokenizer.sink.output.take();
    (residual_sweep(filtered), next)
}

/// Token sink that writes the whitelisted subset of its input
struct SanitizingSink {
    output: RefCell<String>,
    /// Raw-content element whose end tag ends the skipped region
    skip_until: Cell<Option<&'static str>>,
    /// Tags and attributes dropped, for logging
    removed: Cell<usize>,
    /// Set once all input has been fed
    at_end: Cell<bool>,
    /// A comment was still open when input ran out
    comment_at_end: Cell<bool>,
}

impl SanitizingSink {
    fn new(capacity: usize) -> Self {
        Self {
            output: RefCell::new(String::with_capacity(capacity)),
            skip_until: Cell::new(None),
            removed: Cell::new(0),
            at_end: Cell::new(false),
            comment_at_end: Cell::new(false),
        }
    }

    fn note_removed(&self) {
        self.removed.set(self.removed.get() + 1);
    }

    fn handle_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        let name: &str = &tag.name;

        if let Some(skipped) = self.skip_until.get() {
            if tag.kind == TagKind::EndTag && name == skipped {
                self.skip_until.set(None);
            }
            return TokenSinkResult::Continue;
        }

        if let Some(raw) = RAW_CONTENT_ELEMENTS.iter().copied().find(|raw| *raw == name) {
            self.note_removed();
            if tag.kind == TagKind::StartTag {
                self.skip_until.set(Some(raw));
                let kind = if raw == "script" {
                    RawKind::ScriptData
                } else {
                    RawKind::Rawtext
                };
                return TokenSinkResult::RawData(kind);
            }
            return TokenSinkResult::Continue;
        }

        if name == "meta" || DANGEROUS_ELEMENTS.contains(&name) || !is_allowed_tag(name) {
            self.note_removed();
            return TokenSinkResult::Continue;
        }

        let is_void = VOID_ELEMENTS.contains(&name);
        let mut out = self.output.borrow_mut();
        match tag.kind {
            TagKind::StartTag => {
                out.push('<');
                out.push_str(name);
                let allowed = allowed_attributes(name);
                for attr in &tag.attrs {
                    let attr_name: &str = &attr.name.local;
                    if !allowed.contains(&attr_name) {
                        self.note_removed();
                        continue;
                    }
                    let value = if URL_ATTRIBUTES.contains(&attr_name) {
                        sanitize_url(&attr.value)
                    } else {
                        Cow::Borrowed(&*attr.value)
                    };
                    out.push(' ');
                    out.push_str(attr_name);
                    out.push_str("=\"");
                    push_escaped(&mut out, &value);
                    out.push('"');
                }
                if is_void && tag.self_closing {
                    out.push_str(" /");
                }
                out.push('>');
            }
            TagKind::EndTag => {
                if !is_void {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
        TokenSinkResult::Continue
    }
}

impl TokenSink for SanitizingSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => self.handle_tag(tag),
            Token::CharacterTokens(text) => {
                if self.skip_until.get().is_none() {
                    push_escaped(&mut self.output.borrow_mut(), &text);
                }
                TokenSinkResult::Continue
            }
            // Comments are only emitted at end of input when unterminated
            Token::CommentToken(_) => {
                if self.at_end.get() {
                    self.comment_at_end.set(true);
                }
                TokenSinkResult::Continue
            }
            // Doctypes, NULs, parse errors and EOF produce no output
            _ => TokenSinkResult::Continue,
        }
    }
}

/// Escape text or an attribute value
///
/// Quotes are escaped in text as well, so the residual sweep below can
/// only ever see quote characters that delimit attribute values.
fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

struct SweepPatterns {
    event_handler: Regex,
    javascript: Regex,
    data_script: Regex,
}

fn sweep_patterns() -> Option<&'static SweepPatterns> {
    static PATTERNS: OnceLock<Option<SweepPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(SweepPatterns {
                // An `on*` attribute preceded only by complete attributes of the same tag
                event_handler: Regex::new(
                    r#"(?i)(?P<tag><[a-z][a-z0-9-]*(?:\s+[a-z][a-z0-9_:-]*\s*=\s*(?:"[^"]*"|'[^']*'))*)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*')"#,
                )
                .ok()?,
                javascript: Regex::new(r"(?i)javascript:").ok()?,
                // Bounded to one text run or attribute value
                data_script: Regex::new(r#"(?i)data:[^,<>"']*script[^,<>"']*,"#).ok()?,
            })
        })
        .as_ref()
}

/// Neutralise event handlers and script payloads left in serialised markup
///
/// Repeats until nothing changes; every rewrite shortens the text, so this
/// terminates.
fn residual_sweep(mut html: String) -> String {
    let Some(patterns) = sweep_patterns() else {
        return html;
    };

    loop {
        let pass = {
            let step = patterns.event_handler.replace_all(&html, "${tag}");
            let step = patterns.javascript.replace_all(&step, "blocked:").into_owned();
            patterns
                .data_script
                .replace_all(&step, "blocked:,")
                .into_owned()
        };
        if pass == html {
            return html;
        }
        html = pass;
    }
}
