//! Node tree to document model
//!
//! [`DocumentWalker`] visits a parsed [`Node`] tree and accumulates content
//! elements, links, images and the excerpt candidate. It can walk several
//! trees in sequence; the streaming path walks one tree per flushed segment
//! into the same walker and gets the same result as walking the whole body
//! at once.
//!
//! # Element Rules
//!
//! - Headings become `Heading` with a naive anchor id (lowercase, spaces to
//!   dashes; duplicates are not deduplicated)
//! - Paragraphs become `Paragraph`; the first non-empty one is the excerpt
//!   candidate, and their descendants are searched for links and images
//! - Lists become `List` with each item flattened to plain text, nested
//!   lists included
//! - Code blocks keep their info string and trimmed content
//! - Tables become header and row cell text
//! - Everything else is a transparent container
//!
//! # Examples
//!
//! ```rust
//! use markdown_ingest::parser::parse_markdown;
//! use markdown_ingest::walker::DocumentWalker;
//!
//! let tree = parse_markdown("# Hello World\n\nFirst [link](https://a.example).").unwrap();
//! let mut walker = DocumentWalker::new();
//! walker.walk(&tree.root);
//! let doc = walker.finish(None, 300);
//!
//! assert_eq!(doc.headings[0].id, "hello-world");
//! assert_eq!(doc.links[0].url, "https://a.example");
//! assert_eq!(doc.excerpt.as_deref(), Some("First link."));
//! ```

use crate::document::{
    CodeBlock, ContentElement, Heading, Image, Link, ListBlock, ParsedDocument, Table,
};
use crate::excerpt::truncate_excerpt;
use crate::frontmatter::{FrontMatter, FrontMatterValue};
use crate::parser::{Node, NodeKind};

/// Accumulates a [`ParsedDocument`] from one or more node trees
#[derive(Debug, Default)]
pub struct DocumentWalker {
    elements: Vec<ContentElement>,
    headings: Vec<Heading>,
    links: Vec<Link>,
    images: Vec<Image>,
    code_blocks: Vec<CodeBlock>,
    tables: Vec<Table>,
    first_paragraph: Option<String>,
}

impl DocumentWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visit a tree and append what it contains
    pub fn walk(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Heading(level) => {
                let text = plain_text(node);
                let heading = Heading {
                    level: *level,
                    id: heading_id(&text),
                    text,
                };
                self.headings.push(heading.clone());
                self.elements.push(ContentElement::Heading(heading));
            }
            NodeKind::Paragraph => {
                let text = plain_text(node);
                if self.first_paragraph.is_none() && !text.trim().is_empty() {
                    self.first_paragraph = Some(text.trim().to_string());
                }
                self.collect_inline_media(node);
                self.elements.push(ContentElement::Paragraph { text });
            }
            NodeKind::List { ordered } => {
                let items = node
                    .children
                    .iter()
                    .filter(|child| child.kind == NodeKind::Item)
                    .map(|item| plain_text(item).trim().to_string())
                    .collect();
                self.elements.push(ContentElement::List(ListBlock {
                    items,
                    ordered: *ordered,
                }));
            }
            NodeKind::CodeBlock { info } => {
                let language = info
                    .as_deref()
                    .map(str::trim)
                    .filter(|lang| !lang.is_empty())
                    .map(str::to_string);
                let content = literal_text(node).trim().to_string();
                let block = CodeBlock { language, content };
                self.code_blocks.push(block.clone());
                self.elements.push(ContentElement::CodeBlock(block));
            }
            NodeKind::Table => {
                let table = table_cells(node);
                self.tables.push(table.clone());
                self.elements.push(ContentElement::Table(table));
            }
            NodeKind::HtmlBlock | NodeKind::Rule => {}
            _ => {
                for child in &node.children {
                    self.walk(child);
                }
            }
        }
    }

    /// Assemble the document
    ///
    /// The excerpt is the front matter `excerpt` text when present and
    /// non-empty, else the first paragraph, truncated to `excerpt_length`
    /// characters.
    pub fn finish(self, front_matter: Option<FrontMatter>, excerpt_length: usize) -> ParsedDocument {
        let excerpt = declared_excerpt(front_matter.as_ref())
            .or(self.first_paragraph)
            .map(|text| truncate_excerpt(&text, excerpt_length));

        ParsedDocument {
            front_matter,
            elements: self.elements,
            headings: self.headings,
            links: self.links,
            images: self.images,
            code_blocks: self.code_blocks,
            tables: self.tables,
            excerpt,
        }
    }

    /// The first non-empty paragraph seen so far
    pub fn first_paragraph(&self) -> Option<&str> {
        self.first_paragraph.as_deref()
    }

    fn collect_inline_media(&mut self, node: &Node) {
        for child in &node.children {
            match &child.kind {
                NodeKind::Link { url, .. } => {
                    self.links.push(Link::new(plain_text(child), url.clone()));
                }
                NodeKind::Image { url, .. } => {
                    let alt = plain_text(child);
                    self.images.push(Image {
                        alt: (!alt.is_empty()).then_some(alt),
                        url: url.clone(),
                    });
                }
                _ => {}
            }
            self.collect_inline_media(child);
        }
    }
}

/// Anchor id for a heading: lowercase with spaces replaced by dashes
///
/// ```rust
/// use markdown_ingest::walker::heading_id;
///
/// assert_eq!(heading_id("Getting Started"), "getting-started");
/// assert_eq!(heading_id("What's New?"), "what's-new?");
/// ```
pub fn heading_id(text: &str) -> String {
    text.to_lowercase().replace(' ', "-")
}

/// Non-empty front matter `excerpt`, trimmed
pub(crate) fn declared_excerpt(front_matter: Option<&FrontMatter>) -> Option<String> {
    front_matter
        .and_then(|fm| fm.get("excerpt"))
        .and_then(FrontMatterValue::as_text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Concatenated text of a node's descendants
///
/// Breaks become a space. Inline code contributes its text; code blocks and
/// raw HTML contribute nothing. Block children are separated by a space so
/// flattened list items keep their words apart.
pub fn plain_text(node: &Node) -> String {
    let mut out = String::new();
    push_plain_text(node, &mut out);
    out
}

fn push_plain_text(node: &Node, out: &mut String) {
    match &node.kind {
        NodeKind::Text(text) | NodeKind::Code(text) => out.push_str(text),
        NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
        NodeKind::CodeBlock { .. } | NodeKind::HtmlBlock | NodeKind::Html(_) => {}
        _ => {
            for child in &node.children {
                if is_block(&child.kind) && !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
                push_plain_text(child, out);
            }
        }
    }
}

fn is_block(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Paragraph
            | NodeKind::Heading(_)
            | NodeKind::BlockQuote
            | NodeKind::List { .. }
            | NodeKind::Item
            | NodeKind::Table
            | NodeKind::TableRow
            | NodeKind::TableCell
    )
}

/// Raw text of a code block
fn literal_text(node: &Node) -> String {
    node.children
        .iter()
        .filter_map(|child| match &child.kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn table_cells(node: &Node) -> Table {
    let row_text = |row: &Node| -> Vec<String> {
        row.children
            .iter()
            .filter(|cell| cell.kind == NodeKind::TableCell)
            .map(|cell| plain_text(cell).trim().to_string())
            .collect()
    };

    let mut headers = Vec::new();
    let mut rows = Vec::new();
    for child in &node.children {
        match child.kind {
            NodeKind::TableHead => headers = row_text(child),
            NodeKind::TableRow => rows.push(row_text(child)),
            _ => {}
        }
    }
    Table { headers, rows }
}
