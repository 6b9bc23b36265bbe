//! Markdown parsing into a closed node tree
//!
//! This module wraps pulldown-cmark at the crate boundary. The parser's
//! event stream is folded into a [`Node`] tree whose [`NodeKind`] is a
//! closed enum owned by this crate, so the document walker can match
//! exhaustively instead of depending on the parser's (non-exhaustive) tag
//! types.
//!
//! The same event stream is rendered to HTML with pulldown-cmark's HTML
//! writer, which escapes text and attribute values. Raw HTML embedded in
//! the markdown is passed through untouched; it is the sanitizer's job to
//! clean it.
//!
//! # Extensions
//!
//! Only tables are enabled. Strikethrough, task lists and footnotes would
//! render markup (`<del>`, `<input>`, `<sup>`) outside the sanitizer's
//! whitelist.
//!
//! # Examples
//!
//! ```rust
//! use markdown_ingest::parser::{parse_markdown, NodeKind};
//!
//! let tree = parse_markdown("# Hello\n\nWorld").unwrap();
//! assert_eq!(tree.root.children.len(), 2);
//! assert_eq!(tree.root.children[0].kind, NodeKind::Heading(1));
//! assert_eq!(tree.to_html(), "<h1>Hello</h1>\n<p>World</p>\n");
//! ```

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, html};

use crate::error::{IngestError, Result};

/// Maximum depth of the node tree
///
/// The line-based nesting heuristic does not see structures such as
/// `> - > - > -` on one line; this bound keeps the walker's recursion finite.
pub const MAX_TREE_DEPTH: usize = 128;

/// Node types understood by the document walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Heading(u8),
    Paragraph,
    BlockQuote,
    List { ordered: bool },
    Item,
    CodeBlock { info: Option<String> },
    HtmlBlock,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Link { url: String, title: String },
    Image { url: String, title: String },
    /// Text leaf
    Text(String),
    /// Inline code leaf
    Code(String),
    /// Raw HTML leaf (block or inline)
    Html(String),
    SoftBreak,
    HardBreak,
    Rule,
    /// Container for parser constructs with no dedicated kind
    Other,
}

/// A node in the markdown tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }
}

/// A parsed markdown body
pub struct MarkdownTree<'a> {
    /// Root `Document` node
    pub root: Node,
    events: Vec<Event<'a>>,
}

impl MarkdownTree<'_> {
    /// Render the body to HTML
    ///
    /// Text is escaped; raw HTML passes through unchanged.
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(self.events.len() * 16);
        html::push_html(&mut out, self.events.iter().cloned());
        out
    }
}

/// Parser options used for every document
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
}

/// Parse a markdown body into a node tree
///
/// # Errors
///
/// Returns `IngestError::ExcessiveNesting` if the tree would be deeper than
/// [`MAX_TREE_DEPTH`].
pub fn parse_markdown(body: &str) -> Result<MarkdownTree<'_>> {
    let events: Vec<Event<'_>> = Parser::new_ext(body, markdown_options()).collect();
    let root = build_tree(&events)?;
    Ok(MarkdownTree { root, events })
}

fn build_tree(events: &[Event<'_>]) -> Result<Node> {
    let mut root = Node::new(NodeKind::Document);
    // Open containers below the root
    let mut stack: Vec<Node> = Vec::new();

    for event in events {
        match event {
            Event::Start(tag) => {
                let depth = stack.len() + 1;
                if depth > MAX_TREE_DEPTH {
                    return Err(IngestError::ExcessiveNesting {
                        depth,
                        limit: MAX_TREE_DEPTH,
                    });
                }
                stack.push(Node::new(kind_for(tag)));
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    stack.last_mut().unwrap_or(&mut root).children.push(node);
                }
            }
            leaf => {
                stack
                    .last_mut()
                    .unwrap_or(&mut root)
                    .children
                    .push(Node::new(leaf_kind(leaf)));
            }
        }
    }

    // The parser balances every start with an end; fold anything left open.
    while let Some(node) = stack.pop() {
        stack.last_mut().unwrap_or(&mut root).children.push(node);
    }
    Ok(root)
}

fn kind_for(tag: &Tag<'_>) -> NodeKind {
    match tag {
        Tag::Heading { level, .. } => NodeKind::Heading(heading_level(*level)),
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
        },
        Tag::Item => NodeKind::Item,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::CodeBlock {
            info: Some(info.to_string()),
        },
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock { info: None },
        Tag::HtmlBlock => NodeKind::HtmlBlock,
        Tag::Table(_) => NodeKind::Table,
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Link {
            dest_url, title, ..
        } => NodeKind::Link {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
        Tag::Image {
            dest_url, title, ..
        } => NodeKind::Image {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
        _ => NodeKind::Other,
    }
}

fn leaf_kind(event: &Event<'_>) -> NodeKind {
    match event {
        Event::Text(text) => NodeKind::Text(text.to_string()),
        Event::Code(code) => NodeKind::Code(code.to_string()),
        Event::Html(html) | Event::InlineHtml(html) => NodeKind::Html(html.to_string()),
        Event::SoftBreak => NodeKind::SoftBreak,
        Event::HardBreak => NodeKind::HardBreak,
        Event::Rule => NodeKind::Rule,
        _ => NodeKind::Other,
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(node: &Node) -> Vec<&NodeKind> {
        node.children.iter().map(|c| &c.kind).collect()
    }

    #[test]
    fn test_block_structure() {
        let tree = parse_markdown("# Title\n\nPara\n\n> Quote\n\n---\n").unwrap();
        assert_eq!(
            kinds(&tree.root),
            vec![
                &NodeKind::Heading(1),
                &NodeKind::Paragraph,
                &NodeKind::BlockQuote,
                &NodeKind::Rule,
            ]
        );
    }

    #[test]
    fn test_lists() {
        let tree = parse_markdown("- a\n- b\n\n1. one\n").unwrap();
        assert_eq!(
            kinds(&tree.root),
            vec![
                &NodeKind::List { ordered: false },
                &NodeKind::List { ordered: true },
            ]
        );
        assert_eq!(tree.root.children[0].children.len(), 2);
    }

    #[test]
    fn test_code_blocks() {
        let tree = parse_markdown("```rust\nfn main() {}\n```\n\n    indented\n").unwrap();
        assert_eq!(
            tree.root.children[0].kind,
            NodeKind::CodeBlock {
                info: Some("rust".to_string())
            }
        );
        assert_eq!(tree.root.children[1].kind, NodeKind::CodeBlock { info: None });
        assert_eq!(
            tree.root.children[0].children[0].kind,
            NodeKind::Text("fn main() {}\n".to_string())
        );
    }

    #[test]
    fn test_links_and_images() {
        let tree = parse_markdown("[site](https://example.com \"T\") ![alt](/a.png)").unwrap();
        let para = &tree.root.children[0];
        assert_eq!(
            para.children[0].kind,
            NodeKind::Link {
                url: "https://example.com".to_string(),
                title: "T".to_string(),
            }
        );
        assert!(
            para.children
                .iter()
                .any(|c| matches!(&c.kind, NodeKind::Image { url, .. } if url == "/a.png"))
        );
    }

    #[test]
    fn test_tables() {
        let tree = parse_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n").unwrap();
        let table = &tree.root.children[0];
        assert_eq!(table.kind, NodeKind::Table);
        assert_eq!(
            kinds(table),
            vec![&NodeKind::TableHead, &NodeKind::TableRow]
        );
    }

    #[test]
    fn test_raw_html_is_a_leaf() {
        let tree = parse_markdown("<div>hi</div>\n").unwrap();
        assert_eq!(tree.root.children[0].kind, NodeKind::HtmlBlock);
        assert!(matches!(
            tree.root.children[0].children[0].kind,
            NodeKind::Html(_)
        ));
    }

    #[test]
    fn test_html_output_escapes_text() {
        let tree = parse_markdown("a < b & c").unwrap();
        assert_eq!(tree.to_html(), "<p>a &lt; b &amp; c</p>\n");
    }

    #[test]
    fn test_strikethrough_is_not_enabled() {
        let tree = parse_markdown("~~gone~~").unwrap();
        assert_eq!(tree.to_html(), "<p>~~gone~~</p>\n");
    }

    #[test]
    fn test_tree_depth_limit() {
        let body = "> ".repeat(MAX_TREE_DEPTH + 8) + "deep";
        assert!(matches!(
            parse_markdown(&body),
            Err(IngestError::ExcessiveNesting { .. })
        ));
    }

    #[test]
    fn test_empty_body() {
        let tree = parse_markdown("").unwrap();
        assert_eq!(tree.root.kind, NodeKind::Document);
        assert!(tree.root.children.is_empty());
        assert_eq!(tree.to_html(), "");
    }
}
