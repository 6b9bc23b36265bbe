//! Document model produced by ingestion
//!
//! A [`ParsedDocument`] is built once per parse call and handed to the
//! caller by value. `elements` is the authoritative content sequence; the
//! `headings`, `code_blocks` and `tables` fields are denormalised views of
//! the same elements for template convenience. Links and images are
//! collected document-wide as side-channel metadata.
//!
//! Every type serialises with serde so a template layer or JSON manifest can
//! consume it directly.

use serde::Serialize;

use crate::frontmatter::{FrontMatter, FrontMatterValue};

/// A heading with its generated anchor id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// Level 1 through 6
    pub level: u8,
    pub text: String,
    /// Lowercased text with spaces replaced by dashes; not deduplicated
    pub id: String,
}

/// A list with its items flattened to plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListBlock {
    pub items: Vec<String>,
    pub ordered: bool,
}

/// A fenced or indented code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    /// Info string of a fenced block, if any
    pub language: Option<String>,
    pub content: String,
}

/// A table as header and body cell text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A block of document content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentElement {
    Heading(Heading),
    Paragraph { text: String },
    List(ListBlock),
    CodeBlock(CodeBlock),
    Table(Table),
}

/// A link found in paragraph text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub text: String,
    pub url: String,
    /// True iff the url starts with `http://` or `https://`
    pub is_external: bool,
}

impl Link {
    pub fn new(text: String, url: String) -> Self {
        let is_external = url.starts_with("http://") || url.starts_with("https://");
        Self {
            text,
            url,
            is_external,
        }
    }
}

/// An image found in paragraph text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub alt: Option<String>,
    pub url: String,
}

/// Structured result of parsing one markdown document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub front_matter: Option<FrontMatter>,
    pub elements: Vec<ContentElement>,
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub code_blocks: Vec<CodeBlock>,
    pub tables: Vec<Table>,
    /// Front matter `excerpt`, else the first paragraph, within the excerpt bound
    pub excerpt: Option<String>,
}

impl ParsedDocument {
    /// Look up a front matter field
    pub fn front_matter_value(&self, key: &str) -> Option<&FrontMatterValue> {
        self.front_matter.as_ref().and_then(|fm| fm.get(key))
    }

    /// Front matter `title`, falling back to the first level-1 heading
    pub fn title(&self) -> Option<&str> {
        self.front_matter_value("title")
            .and_then(FrontMatterValue::as_text)
            .or_else(|| {
                self.headings
                    .iter()
                    .find(|h| h.level == 1)
                    .map(|h| h.text.as_str())
            })
    }

    /// Links pointing off-site
    pub fn external_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| link.is_external)
    }
}

/// A parsed document together with its sanitised HTML
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDocument {
    pub document: ParsedDocument,
    pub html: String,
    /// Fingerprint of `html`, for skipping unchanged outputs
    pub fingerprint: String,
}
