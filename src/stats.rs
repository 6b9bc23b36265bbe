//! Word count and reading time for listings and feeds

use serde::Serialize;

use crate::document::{ContentElement, ParsedDocument};

/// Default reading speed in words per minute
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Reading statistics for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadingTime {
    pub words: u32,
    /// Whole minutes, rounded up; at least 1 when there are any words
    pub minutes: u32,
}

/// Reading time estimator using a words-per-minute heuristic
pub struct ReadingTimeEstimator {
    words_per_minute: u32,
}

impl ReadingTimeEstimator {
    /// Create an estimator reading 200 words per minute
    pub fn new() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }

    /// Create an estimator with a custom reading speed
    ///
    /// A speed of zero is treated as one word per minute.
    pub fn with_words_per_minute(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
        }
    }

    /// Estimate reading time for a parsed document
    ///
    /// Headings, paragraphs, list items and table cells count; code blocks
    /// do not.
    ///
    /// # Example
    ///
    /// ```
    /// use markdown_ingest::MarkdownIngestor;
    /// use markdown_ingest::stats::ReadingTimeEstimator;
    ///
    /// let doc = MarkdownIngestor::new().parse("# Title\n\nfour words of text").unwrap();
    /// let time = ReadingTimeEstimator::new().estimate(&doc);
    /// assert_eq!(time.words, 5);
    /// assert_eq!(time.minutes, 1);
    /// ```
    pub fn estimate(&self, document: &ParsedDocument) -> ReadingTime {
        let words: usize = document
            .elements
            .iter()
            .map(|element| match element {
                ContentElement::Heading(heading) => count_words(&heading.text),
                ContentElement::Paragraph { text } => count_words(text),
                ContentElement::List(list) => list.items.iter().map(|i| count_words(i)).sum(),
                ContentElement::Table(table) => table
                    .headers
                    .iter()
                    .chain(table.rows.iter().flatten())
                    .map(|cell| count_words(cell))
                    .sum(),
                ContentElement::CodeBlock(_) => 0,
            })
            .sum();
        self.estimate_words(u32::try_from(words).unwrap_or(u32::MAX))
    }

    /// Reading time for a known word count
    pub fn estimate_words(&self, words: u32) -> ReadingTime {
        ReadingTime {
            words,
            minutes: words.div_ceil(self.words_per_minute),
        }
    }
}

impl Default for ReadingTimeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
