#![no_main]

use libfuzzer_sys::fuzz_target;
use markdown_ingest::{IngestOptions, MarkdownIngestor};

fuzz_target!(|data: &[u8]| {
    let ingestor = MarkdownIngestor::new().with_options(IngestOptions::new().trusted());
    if let Ok(rendered) = ingestor.render_bytes(data) {
        assert!(!rendered.html.to_ascii_lowercase().contains("<script"));
    }
});
