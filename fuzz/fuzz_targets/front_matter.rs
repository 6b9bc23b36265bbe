#![no_main]

use libfuzzer_sys::fuzz_target;
use markdown_ingest::MarkdownIngestor;

fuzz_target!(|payload: &str| {
    let markdown = format!("---\n{payload}\n---\nBody");
    let _ = MarkdownIngestor::new().parse(&markdown);
});
