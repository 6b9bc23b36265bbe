#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use markdown_ingest::{IngestOptions, Limits, MarkdownIngestor};

// First byte picks the chunk size; the rest is the file.
fuzz_target!(|data: &[u8]| {
    let Some((&selector, content)) = data.split_first() else {
        return;
    };
    let options = IngestOptions::new().with_chunk_size(usize::from(selector % 64) + 1);
    let ingestor = MarkdownIngestor::with_limits(Limits::default().with_max_front_matter_size(32))
        .with_options(options);

    let mut sink = Vec::new();
    let streamed = ingestor
        .streaming()
        .render_reader(Cursor::new(content), &mut sink);

    // Streaming only succeeds on input the eager decoder also accepts
    if streamed.is_ok() {
        assert!(std::str::from_utf8(content).is_ok());
        assert!(std::str::from_utf8(&sink).is_ok());
    }
});
