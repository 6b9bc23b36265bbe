//! Streams a markdown file to stdout and prints its summary
//!
//! Usage: `cargo run --example streaming_ingest -- <file.md> [chunk_size]`

use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use markdown_ingest::{IngestOptions, MarkdownIngestor};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file.md> [chunk_size]", args[0]);
        process::exit(1);
    }
    let path = Path::new(&args[1]);
    let chunk_size = args
        .get(2)
        .and_then(|value| value.parse().ok())
        .unwrap_or(64 * 1024);

    let ingestor = MarkdownIngestor::new()
        .with_options(IngestOptions::new().with_chunk_size(chunk_size));

    match ingestor.read_summary(path) {
        Ok(summary) => {
            eprintln!("body offset: {}", summary.body_offset);
            eprintln!("excerpt:     {:?}", summary.excerpt);
            if let Some(front_matter) = &summary.front_matter {
                for (key, value) in front_matter {
                    eprintln!("front matter {key}: {value:?}");
                }
            }
        }
        Err(e) => {
            eprintln!("Error reading summary: {e}");
            process::exit(1);
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match ingestor.streaming().render_to(path, &mut out) {
        Ok(document) => {
            let _ = out.flush();
            eprintln!(
                "\n{} elements, {} headings, {} links",
                document.elements.len(),
                document.headings.len(),
                document.links.len()
            );
        }
        Err(e) => {
            eprintln!("Error rendering {}: {e}", path.display());
            process::exit(1);
        }
    }
}
