#!/usr/bin/env rust-script
//! Corpus ingestion check
//!
//! Ingests every `.md` file under a directory and prints one line per file:
//! `ok` with the element count and fingerprint, or `rejected` with the error
//! code and message. Exits non-zero when any file fails unexpectedly (I/O
//! errors), so hostile fixtures that are rejected still count as passing.
//!
//! ```cargo
//! [dependencies]
//! markdown-ingest = { path = "../.." }
//! ```

use markdown_ingest::{IngestError, MarkdownIngestor};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_markdown(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <corpus_dir>", args[0]);
        process::exit(1);
    }

    let mut files = Vec::new();
    if let Err(e) = collect_markdown(Path::new(&args[1]), &mut files) {
        eprintln!("Error reading corpus {}: {}", args[1], e);
        process::exit(1);
    }
    files.sort();

    let ingestor = MarkdownIngestor::new();
    let mut failures = 0;
    for path in &files {
        match ingestor.render_file(path) {
            Ok(rendered) => println!(
                "ok       {} elements={} fingerprint={}",
                path.display(),
                rendered.document.elements.len(),
                rendered.fingerprint
            ),
            Err(e @ (IngestError::Io(_) | IngestError::FileNotFound(_))) => {
                failures += 1;
                println!("error    {} {}", path.display(), e);
            }
            Err(e) => println!("rejected {} code={} {}", path.display(), e.code(), e),
        }
    }

    println!("{} files, {} errors", files.len(), failures);
    if failures > 0 {
        process::exit(1);
    }
}
