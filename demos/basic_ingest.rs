//! Basic ingestion example demonstrating the document model and HTML output

use markdown_ingest::stats::ReadingTimeEstimator;
use markdown_ingest::{IngestError, MarkdownIngestor};

fn main() {
    println!("=== Markdown Ingest - Basic Examples ===\n");

    // Example 1: Front matter, headings and excerpt
    example_1();

    // Example 2: Links, images and tables
    example_2();

    // Example 3: Rejected input
    example_3();
}

fn example_1() {
    println!("Example 1: Front matter, headings and excerpt");
    let markdown = "---\ntitle: Hello World\ndate: 2024-05-01\ntags: [intro, rust]\n---\n# Hello World\n\nThis is the first post. It has two sentences.\n\n## Next Steps\n\nMore to come.";
    println!("Input Markdown:\n{markdown}\n");

    let rendered = MarkdownIngestor::new().render(markdown).expect("Render failed");
    let doc = &rendered.document;

    println!("Title:    {:?}", doc.title());
    println!("Excerpt:  {:?}", doc.excerpt);
    for heading in &doc.headings {
        println!("Heading:  h{} {} (#{})", heading.level, heading.text, heading.id);
    }
    println!("Reading:  {:?}", ReadingTimeEstimator::new().estimate(doc));
    println!("Output HTML:\n{}", rendered.html);
    println!("Fingerprint: {}", rendered.fingerprint);
    println!("---\n");
}

fn example_2() {
    println!("Example 2: Links, images and tables");
    let markdown = "See [the docs](/docs) and [crates.io](https://crates.io).\n\n![Logo](logo.png)\n\n| Crate | Version |\n|-------|---------|\n| serde | 1.0 |\n";

    let doc = MarkdownIngestor::new().parse(markdown).expect("Parse failed");

    for link in &doc.links {
        println!("Link:  {} -> {} (external: {})", link.text, link.url, link.is_external);
    }
    for image in &doc.images {
        println!("Image: {:?} -> {}", image.alt, image.url);
    }
    for table in &doc.tables {
        println!("Table: {:?} / {:?}", table.headers, table.rows);
    }
    println!("---\n");
}

fn example_3() {
    println!("Example 3: Rejected input");
    let inputs = [
        "<script>alert('xss')</script>".to_string(),
        "-".repeat(1001),
        "---\ntitle: never closed\n".to_string(),
    ];

    for input in &inputs {
        match MarkdownIngestor::new().parse(input) {
            Ok(_) => println!("accepted"),
            Err(e @ IngestError::DangerousContent { .. }) => println!("dangerous: {e}"),
            Err(e) => println!("rejected (code {}): {e}", e.code()),
        }
    }
}
