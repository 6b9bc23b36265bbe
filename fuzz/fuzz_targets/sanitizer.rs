#![no_main]

use libfuzzer_sys::fuzz_target;
use markdown_ingest::sanitize_html;

fuzz_target!(|html: &str| {
    let once = sanitize_html(html);
    assert!(!once.to_ascii_lowercase().contains("<script"));
    assert_eq!(sanitize_html(&once), once);
});
