//! Shows what the sanitizer keeps and drops for common XSS payloads

use markdown_ingest::sanitize_html;
use markdown_ingest::sanitizer::sanitize_url;

fn main() {
    let payloads = [
        r#"<p>Before script</p><script>alert('xss')</script><p>After script</p>"#,
        r#"<p>Before iframe</p><iframe src="https://evil.example/malicious"></iframe><p>After iframe</p>"#,
        r#"<img src="x.png" onerror="alert(1)" alt="pic">"#,
        r#"<a href="&#106;avascript:alert(1)" title="t">entity encoded</a>"#,
        r#"<div style="color:red" class="x">styled</div>"#,
        r#"<svg onload="alert(1)"><circle r="5"/></svg>"#,
        r#"<table><tr><td colspan="2" onclick="x()">cell</td></tr></table>"#,
    ];

    for html in payloads {
        println!("Input:  {html}");
        println!("Output: {}\n", sanitize_html(html));
    }

    println!("--- URLs ---");
    for url in [
        "https://example.com",
        "/relative/path",
        "javascript:alert(1)",
        "JaVaScRiPt:alert(1)",
        "data:text/html;base64,PHNjcmlwdD4=",
        "gopher://old.example",
    ] {
        println!("{url:40} -> {}", sanitize_url(url));
    }
}
