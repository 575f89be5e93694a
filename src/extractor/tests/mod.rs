use chrono::Utc;
use url::Url;

use crate::extractor::{article_text, is_gibberish, normalize};
use crate::fetcher::types::{Charset, PageResponse};

const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <style>body { font-family: serif; }</style>
  <script>window.analytics = { track: function () {} };</script>
</head>
<body>
  <article>
    <h1>Sample Article</h1>
    <p>This is the <em>first</em> paragraph of the article.</p>
    <p>This is the second paragraph, with a <a href="/related">related link</a>.</p>
    <ul><li>One point</li><li>Another point</li></ul>
  </article>
  <noscript>Enable JavaScript to see comments.</noscript>
</body>
</html>"#;

#[test]
fn test_article_text_keeps_block_structure() {
    let response = create_test_response(ARTICLE.to_string(), "https://example.com/article");
    let text = article_text(&response).unwrap();

    assert_eq!(
        text,
        "Sample Article\n\
         This is the first paragraph of the article.\n\
         This is the second paragraph, with a related link .\n\
         One point\n\
         Another point"
    );
}

#[test]
fn test_article_text_drops_scripts_and_styles() {
    let response = create_test_response(ARTICLE.to_string(), "https://example.com/article");
    let text = article_text(&response).unwrap();

    assert!(!text.contains("analytics"));
    assert!(!text.contains("font-family"));
    assert!(!text.contains("Enable JavaScript"));
}

#[test]
fn test_reject_empty_page() {
    let html = "<html><head><script>var x = 1;</script></head><body>  </body></html>";
    let response = create_test_response(html.to_string(), "https://example.com/empty");

    assert_eq!(article_text(&response), None);
}

#[test]
fn test_malformed_html() {
    let html = "<html><head><title>Broken</title><body><p>Unclosed tags<div>More content";
    let response = create_test_response(html.to_string(), "https://example.com/broken");

    let text = article_text(&response).unwrap();
    assert!(text.contains("Unclosed tags"));
    assert!(text.contains("More content"));
}

#[test]
fn test_normalized_article_reads_as_language() {
    let html = format!(
        "<article><h1>Budget review</h1>{}</article>",
        "<p>The committee met on Monday to review the budget for the coming year.</p>".repeat(5)
    );
    let text = normalize(Some(&html)).unwrap();

    assert!(!is_gibberish(Some(&text)));
}

fn create_test_response(html: String, url: &str) -> PageResponse {
    PageResponse {
        url_final: Url::parse(url).unwrap(),
        body_utf8: html,
        charset: Charset::Utf8,
        fetched_at: Utc::now(),
    }
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_normalize_never_panics(html in ".*") {
            let _ = normalize(Some(&html));
        }

        #[test]
        fn test_article_text_is_trimmed(html in "<p>[a-z ]{0,40}</p>") {
            let response = create_test_response(html, "https://example.com");
            if let Some(text) = article_text(&response) {
                prop_assert_eq!(text.trim(), text.as_str());
                prop_assert!(!text.is_empty());
            }
        }
    }
}
