use crate::fetcher::{
    errors::FetchError,
    types::{Charset, DocumentResponse, PageResponse},
};
use encoding_rs::Encoding;
use regex::Regex;
use std::sync::LazyLock;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

/// Bytes inspected when sniffing the charset of a page.
const SNIFF_LEN: usize = 4096;

/// Pages are HTML; anything bigger than this is not an article.
const MAX_PAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Decodes a fetched HTML document into UTF-8 using the declared or sniffed
/// charset.
pub fn process_page(document: DocumentResponse) -> Result<PageResponse, FetchError> {
    if !document.looks_like_html() {
        return Err(FetchError::UnsupportedContentType(
            document.content_type.unwrap_or_default(),
        ));
    }
    if document.body.len() > MAX_PAGE_SIZE {
        return Err(FetchError::BodyTooLarge(document.body.len() as u64));
    }

    let content_type = document.content_type.as_deref().unwrap_or("text/html");
    let charset = detect_charset(content_type, &document.body);
    let body_utf8 = decode_to_utf8(&document.body, &charset)?;

    Ok(PageResponse {
        url_final: document.url_final,
        body_utf8,
        charset,
        fetched_at: document.fetched_at,
    })
}

fn charset_from_label(label: &str) -> Option<Charset> {
    Encoding::for_label(label.to_lowercase().as_bytes()).map(Charset::from_encoding)
}

fn detect_charset(content_type: &str, body_bytes: &[u8]) -> Charset {
    // Content-Type header wins.
    if let Some(charset) = CHARSET_REGEX
        .captures(content_type)
        .and_then(|c| c.get(1))
        .and_then(|m| charset_from_label(m.as_str()))
    {
        return charset;
    }

    // Then <meta charset> / <meta http-equiv> near the top of the document.
    let search_bytes = &body_bytes[..body_bytes.len().min(SNIFF_LEN)];
    let search_str = String::from_utf8_lossy(search_bytes);
    if let Some(charset) = META_CHARSET_REGEX
        .captures(&search_str)
        .and_then(|c| c.get(1))
        .and_then(|m| charset_from_label(m.as_str()))
    {
        return charset;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(search_bytes, false);
    Charset::from_encoding(detector.guess(None, true))
}

fn decode_to_utf8(body_bytes: &[u8], charset: &Charset) -> Result<String, FetchError> {
    let encoding = charset.encoding();
    let (decoded, _encoding, had_errors) = encoding.decode(body_bytes);

    if had_errors {
        return Err(FetchError::Charset(format!(
            "failed to decode content with encoding: {}",
            encoding.name()
        )));
    }

    Ok(decoded.into_owned())
}
