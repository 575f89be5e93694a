//! Entry point used while refreshing feeds: one call per item link, or per
//! inline item body.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::extractor::{BackendKind, Confidence, article_text, normalize_text};
use crate::fetcher::{DocumentResponse, FetchError, Fetcher, process_page};
use crate::pdf::{FAILED_PLACEHOLDER, PdfTextExtractor, ScannerExtractor};

/// Which PDF extractor handles linked documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfStrategy {
    /// Multi-backend extraction with quality checks.
    #[default]
    Full,
    /// Byte scanning only. Always returns some text, possibly a placeholder.
    ByteScanner,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentSource {
    Article,
    Pdf {
        backend: BackendKind,
        confidence: Confidence,
    },
    PdfScan,
    Inline,
}

/// Plain text for one feed item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemText {
    /// Final URL after redirects; `None` for inline content.
    pub url: Option<String>,
    pub text: String,
    pub source: ContentSource,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ExtractionPipeline {
    fetcher: Fetcher,
    pdf: PdfTextExtractor,
    scanner: ScannerExtractor,
}

impl ExtractionPipeline {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(config.fetch())?;
        let pdf = PdfTextExtractor::with_backends(
            config,
            fetcher.clone(),
            crate::pdf::default_backends(config.max_pages()),
        );
        let scanner = ScannerExtractor::new(fetcher.clone());
        Ok(Self::from_parts(fetcher, pdf, scanner))
    }

    pub fn from_parts(fetcher: Fetcher, pdf: PdfTextExtractor, scanner: ScannerExtractor) -> Self {
        Self {
            fetcher,
            pdf,
            scanner,
        }
    }

    /// Text behind an item link. PDFs go through the chosen PDF strategy,
    /// HTML pages through the normalizer; anything else yields `None`.
    #[instrument(skip_all, fields(url = %url, strategy = ?strategy))]
    pub async fn item_text(&self, url: &str, strategy: PdfStrategy) -> Option<ItemText> {
        let document = match self.fetcher.document(url).await {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, retriable = e.should_retry(), "item fetch failed");
                // The byte scanner reports fetch failures in-band.
                if strategy == PdfStrategy::ByteScanner && is_pdf_url(url) {
                    return Some(ItemText {
                        url: Some(url.to_string()),
                        text: FAILED_PLACEHOLDER.to_string(),
                        source: ContentSource::PdfScan,
                        fetched_at: Utc::now(),
                    });
                }
                return None;
            }
        };

        if is_pdf_url(url) || document.looks_like_pdf() {
            return self.pdf_text(document, strategy).await;
        }

        let page = match process_page(document) {
            Ok(page) => page,
            Err(e) => {
                debug!(error = %e, "item link is neither pdf nor html");
                return None;
            }
        };
        let text = article_text(&page)?;
        Some(ItemText {
            url: Some(page.url_final.to_string()),
            text,
            source: ContentSource::Article,
            fetched_at: page.fetched_at,
        })
    }

    async fn pdf_text(&self, document: DocumentResponse, strategy: PdfStrategy) -> Option<ItemText> {
        let url = Some(document.url_final.to_string());
        match strategy {
            PdfStrategy::Full => {
                let extraction = self.pdf.extract_bytes(document.body).await?;
                Some(ItemText {
                    url,
                    text: extraction.text,
                    source: ContentSource::Pdf {
                        backend: extraction.backend,
                        confidence: extraction.confidence,
                    },
                    fetched_at: document.fetched_at,
                })
            }
            PdfStrategy::ByteScanner => Some(ItemText {
                url,
                text: self.scanner.scan_bytes(document.body).await,
                source: ContentSource::PdfScan,
                fetched_at: document.fetched_at,
            }),
        }
    }

    /// Text of an item body embedded in the feed itself.
    pub fn inline_text(&self, html: &str) -> Option<ItemText> {
        let text = normalize_text(html);
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(ItemText {
            url: None,
            text: text.to_string(),
            source: ContentSource::Inline,
            fetched_at: Utc::now(),
        })
    }
}

/// True when the URL path names a `.pdf` file, ignoring query and fragment.
pub fn is_pdf_url(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::LIMITED_PLACEHOLDER;
    use crate::retry::RetryPolicy;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline() -> ExtractionPipeline {
        let config = Config::default().with_retry(RetryPolicy::new(1, Duration::ZERO));
        ExtractionPipeline::new(&config).unwrap()
    }

    async fn serve(server: &MockServer, route: &str, status: u16, ct: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("content-type", ct)
                    .set_body_bytes(body.to_vec()),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_is_pdf_url() {
        assert!(is_pdf_url("https://example.com/papers/2024.PDF"));
        assert!(is_pdf_url("https://example.com/a.pdf?download=1#page=2"));
        assert!(!is_pdf_url("https://example.com/pdf/viewer"));
        assert!(!is_pdf_url("not a url.pdf"));
    }

    #[test]
    fn test_inline_text() {
        let item = pipeline()
            .inline_text("<p>Short <b>summary</b></p><p>Second line</p>")
            .unwrap();
        assert_eq!(item.text, "Short summary\nSecond line");
        assert_eq!(item.source, ContentSource::Inline);
        assert_eq!(item.url, None);

        assert!(pipeline().inline_text("<div> </div>").is_none());
    }

    #[tokio::test]
    async fn test_html_item_becomes_article_text() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/post",
            200,
            "text/html; charset=utf-8",
            b"<html><body><h1>Title</h1><p>Body text</p></body></html>",
        )
        .await;

        let item = pipeline()
            .item_text(&format!("{}/post", server.uri()), PdfStrategy::Full)
            .await
            .unwrap();
        assert_eq!(item.text, "Title\nBody text");
        assert_eq!(item.source, ContentSource::Article);
        assert_eq!(item.url, Some(format!("{}/post", server.uri())));
    }

    #[tokio::test]
    async fn test_pdf_detected_by_content_type() {
        let server = MockServer::start().await;
        let pdf = b"%PDF-1.4\nBT (The quarterly report shows strong growth in the northern region.) Tj ET\n%%EOF";
        serve(&server, "/download", 200, "application/pdf", pdf).await;

        let item = pipeline()
            .item_text(&format!("{}/download", server.uri()), PdfStrategy::ByteScanner)
            .await
            .unwrap();
        assert_eq!(
            item.text,
            "The quarterly report shows strong growth in the northern region."
        );
        assert_eq!(item.source, ContentSource::PdfScan);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_with_byte_scanner_gives_placeholder() {
        let server = MockServer::start().await;
        serve(&server, "/blank.pdf", 200, "application/pdf", &[0u8; 256]).await;

        let item = pipeline()
            .item_text(&format!("{}/blank.pdf", server.uri()), PdfStrategy::ByteScanner)
            .await
            .unwrap();
        assert_eq!(item.text, LIMITED_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_missing_pdf_with_byte_scanner_gives_failure_placeholder() {
        let server = MockServer::start().await;
        serve(&server, "/gone.pdf", 404, "text/plain", b"not found").await;

        let url = format!("{}/gone.pdf", server.uri());
        let item = pipeline()
            .item_text(&url, PdfStrategy::ByteScanner)
            .await
            .unwrap();
        assert_eq!(item.text, FAILED_PLACEHOLDER);

        assert!(pipeline().item_text(&url, PdfStrategy::Full).await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_content_type_is_none() {
        let server = MockServer::start().await;
        serve(&server, "/logo.png", 200, "image/png", b"\x89PNG\r\n").await;

        let item = pipeline()
            .item_text(&format!("{}/logo.png", server.uri()), PdfStrategy::Full)
            .await;
        assert!(item.is_none());
    }
}
