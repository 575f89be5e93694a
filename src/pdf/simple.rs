use bytes::Bytes;
use tracing::{instrument, warn};

use crate::fetcher::Fetcher;
use crate::pdf::scanner::{self, FAILED_PLACEHOLDER};

/// Dependency-free PDF extraction: fetch, then scan the raw bytes.
///
/// Always yields a string. Failures come back as one of the scanner's
/// placeholder messages.
#[derive(Debug, Clone)]
pub struct ScannerExtractor {
    fetcher: Fetcher,
}

impl ScannerExtractor {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract(&self, url: &str) -> String {
        match self.fetcher.document(url).await {
            Ok(document) => self.scan_bytes(document.body).await,
            Err(e) => {
                warn!(error = %e, "pdf fetch failed");
                FAILED_PLACEHOLDER.to_string()
            }
        }
    }

    pub async fn scan_bytes(&self, pdf: Bytes) -> String {
        match tokio::task::spawn_blocking(move || scanner::scan(&pdf)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "byte scan aborted");
                FAILED_PLACEHOLDER.to_string()
            }
        }
    }
}
