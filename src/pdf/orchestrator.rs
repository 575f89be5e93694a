//! Multi-backend PDF text extraction.
//!
//! Backends run strictly in order. The first candidate that is long enough
//! and reads as language wins; when none does, the longest candidate any
//! backend produced is returned as a best effort.

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::extractor::gibberish::{Thresholds, Verdict, classify};
use crate::extractor::model::{Confidence, ExtractionCandidate, PdfExtraction};
use crate::fetcher::{FetchError, Fetcher};
use crate::pdf::backends::{BackendError, LibraryBackend, PageWalkBackend, PdfBackend};
use crate::retry::{RetryPolicy, with_retry};

/// The production backend chain: library parse, then the two page walks.
pub fn default_backends(max_pages: usize) -> Vec<Arc<dyn PdfBackend>> {
    vec![
        Arc::new(LibraryBackend),
        Arc::new(PageWalkBackend::primary(max_pages)),
        Arc::new(PageWalkBackend::alternate(max_pages)),
    ]
}

/// Fetches PDFs and turns them into text. Cheap to clone; clones share the
/// HTTP client and backends.
#[derive(Clone)]
pub struct PdfTextExtractor {
    fetcher: Fetcher,
    backends: Vec<Arc<dyn PdfBackend>>,
    retry: RetryPolicy,
    thresholds: Thresholds,
    min_content_length: usize,
}

struct Selection {
    candidate: ExtractionCandidate,
    confidence: Confidence,
    verdict: Verdict,
}

impl PdfTextExtractor {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(config.fetch())?;
        Ok(Self::with_backends(
            config,
            fetcher,
            default_backends(config.max_pages()),
        ))
    }

    pub fn with_backends(
        config: &Config,
        fetcher: Fetcher,
        backends: Vec<Arc<dyn PdfBackend>>,
    ) -> Self {
        Self {
            fetcher,
            backends,
            retry: *config.retry(),
            thresholds: config.thresholds().clone(),
            min_content_length: config.min_content_length(),
        }
    }

    /// Text of the PDF at `url`, or `None` when it could not be fetched or
    /// no backend produced anything.
    pub async fn extract(&self, url: &str) -> Option<String> {
        self.extract_detailed(url).await.map(|e| e.text)
    }

    /// Like [`extract`](Self::extract), also reporting which backend won and
    /// how the text scored.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract_detailed(&self, url: &str) -> Option<PdfExtraction> {
        let document = match self.fetcher.document(url).await {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, retriable = e.should_retry(), "pdf fetch failed");
                return None;
            }
        };
        if !document.looks_like_pdf() {
            debug!(
                content_type = ?document.content_type,
                "document has neither a pdf content-type nor a pdf header"
            );
        }

        let checksum = document.checksum();
        let selection = self.select(document.body).await?;
        Some(finish(selection, checksum, document.fetched_at))
    }

    /// Runs the backend chain over bytes already in memory.
    pub async fn extract_bytes(&self, pdf: Bytes) -> Option<PdfExtraction> {
        let checksum = format!("{:x}", md5::compute(pdf.as_ref()));
        let selection = self.select(pdf).await?;
        Some(finish(selection, checksum, Utc::now()))
    }

    async fn select(&self, pdf: Bytes) -> Option<Selection> {
        let mut candidates = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            let candidate = self.attempt(backend, &pdf).await;
            if let Some(text) = candidate.text() {
                let verdict = classify(Some(text), &self.thresholds);
                if candidate.len() > self.min_content_length && !verdict.is_gibberish {
                    info!(
                        backend = %candidate.source(),
                        chars = candidate.len(),
                        "pdf text accepted"
                    );
                    return Some(Selection {
                        candidate,
                        confidence: Confidence::Accepted,
                        verdict,
                    });
                }
                debug!(
                    backend = %candidate.source(),
                    chars = candidate.len(),
                    failed_checks = ?verdict.failed_checks,
                    "candidate below quality bar"
                );
            }
            candidates.push(candidate);
        }

        // Ties keep the earlier backend.
        let Some(best) = candidates
            .into_iter()
            .filter(ExtractionCandidate::is_present)
            .reduce(|best, c| if c.len() > best.len() { c } else { best })
        else {
            warn!(backends = self.backends.len(), "every pdf backend failed");
            return None;
        };

        let verdict = classify(best.text(), &self.thresholds);
        warn!(
            backend = %best.source(),
            chars = best.len(),
            failed_checks = ?verdict.failed_checks,
            "no candidate passed quality checks, returning best effort"
        );
        Some(Selection {
            candidate: best,
            confidence: Confidence::BestEffort,
            verdict,
        })
    }

    /// One backend under the retry policy. Parsing runs on the blocking pool.
    async fn attempt(&self, backend: &Arc<dyn PdfBackend>, pdf: &Bytes) -> ExtractionCandidate {
        let kind = backend.kind();
        let result = with_retry(&self.retry, || {
            let backend = Arc::clone(backend);
            let pdf = pdf.clone();
            async move {
                match tokio::task::spawn_blocking(move || backend.extract(&pdf)).await {
                    Ok(result) => result,
                    Err(join_error) => Err(BackendError::Panicked(join_error.to_string())),
                }
            }
        })
        .await;

        match result {
            Ok(text) => {
                debug!(backend = %kind, produced = text.is_some(), "backend finished");
                ExtractionCandidate::new(kind, text)
            }
            Err(e) => {
                warn!(backend = %kind, error = %e, "pdf backend failed");
                ExtractionCandidate::failed(kind)
            }
        }
    }
}

fn finish(
    selection: Selection,
    checksum: String,
    fetched_at: chrono::DateTime<Utc>,
) -> PdfExtraction {
    let backend = selection.candidate.source();
    PdfExtraction {
        text: selection.candidate.into_text().unwrap_or_default(),
        backend,
        confidence: selection.confidence,
        verdict: selection.verdict,
        checksum,
        fetched_at,
    }
}
