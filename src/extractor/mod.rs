pub mod gibberish;
pub mod model;
pub mod normalize;

#[cfg(test)]
mod tests;

pub use gibberish::{Check, Thresholds, Verdict, classify, is_gibberish};
pub use model::{BackendKind, Confidence, ExtractionCandidate, PdfExtraction};
pub use normalize::{normalize, normalize_text};

use crate::fetcher::types::PageResponse;

/// Plain text of a fetched HTML page, or `None` when nothing readable is left.
pub fn article_text(resp: &PageResponse) -> Option<String> {
    let text = normalize_text(&resp.body_utf8);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}
