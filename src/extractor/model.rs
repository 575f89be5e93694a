use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extractor::gibberish::Verdict;

/// The strategy that produced a piece of PDF text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    LibraryParse,
    RenderedPageWalk,
    AlternateRenderedPageWalk,
    ByteScanner,
    RawDecode,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LibraryParse => "library_parse",
            Self::RenderedPageWalk => "rendered_page_walk",
            Self::AlternateRenderedPageWalk => "alternate_rendered_page_walk",
            Self::ByteScanner => "byte_scanner",
            Self::RawDecode => "raw_decode",
        };
        f.write_str(name)
    }
}

/// Output of one backend attempt, before quality adjudication.
///
/// `text == None` means the backend failed; it never stands for "the
/// document is empty".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionCandidate {
    source: BackendKind,
    text: Option<String>,
    length: usize,
}

impl ExtractionCandidate {
    pub fn new(source: BackendKind, text: Option<String>) -> Self {
        let length = text.as_deref().map_or(0, |t| t.chars().count());
        Self {
            source,
            text,
            length,
        }
    }

    pub fn failed(source: BackendKind) -> Self {
        Self::new(source, None)
    }

    pub fn source(&self) -> BackendKind {
        self.source
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Character count of the text; 0 for a failed attempt.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_present(&self) -> bool {
        self.text.is_some()
    }

    pub fn into_text(self) -> Option<String> {
        self.text
    }
}

/// Whether the returned text cleared the quality bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Accepted,
    BestEffort,
}

/// Final result of one PDF extraction call.
#[derive(Debug, Clone, Serialize)]
pub struct PdfExtraction {
    pub text: String,
    pub backend: BackendKind,
    pub confidence: Confidence,
    pub verdict: Verdict,
    pub checksum: String,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_counts_characters() {
        let candidate =
            ExtractionCandidate::new(BackendKind::LibraryParse, Some("naïve café".to_string()));
        assert_eq!(candidate.len(), 10);
        assert!(candidate.is_present());
    }

    #[test]
    fn test_failed_candidate_has_no_text() {
        let candidate = ExtractionCandidate::failed(BackendKind::RenderedPageWalk);
        assert!(!candidate.is_present());
        assert!(candidate.is_empty());
        assert_eq!(candidate.text(), None);
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::ByteScanner.to_string(), "byte_scanner");
        assert_eq!(
            BackendKind::AlternateRenderedPageWalk.to_string(),
            "alternate_rendered_page_walk"
        );
    }
}
