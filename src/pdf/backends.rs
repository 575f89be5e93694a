//! Parser-backed strategies for turning PDF bytes into text.

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::debug;

use crate::extractor::model::BackendKind;

/// `TJ` adjustments more negative than this (thousandths of an em) read as
/// a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("pdf parse error: {0}")]
    Parse(String),

    #[error("document is encrypted")]
    Encrypted,

    #[error("pdf library panicked: {0}")]
    Panicked(String),
}

/// One independent way of getting text out of a PDF.
///
/// `Ok(None)` means the backend ran but produced nothing usable.
#[cfg_attr(test, mockall::automock)]
pub trait PdfBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn extract(&self, pdf: &[u8]) -> Result<Option<String>, BackendError>;
}

/// General-purpose extraction through `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryBackend;

impl PdfBackend for LibraryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LibraryParse
    }

    fn extract(&self, pdf: &[u8]) -> Result<Option<String>, BackendError> {
        // pdf-extract panics on some malformed input instead of erroring.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(pdf)
        }));
        match result {
            Ok(Ok(text)) => Ok(non_blank(text)),
            Ok(Err(e)) => Err(BackendError::Parse(e.to_string())),
            Err(payload) => Err(BackendError::Panicked(panic_message(payload))),
        }
    }
}

/// How a page walk turns one page into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTextMode {
    /// `lopdf`'s own per-page text extraction.
    Library,
    /// Interpret the page's text-showing operators directly.
    ContentOperators,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWalkConfig {
    pub max_pages: usize,
    pub mode: PageTextMode,
    pub normalize_whitespace: bool,
}

impl PageWalkConfig {
    pub fn primary(max_pages: usize) -> Self {
        Self {
            max_pages,
            mode: PageTextMode::Library,
            normalize_whitespace: false,
        }
    }

    pub fn alternate(max_pages: usize) -> Self {
        Self {
            max_pages,
            mode: PageTextMode::ContentOperators,
            normalize_whitespace: true,
        }
    }
}

/// Page-by-page extraction through `lopdf`, bounded to `max_pages`.
#[derive(Debug, Clone)]
pub struct PageWalkBackend {
    kind: BackendKind,
    config: PageWalkConfig,
}

impl PageWalkBackend {
    pub fn new(kind: BackendKind, config: PageWalkConfig) -> Self {
        Self { kind, config }
    }

    pub fn primary(max_pages: usize) -> Self {
        Self::new(
            BackendKind::RenderedPageWalk,
            PageWalkConfig::primary(max_pages),
        )
    }

    pub fn alternate(max_pages: usize) -> Self {
        Self::new(
            BackendKind::AlternateRenderedPageWalk,
            PageWalkConfig::alternate(max_pages),
        )
    }

    fn walk(&self, pdf: &[u8]) -> Result<Option<String>, BackendError> {
        let doc = Document::load_mem(pdf).map_err(|e| BackendError::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(BackendError::Encrypted);
        }

        let pages = doc.get_pages();
        if pages.len() > self.config.max_pages {
            debug!(
                backend = %self.kind,
                pages = pages.len(),
                max_pages = self.config.max_pages,
                "page limit reached, trailing pages skipped"
            );
        }

        let mut texts = Vec::new();
        for (&number, &page_id) in pages.iter().take(self.config.max_pages) {
            let text = match self.config.mode {
                PageTextMode::Library => doc.extract_text(&[number]),
                PageTextMode::ContentOperators => operator_text(&doc, page_id),
            };
            match text {
                Ok(text) => texts.push(text),
                Err(e) => debug!(backend = %self.kind, page = number, "page skipped: {}", e),
            }
        }

        let mut text = texts.join("\n\n");
        if self.config.normalize_whitespace {
            text = normalize_whitespace(&text);
        }
        Ok(non_blank(text))
    }
}

impl PdfBackend for PageWalkBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn extract(&self, pdf: &[u8]) -> Result<Option<String>, BackendError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.walk(pdf))) {
            Ok(result) => result,
            Err(payload) => Err(BackendError::Panicked(panic_message(payload))),
        }
    }
}

/// Text shown by the `Tj`, `TJ`, `'` and `"` operators of one page.
fn operator_text(doc: &Document, page_id: ObjectId) -> lopdf::Result<String> {
    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)?;

    let mut out = String::new();
    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tj" => push_string_operands(&operation.operands, &mut out),
            "'" | "\"" => {
                push_line_break(&mut out);
                push_string_operands(&operation.operands, &mut out);
            }
            "TJ" => {
                for operand in &operation.operands {
                    let Object::Array(items) = operand else {
                        continue;
                    };
                    for item in items {
                        match item {
                            Object::String(bytes, _) => out.push_str(&decode_pdf_string(bytes)),
                            other => {
                                if other.as_float().is_ok_and(|n| n < -TJ_SPACE_THRESHOLD)
                                    && !out.ends_with(' ')
                                {
                                    out.push(' ');
                                }
                            }
                        }
                    }
                }
            }
            "Td" | "TD" | "T*" | "ET" => push_line_break(&mut out),
            _ => {}
        }
    }
    Ok(out)
}

fn push_string_operands(operands: &[Object], out: &mut String) {
    for operand in operands {
        if let Object::String(bytes, _) = operand {
            out.push_str(&decode_pdf_string(bytes));
        }
    }
}

fn push_line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// UTF-16BE when the string carries a byte-order mark, Latin-1 otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE_u8, 0xFF]) {
        let (text, _) = encoding_rs::UTF_16BE.decode_without_bom_handling(rest);
        return text.into_owned();
    }
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
