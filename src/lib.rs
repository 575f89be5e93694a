pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod pdf;
pub mod pipeline;
pub mod retry;

pub use pipeline::{ContentSource, ExtractionPipeline, ItemText, PdfStrategy};
