pub mod backends;
pub mod orchestrator;
pub mod scanner;
pub mod simple;

#[cfg(test)]
mod tests;

pub use backends::{BackendError, LibraryBackend, PageWalkBackend, PdfBackend};
pub use orchestrator::{PdfTextExtractor, default_backends};
pub use scanner::{FAILED_PLACEHOLDER, LIMITED_PLACEHOLDER, scan};
pub use simple::ScannerExtractor;
