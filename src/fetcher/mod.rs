pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::{Fetcher, fetch_document};
pub use pipeline::process_page;
pub use errors::FetchError;
pub use types::{Charset, DocumentResponse, PageResponse};
