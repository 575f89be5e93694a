use crate::config::FetchConfig;
use crate::fetcher::{
    errors::{FetchError, is_retriable_status},
    types::DocumentResponse,
};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder, Response};
use tracing::{debug, instrument};

static DEFAULT_FETCHER: Lazy<Option<Fetcher>> =
    Lazy::new(|| Fetcher::new(&FetchConfig::default()).ok());

/// HTTP client for feed item links. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_body_bytes: u64,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Unknown(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Fetches a linked document (PDF or HTML page) as raw bytes.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn document(&self, url: &str) -> Result<DocumentResponse, FetchError> {
        let response = self
            .get(url, "application/pdf,text/html;q=0.9,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .await?;

        let url_final = response.url().clone();
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(str::to_string);

        let body = read_body(response, self.max_body_bytes).await?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        let document = DocumentResponse {
            url_final,
            status,
            content_type,
            body,
            fetched_at: Utc::now(),
        };
        debug!(
            status = %document.status,
            content_type = ?document.content_type,
            bytes = document.body.len(),
            pdf = document.looks_like_pdf(),
            "document fetched"
        );
        Ok(document)
    }

    async fn get(&self, url: &str, accept: &str) -> Result<Response, FetchError> {
        let parsed_url = url::Url::parse(url)?;

        let response = self
            .client
            .get(parsed_url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status,
                retriable: is_retriable_status(status),
            });
        }

        if let Some(content_length) = response.content_length()
            && content_length > self.max_body_bytes
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        Ok(response)
    }
}

/// Streams the body, giving up as soon as it grows past `limit`.
async fn read_body(mut response: Response, limit: u64) -> Result<Bytes, FetchError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetchError::Io(e.to_string()))?
    {
        let total = (body.len() + chunk.len()) as u64;
        // Content-Length may be missing or wrong.
        if total > limit {
            return Err(FetchError::BodyTooLarge(total));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn default_fetcher() -> Result<&'static Fetcher, FetchError> {
    DEFAULT_FETCHER
        .as_ref()
        .ok_or_else(|| FetchError::Unknown("default http client unavailable".to_string()))
}

/// Fetches a document with the default settings.
pub async fn fetch_document(url: &str) -> Result<DocumentResponse, FetchError> {
    default_fetcher()?.document(url).await
}
