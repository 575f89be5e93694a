use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{Config, FetchConfig};
use crate::extractor::model::{BackendKind, Confidence};
use crate::fetcher::Fetcher;
use crate::pdf::backends::tests::build_pdf;
use crate::pdf::backends::{BackendError, MockPdfBackend, PdfBackend};
use crate::pdf::orchestrator::{PdfTextExtractor, default_backends};
use crate::pdf::simple::ScannerExtractor;
use crate::pdf::{FAILED_PLACEHOLDER, LIMITED_PLACEHOLDER};
use crate::retry::RetryPolicy;

const PROSE: &str = "The committee met on Monday to review the budget for the coming year. \
    It is clear that the plan, which was drafted by the finance team, needs more work. \
    Members agreed to meet again in two weeks. ";

fn prose(len: usize) -> String {
    PROSE.repeat(len / PROSE.len() + 1).chars().take(len).collect()
}

fn noise(len: usize) -> String {
    "\u{01}\u{02}\u{03}\u{04}\u{05}".chars().cycle().take(len).collect()
}

fn test_config() -> Config {
    Config::default().with_retry(RetryPolicy::new(3, Duration::ZERO))
}

fn fetcher() -> Fetcher {
    Fetcher::new(&FetchConfig::default()).unwrap()
}

fn backend<F>(kind: BackendKind, calls: usize, result: F) -> Arc<dyn PdfBackend>
where
    F: Fn() -> Result<Option<String>, BackendError> + Send + 'static,
{
    let mut mock = MockPdfBackend::new();
    mock.expect_kind().return_const(kind);
    mock.expect_extract()
        .times(calls)
        .returning(move |_| result());
    Arc::new(mock)
}

async fn serve_pdf(server: &MockServer, body: Vec<u8>) -> String {
    Mock::given(method("GET"))
        .and(path("/paper.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(body),
        )
        .mount(server)
        .await;
    format!("{}/paper.pdf", server.uri())
}

#[tokio::test]
async fn test_first_backend_accepted_without_running_the_rest() {
    let server = MockServer::start().await;
    let url = serve_pdf(&server, b"%PDF-1.4 stub".to_vec()).await;
    let text = prose(2000);

    let expected = text.clone();
    let extractor = PdfTextExtractor::with_backends(
        &test_config(),
        fetcher(),
        vec![
            backend(BackendKind::LibraryParse, 1, move || Ok(Some(text.clone()))),
            backend(BackendKind::RenderedPageWalk, 0, || Ok(None)),
            backend(BackendKind::AlternateRenderedPageWalk, 0, || Ok(None)),
        ],
    );

    let result = extractor.extract_detailed(&url).await.unwrap();
    assert_eq!(result.text, expected);
    assert_eq!(result.text.chars().count(), 2000);
    assert_eq!(result.backend, BackendKind::LibraryParse);
    assert_eq!(result.confidence, Confidence::Accepted);
    assert!(!result.verdict.is_gibberish);
    assert_eq!(result.checksum, format!("{:x}", md5::compute(b"%PDF-1.4 stub")));
}

#[tokio::test]
async fn test_falls_through_failed_and_gibberish_backends() {
    let server = MockServer::start().await;
    let url = serve_pdf(&server, b"%PDF-1.4 stub".to_vec()).await;
    let text = prose(300);

    let expected = text.clone();
    let extractor = PdfTextExtractor::with_backends(
        &test_config(),
        fetcher(),
        vec![
            backend(BackendKind::LibraryParse, 3, || {
                Err(BackendError::Parse("xref table broken".to_string()))
            }),
            backend(BackendKind::RenderedPageWalk, 1, || Ok(Some(noise(50)))),
            backend(BackendKind::AlternateRenderedPageWalk, 1, move || {
                Ok(Some(text.clone()))
            }),
        ],
    );

    let result = extractor.extract_detailed(&url).await.unwrap();
    assert_eq!(result.text, expected);
    assert_eq!(result.backend, BackendKind::AlternateRenderedPageWalk);
    assert_eq!(result.confidence, Confidence::Accepted);
}

#[tokio::test]
async fn test_every_backend_failing_yields_none() {
    let server = MockServer::start().await;
    let url = serve_pdf(&server, b"%PDF-1.4 stub".to_vec()).await;

    let extractor = PdfTextExtractor::with_backends(
        &test_config(),
        fetcher(),
        vec![
            backend(BackendKind::LibraryParse, 3, || Err(BackendError::Encrypted)),
            backend(BackendKind::RenderedPageWalk, 1, || Ok(None)),
            backend(BackendKind::AlternateRenderedPageWalk, 3, || {
                Err(BackendError::Panicked("boom".to_string()))
            }),
        ],
    );

    assert_eq!(extractor.extract(&url).await, None);
}

#[tokio::test]
async fn test_longest_candidate_returned_as_best_effort() {
    let short_prose = prose(80);

    let expected = short_prose.clone();
    let extractor = PdfTextExtractor::with_backends(
        &test_config(),
        fetcher(),
        vec![
            backend(BackendKind::LibraryParse, 1, move || {
                Ok(Some(short_prose.clone()))
            }),
            backend(BackendKind::RenderedPageWalk, 1, || Ok(Some(noise(60)))),
            backend(BackendKind::AlternateRenderedPageWalk, 1, || Ok(None)),
        ],
    );

    let result = extractor
        .extract_bytes(Bytes::from_static(b"%PDF-1.4 stub"))
        .await
        .unwrap();
    assert_eq!(result.text, expected);
    assert_eq!(result.backend, BackendKind::LibraryParse);
    assert_eq!(result.confidence, Confidence::BestEffort);
}

#[tokio::test]
async fn test_best_effort_tie_keeps_earlier_backend() {
    let extractor = PdfTextExtractor::with_backends(
        &test_config(),
        fetcher(),
        vec![
            backend(BackendKind::LibraryParse, 1, || Ok(Some(noise(70)))),
            backend(BackendKind::RenderedPageWalk, 1, || Ok(Some(noise(70)))),
        ],
    );

    let result = extractor
        .extract_bytes(Bytes::from_static(b"%PDF-1.4 stub"))
        .await
        .unwrap();
    assert_eq!(result.backend, BackendKind::LibraryParse);
    assert_eq!(result.confidence, Confidence::BestEffort);
    assert!(result.verdict.is_gibberish);
}

#[tokio::test]
async fn test_fetch_failure_runs_no_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let extractor = PdfTextExtractor::with_backends(
        &test_config(),
        fetcher(),
        vec![backend(BackendKind::LibraryParse, 0, || Ok(None))],
    );

    let url = format!("{}/missing.pdf", server.uri());
    assert_eq!(extractor.extract(&url).await, None);
}

#[tokio::test]
async fn test_invalid_url_yields_none() {
    let extractor = PdfTextExtractor::new(&test_config()).unwrap();
    assert_eq!(extractor.extract("not a url").await, None);
}

#[tokio::test]
async fn test_real_backends_read_generated_pdf() {
    let sentences = [
        (
            "The committee met on Monday to review the budget for the year.",
            "It is clear that the plan needs more work from the finance team.",
        ),
        (
            "Members agreed to meet again in two weeks to settle the matter.",
            "The chair thanked the staff for the report and closed the session.",
        ),
    ];
    let pdf = build_pdf(&sentences);

    let extractor = PdfTextExtractor::with_backends(&test_config(), fetcher(), default_backends(100));
    let result = extractor.extract_bytes(Bytes::from(pdf)).await.unwrap();

    assert!(result.text.contains("review the budget"));
    assert!(result.text.contains("closed the session"));
}

#[tokio::test]
async fn test_scanner_extractor_reads_served_pdf() {
    let server = MockServer::start().await;
    let pdf = b"%PDF-1.4\n\
        4 0 obj\n<< /Length 120 >>\nstream\n\
        BT /F1 12 Tf 72 712 Td (The quarterly report shows strong growth in the northern region.) Tj ET\n\
        endstream\nendobj\n%%EOF";
    let url = serve_pdf(&server, pdf.to_vec()).await;

    let text = ScannerExtractor::new(fetcher()).extract(&url).await;
    assert_eq!(
        text,
        "The quarterly report shows strong growth in the northern region."
    );
}

#[tokio::test]
async fn test_scanner_extractor_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let scanner = ScannerExtractor::new(fetcher());

    let text = scanner.extract(&format!("{}/gone.pdf", server.uri())).await;
    assert_eq!(text, FAILED_PLACEHOLDER);

    let text = scanner.scan_bytes(Bytes::from_static(&[0u8; 512])).await;
    assert_eq!(text, LIMITED_PLACEHOLDER);
}
