//! Integration tests for the PDF Toolbox HTTP service

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use lopdf::{Dictionary, Document, Object, Stream};
use serde_json::Value;
use tower::ServiceExt;

use pdf_toolbox::{
    config::Config,
    error::AppResult,
    handlers::{create_router, AppState},
    services::{CompressionParams, PdfCompressor},
};

const BOUNDARY: &str = "pdf-toolbox-test-boundary";

/// Halves every input, or fails when `fail` is set.
struct HalvingCompressor {
    fail: bool,
}

#[async_trait]
impl PdfCompressor for HalvingCompressor {
    async fn compress(&self, input: &[u8], _params: &CompressionParams) -> AppResult<Vec<u8>> {
        if self.fail {
            return Err(pdf_toolbox::AppError::processing("compressor offline"));
        }
        Ok(input[..input.len() / 2].to_vec())
    }

    fn is_available(&self) -> bool {
        !self.fail
    }
}

/// Holds every request long enough for concurrent requests to overlap.
struct SlowCompressor {
    delay: Duration,
}

#[async_trait]
impl PdfCompressor for SlowCompressor {
    async fn compress(&self, input: &[u8], _params: &CompressionParams) -> AppResult<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        Ok(input[..input.len() / 2].to_vec())
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn app() -> Router {
    app_with(HalvingCompressor { fail: false })
}

fn app_with(compressor: HalvingCompressor) -> Router {
    create_router(AppState::new(Config::default(), Arc::new(compressor)))
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                let disposition = format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    name, value
                );
                body.extend_from_slice(disposition.as_bytes());
            }
            Part::File(name, filename, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn error_code(response: Response) -> String {
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["success"], false);
    json["error"]["code"].as_str().unwrap().to_string()
}

fn create_test_pdf(num_pages: u32, content_prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for page_num in 1..=num_pages {
        let content = format!(
            "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET",
            content_prefix, page_num
        );
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        let media_box = [0, 0, 612, 792].into_iter().map(Object::Integer).collect();
        page.set("MediaBox", Object::Array(media_box));
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(num_pages as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes).unwrap().get_pages().len()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["services"]["ghostscript"], true);
    assert_eq!(json["rate_limiting"]["max_concurrent_requests"], 8);
}

#[tokio::test]
async fn test_health_is_degraded_without_compressor() {
    let response = app_with(HalvingCompressor { fail: true })
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "degraded");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let response = app()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_index_sets_splash_cookie_once() {
    let first = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert!(first.headers().contains_key(header::SET_COOKIE));
    let html = String::from_utf8(body_bytes(first).await).unwrap();
    assert!(html.contains("splash-screen"));

    let returning = app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, "splash_seen=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(!returning.headers().contains_key(header::SET_COOKIE));
    let html = String::from_utf8(body_bytes(returning).await).unwrap();
    assert!(!html.contains("splash-screen"));
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let response = app()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_compress_with_tier() {
    let pdf = create_test_pdf(2, "Doc");
    let request = multipart_request(
        "/api/v1/compress",
        &[Part::File("file", "report.pdf", &pdf), Part::Text("quality", "high")],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("report_compressed.pdf"));
    assert_eq!(headers["x-original-size"], pdf.len().to_string().as_str());
    assert_eq!(headers["x-compressed-size"], (pdf.len() / 2).to_string().as_str());

    let body = body_bytes(response).await;
    assert_eq!(body.len(), pdf.len() / 2);
}

#[tokio::test]
async fn test_compress_with_target_size() {
    let pdf = create_test_pdf(1, "Doc");
    let request = multipart_request(
        "/api/v1/compress",
        &[
            Part::File("file", "small.pdf", &pdf),
            Part::Text("quality", "medium"),
            Part::Text("target_size_mb", "1"),
        ],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.len() <= 1024 * 1024);
}

#[tokio::test]
async fn test_compress_falls_back_to_original_on_failure() {
    let pdf = create_test_pdf(1, "Doc");
    let request = multipart_request("/api/v1/compress", &[Part::File("file", "doc.pdf", &pdf)]);

    let response = app_with(HalvingCompressor { fail: true }).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-reduction-percent"], "0.0");
    assert_eq!(body_bytes(response).await, pdf);
}

#[tokio::test]
async fn test_compress_rejects_bad_target() {
    let pdf = create_test_pdf(1, "Doc");
    let request = multipart_request(
        "/api/v1/compress",
        &[Part::File("file", "doc.pdf", &pdf), Part::Text("target_size_mb", "lots")],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_compress_without_file() {
    let request = multipart_request("/api/v1/compress", &[Part::Text("quality", "low")]);

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "MISSING_FILE");
}

#[tokio::test]
async fn test_non_pdf_upload_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/info")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nplain text\r\n--{b}--\r\n",
            b = BOUNDARY
        )))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "INVALID_FILE");
}

#[tokio::test]
async fn test_oversized_upload_reports_exact_size() {
    let config = Config {
        max_file_size_mb: 1,
        ..Config::default()
    };
    let app = create_router(AppState::new(config, Arc::new(HalvingCompressor { fail: false })));

    let mut pdf = create_test_pdf(1, "Doc");
    pdf.resize(1024 * 1024 + 512 * 1024, b' ');
    let request = multipart_request("/api/v1/compress", &[Part::File("file", "big.pdf", &pdf)]);

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"]["code"], "FILE_TOO_LARGE");
    assert_eq!(
        json["error"]["message"],
        "File too large: 1.50 MB exceeds limit of 1MB"
    );
}

#[tokio::test]
async fn test_split_range_returns_zip() {
    let pdf = create_test_pdf(10, "Doc");
    let request = multipart_request(
        "/api/v1/split",
        &[
            Part::File("file", "book.pdf", &pdf),
            Part::Text("mode", "range"),
            Part::Text("pages", "1-3, 5, 7-10"),
        ],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(response.headers()["x-file-count"], "8");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("book_pages.zip"));

    let body = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "page_1.pdf", "page_10.pdf", "page_2.pdf", "page_3.pdf",
            "page_5.pdf", "page_7.pdf", "page_8.pdf", "page_9.pdf",
        ]
    );

    let mut entry = archive.by_name("page_5.pdf").unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    assert_eq!(page_count(&content), 1);
}

#[tokio::test]
async fn test_split_all_pages() {
    let pdf = create_test_pdf(3, "Doc");
    let request = multipart_request(
        "/api/v1/split",
        &[Part::File("file", "three.pdf", &pdf), Part::Text("mode", "all")],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-file-count"], "3");
}

#[tokio::test]
async fn test_split_single_page_download() {
    let pdf = create_test_pdf(5, "Doc");
    let request = multipart_request(
        "/api/v1/split",
        &[
            Part::File("file", "report.pdf", &pdf),
            Part::Text("mode", "all"),
            Part::Text("page", "3"),
        ],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("report_page_3.pdf"));

    let mut doc = Document::load_mem(&body_bytes(response).await).unwrap();
    doc.decompress();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);
    let content = doc.get_page_content(pages[&1]).unwrap();
    assert!(String::from_utf8_lossy(&content).contains("Doc-Page-3"));
}

#[tokio::test]
async fn test_split_single_page_out_of_range() {
    let pdf = create_test_pdf(2, "Doc");
    let request = multipart_request(
        "/api/v1/split",
        &[Part::File("file", "report.pdf", &pdf), Part::Text("page", "7")],
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "NO_PAGES_SELECTED");

    let request = multipart_request(
        "/api/v1/split",
        &[Part::File("file", "report.pdf", &pdf), Part::Text("page", "third")],
    );
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_split_with_no_matching_pages() {
    let pdf = create_test_pdf(3, "Doc");
    let request = multipart_request(
        "/api/v1/split",
        &[
            Part::File("file", "three.pdf", &pdf),
            Part::Text("mode", "range"),
            Part::Text("pages", "5-2, 9"),
        ],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "NO_PAGES_SELECTED");
}

#[tokio::test]
async fn test_split_range_requires_pages() {
    let pdf = create_test_pdf(3, "Doc");
    let request = multipart_request(
        "/api/v1/split",
        &[
            Part::File("file", "three.pdf", &pdf),
            Part::Text("mode", "range"),
            Part::Text("pages", "   "),
        ],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_split_unreadable_pdf() {
    let request = multipart_request(
        "/api/v1/split",
        &[Part::File("file", "broken.pdf", b"%PDF-1.4 this is not really a pdf")],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "UNREADABLE_PDF");
}

#[tokio::test]
async fn test_merge_preserves_order() {
    let first = create_test_pdf(1, "First");
    let second = create_test_pdf(2, "Second");
    let third = create_test_pdf(1, "Third");
    let request = multipart_request(
        "/api/v1/merge",
        &[
            Part::File("files", "a.pdf", &first),
            Part::File("files", "b.pdf", &second),
            Part::File("files", "c.pdf", &third),
        ],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("merged.pdf"));

    let mut doc = Document::load_mem(&body_bytes(response).await).unwrap();
    doc.decompress();
    let texts: Vec<String> = doc
        .get_pages()
        .into_values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).to_string())
        .collect();
    assert_eq!(texts.len(), 4);
    assert!(texts[0].contains("First-Page-1"));
    assert!(texts[1].contains("Second-Page-1"));
    assert!(texts[2].contains("Second-Page-2"));
    assert!(texts[3].contains("Third-Page-1"));
}

#[tokio::test]
async fn test_merge_needs_two_files() {
    let pdf = create_test_pdf(1, "Only");
    let request = multipart_request("/api/v1/merge", &[Part::File("files", "a.pdf", &pdf)]);

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "NOT_ENOUGH_FILES");
}

#[tokio::test]
async fn test_info_reports_page_count() {
    let pdf = create_test_pdf(4, "Doc");
    let request = multipart_request("/api/v1/info", &[Part::File("file", "four.pdf", &pdf)]);

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["pages"], 4);
    assert_eq!(json["data"]["file_name"], "four.pdf");
    assert_eq!(json["data"]["file_size_bytes"], pdf.len());
}

#[tokio::test]
async fn test_concurrency_limit_rejects_excess_requests() {
    let config = Config {
        max_concurrent_requests: 2,
        ..Config::default()
    };
    let compressor = SlowCompressor {
        delay: Duration::from_millis(300),
    };
    let app = create_router(AppState::new(config, Arc::new(compressor)));
    let pdf = create_test_pdf(1, "Doc");

    let send = |app: Router| {
        let request = multipart_request("/api/v1/compress", &[Part::File("file", "doc.pdf", &pdf)]);
        async move { app.oneshot(request).await.unwrap() }
    };
    let (first, second, third) = tokio::join!(
        send(app.clone()),
        send(app.clone()),
        send(app.clone())
    );

    let mut statuses = vec![first.status(), second.status(), third.status()];
    statuses.sort();
    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );

    let rejected = [first, second, third]
        .into_iter()
        .find(|response| response.status() == StatusCode::TOO_MANY_REQUESTS)
        .unwrap();
    assert_eq!(error_code(rejected).await, "RATE_LIMIT_EXCEEDED");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["rate_limiting"]["total_requests"], 3);
    assert_eq!(json["rate_limiting"]["rejected_requests"], 1);
    assert_eq!(json["rate_limiting"]["available_permits"], 2);
}
