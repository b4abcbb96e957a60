//! Shared test infrastructure for router tests.
//!
//! Every test gets its own temporary directory holding the SQLite database
//! and the storage root, so tests can run in parallel.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use serde_json::Value;
use std::collections::HashMap;
use tempfile::TempDir;
use tower::util::ServiceExt;

use docfill_server::storage::Storage;
use docfill_server::{app, db, AppConfig, AppState};

pub const BOUNDARY: &str = "docfill-test-boundary";

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "response is not JSON ({e}): {}",
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

// ============================================================================
// APP SETUP
// ============================================================================

/// Build the router over a fresh database and storage root
pub fn test_app() -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let vars: HashMap<&str, String> = HashMap::from([
        (
            "DOCFILL_DATABASE",
            dir.path().join("docfill.db").display().to_string(),
        ),
        (
            "DOCFILL_STORAGE",
            dir.path().join("storage").display().to_string(),
        ),
    ]);
    let config =
        AppConfig::from_lookup(|name| vars.get(name).cloned()).expect("Failed to build config");

    let storage = Storage::new(&config.storage_root);
    storage.init().expect("Failed to init storage");
    let pool = db::init_pool(&config.database_path).expect("Failed to open test DB");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let state = AppState::new(pool, storage, config).expect("Failed to build state");
    let router = app(state.clone());
    TestApp { dir, state, router }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn json(&self, method: Method, uri: &str, body: Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
    }

    pub async fn multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(fields, file)))
                .unwrap(),
        )
        .await
    }

    /// Upload a template and assert it was created
    pub async fn create_template(&self, key: &str, pdf: &[u8]) -> Value {
        let response = self
            .multipart(
                "/api/templates",
                &[("key", key), ("name", "Test Template")],
                Some(("template.pdf", pdf)),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "{}",
            String::from_utf8_lossy(&response.body)
        );
        response.json()
    }
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

// ============================================================================
// PDF HELPERS
// ============================================================================

/// A PDF with `pages` empty A4 pages
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..pages {
        let contents_id = doc.add_object(Stream::new(Dictionary::new(), b"0 g".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Real(595.28), Object::Real(841.89)],
            "Resources" => Dictionary::new(),
            "Contents" => contents_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Decoded content stream of a 1-indexed page
pub fn page_content(pdf: &[u8], page: u32) -> String {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = doc.get_pages()[&page];
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).to_string()
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

/// Text as it appears in a content stream (hex string)
pub fn hex(text: &str) -> String {
    let mut out = String::from("<");
    for b in text.bytes() {
        out.push_str(&format!("{b:02X}"));
    }
    out.push('>');
    out
}
