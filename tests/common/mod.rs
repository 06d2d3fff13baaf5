#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tempfile::TempDir;

use hanzi_cards::build_router;
use hanzi_cards::db::Database;
use hanzi_cards::services::pinyin::{PinyinOverrides, PinyinResolver};
use hanzi_cards::state::AppState;

pub const BOUNDARY: &str = "hanzi-cards-test-boundary";

pub struct TestContext {
    _dir: TempDir,
    pub db: Database,
    pub resolver: Arc<PinyinResolver>,
    pub state: AppState,
}

impl TestContext {
    pub fn app(&self) -> Router {
        build_router(self.state.clone())
    }
}

pub async fn create_test_db() -> (TempDir, Database) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("test.db").display());
    let db = Database::connect(&url)
        .await
        .expect("failed to open test database");
    (dir, db)
}

pub fn test_resolver() -> PinyinResolver {
    let mut entries = HashMap::new();
    entries.insert("行".to_string(), vec!["xíng".to_string(), "háng".to_string()]);
    PinyinResolver::with_overrides(PinyinOverrides::from_map(entries))
}

pub async fn create_test_context() -> TestContext {
    let (dir, db) = create_test_db().await;
    let resolver = Arc::new(test_resolver());
    let state = AppState::new(db.clone(), Arc::clone(&resolver), None);
    TestContext {
        _dir: dir,
        db,
        resolver,
        state,
    }
}

pub fn multipart_upload(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/characters/import")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response is not JSON")
}
