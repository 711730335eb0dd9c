//! Test application factory for integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use certportal::assets::AssetLoader;
use certportal::server::{build_router, create_app_state, AppState};

use super::fixtures::{self, ADMIN_TOKEN, TEMPLATE_HEIGHT, TEMPLATE_WIDTH};

/// Test application with router and its own storage directory
pub struct TestApp {
    router: axum::Router,
    pub state: AppState,
    // Removed when the app is dropped
    dir: TempDir,
}

impl TestApp {
    /// Create a test application seeded from the fixture config
    pub fn new() -> Self {
        Self::with_config(|yaml| yaml)
    }

    /// Create a test application from an edited fixture config
    pub fn with_config(edit: impl FnOnce(String) -> String) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let templates = dir.path().join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        let template = fixtures::blank_png(TEMPLATE_WIDTH, TEMPLATE_HEIGHT);
        std::fs::write(templates.join("workshop.png"), &template).unwrap();
        std::fs::write(templates.join("retreat.png"), &template).unwrap();

        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, edit(fixtures::config_yaml(dir.path()))).unwrap();

        let fonts_dir = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/fonts"));
        let asset_loader = Arc::new(AssetLoader::new(Some(fonts_dir), Some(config_path)));

        // Same state and router as production
        let state = create_app_state(asset_loader).expect("Failed to create app state");
        let router = build_router(state.clone());

        Self { router, state, dir }
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.dir.path().join("templates")
    }

    pub fn certificates_dir(&self) -> PathBuf {
        self.dir.path().join("certificates")
    }

    /// Make a GET request to the given path
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Method::GET, path, &[], Body::empty()).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> TestResponse {
        self.send(
            Method::POST,
            path,
            &[("content-type", "application/json")],
            Body::from(body.to_string()),
        )
        .await
    }

    /// GET as the seeded admin
    pub async fn admin_get(&self, path: &str) -> TestResponse {
        let auth = admin_auth();
        self.send(Method::GET, path, &[("authorization", auth.as_str())], Body::empty())
            .await
    }

    /// DELETE as the seeded admin
    pub async fn admin_delete(&self, path: &str) -> TestResponse {
        let auth = admin_auth();
        self.send(Method::DELETE, path, &[("authorization", auth.as_str())], Body::empty())
            .await
    }

    /// JSON request as the seeded admin
    pub async fn admin_json(
        &self,
        method: Method,
        path: &str,
        body: serde_json::Value,
    ) -> TestResponse {
        let auth = admin_auth();
        self.send(
            method,
            path,
            &[("authorization", auth.as_str()), ("content-type", "application/json")],
            Body::from(body.to_string()),
        )
        .await
    }

    /// Raw body request as the seeded admin (uploads, CSV)
    pub async fn admin_upload(&self, method: Method, path: &str, body: Vec<u8>) -> TestResponse {
        let auth = admin_auth();
        self.send(
            method,
            path,
            &[
                ("authorization", auth.as_str()),
                ("content-type", "application/octet-stream"),
            ],
            Body::from(body),
        )
        .await
    }

    /// Send a request to the router
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Fetch a CAPTCHA for an event and return (captcha_id, answer)
    pub async fn solved_captcha(&self, event_id: u64, token: Option<&str>) -> (String, String) {
        let path = match token {
            Some(token) => format!("/api/events/{event_id}/captcha?token={token}"),
            None => format!("/api/events/{event_id}/captcha"),
        };
        let response = self.get(&path).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());

        let json: serde_json::Value = response.json();
        let id = json["captcha_id"].as_str().unwrap().to_string();
        let answer = fixtures::solve_captcha(json["question"].as_str().unwrap());
        (id, answer)
    }

    /// Solve a CAPTCHA and verify an email in one go
    pub async fn verify(&self, event_id: u64, email: &str, token: Option<&str>) -> TestResponse {
        let (captcha_id, answer) = self.solved_captcha(event_id, token).await;
        self.post_json(
            &format!("/api/events/{event_id}/verify"),
            serde_json::json!({
                "email": email,
                "captcha_id": captcha_id,
                "captcha_answer": answer,
                "token": token,
            }),
        )
        .await
    }

    /// Access token of a protected event, read through the admin API
    pub async fn access_token(&self, event_id: u64) -> String {
        let response = self
            .admin_get(&format!("/api/admin/events/{event_id}"))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        let json: serde_json::Value = response.json();
        json["event"]["access_token"]
            .as_str()
            .expect("Event is not protected")
            .to_string()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn admin_auth() -> String {
    format!("Bearer {ADMIN_TOKEN}")
}

/// Test response with convenience methods
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Get body as string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `error` field of a JSON error body
    pub fn error_message(&self) -> String {
        let json: serde_json::Value = self.json();
        json["error"].as_str().unwrap_or_default().to_string()
    }

    /// Check if response is a PNG image
    pub fn is_png(&self) -> bool {
        self.body.len() >= 8 && &self.body[0..8] == b"\x89PNG\r\n\x1a\n"
    }
}
