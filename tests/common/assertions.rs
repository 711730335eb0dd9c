//! Assertion helpers for tests.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use super::app::TestResponse;

/// Assert response has expected status code
pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status,
        expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );
}

/// Assert response is OK (200)
pub fn assert_ok(response: &TestResponse) {
    assert_status(response, StatusCode::OK);
}

/// Assert a JSON error with the given status and message
pub fn assert_error(response: &TestResponse, expected: StatusCode, message: &str) {
    assert_status(response, expected);
    let json: serde_json::Value = response.json();
    assert_eq!(json["status"].as_u64(), Some(expected.as_u16() as u64));
    assert_eq!(json["error"].as_str(), Some(message));
}

/// Assert response is a PNG image, returning its dimensions
pub fn assert_png(response: &TestResponse) -> (u32, u32) {
    assert_ok(response);
    assert!(
        response.is_png(),
        "Expected PNG image, got {} bytes starting with {:?}",
        response.body.len(),
        &response.body[..8.min(response.body.len())]
    );
    assert_eq!(
        response.header("content-type"),
        Some("image/png"),
        "Expected Content-Type: image/png"
    );

    let img = image::load_from_memory(&response.body).expect("Failed to decode PNG");
    (img.width(), img.height())
}

/// Assert the certificate headers of a delivered PNG
pub fn assert_certificate(response: &TestResponse, disposition: &str, filename: &str) {
    assert_png(response);
    assert_eq!(response.header("cache-control"), Some("no-store, private"));

    let value = response
        .header("content-disposition")
        .expect("Missing Content-Disposition");
    assert!(
        value.starts_with(&format!("{disposition}; filename=\"{filename}\"")),
        "Unexpected Content-Disposition: {value}"
    );
}
