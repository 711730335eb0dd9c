//! Admin API: authentication, event management, templates, placement,
//! participants, CSV import and activity logs.

mod common;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use common::fixtures::{events, participants, TEMPLATE_HEIGHT, TEMPLATE_WIDTH};
use common::*;
use serde_json::{json, Value};

/// Create an event through the API and return its id
async fn create_event(app: &TestApp, name: &str) -> u64 {
    let response = app
        .admin_json(Method::POST, "/api/admin/events", json!({ "name": name }))
        .await;
    assert_status(&response, StatusCode::CREATED);
    let json: Value = response.json();
    json["id"].as_u64().unwrap()
}

async fn upload_template(app: &TestApp, event_id: u64, filename: &str, data: Vec<u8>) -> TestResponse {
    app.admin_upload(
        Method::PUT,
        &format!("/api/admin/events/{event_id}/template?filename={filename}"),
        data,
    )
    .await
}

fn files_in(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_admin_requires_bearer_token() {
    let app = TestApp::new();

    let response = app.get("/api/admin/events").await;
    assert_error(&response, StatusCode::UNAUTHORIZED, "Unauthorized");

    for value in ["Bearer wrong-token", "Basic dGVzdGVyOnB3", "Bearer "] {
        let response = app
            .send(
                Method::GET,
                "/api/admin/dashboard",
                &[("authorization", value)],
                Body::empty(),
            )
            .await;
        assert_status(&response, StatusCode::UNAUTHORIZED);
    }

    // mutating routes are guarded too
    let response = app
        .send(
            Method::DELETE,
            &format!("/api/admin/events/{}", events::WORKSHOP),
            &[],
            Body::empty(),
        )
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
    assert_ok(&app.get(&format!("/api/events/{}", events::WORKSHOP)).await);
}

#[tokio::test]
async fn test_dashboard() {
    let app = TestApp::new();

    let response = app.admin_get("/api/admin/dashboard").await;
    assert_ok(&response);
    let json: Value = response.json();
    assert_eq!(json["stats"]["total_events"], 4);
    assert_eq!(json["stats"]["visible_events"], 3);
    assert_eq!(json["stats"]["total_participants"], 5);
    assert_eq!(json["stats"]["total_downloads"], 0);
    assert_eq!(json["recent_downloads"], json!([]));
}

#[tokio::test]
async fn test_admin_lists_all_events() {
    let app = TestApp::new();

    let response = app.admin_get("/api/admin/events").await;
    assert_ok(&response);
    let json: Value = response.json();
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 4);

    let workshop = list.iter().find(|e| e["id"] == events::WORKSHOP).unwrap();
    assert_eq!(workshop["participant_count"], 2);
    assert_eq!(workshop["template_filename"], "workshop.png");
    assert_eq!(workshop["placement"]["font_key"], "arial");
    assert_eq!(workshop["placement"]["font_color"], "#1A1A80");

    let hidden = list.iter().find(|e| e["id"] == events::HIDDEN).unwrap();
    assert_eq!(hidden["is_visible"], false);
}

#[tokio::test]
async fn test_create_and_update_event() {
    let app = TestApp::new();

    let response = app
        .admin_json(
            Method::POST,
            "/api/admin/events",
            json!({
                "name": "  Rust Meetup  ",
                "description": "Monthly",
                "event_date": "2026-09-01",
            }),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["name"], "Rust Meetup");
    assert_eq!(created["event_date"], "2026-09-01");
    assert_eq!(created["is_visible"], true);
    assert_eq!(created["template_filename"], Value::Null);
    let id = created["id"].as_u64().unwrap();

    let response = app
        .admin_json(
            Method::PUT,
            &format!("/api/admin/events/{id}"),
            json!({ "description": "", "event_date": "2026-10-01" }),
        )
        .await;
    assert_ok(&response);
    let updated: Value = response.json();
    assert_eq!(updated["name"], "Rust Meetup");
    assert_eq!(updated["description"], Value::Null);
    assert_eq!(updated["event_date"], "2026-10-01");

    // new events are public right away
    let response = app.get(&format!("/api/events/{id}")).await;
    assert_ok(&response);
}

#[tokio::test]
async fn test_create_event_validation() {
    let app = TestApp::new();

    let response = app
        .admin_json(Method::POST, "/api/admin/events", json!({ "name": "   " }))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "Event name is required");

    let response = app
        .admin_json(
            Method::POST,
            "/api/admin/events",
            json!({ "name": "Bad Date", "event_date": "01.09.2026" }),
        )
        .await;
    assert_error(
        &response,
        StatusCode::BAD_REQUEST,
        "Invalid date format. Use YYYY-MM-DD.",
    );

    let response = app.admin_get("/api/admin/events/999").await;
    assert_error(&response, StatusCode::NOT_FOUND, "Event not found");
}

#[tokio::test]
async fn test_toggle_visibility() {
    let app = TestApp::new();
    let path = format!("/api/admin/events/{}/visibility", events::WORKSHOP);

    let response = app.admin_json(Method::POST, &path, json!({})).await;
    assert_ok(&response);
    let json: Value = response.json();
    assert_eq!(json["is_visible"], false);
    assert_status(
        &app.get(&format!("/api/events/{}", events::WORKSHOP)).await,
        StatusCode::NOT_FOUND,
    );

    let response = app.admin_json(Method::POST, &path, json!({})).await;
    let json: Value = response.json();
    assert_eq!(json["is_visible"], true);
}

#[tokio::test]
async fn test_protection_issues_fresh_tokens() {
    let app = TestApp::new();
    let path = format!("/api/admin/events/{}/protection", events::WORKSHOP);
    let public = format!("/api/events/{}", events::WORKSHOP);

    let response = app
        .admin_json(Method::POST, &path, json!({ "enabled": true }))
        .await;
    assert_ok(&response);
    let first: Value = response.json();
    assert_eq!(first["is_protected"], true);
    let first_token = first["access_token"].as_str().unwrap().to_string();
    assert_eq!(first_token.len(), 64);
    assert_eq!(
        first["event_url"],
        format!("/api/events/{}?token={first_token}", events::WORKSHOP)
    );

    assert_status(&app.get(&public).await, StatusCode::FORBIDDEN);
    assert_ok(&app.get(&format!("{public}?token={first_token}")).await);

    let response = app
        .admin_json(Method::POST, &path, json!({ "enabled": true }))
        .await;
    let second: Value = response.json();
    let second_token = second["access_token"].as_str().unwrap();
    assert_ne!(second_token, first_token);
    assert_status(
        &app.get(&format!("{public}?token={first_token}")).await,
        StatusCode::FORBIDDEN,
    );

    let response = app
        .admin_json(Method::POST, &path, json!({ "enabled": false }))
        .await;
    let disabled: Value = response.json();
    assert_eq!(disabled["is_protected"], false);
    assert!(disabled.get("access_token").is_none());
    assert_ok(&app.get(&public).await);
}

#[tokio::test]
async fn test_archive_and_restore() {
    let app = TestApp::new();
    let path = format!("/api/admin/events/{}/archive", events::WORKSHOP);

    let response = app
        .admin_json(Method::POST, &path, json!({ "archived": true }))
        .await;
    assert_ok(&response);
    let archived: Value = response.json();
    assert_eq!(archived["is_archived"], true);
    assert_eq!(archived["show_in_archive"], false);
    assert!(archived["archived_at"].is_string());

    // archived but not shown
    let list: Value = app.get("/api/archive").await.json();
    assert_eq!(list, json!([]));

    let response = app
        .admin_json(Method::POST, &path, json!({ "archived": false }))
        .await;
    let restored: Value = response.json();
    assert_eq!(restored["is_archived"], false);
    assert_eq!(restored["archived_at"], Value::Null);
}

#[tokio::test]
async fn test_template_upload_and_download() {
    let app = TestApp::new();
    let id = create_event(&app, "Template Test").await;

    let png = fixtures::blank_png(300, 150);
    let response = upload_template(&app, id, "My_Design.PNG", png.clone()).await;
    assert_ok(&response);
    let json: Value = response.json();
    assert_eq!(json["width"], 300);
    assert_eq!(json["height"], 150);
    // first template centres the name
    assert_eq!(json["placement"]["x_percent"], 50.0);
    assert_eq!(json["placement"]["y_percent"], 50.0);
    let filename = json["filename"].as_str().unwrap().to_string();
    assert!(filename.starts_with("template_Template_Test_"), "{filename}");
    assert!(filename.ends_with(".png"));
    assert!(app.templates_dir().join(&filename).exists());

    let response = app
        .admin_get(&format!("/api/admin/events/{id}/template"))
        .await;
    assert_ok(&response);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(response.body, png);

    // replacing removes the old file
    let response = upload_template(&app, id, "design.jpg", fixtures::blank_jpeg(300, 150)).await;
    assert_ok(&response);
    let replacement: Value = response.json();
    let new_filename = replacement["filename"].as_str().unwrap();
    assert!(new_filename.ends_with(".jpg"));
    assert!(!app.templates_dir().join(&filename).exists());
    assert!(app.templates_dir().join(new_filename).exists());

    let response = app
        .admin_get(&format!("/api/admin/events/{id}/template"))
        .await;
    assert_eq!(response.header("content-type"), Some("image/jpeg"));
}

#[tokio::test]
async fn test_template_upload_rejects_bad_files() {
    let app = TestApp::new();
    let id = create_event(&app, "Bad Uploads").await;
    let before = files_in(&app.templates_dir());

    // PNG content with a JPEG name
    let response = upload_template(&app, id, "design.jpg", fixtures::blank_png(10, 10)).await;
    assert_status(&response, StatusCode::BAD_REQUEST);

    let response = upload_template(&app, id, "design.gif", fixtures::blank_png(10, 10)).await;
    assert_status(&response, StatusCode::BAD_REQUEST);

    let response = upload_template(&app, id, "design.png", b"not an image".to_vec()).await;
    assert_status(&response, StatusCode::BAD_REQUEST);

    // truncated PNG
    let mut broken = fixtures::blank_png(10, 10);
    broken.truncate(20);
    let response = upload_template(&app, id, "design.png", broken).await;
    assert_status(&response, StatusCode::BAD_REQUEST);

    assert_eq!(files_in(&app.templates_dir()), before);
    let detail: Value = app
        .admin_get(&format!("/api/admin/events/{id}"))
        .await
        .json();
    assert_eq!(detail["event"]["template_filename"], Value::Null);
}

#[tokio::test]
async fn test_delete_template() {
    let app = TestApp::new();
    let path = format!("/api/admin/events/{}/template", events::WORKSHOP);

    let response = app.admin_delete(&path).await;
    assert_status(&response, StatusCode::NO_CONTENT);
    assert!(!app.templates_dir().join("workshop.png").exists());

    let detail: Value = app
        .admin_get(&format!("/api/admin/events/{}", events::WORKSHOP))
        .await
        .json();
    assert_eq!(detail["event"]["template_filename"], Value::Null);
    assert_eq!(detail["event"]["placement"]["x_percent"], Value::Null);

    let response = app.admin_delete(&path).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_placement_requires_template() {
    let app = TestApp::new();

    let response = app
        .admin_json(
            Method::PUT,
            &format!("/api/admin/events/{}/placement", events::NO_TEMPLATE),
            json!({ "x_percent": 30, "y_percent": 60 }),
        )
        .await;
    assert_error(
        &response,
        StatusCode::BAD_REQUEST,
        "Upload a template before positioning the name.",
    );
}

#[tokio::test]
async fn test_placement_is_clamped_and_merged() {
    let app = TestApp::new();
    let path = format!("/api/admin/events/{}/placement", events::WORKSHOP);

    let response = app
        .admin_json(
            Method::PUT,
            &path,
            json!({ "x_percent": 150, "y_percent": -5, "font_size": 500 }),
        )
        .await;
    assert_ok(&response);
    let placement: Value = response.json();
    assert_eq!(placement["x_percent"], 100.0);
    assert_eq!(placement["y_percent"], 0.0);
    assert_eq!(placement["font_size"], 200);
    // omitted fields keep their values
    assert_eq!(placement["font_color"], "#1A1A80");
    assert_eq!(placement["font_key"], "arial");

    let response = app
        .admin_json(
            Method::PUT,
            &path,
            json!({
                "x_percent": 25.5,
                "y_percent": 75,
                "font_size": 2,
                "font_color": "not-a-colour",
                "font_key": "Times New Roman",
            }),
        )
        .await;
    assert_ok(&response);
    let placement: Value = response.json();
    assert_eq!(placement["x_percent"], 25.5);
    assert_eq!(placement["font_size"], 8);
    assert_eq!(placement["font_color"], "#000000");
    assert_eq!(placement["font_key"], "arial");
}

#[tokio::test]
async fn test_admin_preview() {
    let app = TestApp::new();

    let response = app
        .admin_get(&format!(
            "/api/admin/events/{}/preview?name=Ada%20Lovelace",
            events::WORKSHOP
        ))
        .await;
    assert_eq!(assert_png(&response), (TEMPLATE_WIDTH, TEMPLATE_HEIGHT));
    assert_eq!(response.header("cache-control"), Some("no-store, private"));

    // default sample name
    let response = app
        .admin_get(&format!("/api/admin/events/{}/preview", events::WORKSHOP))
        .await;
    assert_png(&response);

    let response = app
        .admin_get(&format!("/api/admin/events/{}/preview", events::NO_TEMPLATE))
        .await;
    assert_error(
        &response,
        StatusCode::NOT_FOUND,
        "Certificate template not found.",
    );
}

#[tokio::test]
async fn test_participant_crud() {
    let app = TestApp::new();
    let list_path = format!("/api/admin/events/{}/participants", events::NO_TEMPLATE);

    let response = app
        .admin_json(
            Method::POST,
            &list_path,
            json!({ "name": " Carol ", "email": "Carol@Example.com" }),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);
    let carol: Value = response.json();
    assert_eq!(carol["name"], "Carol");
    assert_eq!(carol["email"], "carol@example.com");
    assert_eq!(carol["event_id"], events::NO_TEMPLATE);
    let carol_id = carol["id"].as_u64().unwrap();

    // emails are unique per event, case-insensitively
    let response = app
        .admin_json(
            Method::POST,
            &list_path,
            json!({ "name": "Carol Again", "email": "CAROL@example.com" }),
        )
        .await;
    assert_error(
        &response,
        StatusCode::CONFLICT,
        "A participant with this email already exists for this event.",
    );

    // but may repeat across events
    let response = app
        .admin_json(
            Method::POST,
            &format!("/api/admin/events/{}/participants", events::WORKSHOP),
            json!({ "name": "Carol", "email": "carol@example.com" }),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);

    let response = app
        .admin_json(
            Method::POST,
            &list_path,
            json!({ "name": "Dave", "email": "dave@" }),
        )
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "Invalid email format");

    let response = app
        .admin_json(
            Method::PUT,
            &format!("/api/admin/participants/{carol_id}"),
            json!({ "name": "Carol Smith" }),
        )
        .await;
    assert_ok(&response);
    let updated: Value = response.json();
    assert_eq!(updated["name"], "Carol Smith");
    assert_eq!(updated["email"], "carol@example.com");

    // changing to an address already taken in the event
    let response = app
        .admin_json(
            Method::PUT,
            &format!("/api/admin/participants/{carol_id}"),
            json!({ "email": participants::BOB_EMAIL }),
        )
        .await;
    assert_status(&response, StatusCode::CONFLICT);

    let response = app
        .admin_delete(&format!("/api/admin/participants/{carol_id}"))
        .await;
    assert_status(&response, StatusCode::NO_CONTENT);

    let list: Value = app.admin_get(&list_path).await.json();
    assert_eq!(list.as_array().unwrap().len(), 1);

    let response = app
        .admin_delete(&format!("/api/admin/participants/{carol_id}"))
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "Participant not found");
}

#[tokio::test]
async fn test_csv_import_dry_run_then_commit() {
    let app = TestApp::new();
    let path = format!("/api/admin/events/{}/participants/import", events::WORKSHOP);
    let csv = "\u{feff}Name,EMAIL\n\
               Alice,alice@example.com\n\
               Bob,not-an-email\n\
               ,nobody@example.com\n\
               Jane Again,JANE@example.com\n\
               Alicia,alice@example.com\n\
               Eve,eve@example.com\n";

    let response = app
        .admin_upload(Method::POST, &format!("{path}?dry_run=true"), csv.into())
        .await;
    assert_ok(&response);
    let plan: Value = response.json();
    assert_eq!(plan["dry_run"], true);
    assert_eq!(plan["imported"], 0);
    let valid: Vec<&str> = plan["valid"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["email"].as_str().unwrap())
        .collect();
    assert_eq!(valid, vec!["alice@example.com", "eve@example.com"]);
    let errors: Vec<(u64, &str)> = plan["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["line"].as_u64().unwrap(), e["message"].as_str().unwrap()))
        .collect();
    assert_eq!(
        errors,
        vec![
            (3, "Invalid email"),
            (4, "Missing name"),
            (5, "Duplicate email"),
            (6, "Duplicate email"),
        ]
    );

    let roster: Value = app
        .admin_get(&format!("/api/admin/events/{}/participants", events::WORKSHOP))
        .await
        .json();
    assert_eq!(roster.as_array().unwrap().len(), 2);

    let response = app.admin_upload(Method::POST, &path, csv.into()).await;
    assert_ok(&response);
    let result: Value = response.json();
    assert_eq!(result["dry_run"], false);
    assert_eq!(result["imported"], 2);

    let roster: Value = app
        .admin_get(&format!("/api/admin/events/{}/participants", events::WORKSHOP))
        .await
        .json();
    assert_eq!(roster.as_array().unwrap().len(), 4);

    let logs: Value = app.admin_get("/api/admin/logs?limit=1").await.json();
    assert_eq!(logs[0]["action"], "import_participants");
}

#[tokio::test]
async fn test_csv_import_requires_columns() {
    let app = TestApp::new();

    let response = app
        .admin_upload(
            Method::POST,
            &format!("/api/admin/events/{}/participants/import", events::WORKSHOP),
            b"full_name,mail\nAlice,alice@example.com\n".to_vec(),
        )
        .await;
    assert_error(
        &response,
        StatusCode::BAD_REQUEST,
        "CSV must contain 'name' and 'email' columns",
    );
}

#[tokio::test]
async fn test_custom_certificate_must_be_png() {
    let app = TestApp::new();

    let response = app
        .admin_upload(
            Method::PUT,
            &format!(
                "/api/admin/participants/{}/certificate?filename=cert.jpg",
                participants::JANE
            ),
            fixtures::blank_jpeg(20, 20),
        )
        .await;
    assert_status(&response, StatusCode::BAD_REQUEST);
    assert!(files_in(&app.certificates_dir()).is_empty());
}

#[tokio::test]
async fn test_delete_event_cascades() {
    let app = TestApp::new();
    let id = create_event(&app, "Short Lived").await;
    assert_ok(&upload_template(&app, id, "t.png", fixtures::blank_png(50, 50)).await);

    let response = app
        .admin_json(
            Method::POST,
            &format!("/api/admin/events/{id}/participants"),
            json!({ "name": "Temp", "email": "temp@example.com" }),
        )
        .await;
    let participant: Value = response.json();
    let participant_id = participant["id"].as_u64().unwrap();

    let response = app
        .admin_upload(
            Method::PUT,
            &format!("/api/admin/participants/{participant_id}/certificate?filename=c.png"),
            fixtures::blank_png(30, 30),
        )
        .await;
    assert_ok(&response);
    assert_eq!(files_in(&app.certificates_dir()).len(), 1);
    let templates_before = files_in(&app.templates_dir()).len();

    let response = app.admin_delete(&format!("/api/admin/events/{id}")).await;
    assert_status(&response, StatusCode::NO_CONTENT);

    assert!(files_in(&app.certificates_dir()).is_empty());
    assert_eq!(files_in(&app.templates_dir()).len(), templates_before - 1);
    assert_status(
        &app.admin_get(&format!("/api/admin/events/{id}")).await,
        StatusCode::NOT_FOUND,
    );
    assert_status(
        &app.admin_delete(&format!("/api/admin/participants/{participant_id}"))
            .await,
        StatusCode::NOT_FOUND,
    );

    let response = app.admin_delete(&format!("/api/admin/events/{id}")).await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_font_listing() {
    let app = TestApp::new();

    let response = app.admin_get("/api/admin/fonts").await;
    assert_ok(&response);
    let fonts: Value = response.json();
    let keys: Vec<&str> = fonts
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["arial", "arial_bold", "times", "times_bold", "courier"]);

    // the repository ships DejaVu Sans for the default font
    let arial = &fonts[0];
    assert_eq!(arial["fallback"], false);
    assert!(arial["resolved"].as_str().unwrap().ends_with(".ttf"));
    assert!(arial["aliases"]
        .as_array()
        .unwrap()
        .contains(&json!("helvetica")));
}

#[tokio::test]
async fn test_admin_actions_are_logged() {
    let app = TestApp::new();
    create_event(&app, "Logged Event").await;
    app.admin_json(
        Method::POST,
        &format!("/api/admin/events/{}/visibility", events::HIDDEN),
        json!({}),
    )
    .await;

    let auth = format!("Bearer {}", fixtures::ADMIN_TOKEN);
    let response = app
        .send(
            Method::GET,
            "/api/admin/logs",
            &[
                ("authorization", auth.as_str()),
                ("x-real-ip", "198.51.100.4"),
            ],
            Body::empty(),
        )
        .await;
    assert_ok(&response);
    let logs: Value = response.json();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);

    // newest first
    assert_eq!(logs[0]["action"], "toggle_visibility");
    assert_eq!(logs[1]["action"], "create_event");
    assert_eq!(logs[1]["admin"], "tester");
    assert!(logs[1]["details"]
        .as_str()
        .unwrap()
        .contains("Logged Event"));

    // reads are not logged
    let logs: Value = app.admin_get("/api/admin/logs").await.json();
    assert_eq!(logs.as_array().unwrap().len(), 2);
}
