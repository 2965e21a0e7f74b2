pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::editor::handlers as editor;
use crate::enhance::handlers as enhance;
use crate::export::handlers::{self as export, MAX_SURFACE_BYTES};
use crate::render::handlers as render;
use crate::sections::handlers as sections;
use crate::state::AppState;
use crate::storage::handlers as storage;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stored résumés
        .route("/api/v1/resumes", get(storage::handle_list_resumes))
        .route("/api/v1/resumes/:id", delete(storage::handle_delete_resume))
        // Editing sessions
        .route("/api/v1/sessions", post(editor::handle_open_session))
        .route(
            "/api/v1/sessions/:id",
            get(editor::handle_get_session).delete(editor::handle_close_session),
        )
        .route(
            "/api/v1/sessions/:id/mutations",
            post(editor::handle_apply_mutation),
        )
        .route(
            "/api/v1/sessions/:id/name",
            patch(editor::handle_rename_session),
        )
        .route("/api/v1/sessions/:id/save", post(editor::handle_save_session))
        // Preview and export
        .route("/api/v1/sessions/:id/preview", get(render::handle_preview))
        .route(
            "/api/v1/sessions/:id/surface",
            put(export::handle_upload_surface).layer(DefaultBodyLimit::max(MAX_SURFACE_BYTES)),
        )
        .route("/api/v1/sessions/:id/export", post(export::handle_export))
        // Enhancement
        .route(
            "/api/v1/sessions/:id/enhance",
            post(enhance::handle_enhance_field),
        )
        .route("/api/enhance", post(enhance::handle_enhance))
        // Section registry
        .route(
            "/api/v1/sections/:kind/fields",
            get(sections::handle_section_schema),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, HeaderMap, Method, Request, StatusCode};
    use bytes::Bytes;
    use image::{ImageFormat, Rgb, RgbImage};
    use serde_json::{json, Value};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::enhance::{EnhanceError, TextEnhancer};
    use crate::storage::{DocumentStore, MemoryDocumentStore};

    struct UppercaseEnhancer;

    #[async_trait]
    impl TextEnhancer for UppercaseEnhancer {
        async fn enhance(&self, _prompt: &str, original_text: &str) -> Result<String, EnhanceError> {
            Ok(original_text.to_uppercase())
        }
    }

    fn test_config() -> Config {
        Config {
            database_url: None,
            openrouter_api_key: "sk-test".to_string(),
            openrouter_api_url: crate::enhance::DEFAULT_API_URL.to_string(),
            enhance_model: crate::enhance::DEFAULT_MODEL.to_string(),
            port: 0,
            save_quiet_period: Duration::from_millis(10),
            export_supersample: 2,
            session_idle_timeout: Duration::from_secs(3600),
            export_dir: None::<PathBuf>,
            rust_log: "info".to_string(),
        }
    }

    /// Holds every call until released, then wraps the text.
    struct GatedEnhancer {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl TextEnhancer for GatedEnhancer {
        async fn enhance(&self, _prompt: &str, original_text: &str) -> Result<String, EnhanceError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(format!("ENHANCED({original_text})"))
        }
    }

    fn test_app_with(enhancer: Arc<dyn TextEnhancer>) -> Router {
        let state = AppState::new(test_config(), Arc::new(MemoryDocumentStore::new()), enhancer);
        build_router(state)
    }

    fn test_app() -> Router {
        test_app_with(Arc::new(UppercaseEnhancer))
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes)
    }

    fn json_of(bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(bytes).unwrap()
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let (status, _, bytes) = call(app, builder.body(body).unwrap()).await;
        (status, json_of(&bytes))
    }

    const BOUNDARY: &str = "resume-surface-boundary";

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 60, 80]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), format).unwrap();
        out
    }

    fn surface_form(image: Option<Vec<u8>>, fields: &[(&str, String)]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(image) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"preview\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(&image);
            body.extend_from_slice(b"\r\n");
        }
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn size_fields(width: u32, height: u32, revision: u64) -> Vec<(&'static str, String)> {
        vec![
            ("width", width.to_string()),
            ("height", height.to_string()),
            ("revision", revision.to_string()),
        ]
    }

    async fn upload(app: &Router, id: &str, form: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/v1/sessions/{id}/surface"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form))
            .unwrap();
        let (status, _, bytes) = call(app, request).await;
        (status, json_of(&bytes))
    }

    async fn open_session(app: &Router) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "owner_id": "user-1", "name": "Backend CV" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["sessionId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "resume-api");
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["sessions"], 0);

        open_session(&app).await;
        let (_, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(body["sessions"], 1);
    }

    #[tokio::test]
    async fn test_new_session_requires_name() {
        let app = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "owner_id": "user-1", "name": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_mutation_round_trip_through_router() {
        let app = test_app();
        let id = open_session(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/mutations"),
            Some(json!({
                "op": "set_field",
                "path": ["experience", 0, "company"],
                "value": "Acme"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], true);
        assert_eq!(body["revision"], 1);

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(body["document"]["experience"][0]["company"], "Acme");
        assert_eq!(body["dirty"], true);
    }

    #[tokio::test]
    async fn test_refusal_reported_with_tip() {
        let app = test_app();
        let id = open_session(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/mutations"),
            Some(json!({ "op": "remove_list_item", "list": "education", "index": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], false);
        assert_eq!(body["revision"], 0);
        assert!(body["refusal"]["tip"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_outline_lists_section_titles() {
        let app = test_app();
        let id = open_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/mutations");
        send(&app, Method::POST, &uri, Some(json!({ "op": "add_custom_section", "kind": "language" }))).await;
        send(
            &app,
            Method::POST,
            &uri,
            Some(json!({
                "op": "set_field",
                "path": ["customSections", 0, "language"],
                "value": "English"
            })),
        )
        .await;

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(body["outline"][0]["kind"], "language");
        assert_eq!(body["outline"][0]["title"], "English");
        assert_eq!(body["revision"], 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = test_app();
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_without_surface_is_precondition_failure() {
        let app = test_app();
        let id = open_session(&app).await;
        let (status, _) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/export"), None).await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_preview_returns_tree_for_revision() {
        let app = test_app();
        let id = open_session(&app).await;
        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/sessions/{id}/preview?template=creative"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revision"], 0);
        assert_eq!(body["tree"]["templateId"], "creative");
    }

    #[tokio::test]
    async fn test_enhance_passthrough() {
        let app = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/enhance",
            Some(json!({ "prompt": "Improve:", "originalText": "wrote code" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "WROTE CODE");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/enhance",
            Some(json!({ "originalText": "wrote code" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_enhance_field_writes_back() {
        let app = test_app();
        let id = open_session(&app).await;
        send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/mutations"),
            Some(json!({
                "op": "set_field",
                "path": ["experience", 0, "description"],
                "value": "built apis"
            })),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/enhance"),
            Some(json!({ "path": ["experience", 0, "description"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document"]["experience"][0]["description"], "BUILT APIS");
    }

    #[tokio::test]
    async fn test_enhance_empty_field_is_precondition_failure() {
        let app = test_app();
        let id = open_session(&app).await;
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/enhance"),
            Some(json!({ "path": ["experience", 0, "description"] })),
        )
        .await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_section_schema() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, "/api/v1/sections/language/fields", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "language");

        let (status, _) = send(&app, Method::GET, "/api/v1/sections/hobbies/fields", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_close_session_discards_it() {
        let app = test_app();
        let id = open_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}");
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_enhance_template_id_is_rejected() {
        let app = test_app();
        let id = open_session(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/enhance"),
            Some(json!({ "path": ["templateId"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(body["document"]["templateId"], "classic");
        assert_eq!(body["revision"], 0);
    }

    #[tokio::test]
    async fn test_enhanced_text_follows_moved_section() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let app = test_app_with(Arc::new(GatedEnhancer {
            started: started.clone(),
            release: release.clone(),
        }));
        let id = open_session(&app).await;
        let mutations = format!("/api/v1/sessions/{id}/mutations");
        for (index, content) in ["A body", "B body"].into_iter().enumerate() {
            send(&app, Method::POST, &mutations, Some(json!({ "op": "add_custom_section", "kind": "generic" }))).await;
            send(
                &app,
                Method::POST,
                &mutations,
                Some(json!({
                    "op": "set_field",
                    "path": ["customSections", index, "content"],
                    "value": content
                })),
            )
            .await;
        }

        let pending = tokio::spawn({
            let app = app.clone();
            let uri = format!("/api/v1/sessions/{id}/enhance");
            async move {
                send(
                    &app,
                    Method::POST,
                    &uri,
                    Some(json!({ "path": ["customSections", 0, "content"] })),
                )
                .await
            }
        });
        started.notified().await;
        let (_, moved) = send(
            &app,
            Method::POST,
            &mutations,
            Some(json!({ "op": "move_custom_section", "index": 0, "direction": "down" })),
        )
        .await;
        assert_eq!(moved["applied"], true);
        release.notify_one();

        let (status, body) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], true);
        let contents: Vec<&str> = body["document"]["customSections"]
            .as_array()
            .unwrap()
            .iter()
            .map(|section| section["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, ["B body", "ENHANCED(A body)"]);
    }

    #[tokio::test]
    async fn test_enhanced_text_dropped_when_entry_removed() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let app = test_app_with(Arc::new(GatedEnhancer {
            started: started.clone(),
            release: release.clone(),
        }));
        let id = open_session(&app).await;
        let mutations = format!("/api/v1/sessions/{id}/mutations");
        send(&app, Method::POST, &mutations, Some(json!({ "op": "add_list_item", "list": "experience" }))).await;
        send(
            &app,
            Method::POST,
            &mutations,
            Some(json!({
                "op": "set_field",
                "path": ["experience", 1, "description"],
                "value": "led team"
            })),
        )
        .await;

        let pending = tokio::spawn({
            let app = app.clone();
            let uri = format!("/api/v1/sessions/{id}/enhance");
            async move {
                send(&app, Method::POST, &uri, Some(json!({ "path": ["experience", 1, "description"] })))
                    .await
            }
        });
        started.notified().await;
        send(&app, Method::POST, &mutations, Some(json!({ "op": "remove_list_item", "list": "experience", "index": 0 }))).await;
        release.notify_one();

        let (status, body) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], false);
        assert_eq!(body["refusal"]["kind"], "field_removed");
        assert_eq!(body["revision"], 3);
        let experience = body["document"]["experience"].as_array().unwrap();
        assert_eq!(experience.len(), 1);
        assert_eq!(experience[0]["description"], "led team");
    }

    #[tokio::test]
    async fn test_upload_surface_requires_every_field() {
        let app = test_app();
        let id = open_session(&app).await;

        let (status, body) = upload(&app, &id, surface_form(None, &size_fields(40, 56, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("image"));

        let fields = vec![("width", "40".to_string()), ("height", "56".to_string())];
        let png = encoded(40, 56, ImageFormat::Png);
        let (status, body) = upload(&app, &id, surface_form(Some(png), &fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("revision"));

        let fields = vec![
            ("width", "wide".to_string()),
            ("height", "56".to_string()),
            ("revision", "0".to_string()),
        ];
        let png = encoded(40, 56, ImageFormat::Png);
        let (status, _) = upload(&app, &id, surface_form(Some(png), &fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_surface_size_limits() {
        let app = test_app();
        let id = open_session(&app).await;
        let png = || Some(encoded(40, 56, ImageFormat::Png));

        let (status, _) = upload(&app, &id, surface_form(png(), &size_fields(0, 56, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = upload(&app, &id, surface_form(png(), &size_fields(40, 10_001, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // A 1x40 image declared as 1000x40 would supersample to 2000x80000.
        let narrow = Some(encoded(1, 40, ImageFormat::Png));
        let (status, _) = upload(&app, &id, surface_form(narrow, &size_fields(1000, 40, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = upload(&app, &id, surface_form(png(), &size_fields(40, 56, 0))).await;
        assert_eq!(status, StatusCode::OK);
        // Matching aspect, but too large once supersampled.
        let (status, _) = upload(&app, &id, surface_form(png(), &size_fields(7_000, 9_800, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_surface_accepts_png_and_jpeg_only() {
        let app = test_app();
        let id = open_session(&app).await;

        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();
        let (status, body) = upload(&app, &id, surface_form(Some(gif), &size_fields(1, 1, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("PNG or JPEG"));

        let jpeg = encoded(40, 56, ImageFormat::Jpeg);
        let (status, _) = upload(&app, &id, surface_form(Some(jpeg), &size_fields(40, 56, 0))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_surface_reports_stale_revision() {
        let app = test_app();
        let id = open_session(&app).await;
        let png = || Some(encoded(40, 56, ImageFormat::Png));

        let (status, body) = upload(&app, &id, surface_form(png(), &size_fields(40, 56, 0))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "revision": 0, "stale": false }));

        send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/mutations"),
            Some(json!({ "op": "set_skills_text", "text": "Rust, SQL" })),
        )
        .await;
        let (_, body) = upload(&app, &id, surface_form(png(), &size_fields(40, 56, 0))).await;
        assert_eq!(body["stale"], true);

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/export"), None).await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_uploaded_surface_exports_pdf() {
        let app = test_app();
        let id = open_session(&app).await;
        let png = encoded(40, 56, ImageFormat::Png);
        let (status, _) = upload(&app, &id, surface_form(Some(png), &size_fields(40, 56, 0))).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/sessions/{id}/export"))
            .body(Body::empty())
            .unwrap();
        let (status, headers, bytes) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"Backend CV.pdf\""));
        assert!(bytes.starts_with(b"%PDF"));
        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        assert!(!pdf.get_pages().is_empty());
    }

    #[tokio::test]
    async fn test_reopened_session_carries_stored_name_and_data() {
        let store = Arc::new(MemoryDocumentStore::new());
        let resume_id = store
            .create_document("user-1", json!({ "firstName": "Ivan", "skills": "Go" }), "Stored CV")
            .await
            .unwrap();
        let app = build_router(AppState::new(test_config(), store, Arc::new(UppercaseEnhancer)));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "owner_id": "user-1", "resume_id": resume_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Stored CV");
        assert_eq!(body["document"]["firstName"], "Ivan");
        assert_eq!(body["document"]["skills"], "Go");
        assert_eq!(body["dirty"], false);
    }
}
