pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::badges::handlers as badges;
use crate::printer::handlers as printer;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::index_handler))
        .route("/health", get(health::health_handler))
        // Badge records
        .route("/api/getbadges", get(badges::handle_list_badges))
        .route("/api/getbadges/local", get(badges::handle_list_local))
        .route("/api/getbadges/external", get(badges::handle_list_external))
        .route("/api/getbadges/:id", get(badges::handle_get_badge))
        .route("/api/badges", post(badges::handle_create_badge))
        .route("/user_data", post(badges::handle_create_badge))
        .route(
            "/api/badges/:id",
            axum::routing::put(badges::handle_update_badge).delete(badges::handle_delete_badge),
        )
        .route("/api/validate/:id", post(badges::handle_validate_badge))
        .route("/api/search", get(badges::handle_search))
        .route("/api/stats", get(badges::handle_stats))
        .route("/api/sync-external", post(badges::handle_sync_external))
        .route("/api/export-excel", get(badges::handle_export_excel))
        // Labels
        .route("/print-label", post(printer::handle_print_label))
        .route("/print-label-pdf", post(printer::handle_print_label_pdf))
        .route("/api/label/preview", post(printer::handle_label_preview))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_support::{test_state, RecordingSink};

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn setup() -> (Router, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let state = test_state(sink.clone()).await;
        (build_router(state), sink)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = setup().await;
        let response = app.oneshot(empty_request(Method::GET, "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (app, _) = setup().await;
        let response = app.oneshot(empty_request(Method::GET, "/")).await.unwrap();
        let value = body_json(response).await;
        assert_eq!(value["printer"]["model"], "QL-810W");
        assert_eq!(value["printer"]["label"]["name"], "29x90");
        assert_eq!(value["printer"]["label"]["width_mm"], 29.0);
        assert_eq!(value["printer"]["label"]["length_mm"], 90.0);
        assert!(value["endpoints"]["POST /print-label"].is_string());
    }

    #[tokio::test]
    async fn test_badge_crud_flow() {
        let (app, _) = setup().await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/badges",
                json!({"nom": "Smith", "prenom": "Jane"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["valide"], 0);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/badges/{id}"),
                json!({"prenom": "Janet"}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["prenom"], "Janet");

        let response = app
            .clone()
            .oneshot(empty_request(Method::POST, &format!("/api/validate/{id}")))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["valide"], 1);

        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, &format!("/api/getbadges/{id}")))
            .await
            .unwrap();
        let fetched = body_json(response).await;
        assert_eq!(fetched["source"], "local");
        assert_eq!(fetched["nom"], "Smith");

        let response = app
            .clone()
            .oneshot(empty_request(Method::DELETE, &format!("/api/badges/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(empty_request(Method::DELETE, &format!("/api/badges/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_names() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/user_data",
                json!({"last_name": " ", "first_name": "Jane"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_listing_survives_unreachable_upstream() {
        let (app, _) = setup().await;
        for (nom, prenom) in [("Smith", "Jane"), ("Doe", "John")] {
            app.clone()
                .oneshot(json_request(
                    Method::POST,
                    "/api/badges",
                    json!({"nom": nom, "prenom": prenom}),
                ))
                .await
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, "/api/getbadges?search=doe"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let list = body_json(response).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["prenom"], "John");

        let response = app
            .oneshot(empty_request(Method::GET, "/api/getbadges/external"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(empty_request(Method::GET, "/api/search"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_print_label_creates_badge_and_logs_print() {
        let (app, sink) = setup().await;
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/print-label",
                json!({"last_name": "Smith", "first_name": "Jane"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["status"], "success");
        assert_eq!(value["font"], "default");
        let id = value["id"].as_i64().unwrap();

        {
            let jobs = sink.jobs.lock().unwrap();
            assert_eq!(jobs.len(), 1);
            // 29x90 canvas rotated for feeding
            assert_eq!((jobs[0].raster.width, jobs[0].raster.height), (306, 991));
            assert_eq!(jobs[0].label, "29x90");
        }

        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, "/api/stats"))
            .await
            .unwrap();
        let stats = body_json(response).await;
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["validated"], 1);
        assert_eq!(stats["total_prints"], 1);

        let response = app
            .oneshot(empty_request(Method::GET, &format!("/api/getbadges/{id}")))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["valide"], 1);
    }

    #[tokio::test]
    async fn test_print_label_requires_names() {
        let (app, sink) = setup().await;
        let response = app
            .oneshot(json_request(Method::POST, "/print-label", json!({"nom": "Smith"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "last_name and first_name are required"
        );
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_print_label_unknown_id_is_not_found() {
        let (app, sink) = setup().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/print-label",
                json!({"nom": "Smith", "prenom": "Jane", "id": 404}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_print_label_pdf_attachment() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/print-label-pdf",
                json!({"nom": "Smith", "prenom": "Jane"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"badge_Jane_Smith.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_label_preview_png() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/label/preview",
                json!({"text": "Jane Smith"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()["x-label-font"], "default");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let image = image::load_from_memory(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (991, 306));
    }

    #[tokio::test]
    async fn test_export_excel_attachment() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(empty_request(Method::GET, "/api/export-excel?source=local"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains(".xlsx"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_sync_external_reports_upstream_failure() {
        let (app, _) = setup().await;
        let response = app
            .oneshot(empty_request(Method::POST, "/api/sync-external"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "EXTERNAL_ERROR");
    }
}
