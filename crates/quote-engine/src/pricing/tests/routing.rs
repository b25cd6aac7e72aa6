use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::body::Body;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;

use crate::pricing::router::{quote_handler, settings_handler};
use crate::pricing::{FileSettingsStore, QuoteRequest, QuoteService, TaskSelection};

#[tokio::test]
async fn catalog_route_lists_services_and_parameters() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/catalog")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let services = payload["services"].as_array().expect("services array");
    assert_eq!(services.len(), 12);
    assert_eq!(services[0]["id"], "at");
    assert_eq!(services[0]["tasks"][0]["id"], ARCHITECT_TRAVEL_TASK);
    assert_eq!(services[0]["tasks"][0]["category"], "travel");
    let parameters = payload["parameters"].as_array().expect("parameters array");
    assert_eq!(parameters.len(), 9);
    assert_eq!(parameters[0]["type"], "select");
}

#[tokio::test]
async fn parameters_route_returns_applicable_set() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/quotes/parameters",
            &json!({ "taskIds": [PRINTING_TASK] }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let ids: Vec<&str> = payload["parameters"]
        .as_array()
        .expect("parameters array")
        .iter()
        .filter_map(|parameter| parameter["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["complexity", "floorsNumber", "copiesNumber"]);
}

#[tokio::test]
async fn quote_route_creates_quote() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/quotes",
            &json!({
                "taskIds": [ARCHITECT_TRAVEL_TASK],
                "inputs": { "distance": 200, "complexity": "Simple" },
                "discountPercentage": 0
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["subtotal"], json!(300.0));
    assert_eq!(payload["totalAfterTax"], json!(360.0));
    assert_eq!(payload["lineItems"][0]["serviceId"], "at");
    assert!(payload["warningMessages"].as_array().is_some());
    assert!(payload.get("id").is_some());
}

#[tokio::test]
async fn settings_route_rejects_inverted_thresholds() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "PUT",
            "/api/v1/settings",
            &json!({
                "distanceThresholds": { "x": 100, "y": 50, "coeffX": 1, "coeffXY": 1.5, "coeffY": 2 }
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"].as_str().is_some());
}

#[tokio::test]
async fn settings_route_round_trips_updates() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/settings",
            &json!({ "defaultVatRate": 10, "taskPrices": { "visite_audit_sec": { "pricePerSqm": 1.5 } } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::get("/api/v1/settings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["defaultVatRate"], json!(10.0));
    assert_eq!(
        payload["taskPrices"]["visite_audit_sec"]["pricePerArea"],
        json!(1.5)
    );
}

#[tokio::test]
async fn handlers_return_internal_error_when_store_fails() {
    let service = Arc::new(QuoteService::new(engine(), Arc::new(UnavailableStore)));

    let response = quote_handler::<UnavailableStore>(
        State(service.clone()),
        axum::Json(QuoteRequest {
            selection: TaskSelection {
                task_ids: vec![ALARM_TASK.to_string()],
                service_ids: Vec::new(),
            },
            ..QuoteRequest::default()
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = settings_handler::<UnavailableStore>(State(service)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_backed_settings_update_keeps_corrupt_file_intact() {
    let path = std::env::temp_dir()
        .join(format!("quote-engine-routing-{}", uuid::Uuid::new_v4()))
        .join("settings.json");
    let dir = path.parent().expect("scratch dir").to_path_buf();
    std::fs::create_dir_all(&dir).expect("create dir");
    let original = r#"{"defaultVatRate": 10, "taskPrices": {"visa_rus": {"unitPrice": 75}},}"#;
    std::fs::write(&path, original).expect("write settings file");

    let service = QuoteService::new(engine(), Arc::new(FileSettingsStore::new(&path)));
    let router = crate::pricing::quote_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(Request::get("/api/v1/settings").body(Body::empty()).expect("request builds"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["defaultVatRate"], json!(20.0));

    let response = router
        .oneshot(json_request(
            "PUT",
            "/api/v1/settings",
            &json!({ "pricePerPage": 0.2 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(
        payload["error"]
            .as_str()
            .is_some_and(|message| message.contains("not a valid settings document")),
        "unexpected payload: {payload}"
    );

    assert_eq!(std::fs::read_to_string(&path).expect("file kept"), original);
    let _ = std::fs::remove_dir_all(dir);
}
