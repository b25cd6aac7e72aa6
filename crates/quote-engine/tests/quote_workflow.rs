//! End-to-end quote scenarios driven through the public service facade and
//! HTTP router, with settings persisted to a JSON file between runs.

mod common {
    use std::path::PathBuf;
    use std::sync::Arc;

    use quote_engine::pricing::{FileSettingsStore, QuoteEngine, QuoteService};
    use uuid::Uuid;

    pub(super) fn settings_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("quote-engine-it-{}", Uuid::new_v4()))
            .join("settings.json")
    }

    pub(super) fn file_service(path: &PathBuf) -> QuoteService<FileSettingsStore> {
        QuoteService::new(
            QuoteEngine::standard(),
            Arc::new(FileSettingsStore::new(path.clone())),
        )
    }

    pub(super) fn cleanup(path: &PathBuf) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use quote_engine::pricing::{
    quote_router, QuoteRequest, SettingsUpdate, TaskPriceOverride, TaskSelection,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;

fn service_request(service_id: &str) -> QuoteRequest {
    QuoteRequest {
        selection: TaskSelection {
            task_ids: Vec::new(),
            service_ids: vec![service_id.to_string()],
        },
        inputs: BTreeMap::new(),
        discount_percentage: 0.0,
        apply_defaults: true,
    }
}

#[test]
fn whole_service_quote_uses_catalog_defaults() {
    let path = settings_path();
    let service = file_service(&path);

    let quote = service
        .generate(&service_request("at"))
        .expect("quote generated");

    assert_eq!(quote.line_items.len(), 12);
    assert_eq!(quote.groups_by_service.len(), 1);
    assert!((quote.groups_by_service[0].subtotal - quote.subtotal).abs() < 1e-9);

    let printing = quote
        .line_items
        .iter()
        .find(|item| item.task_id == "impression_dossier_at")
        .expect("printing line item");
    assert!((printing.unit_price - 1.5).abs() < 1e-9);

    let plans = quote
        .line_items
        .iter()
        .find(|item| item.task_id == "realisation_plans_existant_at")
        .expect("plans line item");
    assert!((plans.unit_price - 325.0).abs() < 1e-9);

    assert!((quote.total_after_tax - quote.total_before_tax * 1.2).abs() < 1e-9);
    cleanup(&path);
}

#[test]
fn persisted_overrides_apply_to_later_sessions() {
    let path = settings_path();

    let first = file_service(&path);
    let mut task_prices = BTreeMap::new();
    task_prices.insert(
        "maintenance_annuelle_ria".to_string(),
        TaskPriceOverride {
            unit_price: Some(180.0),
            price_per_area: None,
        },
    );
    first
        .update_settings(SettingsUpdate {
            task_prices: Some(task_prices),
            default_vat_rate: Some(10.0),
            ..SettingsUpdate::default()
        })
        .expect("settings saved");

    let second = file_service(&path);
    let quote = second
        .generate(&QuoteRequest {
            selection: TaskSelection {
                task_ids: vec!["maintenance_annuelle_ria".to_string()],
                service_ids: Vec::new(),
            },
            ..QuoteRequest::default()
        })
        .expect("quote generated");

    assert!((quote.subtotal - 180.0).abs() < 1e-9);
    assert!((quote.vat_amount - 18.0).abs() < 1e-9);
    cleanup(&path);
}

#[tokio::test]
async fn http_round_trip_prices_with_updated_settings() {
    let path = settings_path();
    let router = quote_router(Arc::new(file_service(&path)));

    let update = router
        .clone()
        .oneshot(
            Request::put("/api/v1/settings")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "pricePerPage": 0.2 }).to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(update.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::post("/api/v1/quotes")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "taskIds": ["impression_plans"],
                        "inputs": { "floorsNumber": "2", "copiesNumber": 1 }
                    })
                    .to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&body).expect("json payload");
    // (3 + 2 x 2) pages x 0.2 x 1 copy
    let subtotal = payload["subtotal"].as_f64().expect("numeric subtotal");
    assert!((subtotal - 1.4).abs() < 1e-9);
    assert_eq!(payload["lineItems"][0]["explanation"], "7 pages x 1 copies");
    cleanup(&path);
}
