use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::pricing::settings::{
    SettingsKey, SettingsSnapshot, SettingsStore, SettingsStoreError, ThresholdTable,
};
use crate::pricing::{
    quote_router, InMemorySettingsStore, ParameterId, ParameterValue, QuoteEngine, QuoteInput,
    QuoteService,
};

pub(super) const TRAVEL_TASK: &str = "deplacement_technicien_maint";
pub(super) const ALARM_TASK: &str = "maintenance_annuelle_alarme";
pub(super) const EXTINGUISHER_TASK: &str = "maintenance_annuelle_extincteur";
pub(super) const AUDIT_VISIT_TASK: &str = "visite_audit_sec";
pub(super) const SURVEY_TASK: &str = "releve_geometrique_at";
pub(super) const PLANS_TASK: &str = "realisation_plans_existant_at";
pub(super) const SAFETY_NOTICE_TASK: &str = "redaction_notice_securite_at";
pub(super) const DEROGATION_TASK: &str = "redaction_demande_derogation_at";
pub(super) const PRINTING_TASK: &str = "impression_dossier_at";
pub(super) const ARCHITECT_TRAVEL_TASK: &str = "deplacement_architecte_at";

pub(super) fn engine() -> QuoteEngine {
    QuoteEngine::standard()
}

pub(super) fn settings() -> SettingsSnapshot {
    SettingsSnapshot::default()
}

pub(super) fn simple() -> QuoteInput {
    QuoteInput::new().with(
        ParameterId::Complexity,
        ParameterValue::Choice("Simple".to_string()),
    )
}

pub(super) fn number(inputs: QuoteInput, id: ParameterId, value: f64) -> QuoteInput {
    inputs.with(id, ParameterValue::Number(value))
}

pub(super) fn distance_table() -> ThresholdTable {
    ThresholdTable::new(50.0, 100.0, 1.0, 1.5, 2.0)
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn build_service() -> (QuoteService<InMemorySettingsStore>, Arc<InMemorySettingsStore>) {
    let store = Arc::new(InMemorySettingsStore::default());
    let service = QuoteService::new(engine(), store.clone());
    (service, store)
}

pub(super) fn service_with_entries(
    entries: BTreeMap<SettingsKey, String>,
) -> QuoteService<InMemorySettingsStore> {
    QuoteService::new(
        engine(),
        Arc::new(InMemorySettingsStore::with_entries(entries)),
    )
}

pub(super) struct UnavailableStore;

impl SettingsStore for UnavailableStore {
    fn read_all(&self) -> Result<BTreeMap<SettingsKey, String>, SettingsStoreError> {
        Err(SettingsStoreError::Unavailable("disk offline".to_string()))
    }

    fn write_all(&self, _entries: BTreeMap<SettingsKey, String>) -> Result<(), SettingsStoreError> {
        Err(SettingsStoreError::Unavailable("disk offline".to_string()))
    }

    fn remove(&self, _key: SettingsKey) -> Result<(), SettingsStoreError> {
        Err(SettingsStoreError::Unavailable("disk offline".to_string()))
    }
}

pub(super) fn router_with_service(service: QuoteService<InMemorySettingsStore>) -> axum::Router {
    quote_router(Arc::new(service))
}

pub(super) fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("encode payload")))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
