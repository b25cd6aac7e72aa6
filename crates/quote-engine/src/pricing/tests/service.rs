use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use super::common::*;

use crate::pricing::settings::{SettingsKey, SettingsStore, SettingsUpdate, ThresholdTable};
use crate::pricing::{
    ParameterId, QuoteRequest, QuoteService, QuoteServiceError, SettingsValidationError,
    TaskSelection,
};

fn request(task_ids: &[&str]) -> QuoteRequest {
    QuoteRequest {
        selection: TaskSelection {
            task_ids: task_ids.iter().map(|id| id.to_string()).collect(),
            service_ids: Vec::new(),
        },
        ..QuoteRequest::default()
    }
}

#[test]
fn applicable_parameters_expand_services() {
    let (service, _) = build_service();
    let selection = TaskSelection {
        task_ids: Vec::new(),
        service_ids: vec!["maintenance".to_string()],
    };

    let ids: Vec<ParameterId> = service
        .applicable_parameters(&selection)
        .iter()
        .map(|parameter| parameter.id())
        .collect();

    assert_eq!(ids, vec![ParameterId::Complexity, ParameterId::Distance]);
}

#[test]
fn generate_coerces_raw_inputs() {
    let (service, _) = build_service();
    let mut request = request(&[TRAVEL_TASK]);
    request.inputs = BTreeMap::from([
        ("distance".to_string(), json!("150")),
        ("complexity".to_string(), json!("Simple")),
        ("unknown".to_string(), json!(42)),
    ]);

    let quote = service.generate(&request).expect("quote generated");

    assert_close(quote.subtotal, 300.0);
}

#[test]
fn generate_fills_defaults_only_when_asked() {
    let (service, _) = build_service();
    let mut bare = request(&[EXTINGUISHER_TASK]);
    bare.inputs = BTreeMap::from([("complexity".to_string(), json!("Complexe"))]);

    let raw = service.generate(&bare).expect("quote generated");
    assert_close(raw.subtotal, 150.0);

    let mut defaulted = request(&[EXTINGUISHER_TASK]);
    defaulted.apply_defaults = true;
    let quote = service.generate(&defaulted).expect("quote generated");
    assert_close(quote.subtotal, 100.0);
}

#[test]
fn generate_reads_stored_settings() {
    let service = service_with_entries(BTreeMap::from([
        (SettingsKey::DefaultVatRate, "5.5".to_string()),
        (SettingsKey::PricePerPage, "not json".to_string()),
    ]));

    let quote = service
        .generate(&request(&[ALARM_TASK]))
        .expect("quote generated");

    assert_close(quote.vat_rate, 5.5);
    assert_close(quote.vat_amount, 5.5);
    let settings = service.settings().expect("settings readable");
    assert_close(settings.price_per_page, 0.10);
}

#[test]
fn update_settings_persists_and_returns_snapshot() {
    let (service, store) = build_service();
    let update = SettingsUpdate {
        distance_thresholds: Some(ThresholdTable::new(10.0, 40.0, 1.0, 1.1, 1.4)),
        min_margin_percentage: Some(25.0),
        ..SettingsUpdate::default()
    };

    let snapshot = service.update_settings(update).expect("update accepted");

    assert_close(snapshot.min_margin_percentage, 25.0);
    assert_close(snapshot.distance_thresholds.coeff_y, 1.4);
    let stored = store.read_all().expect("store readable");
    assert!(stored.contains_key(&SettingsKey::DistanceThresholds));
    assert!(stored.contains_key(&SettingsKey::MinMarginPercentage));
    assert!(!stored.contains_key(&SettingsKey::DefaultVatRate));
}

#[test]
fn update_settings_rejects_invalid_values_without_writing() {
    let (service, store) = build_service();
    let update = SettingsUpdate {
        ground_area_thresholds: Some(ThresholdTable::new(500.0, 100.0, 1.0, 1.3, 1.6)),
        ..SettingsUpdate::default()
    };

    match service.update_settings(update) {
        Err(QuoteServiceError::InvalidSettings(SettingsValidationError::InvertedThresholds {
            key,
            ..
        })) => assert_eq!(key, SettingsKey::GroundAreaThresholds),
        other => panic!("expected inverted thresholds, got {other:?}"),
    }
    assert!(store.read_all().expect("store readable").is_empty());
}

#[test]
fn reset_setting_restores_default() {
    let (service, _) = build_service();
    service
        .update_settings(SettingsUpdate {
            default_vat_rate: Some(10.0),
            ..SettingsUpdate::default()
        })
        .expect("update accepted");

    let snapshot = service
        .reset_setting(SettingsKey::DefaultVatRate)
        .expect("reset succeeds");

    assert_close(snapshot.vat_rate, 20.0);
}

#[test]
fn store_failures_surface_as_errors() {
    let service = QuoteService::new(engine(), Arc::new(UnavailableStore));

    match service.generate(&request(&[ALARM_TASK])) {
        Err(QuoteServiceError::Store(_)) => {}
        other => panic!("expected store error, got {other:?}"),
    }
    assert!(matches!(
        service.reset_setting(SettingsKey::PricePerPage),
        Err(QuoteServiceError::Store(_))
    ));
}
