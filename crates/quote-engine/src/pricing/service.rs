use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::catalog::Catalog;
use super::parameters::{PricingParameter, QuoteInput};
use super::quote::Quote;
use super::settings::{
    SettingsKey, SettingsSnapshot, SettingsStore, SettingsStoreError, SettingsUpdate,
    SettingsValidationError,
};
use super::QuoteEngine;

/// Tasks chosen by the caller, either one by one or as whole services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSelection {
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub service_ids: Vec<String>,
}

/// Everything needed to generate one quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(flatten)]
    pub selection: TaskSelection,
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub discount_percentage: f64,
    /// Fill catalog defaults for applicable parameters the caller left out.
    #[serde(default)]
    pub apply_defaults: bool,
}

/// Couples the pricing engine with the settings store it reads from.
pub struct QuoteService<S> {
    engine: QuoteEngine,
    store: Arc<S>,
}

impl<S> QuoteService<S>
where
    S: SettingsStore,
{
    pub fn new(engine: QuoteEngine, store: Arc<S>) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &QuoteEngine {
        &self.engine
    }

    pub fn catalog(&self) -> &Catalog {
        self.engine.catalog()
    }

    pub fn resolve_selection(&self, selection: &TaskSelection) -> Vec<String> {
        self.catalog()
            .expand_selection(&selection.task_ids, &selection.service_ids)
    }

    pub fn applicable_parameters(&self, selection: &TaskSelection) -> Vec<PricingParameter> {
        let task_ids = self.resolve_selection(selection);
        self.engine
            .applicable_parameters(&task_ids)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Coerces raw inputs, optionally completing them with catalog defaults.
    pub fn prepare_input(&self, request: &QuoteRequest) -> (Vec<String>, QuoteInput) {
        let task_ids = self.resolve_selection(&request.selection);
        let mut inputs = QuoteInput::from_raw(self.catalog().parameters(), &request.inputs);
        if request.apply_defaults {
            inputs = inputs.with_defaults(self.engine.applicable_parameters(&task_ids));
        }
        (task_ids, inputs)
    }

    /// Reads settings once, then prices the whole request against that snapshot.
    pub fn generate(&self, request: &QuoteRequest) -> Result<Quote, QuoteServiceError> {
        let settings = SettingsSnapshot::load(self.store.as_ref())?;
        let (task_ids, inputs) = self.prepare_input(request);
        Ok(self
            .engine
            .generate(&task_ids, &inputs, request.discount_percentage, &settings))
    }

    pub fn settings(&self) -> Result<SettingsSnapshot, QuoteServiceError> {
        Ok(SettingsSnapshot::load(self.store.as_ref())?)
    }

    /// Validates and stores a partial settings change, returning the new snapshot.
    pub fn update_settings(
        &self,
        update: SettingsUpdate,
    ) -> Result<SettingsSnapshot, QuoteServiceError> {
        update.validate(self.catalog())?;
        let entries = update.into_entries().map_err(SettingsStoreError::from)?;
        let keys: Vec<&'static str> = entries.keys().map(|key| key.as_str()).collect();
        self.store.write_all(entries)?;
        info!(settings = ?keys, "settings updated");
        self.settings()
    }

    /// Drops a stored value so the default applies again.
    pub fn reset_setting(&self, key: SettingsKey) -> Result<SettingsSnapshot, QuoteServiceError> {
        self.store.remove(key)?;
        info!(setting = %key, "setting reset to default");
        self.settings()
    }
}

/// Error raised by the quote service.
#[derive(Debug, thiserror::Error)]
pub enum QuoteServiceError {
    #[error(transparent)]
    Store(#[from] SettingsStoreError),
    #[error(transparent)]
    InvalidSettings(#[from] SettingsValidationError),
}
