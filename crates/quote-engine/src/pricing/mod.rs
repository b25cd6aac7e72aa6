//! Quote configurator pricing: catalog, parameter applicability, per-task
//! pricing rules and quote aggregation.
//!
//! Everything in [`QuoteEngine`] is a pure computation over a
//! [`SettingsSnapshot`]; reading settings from a store happens once per quote
//! in [`QuoteService`].

mod applicability;
pub mod catalog;
pub mod parameters;
mod pricer;
pub mod quote;
pub mod router;
pub mod service;
pub mod settings;

#[cfg(test)]
mod tests;

pub use catalog::{Catalog, Service, Task, TaskCategory, Trade};
pub use parameters::{ParameterId, ParameterValue, PricingParameter, QuoteInput};
pub use pricer::TaskPrice;
pub use quote::{Quote, QuoteId, QuoteLineItem, QuoteServiceGroup, QuoteWarning};
pub use router::quote_router;
pub use service::{QuoteRequest, QuoteService, QuoteServiceError, TaskSelection};
pub use settings::{
    ComplexityFactorTable, ErpFactorTable, FileSettingsStore, InMemorySettingsStore,
    SettingsKey, SettingsSnapshot, SettingsStore, SettingsStoreError, SettingsUpdate,
    SettingsValidationError, TaskPriceOverride, ThresholdTable,
};

/// Stateless engine applying the pricing rules to a catalog.
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    catalog: Catalog,
}

impl QuoteEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn standard() -> Self {
        Self::new(Catalog::standard())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parameters the caller should collect for this selection.
    pub fn applicable_parameters<T>(&self, task_ids: &[T]) -> Vec<&PricingParameter>
    where
        T: AsRef<str>,
    {
        applicability::applicable_parameters(&self.catalog, task_ids)
    }

    /// Prices one task. Unknown ids price at zero with no explanation.
    pub fn price(&self, task_id: &str, inputs: &QuoteInput, settings: &SettingsSnapshot) -> TaskPrice {
        match self.catalog.task(task_id) {
            Some(task) => pricer::price_task(task, inputs, settings),
            None => TaskPrice::zero(),
        }
    }

    /// Prices every selected task and rolls the results into a quote.
    /// Duplicate ids are ignored after their first occurrence.
    pub fn generate<T>(
        &self,
        task_ids: &[T],
        inputs: &QuoteInput,
        discount_percentage: f64,
        settings: &SettingsSnapshot,
    ) -> Quote
    where
        T: AsRef<str>,
    {
        quote::build_quote(&self.catalog, task_ids, inputs, discount_percentage, settings)
    }
}

impl Default for QuoteEngine {
    fn default() -> Self {
        Self::standard()
    }
}
