use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::catalog::Catalog;
use super::parameters::QuoteInput;
use super::pricer::price_task;
use super::settings::SettingsSnapshot;

/// Floating-point slack when comparing a margin against its target.
const MARGIN_TOLERANCE: f64 = 1e-9;

/// Identifier wrapper for generated quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub Uuid);

impl QuoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLineItem {
    pub task_id: String,
    pub task_name: String,
    pub service_id: String,
    pub service_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteServiceGroup {
    pub service_id: String,
    pub service_name: String,
    pub items: Vec<QuoteLineItem>,
    pub subtotal: f64,
}

/// Advisory raised when the estimated margin needs attention.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuoteWarning {
    MarginBelowTarget {
        margin_percentage: f64,
        target_percentage: f64,
    },
    NonPositiveMarginAfterDiscount {
        discount_percentage: f64,
    },
}

impl QuoteWarning {
    pub fn summary(&self) -> String {
        match self {
            QuoteWarning::MarginBelowTarget {
                margin_percentage,
                target_percentage,
            } => format!(
                "estimated margin {:.1}% is below the {:.1}% target",
                margin_percentage, target_percentage
            ),
            QuoteWarning::NonPositiveMarginAfterDiscount {
                discount_percentage,
            } => format!(
                "a {:.1}% discount leaves no billable amount; the margin is negative",
                discount_percentage
            ),
        }
    }
}

/// Priced, itemized quote. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub generated_at: DateTime<Utc>,
    pub line_items: Vec<QuoteLineItem>,
    pub groups_by_service: Vec<QuoteServiceGroup>,
    pub subtotal: f64,
    pub discount_percentage: f64,
    pub discount_amount: f64,
    pub total_before_tax: f64,
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub total_after_tax: f64,
    pub estimated_subcontractor_cost: f64,
    pub estimated_margin_amount: f64,
    /// `None` when a discount wiped out a non-zero subtotal.
    pub estimated_margin_percentage: Option<f64>,
    pub warnings: Vec<QuoteWarning>,
}

impl Quote {
    pub fn warning_summaries(&self) -> Vec<String> {
        self.warnings.iter().map(QuoteWarning::summary).collect()
    }

    pub fn group(&self, service_id: &str) -> Option<&QuoteServiceGroup> {
        self.groups_by_service
            .iter()
            .find(|group| group.service_id == service_id)
    }
}

pub(crate) fn build_quote<T>(
    catalog: &Catalog,
    task_ids: &[T],
    inputs: &QuoteInput,
    discount_percentage: f64,
    settings: &SettingsSnapshot,
) -> Quote
where
    T: AsRef<str>,
{
    let discount_percentage = clamp_discount(discount_percentage);

    let mut seen: Vec<&str> = Vec::new();
    let mut line_items = Vec::new();
    let mut subcontractor_cost = 0.0;

    for task_id in task_ids {
        let task_id: &str = task_id.as_ref();
        if seen.contains(&task_id) {
            continue;
        }
        seen.push(task_id);

        let Some(task) = catalog.task(task_id) else {
            debug!(task_id, "skipping unknown task");
            continue;
        };
        let Some(service) = catalog.service_for_task(task_id) else {
            debug!(task_id, "skipping task without an owning service");
            continue;
        };

        let price = price_task(task, inputs, settings);
        let quantity: u32 = 1;
        let total_price = price.unit_price * f64::from(quantity);
        subcontractor_cost += total_price * task.trade.subcontractor_share();

        line_items.push(QuoteLineItem {
            task_id: task.id.to_string(),
            task_name: task.name.to_string(),
            service_id: service.id.to_string(),
            service_name: service.name.to_string(),
            quantity,
            unit_price: price.unit_price,
            total_price,
            explanation: price.explanation,
        });
    }

    let groups_by_service = group_by_service(catalog, &line_items);

    let subtotal: f64 = line_items.iter().map(|item| item.total_price).sum();
    let discount_amount = subtotal * discount_percentage / 100.0;
    let total_before_tax = subtotal - discount_amount;
    let vat_rate = settings.vat_rate;
    let vat_amount = total_before_tax * vat_rate / 100.0;
    let total_after_tax = total_before_tax + vat_amount;

    let margin_amount = total_before_tax - subcontractor_cost;
    let mut warnings = Vec::new();
    let margin_percentage = if total_before_tax > 0.0 {
        let percentage = margin_amount / total_before_tax * 100.0;
        // Architect-only quotes land exactly on the 30% target.
        if percentage + MARGIN_TOLERANCE < settings.min_margin_percentage {
            warnings.push(QuoteWarning::MarginBelowTarget {
                margin_percentage: percentage,
                target_percentage: settings.min_margin_percentage,
            });
        }
        Some(percentage)
    } else if subtotal > 0.0 {
        warnings.push(QuoteWarning::NonPositiveMarginAfterDiscount {
            discount_percentage,
        });
        None
    } else {
        Some(0.0)
    };

    let quote = Quote {
        id: QuoteId::generate(),
        generated_at: Utc::now(),
        line_items,
        groups_by_service,
        subtotal,
        discount_percentage,
        discount_amount,
        total_before_tax,
        vat_rate,
        vat_amount,
        total_after_tax,
        estimated_subcontractor_cost: subcontractor_cost,
        estimated_margin_amount: margin_amount,
        estimated_margin_percentage: margin_percentage,
        warnings,
    };

    info!(
        quote_id = %quote.id,
        items = quote.line_items.len(),
        subtotal = quote.subtotal,
        total_after_tax = quote.total_after_tax,
        warnings = quote.warnings.len(),
        "quote generated"
    );

    quote
}

fn clamp_discount(discount_percentage: f64) -> f64 {
    if discount_percentage.is_finite() {
        discount_percentage.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Groups follow catalog service order; items keep selection order.
fn group_by_service(catalog: &Catalog, line_items: &[QuoteLineItem]) -> Vec<QuoteServiceGroup> {
    catalog
        .services()
        .iter()
        .filter_map(|service| {
            let items: Vec<QuoteLineItem> = line_items
                .iter()
                .filter(|item| item.service_id == service.id)
                .cloned()
                .collect();
            if items.is_empty() {
                return None;
            }
            let subtotal = items.iter().map(|item| item.total_price).sum();
            Some(QuoteServiceGroup {
                service_id: service.id.to_string(),
                service_name: service.name.to_string(),
                items,
                subtotal,
            })
        })
        .collect()
}
