use serde::Serialize;

use super::catalog::{Task, TaskCategory};
use super::parameters::{ParameterId, QuoteInput};
use super::settings::SettingsSnapshot;

/// Printed set: cover pages plus two per floor.
const BASE_PRINTED_PAGES: f64 = 3.0;
const PAGES_PER_FLOOR: f64 = 2.0;
const DEFAULT_COPIES: f64 = 3.0;

/// Unit price computed for a single task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPrice {
    pub unit_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl TaskPrice {
    pub fn zero() -> Self {
        Self {
            unit_price: 0.0,
            explanation: None,
        }
    }
}

pub(crate) fn price_task(task: &Task, inputs: &QuoteInput, settings: &SettingsSnapshot) -> TaskPrice {
    if task.category == TaskCategory::PlanRealization
        && inputs.flag(ParameterId::NeedsPlans) == Some(false)
    {
        return TaskPrice {
            unit_price: 0.0,
            explanation: Some("plans not required".to_string()),
        };
    }

    let mut price = seed_price(task, inputs, settings);
    let mut explanation = None;

    match task.category {
        TaskCategory::Travel => {
            if let Some(distance) = inputs.number(ParameterId::Distance) {
                price *= settings.distance_thresholds.coefficient(distance);
            }
        }
        TaskCategory::GeometricSurvey | TaskCategory::PlanRealization => {
            let tables = [
                (ParameterId::GroundArea, &settings.ground_area_thresholds),
                (ParameterId::FloorsNumber, &settings.floors_number_thresholds),
                (
                    ParameterId::MainRoomsNumber,
                    &settings.main_rooms_number_thresholds,
                ),
            ];
            for (id, table) in tables {
                if let Some(value) = inputs.number(id) {
                    price *= table.coefficient(value);
                }
            }
        }
        TaskCategory::SafetyNotice | TaskCategory::AccessibilityNotice => {
            if let Some(ranking) = inputs.choice(ParameterId::ErpRanking) {
                price *= settings.erp_factors.factor(ranking).unwrap_or(1.0);
            }
        }
        TaskCategory::DerogationRequest => {
            if let Some(count) = inputs
                .number(ParameterId::DerogationsNumber)
                .filter(|count| *count > 0.0)
            {
                price *= count;
            }
        }
        TaskCategory::Printing => {
            let floors = inputs
                .number(ParameterId::FloorsNumber)
                .unwrap_or(0.0)
                .max(0.0);
            let pages = BASE_PRINTED_PAGES + PAGES_PER_FLOOR * floors;
            let copies = inputs
                .number(ParameterId::CopiesNumber)
                .unwrap_or(DEFAULT_COPIES);
            price = pages * settings.price_per_page * copies;
            explanation = Some(format!("{pages} pages x {copies} copies"));
        }
        TaskCategory::FormFilling | TaskCategory::Dispatch | TaskCategory::General => {}
    }

    let complexity = inputs
        .choice(ParameterId::Complexity)
        .and_then(|complexity| settings.complexity_factors.factor(complexity))
        .unwrap_or(1.0);
    price *= complexity;

    TaskPrice {
        unit_price: price.max(0.0),
        explanation,
    }
}

/// Catalog base price, replaced field by field by any stored override, plus
/// the area rate when the task has one.
fn seed_price(task: &Task, inputs: &QuoteInput, settings: &SettingsSnapshot) -> f64 {
    let stored = settings.task_price(task.id);
    let unit_price = stored
        .and_then(|price| price.unit_price)
        .or(task.base_unit_price)
        .unwrap_or(0.0);
    let rate_per_area = stored
        .and_then(|price| price.price_per_area)
        .or(task.base_rate_per_area);

    match (rate_per_area, inputs.number(ParameterId::GroundArea)) {
        (Some(rate), Some(area)) => unit_price + rate * area.max(0.0),
        _ => unit_price,
    }
}
