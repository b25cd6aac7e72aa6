use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Three-tier step function mapping a numeric input to a coefficient.
///
/// `value < x` yields `coeff_x`, `x <= value <= y` yields `coeff_xy` and
/// `value > y` yields `coeff_y`. `x < y` is checked when settings are written,
/// never while pricing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "coeffX")]
    pub coeff_x: f64,
    #[serde(rename = "coeffXY")]
    pub coeff_xy: f64,
    #[serde(rename = "coeffY")]
    pub coeff_y: f64,
}

impl ThresholdTable {
    pub const fn new(x: f64, y: f64, coeff_x: f64, coeff_xy: f64, coeff_y: f64) -> Self {
        Self {
            x,
            y,
            coeff_x,
            coeff_xy,
            coeff_y,
        }
    }

    pub fn coefficient(&self, value: f64) -> f64 {
        if value < self.x {
            self.coeff_x
        } else if value > self.y {
            self.coeff_y
        } else {
            self.coeff_xy
        }
    }

    pub fn coefficients(&self) -> [f64; 3] {
        [self.coeff_x, self.coeff_xy, self.coeff_y]
    }
}

/// Multiplicative factor per complexity option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityFactorTable {
    #[serde(rename = "Simple")]
    pub simple: f64,
    #[serde(rename = "Moyenne")]
    pub moyenne: f64,
    #[serde(rename = "Complexe")]
    pub complexe: f64,
}

impl ComplexityFactorTable {
    pub fn factor(&self, complexity: &str) -> Option<f64> {
        match complexity {
            "Simple" => Some(self.simple),
            "Moyenne" => Some(self.moyenne),
            "Complexe" => Some(self.complexe),
            _ => None,
        }
    }

    pub fn factors(&self) -> [f64; 3] {
        [self.simple, self.moyenne, self.complexe]
    }
}

impl Default for ComplexityFactorTable {
    fn default() -> Self {
        Self {
            simple: 1.0,
            moyenne: 1.2,
            complexe: 1.5,
        }
    }
}

/// Multiplicative factor per ERP ranking option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErpFactorTable(pub BTreeMap<String, f64>);

impl ErpFactorTable {
    pub fn factor(&self, ranking: &str) -> Option<f64> {
        self.0.get(ranking).copied()
    }
}

impl Default for ErpFactorTable {
    fn default() -> Self {
        Self(
            [("1", 1.5), ("2", 1.4), ("3", 1.3), ("4", 1.15), ("5", 1.0)]
                .into_iter()
                .map(|(ranking, factor)| (ranking.to_string(), factor))
                .collect(),
        )
    }
}

/// Per-task price override stored in settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPriceOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, alias = "pricePerSqm", skip_serializing_if = "Option::is_none")]
    pub price_per_area: Option<f64>,
}
