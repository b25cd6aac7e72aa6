//! Resolved pricing settings and the key-value store they are read from.

mod store;
mod tables;

pub use store::{FileSettingsStore, InMemorySettingsStore, SettingsStore, SettingsStoreError};
pub use tables::{ComplexityFactorTable, ErpFactorTable, TaskPriceOverride, ThresholdTable};

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::catalog::Catalog;

pub const DEFAULT_VAT_RATE: f64 = 20.0;
pub const DEFAULT_MIN_MARGIN_PERCENTAGE: f64 = 30.0;
pub const DEFAULT_PRICE_PER_PAGE: f64 = 0.10;
pub const DEFAULT_DISTANCE_THRESHOLDS: ThresholdTable =
    ThresholdTable::new(50.0, 100.0, 1.0, 1.5, 2.0);
pub const DEFAULT_GROUND_AREA_THRESHOLDS: ThresholdTable =
    ThresholdTable::new(100.0, 500.0, 1.0, 1.3, 1.6);
pub const DEFAULT_FLOORS_NUMBER_THRESHOLDS: ThresholdTable =
    ThresholdTable::new(2.0, 5.0, 1.0, 1.2, 1.5);
pub const DEFAULT_MAIN_ROOMS_NUMBER_THRESHOLDS: ThresholdTable =
    ThresholdTable::new(5.0, 15.0, 1.0, 1.2, 1.5);

/// Storage key of every persisted setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingsKey {
    DefaultVatRate,
    MinMarginPercentage,
    TaskPrices,
    ComplexityFactors,
    DistanceThresholds,
    GroundAreaThresholds,
    FloorsNumberThresholds,
    MainRoomsNumberThresholds,
    ErpFactors,
    PricePerPage,
}

impl SettingsKey {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::DefaultVatRate,
            Self::MinMarginPercentage,
            Self::TaskPrices,
            Self::ComplexityFactors,
            Self::DistanceThresholds,
            Self::GroundAreaThresholds,
            Self::FloorsNumberThresholds,
            Self::MainRoomsNumberThresholds,
            Self::ErpFactors,
            Self::PricePerPage,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DefaultVatRate => "defaultVatRate",
            Self::MinMarginPercentage => "minMarginPercentage",
            Self::TaskPrices => "taskPrices",
            Self::ComplexityFactors => "complexityFactors",
            Self::DistanceThresholds => "distanceThresholds",
            Self::GroundAreaThresholds => "groundAreaThresholds",
            Self::FloorsNumberThresholds => "floorsNumberThresholds",
            Self::MainRoomsNumberThresholds => "mainRoomsNumberThresholds",
            Self::ErpFactors => "erpFactors",
            Self::PricePerPage => "pricePerPage",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|key| key.as_str() == raw.trim())
    }
}

impl fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent pricing basis for one quote computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    #[serde(rename = "defaultVatRate")]
    pub vat_rate: f64,
    pub min_margin_percentage: f64,
    pub task_prices: BTreeMap<String, TaskPriceOverride>,
    pub complexity_factors: ComplexityFactorTable,
    pub distance_thresholds: ThresholdTable,
    pub ground_area_thresholds: ThresholdTable,
    pub floors_number_thresholds: ThresholdTable,
    pub main_rooms_number_thresholds: ThresholdTable,
    pub erp_factors: ErpFactorTable,
    pub price_per_page: f64,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            vat_rate: DEFAULT_VAT_RATE,
            min_margin_percentage: DEFAULT_MIN_MARGIN_PERCENTAGE,
            task_prices: BTreeMap::new(),
            complexity_factors: ComplexityFactorTable::default(),
            distance_thresholds: DEFAULT_DISTANCE_THRESHOLDS,
            ground_area_thresholds: DEFAULT_GROUND_AREA_THRESHOLDS,
            floors_number_thresholds: DEFAULT_FLOORS_NUMBER_THRESHOLDS,
            main_rooms_number_thresholds: DEFAULT_MAIN_ROOMS_NUMBER_THRESHOLDS,
            erp_factors: ErpFactorTable::default(),
            price_per_page: DEFAULT_PRICE_PER_PAGE,
        }
    }
}

impl SettingsSnapshot {
    /// Builds a snapshot from raw stored entries. Each key falls back to its
    /// default on its own when missing or unparseable.
    pub fn from_entries(entries: &BTreeMap<SettingsKey, String>) -> Self {
        let defaults = Self::default();
        Self {
            vat_rate: parse_entry(entries, SettingsKey::DefaultVatRate, defaults.vat_rate),
            min_margin_percentage: parse_entry(
                entries,
                SettingsKey::MinMarginPercentage,
                defaults.min_margin_percentage,
            ),
            task_prices: parse_entry(entries, SettingsKey::TaskPrices, defaults.task_prices),
            complexity_factors: parse_entry(
                entries,
                SettingsKey::ComplexityFactors,
                defaults.complexity_factors,
            ),
            distance_thresholds: parse_entry(
                entries,
                SettingsKey::DistanceThresholds,
                defaults.distance_thresholds,
            ),
            ground_area_thresholds: parse_entry(
                entries,
                SettingsKey::GroundAreaThresholds,
                defaults.ground_area_thresholds,
            ),
            floors_number_thresholds: parse_entry(
                entries,
                SettingsKey::FloorsNumberThresholds,
                defaults.floors_number_thresholds,
            ),
            main_rooms_number_thresholds: parse_entry(
                entries,
                SettingsKey::MainRoomsNumberThresholds,
                defaults.main_rooms_number_thresholds,
            ),
            erp_factors: parse_entry(entries, SettingsKey::ErpFactors, defaults.erp_factors),
            price_per_page: parse_entry(
                entries,
                SettingsKey::PricePerPage,
                defaults.price_per_page,
            ),
        }
    }

    /// Reads every entry from the store in one call.
    pub fn load<S>(store: &S) -> Result<Self, SettingsStoreError>
    where
        S: SettingsStore + ?Sized,
    {
        let entries = store.read_all()?;
        Ok(Self::from_entries(&entries))
    }

    pub fn task_price(&self, task_id: &str) -> Option<&TaskPriceOverride> {
        self.task_prices.get(task_id)
    }
}

fn parse_entry<T>(entries: &BTreeMap<SettingsKey, String>, key: SettingsKey, default: T) -> T
where
    T: DeserializeOwned,
{
    let Some(raw) = entries.get(&key) else {
        return default;
    };

    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(setting = %key, error = %err, "falling back to default for unparseable setting");
            default
        }
    }
}

/// Partial settings change submitted by whoever edits settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_vat_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_margin_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_prices: Option<BTreeMap<String, TaskPriceOverride>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_factors: Option<ComplexityFactorTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_thresholds: Option<ThresholdTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_area_thresholds: Option<ThresholdTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floors_number_thresholds: Option<ThresholdTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_rooms_number_thresholds: Option<ThresholdTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erp_factors: Option<ErpFactorTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_page: Option<f64>,
}

impl SettingsUpdate {
    /// Parses a single stored value for `key` into an update touching only that key.
    pub fn from_entry(key: SettingsKey, raw: &str) -> Result<Self, SettingsValidationError> {
        let malformed = |err: serde_json::Error| SettingsValidationError::Malformed {
            key,
            reason: err.to_string(),
        };

        let mut update = Self::default();
        match key {
            SettingsKey::DefaultVatRate => {
                update.default_vat_rate = Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::MinMarginPercentage => {
                update.min_margin_percentage = Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::TaskPrices => {
                update.task_prices = Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::ComplexityFactors => {
                update.complexity_factors = Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::DistanceThresholds => {
                update.distance_thresholds = Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::GroundAreaThresholds => {
                update.ground_area_thresholds = Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::FloorsNumberThresholds => {
                update.floors_number_thresholds =
                    Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::MainRoomsNumberThresholds => {
                update.main_rooms_number_thresholds =
                    Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::ErpFactors => {
                update.erp_factors = Some(serde_json::from_str(raw).map_err(malformed)?)
            }
            SettingsKey::PricePerPage => {
                update.price_per_page = Some(serde_json::from_str(raw).map_err(malformed)?)
            }
        }
        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self, catalog: &Catalog) -> Result<(), SettingsValidationError> {
        if let Some(rate) = self.default_vat_rate {
            check_percentage(SettingsKey::DefaultVatRate, rate)?;
        }
        if let Some(margin) = self.min_margin_percentage {
            check_percentage(SettingsKey::MinMarginPercentage, margin)?;
        }
        if let Some(prices) = &self.task_prices {
            for (task_id, price) in prices {
                if catalog.task(task_id).is_none() {
                    return Err(SettingsValidationError::UnknownTask(task_id.clone()));
                }
                for value in [price.unit_price, price.price_per_area].into_iter().flatten() {
                    check_non_negative(SettingsKey::TaskPrices, value)?;
                }
            }
        }
        if let Some(factors) = &self.complexity_factors {
            for factor in factors.factors() {
                check_non_negative(SettingsKey::ComplexityFactors, factor)?;
            }
        }
        for (key, table) in [
            (SettingsKey::DistanceThresholds, &self.distance_thresholds),
            (SettingsKey::GroundAreaThresholds, &self.ground_area_thresholds),
            (SettingsKey::FloorsNumberThresholds, &self.floors_number_thresholds),
            (
                SettingsKey::MainRoomsNumberThresholds,
                &self.main_rooms_number_thresholds,
            ),
        ] {
            if let Some(table) = table {
                check_thresholds(key, table)?;
            }
        }
        if let Some(factors) = &self.erp_factors {
            for factor in factors.0.values() {
                check_non_negative(SettingsKey::ErpFactors, *factor)?;
            }
        }
        if let Some(price) = self.price_per_page {
            check_non_negative(SettingsKey::PricePerPage, price)?;
        }
        Ok(())
    }

    /// Serialises every present field into its stored representation.
    pub fn into_entries(self) -> Result<BTreeMap<SettingsKey, String>, serde_json::Error> {
        let mut entries = BTreeMap::new();
        let mut put = |key: SettingsKey, value: Option<String>| {
            if let Some(value) = value {
                entries.insert(key, value);
            }
        };

        put(SettingsKey::DefaultVatRate, to_json(&self.default_vat_rate)?);
        put(
            SettingsKey::MinMarginPercentage,
            to_json(&self.min_margin_percentage)?,
        );
        put(SettingsKey::TaskPrices, to_json(&self.task_prices)?);
        put(
            SettingsKey::ComplexityFactors,
            to_json(&self.complexity_factors)?,
        );
        put(
            SettingsKey::DistanceThresholds,
            to_json(&self.distance_thresholds)?,
        );
        put(
            SettingsKey::GroundAreaThresholds,
            to_json(&self.ground_area_thresholds)?,
        );
        put(
            SettingsKey::FloorsNumberThresholds,
            to_json(&self.floors_number_thresholds)?,
        );
        put(
            SettingsKey::MainRoomsNumberThresholds,
            to_json(&self.main_rooms_number_thresholds)?,
        );
        put(SettingsKey::ErpFactors, to_json(&self.erp_factors)?);
        put(SettingsKey::PricePerPage, to_json(&self.price_per_page)?);

        Ok(entries)
    }
}

fn to_json<T: Serialize>(value: &Option<T>) -> Result<Option<String>, serde_json::Error> {
    value.as_ref().map(serde_json::to_string).transpose()
}

fn check_percentage(key: SettingsKey, value: f64) -> Result<(), SettingsValidationError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(SettingsValidationError::OutOfRange { key, value })
    }
}

fn check_non_negative(key: SettingsKey, value: f64) -> Result<(), SettingsValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsValidationError::Negative { key, value })
    }
}

fn check_thresholds(key: SettingsKey, table: &ThresholdTable) -> Result<(), SettingsValidationError> {
    if !(table.x.is_finite() && table.y.is_finite()) || table.x >= table.y {
        return Err(SettingsValidationError::InvertedThresholds {
            key,
            x: table.x,
            y: table.y,
        });
    }
    for coefficient in table.coefficients() {
        check_non_negative(key, coefficient)?;
    }
    Ok(())
}

/// Rejection raised before a settings change reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsValidationError {
    #[error("{key}: lower threshold {x} must be below upper threshold {y}")]
    InvertedThresholds { key: SettingsKey, x: f64, y: f64 },
    #[error("{key}: {value} is outside 0-100")]
    OutOfRange { key: SettingsKey, value: f64 },
    #[error("{key}: {value} must be a non-negative number")]
    Negative { key: SettingsKey, value: f64 },
    #[error("taskPrices: unknown task '{0}'")]
    UnknownTask(String),
    #[error("{key}: {reason}")]
    Malformed { key: SettingsKey, reason: String },
}
