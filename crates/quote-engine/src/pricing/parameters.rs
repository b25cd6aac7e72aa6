use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Join key between the parameter catalog, quote inputs and settings tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterId {
    Complexity,
    ErpRanking,
    Distance,
    GroundArea,
    FloorsNumber,
    MainRoomsNumber,
    DerogationsNumber,
    CopiesNumber,
    NeedsPlans,
}

impl ParameterId {
    pub const fn ordered() -> [Self; 9] {
        [
            Self::Complexity,
            Self::ErpRanking,
            Self::Distance,
            Self::GroundArea,
            Self::FloorsNumber,
            Self::MainRoomsNumber,
            Self::DerogationsNumber,
            Self::CopiesNumber,
            Self::NeedsPlans,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complexity => "complexity",
            Self::ErpRanking => "erpRanking",
            Self::Distance => "distance",
            Self::GroundArea => "groundArea",
            Self::FloorsNumber => "floorsNumber",
            Self::MainRoomsNumber => "mainRoomsNumber",
            Self::DerogationsNumber => "derogationsNumber",
            Self::CopiesNumber => "copiesNumber",
            Self::NeedsPlans => "needsPlans",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|id| id.as_str() == raw.trim())
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed variable that may influence task pricing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PricingParameter {
    #[serde(rename_all = "camelCase")]
    Number {
        id: ParameterId,
        label: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<&'static str>,
        default_value: f64,
    },
    #[serde(rename_all = "camelCase")]
    Select {
        id: ParameterId,
        label: &'static str,
        options: Vec<&'static str>,
        default_value: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Boolean {
        id: ParameterId,
        label: &'static str,
        default_value: bool,
    },
}

impl PricingParameter {
    pub fn id(&self) -> ParameterId {
        match self {
            Self::Number { id, .. } | Self::Select { id, .. } | Self::Boolean { id, .. } => *id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Number { label, .. }
            | Self::Select { label, .. }
            | Self::Boolean { label, .. } => *label,
        }
    }

    pub fn default_value(&self) -> ParameterValue {
        match self {
            Self::Number { default_value, .. } => ParameterValue::Number(*default_value),
            Self::Select { default_value, .. } => {
                ParameterValue::Choice(default_value.to_string())
            }
            Self::Boolean { default_value, .. } => ParameterValue::Flag(*default_value),
        }
    }

    /// Converts a loosely typed value into this parameter's variant, or `None`
    /// when it cannot be read as one.
    pub fn coerce(&self, raw: &Value) -> Option<ParameterValue> {
        match self {
            Self::Number { .. } => {
                let number = match raw {
                    Value::Number(number) => number.as_f64(),
                    Value::String(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
                    _ => None,
                }?;
                number.is_finite().then_some(ParameterValue::Number(number))
            }
            Self::Select { options, .. } => {
                let choice = match raw {
                    Value::String(text) => text.trim().to_string(),
                    Value::Number(number) => number.to_string(),
                    _ => return None,
                };
                options
                    .iter()
                    .any(|option| *option == choice)
                    .then_some(ParameterValue::Choice(choice))
            }
            Self::Boolean { .. } => match raw {
                Value::Bool(flag) => Some(ParameterValue::Flag(*flag)),
                Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(ParameterValue::Flag(true)),
                    "false" => Some(ParameterValue::Flag(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

/// Value supplied for a parameter, already checked against its declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Choice(String),
    Flag(bool),
}

/// Parameter values for one quote computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QuoteInput {
    values: BTreeMap<ParameterId, ParameterValue>,
}

impl QuoteInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerces a raw string-keyed map against the parameter catalog. Unknown
    /// keys and values of the wrong shape are dropped.
    pub fn from_raw(parameters: &[PricingParameter], raw: &BTreeMap<String, Value>) -> Self {
        let mut input = Self::new();
        for (key, value) in raw {
            let Some(parameter) = ParameterId::parse(key)
                .and_then(|id| parameters.iter().find(|parameter| parameter.id() == id))
            else {
                debug!(parameter = %key, "ignoring unknown quote parameter");
                continue;
            };

            match parameter.coerce(value) {
                Some(coerced) => {
                    input.values.insert(parameter.id(), coerced);
                }
                None => debug!(parameter = %key, %value, "ignoring malformed quote parameter"),
            }
        }
        input
    }

    pub fn with(mut self, id: ParameterId, value: ParameterValue) -> Self {
        self.set(id, value);
        self
    }

    pub fn set(&mut self, id: ParameterId, value: ParameterValue) {
        self.values.insert(id, value);
    }

    /// Fills the catalog default of every given parameter that has no value yet.
    pub fn with_defaults<'a, I>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = &'a PricingParameter>,
    {
        for parameter in parameters {
            self.values
                .entry(parameter.id())
                .or_insert_with(|| parameter.default_value());
        }
        self
    }

    pub fn number(&self, id: ParameterId) -> Option<f64> {
        match self.values.get(&id) {
            Some(ParameterValue::Number(number)) if number.is_finite() => Some(*number),
            _ => None,
        }
    }

    pub fn choice(&self, id: ParameterId) -> Option<&str> {
        match self.values.get(&id) {
            Some(ParameterValue::Choice(choice)) => Some(choice.as_str()),
            _ => None,
        }
    }

    pub fn flag(&self, id: ParameterId) -> Option<bool> {
        match self.values.get(&id) {
            Some(ParameterValue::Flag(flag)) => Some(*flag),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub const COMPLEXITY_OPTIONS: [&str; 3] = ["Simple", "Moyenne", "Complexe"];
pub const ERP_RANKING_OPTIONS: [&str; 5] = ["1", "2", "3", "4", "5"];

pub(crate) fn standard_parameters() -> Vec<PricingParameter> {
    vec![
        PricingParameter::Select {
            id: ParameterId::Complexity,
            label: "Complexité",
            options: COMPLEXITY_OPTIONS.to_vec(),
            default_value: "Simple",
        },
        PricingParameter::Select {
            id: ParameterId::ErpRanking,
            label: "Catégorie ERP",
            options: ERP_RANKING_OPTIONS.to_vec(),
            default_value: "5",
        },
        PricingParameter::Number {
            id: ParameterId::Distance,
            label: "Distance",
            unit: Some("km"),
            default_value: 20.0,
        },
        PricingParameter::Number {
            id: ParameterId::GroundArea,
            label: "Surface au sol",
            unit: Some("m²"),
            default_value: 100.0,
        },
        PricingParameter::Number {
            id: ParameterId::FloorsNumber,
            label: "Nombre de niveaux",
            unit: Some("niveaux"),
            default_value: 1.0,
        },
        PricingParameter::Number {
            id: ParameterId::MainRoomsNumber,
            label: "Nombre de pièces principales",
            unit: Some("pièces"),
            default_value: 1.0,
        },
        PricingParameter::Number {
            id: ParameterId::DerogationsNumber,
            label: "Nombre de dérogations",
            unit: None,
            default_value: 0.0,
        },
        PricingParameter::Number {
            id: ParameterId::CopiesNumber,
            label: "Nombre d'exemplaires",
            unit: None,
            default_value: 3.0,
        },
        PricingParameter::Boolean {
            id: ParameterId::NeedsPlans,
            label: "Besoin de réalisation de plans",
            default_value: true,
        },
    ]
}
