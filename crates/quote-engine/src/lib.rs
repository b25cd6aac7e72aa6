//! Quote configurator for building-safety engineering services: a static task
//! catalog, parameter-driven pricing rules and quote aggregation, with settings
//! overrides persisted outside the engine.

pub mod config;
pub mod error;
pub mod pricing;
pub mod telemetry;
