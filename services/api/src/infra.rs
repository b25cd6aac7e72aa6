use metrics_exporter_prometheus::PrometheusHandle;
use quote_engine::config::AppConfig;
use quote_engine::pricing::{FileSettingsStore, QuoteEngine, QuoteService};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Applies the `--settings-path` override on top of the loaded configuration.
pub(crate) fn settings_path(config: &AppConfig, override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(|| config.settings.path.clone())
}

pub(crate) fn file_backed_service(path: PathBuf) -> QuoteService<FileSettingsStore> {
    debug!(path = %path.display(), "using file settings store");
    QuoteService::new(
        QuoteEngine::standard(),
        Arc::new(FileSettingsStore::new(path)),
    )
}

/// Parses `key=value`. The value is read as JSON when it parses, otherwise it
/// is kept as a plain string, so `complexity=Simple` and `distance=120` both work.
pub(crate) fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }

    let value = value.trim();
    let parsed = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), parsed))
}
