use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::catalog::{Task, TaskCategory};
use super::parameters::PricingParameter;
use super::quote::Quote;
use super::service::{QuoteRequest, QuoteService, QuoteServiceError, TaskSelection};
use super::settings::{SettingsStore, SettingsUpdate};

/// Router builder exposing the catalog, quote generation and settings endpoints.
pub fn quote_router<S>(service: Arc<QuoteService<S>>) -> Router
where
    S: SettingsStore + 'static,
{
    Router::new()
        .route("/api/v1/catalog", get(catalog_handler::<S>))
        .route("/api/v1/quotes", post(quote_handler::<S>))
        .route("/api/v1/quotes/parameters", post(parameters_handler::<S>))
        .route(
            "/api/v1/settings",
            get(settings_handler::<S>).put(update_settings_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogTaskView<'a> {
    id: &'a str,
    name: &'a str,
    category: TaskCategory,
    category_label: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogServiceView<'a> {
    id: &'a str,
    name: &'a str,
    tasks: Vec<CatalogTaskView<'a>>,
}

#[derive(Debug, Serialize)]
struct CatalogView<'a> {
    services: Vec<CatalogServiceView<'a>>,
    parameters: &'a [PricingParameter],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteView {
    #[serde(flatten)]
    pub(crate) quote: Quote,
    pub(crate) warning_messages: Vec<String>,
}

impl From<Quote> for QuoteView {
    fn from(quote: Quote) -> Self {
        let warning_messages = quote.warning_summaries();
        Self {
            quote,
            warning_messages,
        }
    }
}

pub(crate) async fn catalog_handler<S>(State(service): State<Arc<QuoteService<S>>>) -> Response
where
    S: SettingsStore + 'static,
{
    let catalog = service.catalog();
    let services = catalog
        .services()
        .iter()
        .map(|entry| CatalogServiceView {
            id: entry.id,
            name: entry.name,
            tasks: catalog
                .tasks_for_service(entry.id)
                .into_iter()
                .map(task_view)
                .collect(),
        })
        .collect();

    let view = CatalogView {
        services,
        parameters: catalog.parameters(),
    };
    (StatusCode::OK, Json(view)).into_response()
}

fn task_view(task: &Task) -> CatalogTaskView<'_> {
    CatalogTaskView {
        id: task.id,
        name: task.name,
        category: task.category,
        category_label: task.category.label(),
    }
}

pub(crate) async fn parameters_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    Json(selection): Json<TaskSelection>,
) -> Response
where
    S: SettingsStore + 'static,
{
    let parameters = service.applicable_parameters(&selection);
    (StatusCode::OK, Json(json!({ "parameters": parameters }))).into_response()
}

pub(crate) async fn quote_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    Json(request): Json<QuoteRequest>,
) -> Response
where
    S: SettingsStore + 'static,
{
    match blocking(service, move |service| service.generate(&request)).await {
        Ok(quote) => (StatusCode::CREATED, Json(QuoteView::from(quote))).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn settings_handler<S>(State(service): State<Arc<QuoteService<S>>>) -> Response
where
    S: SettingsStore + 'static,
{
    match blocking(service, |service| service.settings()).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn update_settings_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    Json(update): Json<SettingsUpdate>,
) -> Response
where
    S: SettingsStore + 'static,
{
    match blocking(service, move |service| service.update_settings(update)).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(response) => response,
    }
}

/// Runs a store-backed service call on the blocking pool; file stores do
/// synchronous IO under a mutex.
async fn blocking<S, T, F>(service: Arc<QuoteService<S>>, job: F) -> Result<T, Response>
where
    S: SettingsStore + 'static,
    T: Send + 'static,
    F: FnOnce(&QuoteService<S>) -> Result<T, QuoteServiceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || job(&service)).await {
        Ok(result) => result.map_err(error_response),
        Err(err) => {
            error!(error = %err, "settings worker failed");
            let payload = json!({ "error": "settings worker failed" });
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response())
        }
    }
}

fn error_response(err: QuoteServiceError) -> Response {
    let status = match &err {
        QuoteServiceError::InvalidSettings(_) => StatusCode::UNPROCESSABLE_ENTITY,
        QuoteServiceError::Store(_) => {
            error!(error = %err, "settings store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
