use crate::cli::{CatalogArgs, QuoteArgs, SelectionArgs, SettingsCommand};
use crate::infra::{file_backed_service, settings_path};
use crate::render::{catalog_text, parameters_text, render_quote, to_json};
use quote_engine::config::AppConfig;
use quote_engine::error::AppError;
use quote_engine::pricing::{
    Catalog, FileSettingsStore, QuoteRequest, QuoteService, SettingsStore, SettingsUpdate,
    TaskSelection,
};
use quote_engine::telemetry::{self, TelemetryError};
use std::path::PathBuf;
use tracing::warn;

fn command_service(
    settings_override: Option<PathBuf>,
) -> Result<QuoteService<FileSettingsStore>, AppError> {
    let config = AppConfig::load()?;
    match telemetry::init(&config.telemetry) {
        // An already installed subscriber is kept.
        Ok(()) | Err(TelemetryError::Subscriber(_)) => {}
        Err(err) => return Err(err.into()),
    }
    Ok(file_backed_service(settings_path(&config, settings_override)))
}

pub(crate) fn run_quote(args: QuoteArgs, settings_override: Option<PathBuf>) -> Result<(), AppError> {
    let service = command_service(settings_override)?;
    let output = quote_output(&service, args)?;
    println!("{output}");
    Ok(())
}

pub(crate) fn quote_output<S>(service: &QuoteService<S>, args: QuoteArgs) -> Result<String, AppError>
where
    S: SettingsStore,
{
    let QuoteArgs {
        tasks,
        services,
        params,
        discount,
        no_defaults,
        format,
    } = args;

    let selection = TaskSelection {
        task_ids: tasks,
        service_ids: services,
    };
    check_selection(service.catalog(), &selection)?;

    let request = QuoteRequest {
        selection,
        inputs: params.into_iter().collect(),
        discount_percentage: discount,
        apply_defaults: !no_defaults,
    };
    let quote = service.generate(&request)?;
    render_quote(&quote, format)
}

/// Rejects an empty selection and warns about ids the catalog does not know.
fn check_selection(catalog: &Catalog, selection: &TaskSelection) -> Result<(), AppError> {
    if selection.task_ids.is_empty() && selection.service_ids.is_empty() {
        return Err(AppError::InvalidArgument(
            "select at least one --task or --service".to_string(),
        ));
    }
    for task_id in &selection.task_ids {
        if catalog.task(task_id).is_none() {
            warn!(task_id = %task_id, "unknown task ignored");
        }
    }
    for service_id in &selection.service_ids {
        if catalog.service(service_id).is_none() {
            warn!(service_id = %service_id, "unknown service ignored");
        }
    }
    Ok(())
}

pub(crate) fn run_parameters(
    args: SelectionArgs,
    settings_override: Option<PathBuf>,
) -> Result<(), AppError> {
    let service = command_service(settings_override)?;
    let selection = TaskSelection {
        task_ids: args.tasks,
        service_ids: args.services,
    };
    let parameters = service.applicable_parameters(&selection);

    if args.json {
        println!("{}", to_json(&parameters)?);
    } else {
        println!("{}", parameters_text(&parameters));
    }
    Ok(())
}

pub(crate) fn run_catalog(args: CatalogArgs, settings_override: Option<PathBuf>) -> Result<(), AppError> {
    let service = command_service(settings_override)?;
    let catalog = service.catalog();

    if args.json {
        println!("{}", to_json(catalog.services())?);
    } else {
        println!("{}", catalog_text(catalog));
    }
    Ok(())
}

pub(crate) fn run_settings(
    command: SettingsCommand,
    settings_override: Option<PathBuf>,
) -> Result<(), AppError> {
    let service = command_service(settings_override)?;
    let output = settings_output(&service, command)?;
    println!("{output}");
    Ok(())
}

pub(crate) fn settings_output<S>(
    service: &QuoteService<S>,
    command: SettingsCommand,
) -> Result<String, AppError>
where
    S: SettingsStore,
{
    let snapshot = match command {
        SettingsCommand::Show => service.settings()?,
        SettingsCommand::Set { key, value } => {
            let update = SettingsUpdate::from_entry(key, &value)?;
            service.update_settings(update)?
        }
        SettingsCommand::Reset { key } => service.reset_setting(key)?,
    };
    to_json(&snapshot)
}
