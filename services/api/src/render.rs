use clap::ValueEnum;
use quote_engine::error::AppError;
use quote_engine::pricing::{Catalog, PricingParameter, Quote};
use serde::Serialize;
use std::io;

const LABEL_WIDTH: usize = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

pub(crate) fn render_quote(quote: &Quote, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Text => Ok(quote_text(quote)),
        OutputFormat::Json => to_json(quote),
        OutputFormat::Csv => quote_csv(quote),
    }
}

pub(crate) fn to_json<T>(value: &T) -> Result<String, AppError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string_pretty(value).map_err(|err| AppError::Io(io::Error::from(err)))
}

fn amount_line(label: &str, amount: f64) -> String {
    format!("{label:<width$}{amount:>12.2}", width = LABEL_WIDTH)
}

pub(crate) fn quote_text(quote: &Quote) -> String {
    let mut lines = vec![format!(
        "Quote {} ({})",
        quote.id,
        quote.generated_at.format("%Y-%m-%d %H:%M UTC")
    )];

    if quote.line_items.is_empty() {
        lines.push("No billable tasks selected.".to_string());
    }

    for group in &quote.groups_by_service {
        lines.push(String::new());
        lines.push(group.service_name.clone());
        for item in &group.items {
            lines.push(amount_line(&format!("  {}", item.task_name), item.total_price));
            if let Some(explanation) = &item.explanation {
                lines.push(format!("    ({explanation})"));
            }
        }
        lines.push(amount_line("  Service subtotal", group.subtotal));
    }

    lines.push(String::new());
    lines.push(amount_line("Subtotal", quote.subtotal));
    if quote.discount_amount > 0.0 {
        lines.push(amount_line(
            &format!("Discount ({:.1}%)", quote.discount_percentage),
            -quote.discount_amount,
        ));
    }
    lines.push(amount_line("Total before tax", quote.total_before_tax));
    lines.push(amount_line(
        &format!("VAT ({:.1}%)", quote.vat_rate),
        quote.vat_amount,
    ));
    lines.push(amount_line("Total after tax", quote.total_after_tax));

    lines.push(String::new());
    lines.push(amount_line(
        "Estimated subcontracting",
        quote.estimated_subcontractor_cost,
    ));
    let margin = match quote.estimated_margin_percentage {
        Some(percentage) => format!("{percentage:.1}%"),
        None => "n/a".to_string(),
    };
    lines.push(format!(
        "{}  {margin}",
        amount_line("Estimated margin", quote.estimated_margin_amount)
    ));

    let warnings = quote.warning_summaries();
    if !warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings:".to_string());
        lines.extend(warnings.into_iter().map(|warning| format!("- {warning}")));
    }

    lines.join("\n")
}

pub(crate) fn quote_csv(quote: &Quote) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "service_id",
            "service_name",
            "task_id",
            "task_name",
            "quantity",
            "unit_price",
            "total_price",
            "explanation",
        ])
        .map_err(io::Error::from)?;

    for item in &quote.line_items {
        writer
            .write_record([
                item.service_id.as_str(),
                item.service_name.as_str(),
                item.task_id.as_str(),
                item.task_name.as_str(),
                item.quantity.to_string().as_str(),
                format!("{:.2}", item.unit_price).as_str(),
                format!("{:.2}", item.total_price).as_str(),
                item.explanation.as_deref().unwrap_or(""),
            ])
            .map_err(io::Error::from)?;
    }

    for (label, amount) in [
        ("subtotal", quote.subtotal),
        ("discount", quote.discount_amount),
        ("total_before_tax", quote.total_before_tax),
        ("vat", quote.vat_amount),
        ("total_after_tax", quote.total_after_tax),
    ] {
        writer
            .write_record(["", "", "", label, "", "", format!("{amount:.2}").as_str(), ""])
            .map_err(io::Error::from)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    String::from_utf8(bytes)
        .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}

pub(crate) fn parameters_text(parameters: &[PricingParameter]) -> String {
    parameters
        .iter()
        .map(|parameter| {
            let detail = match parameter {
                PricingParameter::Number {
                    unit,
                    default_value,
                    ..
                } => match unit {
                    Some(unit) => format!("number in {unit}, default {default_value}"),
                    None => format!("number, default {default_value}"),
                },
                PricingParameter::Select {
                    options,
                    default_value,
                    ..
                } => format!("one of {}, default {default_value}", options.join(" | ")),
                PricingParameter::Boolean { default_value, .. } => {
                    format!("yes/no, default {default_value}")
                }
            };
            format!("{:<20}{:<28}{detail}", parameter.id().as_str(), parameter.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn catalog_text(catalog: &Catalog) -> String {
    let mut lines = Vec::new();
    for service in catalog.services() {
        lines.push(format!("{} [{}]", service.name, service.id));
        for task in catalog.tasks_for_service(service.id) {
            let price = task
                .base_unit_price
                .map(|price| format!("{price:.2}"))
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "  {:<44}{:<24}{price:>10}",
                task.id,
                task.category.label()
            ));
        }
    }
    lines.join("\n")
}
