//! Service health and model listing commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, HealthReport, HealthStatus, ModelList};
use crate::output::{
    color_status, print_info, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Row for the models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "Loaded")]
    loaded: String,
    #[tabled(rename = "Capability")]
    capability: String,
    #[tabled(rename = "Labels")]
    labels: String,
}

/// Show liveness and per-component health
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: HealthStatus = client.get("health").await?;
    let report: HealthReport = client.get_probe("healthz").await?;

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({ "health": status, "components": report }));
        return Ok(());
    }

    if status.models_loaded {
        print_success(&format!("Service {} at {}", status.status, client.base_url()));
    } else {
        print_warning(&format!(
            "Service {} at {} but models are not loaded",
            status.status,
            client.base_url()
        ));
    }
    print_info(&format!("Overall: {}", color_status(&report.status)));

    let rows: Vec<ComponentRow> = report
        .components
        .into_iter()
        .map(|(name, health)| ComponentRow {
            name,
            status: color_status(&health.status),
            message: health.message.unwrap_or_default(),
        })
        .collect();
    print_table(&rows);

    Ok(())
}

/// List configured classifiers and their load state
pub async fn models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let listing: ModelList = client.get("api/models").await?;

    if format == OutputFormat::Json {
        print_json(&listing);
        return Ok(());
    }

    let rows: Vec<ModelRow> = listing
        .models
        .iter()
        .map(|m| ModelRow {
            name: m.name.clone(),
            loaded: if m.loaded {
                "yes".to_string()
            } else {
                "no".to_string()
            },
            capability: m.capability.clone().unwrap_or_else(|| "-".to_string()),
            labels: m
                .labels
                .as_ref()
                .map(|l| l.join(", "))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(&rows);
    print_info(&format!(
        "Best model: {}  Temperature: {}",
        listing.best_model, listing.temperature
    ));

    Ok(())
}
