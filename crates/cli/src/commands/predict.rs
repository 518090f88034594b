//! Text scoring command

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, PredictionResponse};
use crate::output::{
    color_verdict, format_percent, print_info, print_json, print_table, print_warning, truncate,
    OutputFormat,
};

/// Row for the per-model table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Prediction")]
    prediction: String,
    #[tabled(rename = "AI")]
    ai: String,
    #[tabled(rename = "Human")]
    human: String,
}

/// Pick the input: `--text`, else `--file`, else stdin
pub fn read_input(text: Option<String>, file: Option<&Path>, stdin: impl Read) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let mut buffer = String::new();
    let mut stdin = stdin;
    stdin
        .read_to_string(&mut buffer)
        .context("Failed to read text from stdin")?;
    Ok(buffer)
}

/// Score a text and print the verdict
pub async fn predict(client: &ApiClient, text: String, format: OutputFormat) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("No text given; use --text, --file or pipe text on stdin");
    }

    let result = client.predict(&text).await?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => print_prediction(&text, &result),
    }

    Ok(())
}

fn print_prediction(text: &str, result: &PredictionResponse) {
    print_info(&format!("Input: {}", truncate(text.trim(), 60)));
    println!(
        "\nVerdict: {}  (AI {} / Human {})\n",
        color_verdict(&result.overall.prediction),
        format_percent(result.overall.ai_probability),
        format_percent(result.overall.human_probability),
    );

    let rows: Vec<ModelRow> = result
        .models
        .iter()
        .map(|m| ModelRow {
            model: if m.model_name == result.best_model {
                format!("{} *", m.model_name)
            } else {
                m.model_name.clone()
            },
            prediction: color_verdict(&m.prediction),
            ai: format_percent(m.ai_probability),
            human: format_percent(m.human_probability),
        })
        .collect();
    print_table(&rows);
    println!("* best model: {}", result.best_model);

    if result.models.len() < 3 {
        print_warning(&format!(
            "Only {} classifier(s) answered; the others are unavailable",
            result.models.len()
        ));
    }
}
