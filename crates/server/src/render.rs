//! HTML rendering for the form page

use detector_lib::{EnsembleResult, Verdict};
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;max-width:860px;margin:2rem auto;padding:0 1rem}\
textarea{width:100%;min-height:12rem}\
table{border-collapse:collapse;width:100%}td,th{border:1px solid #ccc;padding:.4rem .6rem;text-align:left}\
.error{color:#b00020}.ai{color:#c0392b}.human{color:#27ae60}";

/// Escape text for use in element content and attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Ai => "AI-generated",
        Verdict::Human => "Human-written",
    }
}

/// Render the page: the form, then either an error or the ensemble result
pub fn page(text: &str, result: Option<&EnsembleResult>, error: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(error) = error {
        let _ = write!(body, "<p class=\"error\">{}</p>", escape_html(error));
    }
    if let Some(result) = result {
        body.push_str(&result_section(result));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>Human vs AI Text Detector</title>\n<style>{style}</style>\n</head>\n<body>\n\
<h1>Human vs AI Text Detector</h1>\n\
<form method=\"post\" action=\"/predict\">\n\
<textarea name=\"text\" placeholder=\"Paste at least 50 characters of text\">{text}</textarea>\n\
<p><button type=\"submit\">Analyze</button></p>\n</form>\n{body}\n</body>\n</html>\n",
        style = STYLE,
        text = escape_html(text),
        body = body,
    )
}

fn result_section(result: &EnsembleResult) -> String {
    let overall = &result.overall;
    let mut html = String::new();

    let _ = write!(
        html,
        "<section id=\"result\">\n<h2>Verdict: <span class=\"{class}\">{label}</span></h2>\n\
<p>AI: {ai:.2}% &middot; Human: {human:.2}%</p>\n",
        class = overall.prediction,
        label = verdict_label(overall.prediction),
        ai = overall.ai_probability,
        human = overall.human_probability,
    );

    html.push_str("<table>\n<tr><th>Model</th><th>Prediction</th><th>AI %</th><th>Human %</th></tr>\n");
    for model in &result.models {
        let best = if model.model_name == result.best_model {
            " (best)"
        } else {
            ""
        };
        let _ = write!(
            html,
            "<tr><td>{name}{best}</td><td class=\"{class}\">{label}</td><td>{ai:.2}</td><td>{human:.2}</td></tr>\n",
            name = escape_html(&model.model_name),
            best = best,
            class = model.prediction,
            label = verdict_label(model.prediction),
            ai = model.ai_probability,
            human = model.human_probability,
        );
    }
    html.push_str("</table>\n");
    let _ = write!(
        html,
        "<p>Best model: {}</p>\n</section>",
        escape_html(&result.best_model)
    );
    html
}
