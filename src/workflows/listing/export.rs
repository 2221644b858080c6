use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::copywriter::CopyPack;
use super::domain::{BiasMiniPlan, IntakeMode, Stack};
use super::repository::{ExportJobId, IntakeRecord};

/// Render the proposal document for a chosen stack, bias plan, and copy
/// pack. Section order is fixed; nested copy structures become deeper
/// headings and bullet lists, to whatever depth the pack carries.
pub fn render_document(
    record: &IntakeRecord,
    stack: &Stack,
    bias: &BiasMiniPlan,
    pack: &CopyPack,
) -> String {
    let mut doc = String::new();

    heading(&mut doc, 1, "Proposal + Listing Lingo Pack");
    paragraph(
        &mut doc,
        &format!("Mode: {} | Intake ID: {}", mode_title(record.mode), record.id.0),
    );
    paragraph(
        &mut doc,
        &format!(
            "Chosen Tier: {} | Bias Plan: {}",
            stack.tier.label(),
            bias.key
        ),
    );

    heading(&mut doc, 2, "Chosen Services & Why");
    for service in &stack.services {
        heading(&mut doc, 3, &service.name);
        paragraph(&mut doc, &service.rationale);
    }

    heading(&mut doc, 2, "I. Core Listing & Print");
    render_value(&mut doc, &pack.core_listing_print, 3);

    heading(&mut doc, 2, "II. Digital & Social");
    render_value(&mut doc, &pack.digital_social, 3);

    heading(&mut doc, 2, "III. Direct Outreach");
    render_value(&mut doc, &pack.direct_outreach, 3);

    heading(&mut doc, 2, "Phase I/II & Week-1 Cadence");
    if pack.cadence.is_null() {
        render_value(&mut doc, &default_cadence(), 3);
    } else {
        render_value(&mut doc, &pack.cadence, 3);
    }

    heading(&mut doc, 2, "Operational Checklists");
    render_value(&mut doc, &pack.ops_checklists, 3);

    heading(&mut doc, 2, "KPIs (Simple)");
    if pack.kpis.is_empty() {
        for kpi in DEFAULT_KPIS {
            bullet(&mut doc, kpi);
        }
    } else {
        for kpi in &pack.kpis {
            bullet(&mut doc, kpi);
        }
    }
    doc.push('\n');

    heading(&mut doc, 2, "Disclaimers");
    for (key, text) in &pack.disclaimers {
        heading(&mut doc, 3, &title_case(key));
        paragraph(&mut doc, text);
    }

    doc
}

/// Write the rendered document under `export_dir` as `{job_id}.md`.
pub fn write_document(
    export_dir: &Path,
    job_id: &ExportJobId,
    contents: &str,
) -> io::Result<PathBuf> {
    std::fs::create_dir_all(export_dir)?;
    let path = export_dir.join(format!("{}.md", job_id.0));
    std::fs::write(&path, contents)?;
    Ok(path)
}

const DEFAULT_KPIS: [&str; 3] = [
    "CTR on listing page",
    "Video completion rate",
    "Inquiry response time",
];

fn default_cadence() -> Value {
    json!({
        "Phase I": ["Morning 9–11a", "Lunch 12–2p", "Evening 5–8p"],
        "Phase II": ["Morning 9–11a", "Lunch 12–2p", "Evening 5–8p"]
    })
}

fn render_value(out: &mut String, value: &Value, level: usize) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                heading(out, level, key);
                render_value(out, nested, level + 1);
            }
        }
        Value::Array(items) => {
            let mut wrote_bullet = false;
            for item in items {
                match item {
                    Value::Object(_) | Value::Array(_) => render_value(out, item, level),
                    scalar => {
                        bullet(out, &scalar_text(scalar));
                        wrote_bullet = true;
                    }
                }
            }
            if wrote_bullet {
                out.push('\n');
            }
        }
        Value::Null => {}
        scalar => paragraph(out, &scalar_text(scalar)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn heading(out: &mut String, level: usize, text: &str) {
    let hashes = "#".repeat(level.min(6));
    writeln!(out, "{hashes} {text}").expect("write heading");
    out.push('\n');
}

fn paragraph(out: &mut String, text: &str) {
    writeln!(out, "{text}").expect("write paragraph");
    out.push('\n');
}

fn bullet(out: &mut String, text: &str) {
    writeln!(out, "- {text}").expect("write bullet");
}

fn mode_title(mode: IntakeMode) -> &'static str {
    match mode {
        IntakeMode::Lighting => "Lighting",
        IntakeMode::DeepDive => "Deep Dive",
    }
}

fn title_case(raw: &str) -> String {
    raw.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
