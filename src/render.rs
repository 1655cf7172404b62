//! Presentation
//!
//! Renders a [`Report`] as a numbered text table with a per-day summary,
//! as pretty JSON, or as CSV.

use crate::report::{FieldNames, Report, ReportRow};
use serde_json::{json, Map, Value};
use std::fmt::Write;

const HEADERS: [&str; 5] = ["#", "ID", "DNI", "Date", "Time"];

/// Numbered table of rows (1-based index)
pub fn render_table(report: &Report) -> String {
    let cells: Vec<[String; 5]> = report
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            [
                (idx + 1).to_string(),
                row.id.clone(),
                row.identity.clone(),
                row.date.clone(),
                row.time.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(str::to_string), &widths);
    let rule_len = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    out.push_str(&"-".repeat(rule_len));
    out.push('\n');
    for line in &cells {
        push_line(&mut out, line, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Bulleted `date: count` lines in first-encounter order
pub fn render_summary(report: &Report) -> String {
    let mut out = String::from("Registrations per day:\n");
    if report.counts.is_empty() {
        out.push_str("  (none)\n");
    }
    for (date, count) in report.counts.iter() {
        let _ = writeln!(out, "- {}: {}", date, count);
    }
    out
}

/// Pretty JSON with `rows` and `counts`.
///
/// Each row is the source document with the identity under its configured
/// field name; formatted values are written last so they win.
pub fn render_json(report: &Report, fields: &FieldNames) -> serde_json::Result<String> {
    let rows: Vec<Value> = report.rows.iter().map(|row| row_json(row, fields)).collect();
    serde_json::to_string_pretty(&json!({
        "rows": rows,
        "counts": &report.counts,
    }))
}

fn row_json(row: &ReportRow, fields: &FieldNames) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(row.id.clone()));
    for (key, value) in &row.extra {
        object.insert(key.clone(), value.clone());
    }
    object.insert(fields.identity.clone(), Value::String(row.identity.clone()));
    object.insert("date".to_string(), Value::String(row.date.clone()));
    object.insert("time".to_string(), Value::String(row.time.clone()));
    object.insert(
        "timestamp".to_string(),
        row.timestamp.clone().unwrap_or(Value::Null),
    );
    Value::Object(object)
}

/// CSV of rows, one line per registration
pub fn render_csv(report: &Report, fields: &FieldNames) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "index",
        "id",
        fields.identity.as_str(),
        "date",
        "time",
        "timestamp",
    ])?;

    for (idx, row) in report.rows.iter().enumerate() {
        let timestamp = match &row.timestamp {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        writer.write_record([
            (idx + 1).to_string(),
            row.id.clone(),
            row.identity.clone(),
            row.date.clone(),
            row.time.clone(),
            timestamp,
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
