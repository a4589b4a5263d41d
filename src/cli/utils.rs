use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print the raw API payload
pub fn output_json(data: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Left-aligned columns sized to the widest cell
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = vec![line(headers.to_vec())];
    out.push(line(rule.iter().map(String::as_str).collect()));
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

/// Read a string field, empty when absent
pub fn field(value: &Value, key: &str) -> String {
    match &value[key] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Text summary of a bulk report: counts, then one line per failed id
pub fn render_bulk_report(report: &Value) -> String {
    let success = report["success"].as_u64().unwrap_or(0);
    let failed = report["failed"].as_u64().unwrap_or(0);
    let mut lines = vec![format!("{} updated, {} failed", success, failed)];

    if let Some(results) = report["results"].as_array() {
        for item in results.iter().filter(|item| item.get("error").is_some()) {
            lines.push(format!("  ✗ {}: {}", field(item, "id"), field(item, "error")));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_align() {
        let table = render_table(
            &["ID", "EMAIL"],
            &[vec!["1".into(), "a@example.com".into()], vec!["22".into(), "b@x.io".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID  EMAIL");
        assert_eq!(lines[1], "--  -------------");
        assert_eq!(lines[2], "1   a@example.com");
        assert_eq!(lines[3], "22  b@x.io");
    }

    #[test]
    fn bulk_report_lists_failures() {
        let report = json!({
            "success": 2,
            "failed": 1,
            "results": [
                {"id": "u1", "email": "a@example.com", "status": "inactive"},
                {"id": "user-2", "error": "User not found"},
                {"id": "u3", "email": "c@example.com", "status": "inactive"}
            ]
        });
        assert_eq!(render_bulk_report(&report), "2 updated, 1 failed\n  ✗ user-2: User not found");
    }
}
