use std::path::PathBuf;

use anyhow::{bail, Context};
use rust_xlsxwriter::{Format, Workbook};
use serde_json::{Map, Value};
use sqlx::PgPool;

use super::tables::{fetch_rows, find_table, Table, TABLES};
use super::ExportXlsxArgs;

/// Export one model to a spreadsheet: a header row, then one row per record
pub async fn run(pool: &PgPool, args: ExportXlsxArgs) -> anyhow::Result<()> {
    let table = find_table(&args.model).with_context(|| {
        let known: Vec<&str> = TABLES.iter().map(|t| t.model).collect();
        format!("unknown model '{}' (expected one of: {})", args.model, known.join(", "))
    })?;
    let columns = select_fields(table, args.fields.as_deref(), args.all)?;

    let rows = fetch_rows(pool, table)
        .await
        .with_context(|| format!("failed to read table {}", table.name))?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.xlsx", table.model)));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(table.model)?;
    let header = Format::new().set_bold();

    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            let c = col as u16;
            match cell(row, name) {
                Value::Null => {}
                Value::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        sheet.write_number(r, c, f)?;
                    }
                    None => {
                        sheet.write_string(r, c, n.to_string())?;
                    }
                },
                Value::String(s) => {
                    sheet.write_string(r, c, s)?;
                }
                other => {
                    sheet.write_string(r, c, other.to_string())?;
                }
            }
        }
    }

    workbook
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let shown = std::fs::canonicalize(&output).unwrap_or(output);
    println!("Exported {} {} rows to {}", rows.len(), table.model, shown.display());
    Ok(())
}

fn cell<'a>(row: &'a Map<String, Value>, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

/// Columns to export, in the requested order.
///
/// Exactly one of `fields` and `all` must be given; unknown names are
/// reported together.
pub fn select_fields(table: &Table, fields: Option<&str>, all: bool) -> anyhow::Result<Vec<&'static str>> {
    match (fields, all) {
        (Some(_), true) => bail!("use either --fields or --all, not both"),
        (None, false) => bail!("pass --fields or --all"),
        (None, true) => Ok(table.columns.to_vec()),
        (Some(raw), false) => {
            let requested: Vec<&str> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if requested.is_empty() {
                bail!("--fields must name at least one column");
            }

            let unknown: Vec<&str> = requested
                .iter()
                .copied()
                .filter(|name| !table.columns.contains(name))
                .collect();
            if !unknown.is_empty() {
                bail!(
                    "unknown fields for {}: {} (available: {})",
                    table.model,
                    unknown.join(", "),
                    table.columns.join(", ")
                );
            }

            let mut selected: Vec<&'static str> = Vec::with_capacity(requested.len());
            for name in requested {
                if let Some(column) = table.columns.iter().find(|c| **c == name) {
                    if !selected.contains(column) {
                        selected.push(column);
                    }
                }
            }
            Ok(selected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courses() -> &'static Table {
        find_table("course").unwrap()
    }

    #[test]
    fn test_all_fields() {
        let columns = select_fields(courses(), None, true).unwrap();
        assert_eq!(columns, courses().columns.to_vec());
    }

    #[test]
    fn test_requested_fields_keep_order_and_drop_duplicates() {
        let columns = select_fields(courses(), Some("price, title,price"), false).unwrap();
        assert_eq!(columns, vec!["price", "title"]);
    }

    #[test]
    fn test_unknown_fields_are_listed() {
        let err = select_fields(courses(), Some("title,rating,owner"), false).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("rating, owner"), "{message}");
    }

    #[test]
    fn test_fields_and_all_are_exclusive() {
        assert!(select_fields(courses(), Some("title"), true).is_err());
        assert!(select_fields(courses(), None, false).is_err());
        assert!(select_fields(courses(), Some(" , "), false).is_err());
    }
}
