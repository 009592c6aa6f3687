use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};
use sqlx::PgPool;

use super::tables::{fetch_rows, TABLES};

/// Write every table to `output` as `{ "<table>": [ {row}, ... ], ... }`
pub async fn run(pool: &PgPool, output: &Path) -> anyhow::Result<()> {
    let mut dump = Map::new();
    let mut total = 0;

    for table in TABLES {
        let rows = fetch_rows(pool, table)
            .await
            .with_context(|| format!("failed to read table {}", table.name))?;
        tracing::info!("Exported {} rows from {}", rows.len(), table.name);
        total += rows.len();
        dump.insert(
            table.name.to_string(),
            Value::Array(rows.into_iter().map(Value::Object).collect()),
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &dump)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    let shown = std::fs::canonicalize(output).unwrap_or_else(|_| output.to_path_buf());
    println!("Database exported to {} ({} rows)", shown.display(), total);
    Ok(())
}
