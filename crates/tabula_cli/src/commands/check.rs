//! Check command implementation.

use std::path::Path;
use tabula_schema::{generate, load_schema};

/// Runs the check command.
///
/// Loads the schema, then runs generation to exercise the type mapping
/// rules; either stage failing makes the check fail.
pub fn run(schema_path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let input = std::fs::read_to_string(schema_path)?;
    let schema = load_schema(&input)?;
    let generated = generate(&schema)?;

    match format {
        "json" => {
            let report = serde_json::json!({
                "tables": schema
                    .tables
                    .iter()
                    .map(|t| serde_json::json!({
                        "name": t.name,
                        "columns": t.columns.len(),
                        "indexes": t.indexes.len(),
                    }))
                    .collect::<Vec<_>>(),
                "hash": generated.hash,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "text" => {
            println!("Schema {:?} is valid", schema_path);
            println!();
            for table in &schema.tables {
                println!(
                    "  {} ({} columns, {} indexes)",
                    table.name,
                    table.columns.len(),
                    table.indexes.len()
                );
            }
            println!();
            println!("hash: {}", generated.hash);
        }
        other => return Err(format!("unknown format `{other}`").into()),
    }
    Ok(())
}
