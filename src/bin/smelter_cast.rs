//! smelter-cast: Cast nested JSON records into flat tabular rows
//!
//! Usage:
//!   # Cast a file of records against a table schema
//!   smelter-cast records.json --schema tables.json --table orders
//!
//!   # Read records from stdin
//!   cat events.jsonl | smelter-cast --schema tables.json --table orders
//!
//!   # Merge constant columns into every row
//!   smelter-cast records.json --schema tables.json --table orders \
//!       --extra '{"batch": "2024-01"}'
//!
//!   # Print declared column types instead of rows
//!   smelter-cast --schema tables.json --table orders --column-types
//!
//!   # Schema-free flattening
//!   smelter-cast records.json --auto-flatten --stringify-lists
//!
//! The schema file maps table names to field spec lists:
//!   {"orders": [{"location": "root::id", "column_name": "id"},
//!               {"location": "root::items[]::x", "column_name": "x"}]}

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use smelter::{FieldSpec, FlattenOptions, Row, Smelter};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};

#[derive(Parser, Debug)]
#[command(name = "smelter-cast")]
#[command(about = "Cast nested JSON records into flat tabular rows", long_about = None)]
struct Args {
    /// Input file with records (use stdin if omitted).
    /// Accepts a JSON array, a single object, or NDJSON.
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Schema file mapping table names to field spec lists
    #[arg(long, short = 's')]
    schema: Option<String>,

    /// Table to cast records against
    #[arg(long, short = 't', requires = "schema")]
    table: Option<String>,

    /// JSON object merged into every output row (extra data wins)
    #[arg(long, requires = "table")]
    extra: Option<String>,

    /// Print declared column types for the table instead of rows
    #[arg(long, requires = "table")]
    column_types: bool,

    /// Flatten records without a schema (parent_child column naming)
    #[arg(long, conflicts_with = "schema")]
    auto_flatten: bool,

    /// Prefix prepended to every auto-flattened column name
    #[arg(long, requires = "auto_flatten")]
    prefix: Option<String>,

    /// JSON-stringify list values when auto-flattening
    #[arg(long, requires = "auto_flatten")]
    stringify_lists: bool,

    /// Lowercase column names when auto-flattening
    #[arg(long, requires = "auto_flatten")]
    lowercase: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let records = read_records(args.input.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    if args.auto_flatten {
        let options = FlattenOptions {
            prefix: args.prefix.unwrap_or_default(),
            stringify_lists: args.stringify_lists,
            lowercase_keys: args.lowercase,
        };
        let smelter = Smelter::new(records, BTreeMap::new());
        for row in smelter.auto_flatten(options) {
            write_row(&mut stdout, &row)?;
        }
        return Ok(());
    }

    let Some(schema_path) = args.schema else {
        bail!("either --schema/--table or --auto-flatten is required");
    };
    let Some(table) = args.table else {
        bail!("--table is required with --schema");
    };

    let schemas = read_schemas(&schema_path)?;
    let smelter = Smelter::new(records, schemas);

    if args.column_types {
        let types = smelter.column_types(&table)?;
        let line = serde_json::to_string(&types).context("Failed to serialize column types")?;
        writeln!(stdout, "{}", line)?;
        return Ok(());
    }

    let extra = match args.extra.as_deref() {
        Some(text) => serde_json::from_str::<Row>(text)
            .context("--extra must be a JSON object")?,
        None => Row::new(),
    };

    for row in smelter.records_with(&table, &extra)? {
        write_row(&mut stdout, &row)?;
    }

    Ok(())
}

fn write_row(writer: &mut impl Write, row: &Row) -> Result<()> {
    let line = serde_json::to_string(row).context("Failed to serialize row")?;
    writeln!(writer, "{}", line).context("Failed to write row")?;
    Ok(())
}

fn read_schemas(path: &str) -> Result<BTreeMap<String, Vec<FieldSpec>>> {
    let file = File::open(path).with_context(|| format!("Failed to open schema file: {path}"))?;
    serde_json::from_reader(file).with_context(|| format!("Failed to parse schema file: {path}"))
}

/// Read all records from a file or stdin using SIMD-accelerated JSON parsing
/// when possible, with a serde_json NDJSON fallback.
fn read_records(input: Option<&str>) -> Result<Vec<Value>> {
    let mut content = Vec::new();
    match input {
        Some(path) => {
            File::open(path)
                .with_context(|| format!("Failed to open input file: {path}"))?
                .read_to_end(&mut content)?;
        }
        None => {
            std::io::stdin().read_to_end(&mut content)?;
        }
    }

    // Try SIMD parsing first (faster); simd-json mutates its buffer, so keep
    // the original around for the fallback path.
    let mut simd_buffer = content.clone();
    match simd_json::to_owned_value(&mut simd_buffer) {
        Ok(simd_json::OwnedValue::Array(items)) => {
            // JSON array - one record per element
            let mut records = Vec::with_capacity(items.len());
            for item in items {
                let text = simd_json::to_string(&item)?;
                records.push(serde_json::from_str(&text)?);
            }
            Ok(records)
        }
        Ok(item) => {
            // Single JSON object
            let text = simd_json::to_string(&item)?;
            Ok(vec![serde_json::from_str(&text)?])
        }
        Err(_) => {
            // Fallback to serde_json for NDJSON or malformed input
            let text = String::from_utf8_lossy(&content);
            let mut records = Vec::new();
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let value: Value =
                    serde_json::from_str(line).context("Failed to parse NDJSON line")?;
                records.push(value);
            }
            Ok(records)
        }
    }
}
