use super::traits::{Tool, ToolFuture, ToolInputs, optional_str, required_str};
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value, json};
use std::path::Path;

/// Default upper bound for files the handler will load (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const UNSUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "pdf"];

/// Reads attachments and local files into JSON values.
pub struct FileHandlerTool {
    max_file_size: u64,
}

impl FileHandlerTool {
    pub const fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }
}

impl Default for FileHandlerTool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl Tool for FileHandlerTool {
    fn name(&self) -> &str {
        "file_handler"
    }

    fn description(&self) -> &str {
        "Read and process various file formats"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file"
                },
                "operation": {
                    "type": "string",
                    "enum": ["read", "analyze"],
                    "default": "read"
                }
            },
            "required": ["file_path"]
        })
    }

    fn invoke<'a>(&'a self, inputs: &'a ToolInputs) -> ToolFuture<'a> {
        Box::pin(async move {
            let file_path = required_str(inputs, "file_path")?;
            let path = Path::new(file_path);

            let metadata = tokio::fs::metadata(path)
                .await
                .with_context(|| format!("File not found: {file_path}"))?;
            if !metadata.is_file() {
                bail!("Not a regular file: {file_path}");
            }

            match optional_str(inputs, "operation").unwrap_or("read") {
                "read" => {
                    if metadata.len() > self.max_file_size {
                        bail!(
                            "File too large: {} bytes (limit: {} bytes)",
                            metadata.len(),
                            self.max_file_size
                        );
                    }
                    read_file(path).await
                }
                "analyze" => Ok(json!({
                    "path": file_path,
                    "name": path.file_name().map(|n| n.to_string_lossy().into_owned()),
                    "extension": extension(path),
                    "size_bytes": metadata.len(),
                    "supported": !UNSUPPORTED_EXTENSIONS.contains(&extension(path).as_str()),
                })),
                other => bail!("Unknown operation: {other}"),
            }
        })
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

async fn read_file(path: &Path) -> Result<Value> {
    let ext = extension(path);
    if UNSUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        bail!("Unsupported file format: .{ext}");
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match ext.as_str() {
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in {}", path.display())),
        "csv" => Ok(parse_csv(&contents)),
        _ => Ok(Value::String(contents)),
    }
}

/// Parse CSV text into an array of header-keyed objects.
///
/// Numeric cells become JSON numbers. Quoted fields may contain commas,
/// doubled quotes and newlines.
fn parse_csv(contents: &str) -> Value {
    let mut rows = split_records(contents).into_iter();
    let Some(header) = rows.next() else {
        return Value::Array(Vec::new());
    };

    let records = rows
        .filter(|row| !(row.len() == 1 && row[0].is_empty()))
        .map(|row| {
            let mut object = Map::new();
            for (index, column) in header.iter().enumerate() {
                let cell = row.get(index).map_or("", String::as_str);
                object.insert(column.clone(), cell_value(cell));
            }
            Value::Object(object)
        })
        .collect();
    Value::Array(records)
}

fn cell_value(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return json!(integer);
    }
    if let Ok(float) = trimmed.parse::<f64>()
        && float.is_finite()
    {
        return json!(float);
    }
    Value::String(cell.to_string())
}

fn split_records(contents: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
