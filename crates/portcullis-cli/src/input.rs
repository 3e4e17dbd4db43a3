//! Resource file loading
//!
//! Resource configuration can be written as JSON, TOML or YAML; all three
//! load into the same [`Value`] tree. Scalars become their text form.

use std::path::Path;

use portcullis::{CvePolicy, FlatMap, Value};

use crate::error::{CliError, Result};

/// Resource file syntax, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Toml,
    Yaml,
}

impl InputFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(CliError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CliError::InputRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a resource configuration file into a value tree
pub fn load_value(path: &Path) -> Result<Value> {
    let format = InputFormat::from_path(path)?;
    parse_value(&read(path)?, format, path)
}

/// Parse resource configuration text; `path` is used in errors only
pub fn parse_value(content: &str, format: InputFormat, path: &Path) -> Result<Value> {
    match format {
        InputFormat::Json => {
            let json: serde_json::Value =
                serde_json::from_str(content).map_err(|e| CliError::parse(path, e))?;
            Ok(Value::from_json(json))
        }
        InputFormat::Yaml => {
            let json: serde_json::Value =
                serde_yaml::from_str(content).map_err(|e| CliError::parse(path, e))?;
            Ok(Value::from_json(json))
        }
        InputFormat::Toml => {
            let table: toml::Table = toml::from_str(content).map_err(|e| CliError::parse(path, e))?;
            Ok(toml_to_value(toml::Value::Table(table)))
        }
    }
}

fn toml_to_value(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::Leaf(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::from(b),
        toml::Value::Datetime(dt) => Value::Leaf(dt.to_string()),
        toml::Value::Array(items) => Value::List(items.into_iter().map(toml_to_value).collect()),
        toml::Value::Table(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, toml_to_value(v)))
                .collect(),
        ),
    }
}

/// Load a flat `key = value` file
pub fn load_flat(path: &Path) -> Result<FlatMap> {
    Ok(FlatMap::parse_lines(&read(path)?)?)
}

/// Load a remote-API policy document
pub fn load_policy_document(path: &Path) -> Result<CvePolicy> {
    CvePolicy::from_json(&read(path)?).map_err(|e| CliError::parse(path, e))
}
