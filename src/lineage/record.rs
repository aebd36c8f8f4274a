use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One device as handed over by the registry fetch layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub predicate_ids: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl DeviceRecord {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn with_predicates<I, S>(mut self, predicate_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predicate_ids = predicate_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Parses either a bare array of records or an object carrying a `devices` array.
pub fn parse_records(raw: &str) -> Result<Vec<DeviceRecord>> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in device records")?;

    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("devices") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(anyhow!("`devices` is not an array")),
            None => return Err(anyhow!("device record object has no `devices` array")),
        },
        _ => return Err(anyhow!("unexpected JSON type for device records")),
    };

    let mut records = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let record = DeviceRecord::deserialize(item)
            .with_context(|| format!("invalid device record at position {position}"))?;
        records.push(record);
    }

    Ok(records)
}

pub fn load_records(path: &Path) -> Result<Vec<DeviceRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read device records from {}", path.display()))?;
    parse_records(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
