use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::layout::LayoutConfig;
use crate::search::SearchConfig;
use crate::view::{FallbackStrategy, FilterPolicy};

/// Everything the core reads. Plain values; hosts decide where they come from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewConfig {
    pub layout: LayoutConfig,
    pub search: SearchConfig,
    pub filter: FilterPolicy,
    pub fallback: FallbackStrategy,
}

impl ViewConfig {
    /// Parses a JSON config; missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid view config JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read view config from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}
