use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::comparison::{ComparisonResult, FieldComparison};
use crate::events::now_utc_iso;

pub const HISTORY_LIMIT: usize = 10;
pub const UNSPECIFIED_PLATFORM: &str = "No especificada";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "fecha")]
    pub recorded_at: String,
    #[serde(rename = "plataforma")]
    pub platform: String,
    #[serde(rename = "aprobado")]
    pub approved: bool,
    #[serde(rename = "campos", default)]
    pub fields: Vec<FieldComparison>,
}

impl HistoryEntry {
    pub fn from_result(result: &ComparisonResult) -> Self {
        Self {
            recorded_at: now_utc_iso(),
            platform: result
                .platform_name
                .clone()
                .unwrap_or_else(|| UNSPECIFIED_PLATFORM.to_string()),
            approved: result.approved,
            fields: result.fields.clone(),
        }
    }
}

/// Bounded audit history kept most-recent-first in a JSON file.
///
/// Every mutation re-reads and rewrites the whole list; concurrent writers
/// are not coordinated.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files read as an empty history; malformed
    /// entries are skipped.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let Some(Value::Array(rows)) = read_json_value(&self.path) else {
            return Vec::new();
        };
        rows.into_iter()
            .filter_map(|row| serde_json::from_value::<HistoryEntry>(row).ok())
            .collect()
    }

    pub fn record(&self, entry: HistoryEntry) -> anyhow::Result<Vec<HistoryEntry>> {
        let mut entries = self.entries();
        entries.insert(0, entry);
        entries.truncate(HISTORY_LIMIT);
        self.write(&entries)?;
        Ok(entries)
    }

    pub fn delete(&self, index: usize) -> anyhow::Result<Option<HistoryEntry>> {
        let mut entries = self.entries();
        if index >= entries.len() {
            return Ok(None);
        }
        let removed = entries.remove(index);
        self.write(&entries)?;
        Ok(Some(removed))
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.write(&[])
    }

    fn write(&self, entries: &[HistoryEntry]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

fn read_json_value(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
