use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const USAGE_FILE: &str = "usage.json";

/// Only the most recent launches are retained per item.
pub const MAX_LAUNCHES: usize = 100;

const HALF_LIFE_SECS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// Launch history for a single item, keyed by its stable identifier.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct UsageRecord {
    pub display_name: String,
    /// RFC 3339 timestamps, oldest first.
    #[serde(default)]
    pub launches: Vec<String>,
}

impl UsageRecord {
    /// Recency-weighted score at `now`. Each launch contributes
    /// `2^(-age / half_life)` with a half-life of seven days. Launches
    /// that appear to be in the future count as a full point and
    /// timestamps that fail to parse count as zero.
    pub fn score(&self, now: DateTime<Utc>) -> f64 {
        self.launches
            .iter()
            .map(|stamp| match DateTime::parse_from_rfc3339(stamp) {
                Ok(t) => {
                    let age = now.signed_duration_since(t.with_timezone(&Utc));
                    if age < chrono::Duration::zero() {
                        1.0
                    } else {
                        let secs = age.num_milliseconds() as f64 / 1000.0;
                        (-secs / HALF_LIFE_SECS).exp2()
                    }
                }
                Err(_) => 0.0,
            })
            .sum()
    }

    /// Most recent launch that parses, if any.
    pub fn last_launch(&self) -> Option<DateTime<Utc>> {
        self.launches
            .iter()
            .rev()
            .find_map(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

/// In-memory launch history for all items. The store never touches the
/// filesystem on its own; callers load and save it explicitly.
#[derive(Debug, Default)]
pub struct UsageStore {
    records: HashMap<String, UsageRecord>,
    dirty: bool,
}

impl UsageStore {
    pub fn from_records(records: HashMap<String, UsageRecord>) -> Self {
        Self {
            records,
            dirty: false,
        }
    }

    pub fn records(&self) -> &HashMap<String, UsageRecord> {
        &self.records
    }

    pub fn get(&self, key: &str) -> Option<&UsageRecord> {
        self.records.get(key)
    }

    /// Append a launch of `key` at `now`, trimming history beyond
    /// [`MAX_LAUNCHES`]. The display name is refreshed so renames show
    /// up the next time the item is listed.
    pub fn record_launch(&mut self, key: &str, display_name: &str, now: DateTime<Utc>) {
        let record = self.records.entry(key.to_string()).or_default();
        record.display_name = display_name.to_string();
        record.launches.push(now.to_rfc3339());
        if record.launches.len() > MAX_LAUNCHES {
            let excess = record.launches.len() - MAX_LAUNCHES;
            record.launches.drain(..excess);
        }
        self.dirty = true;
    }

    /// The `n` highest scoring items at `now`. Ties fall back to the most
    /// recent launch, then to the key so the order is stable.
    pub fn top_n(&self, n: usize, now: DateTime<Utc>) -> Vec<(&String, &UsageRecord, f64)> {
        let mut ranked: Vec<(&String, &UsageRecord, f64)> = self
            .records
            .iter()
            .map(|(key, record)| (key, record, record.score(now)))
            .collect();
        ranked.sort_by(|a, b| {
            b.2.total_cmp(&a.2)
                .then_with(|| b.1.last_launch().cmp(&a.1.last_launch()))
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(n);
        ranked
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }
}

/// Load launch history from `path`.
pub fn load_usage(path: &str) -> anyhow::Result<UsageStore> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    if content.trim().is_empty() {
        return Ok(UsageStore::default());
    }
    let records: HashMap<String, UsageRecord> = serde_json::from_str(&content)?;
    Ok(UsageStore::from_records(records))
}

/// Save launch history in `store` to `path`.
pub fn save_usage(path: &str, store: &UsageStore) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(store.records())?;
    crate::storage::write_atomic(path, &json)
}
