use chrono::{DateTime, Utc};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const CLIPBOARD_FILE: &str = "clipboard.json";

/// Texts longer than this are never captured.
pub const MAX_CLIP_LEN: usize = 1000;

/// One remembered clipboard text. Identity is the exact text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClipEntry {
    pub text: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

impl ClipEntry {
    pub fn new(text: String, now: DateTime<Utc>) -> Self {
        Self {
            text,
            count: 0,
            last_used: Some(now),
        }
    }

    /// Entries pasted more than twice, or touched today, surface in the menu.
    pub fn is_hot(&self, now: DateTime<Utc>) -> bool {
        self.count > 2
            || self
                .last_used
                .map_or(false, |t| t.date_naive() == now.date_naive())
    }

    /// Rarely used entries expire after a day, frequently used ones get a
    /// day per recorded use. Entries that never carried a timestamp
    /// (imported from the old format) do not expire.
    fn expired(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_used else {
            return false;
        };
        let allowed_days = if self.count < 3 { 1 } else { i64::from(self.count) };
        now.signed_duration_since(last) > chrono::Duration::days(allowed_days)
    }
}

/// Older files stored each entry as a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredClip {
    Entry(ClipEntry),
    Plain(String),
}

impl From<StoredClip> for ClipEntry {
    fn from(stored: StoredClip) -> Self {
        match stored {
            StoredClip::Entry(entry) => entry,
            StoredClip::Plain(text) => Self {
                text,
                count: 0,
                last_used: None,
            },
        }
    }
}

fn rank_cmp(a: &ClipEntry, b: &ClipEntry) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.last_used.cmp(&a.last_used))
        .then_with(|| a.text.cmp(&b.text))
}

/// Heuristic filter so captured history does not retain credentials:
/// 8 to 32 characters, no whitespace, and at least one ASCII uppercase
/// letter, one lowercase letter and one digit.
pub fn looks_like_password(text: &str) -> bool {
    let len = text.chars().count();
    (8..=32).contains(&len)
        && !text.chars().any(char::is_whitespace)
        && text.chars().any(|c| c.is_ascii_uppercase())
        && text.chars().any(|c| c.is_ascii_lowercase())
        && text.chars().any(|c| c.is_ascii_digit())
}

/// Menu display string for a clip: first 40 characters with newlines
/// flattened, the paste count when present and the evaluated result when
/// the text is a plain arithmetic expression.
pub fn clip_preview(text: &str, count: u32) -> String {
    let mut preview = if text.chars().count() > 40 {
        let head: String = text.chars().take(37).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
    .replace('\n', " ");

    if count > 0 {
        preview.push_str(&format!(" ({})", count));
    }
    if let Some(result) = eval_math(text) {
        preview.push_str(&format!(" = {}", result));
    }
    preview
}

fn eval_math(text: &str) -> Option<f64> {
    let expr = text
        .trim()
        .replace('x', "*")
        .replace('×', "*")
        .replace('÷', "/")
        .replace(',', ".")
        .replace(' ', "");

    if !expr.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !expr.chars().any(|c| "+-*/".contains(c)) {
        return None;
    }
    if !expr.chars().all(|c| "0123456789.+-*/()".contains(c)) {
        return None;
    }

    exmex::eval_str::<f64>(&expr).ok()
}

/// In-memory clipboard history. Like [`crate::usage::UsageStore`] it never
/// touches the filesystem on its own.
#[derive(Debug)]
pub struct ClipboardStore {
    entries: Vec<ClipEntry>,
    last_observed: Option<String>,
    max_entries: usize,
    dirty: bool,
}

impl ClipboardStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            last_observed: None,
            max_entries,
            dirty: false,
        }
    }

    /// Build a store from loaded entries, trimming to capacity in rank
    /// order when the file holds more than the configured maximum.
    pub fn from_entries(entries: Vec<ClipEntry>, max_entries: usize) -> Self {
        let mut store = Self {
            entries,
            last_observed: None,
            max_entries,
            dirty: false,
        };
        if store.entries.len() > max_entries {
            store.entries.sort_by(rank_cmp);
            store.entries.truncate(max_entries);
            store.dirty = true;
        }
        store
    }

    pub fn entries(&self) -> &[ClipEntry] {
        &self.entries
    }

    /// Feed one clipboard snapshot into the history. Returns `true` when
    /// the history changed. Empty text, a repeat of the previous snapshot,
    /// over-length text and likely passwords are all ignored, though every
    /// novel non-empty text still updates the repeat marker so a skipped
    /// text is not re-examined on the next poll.
    pub fn observe(&mut self, text: &str, now: DateTime<Utc>) -> bool {
        if text.is_empty() {
            return false;
        }
        if self.last_observed.as_deref() == Some(text) {
            return false;
        }
        self.last_observed = Some(text.to_string());

        if text.chars().count() > MAX_CLIP_LEN {
            return false;
        }
        if looks_like_password(text) {
            return false;
        }

        match self.entries.iter_mut().find(|e| e.text == text) {
            Some(entry) => entry.last_used = Some(now),
            None => self.entries.push(ClipEntry::new(text.to_string(), now)),
        }
        self.evict(now);
        self.dirty = true;
        true
    }

    /// Mark the entry holding `text` as pasted once more. Unknown text is
    /// a no-op.
    pub fn record_use(&mut self, text: &str, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.text == text) else {
            return false;
        };
        entry.count += 1;
        entry.last_used = Some(now);
        self.evict(now);
        self.dirty = true;
        true
    }

    /// All entries, most useful first: paste count, then recency, then
    /// text so equal entries keep a stable order.
    pub fn ranked(&self) -> Vec<&ClipEntry> {
        let mut ranked: Vec<&ClipEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| rank_cmp(a, b));
        ranked
    }

    /// Entries whose lowercased text contains `query` as a subsequence,
    /// in rank order. An empty query returns the top of the ranking.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&ClipEntry> {
        let query = query.trim();
        let mut matches: Vec<&ClipEntry> = if query.is_empty() {
            self.entries.iter().collect()
        } else {
            let matcher = SkimMatcherV2::default();
            let needle = query.to_lowercase();
            self.entries
                .iter()
                .filter(|e| matcher.fuzzy_match(&e.text.to_lowercase(), &needle).is_some())
                .collect()
        };
        matches.sort_by(|a, b| rank_cmp(a, b));
        matches.truncate(limit);
        matches
    }

    fn evict(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|e| !e.expired(now));
        if self.entries.len() > self.max_entries {
            self.entries.sort_by(rank_cmp);
            self.entries.truncate(self.max_entries);
        }
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }
}

/// Load clipboard history from `path`, accepting both the current entry
/// shape and the old bare-string format.
pub fn load_clipboard(path: &str) -> anyhow::Result<Vec<ClipEntry>> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let stored: Vec<StoredClip> = serde_json::from_str(&content)?;
    Ok(stored.into_iter().map(ClipEntry::from).collect())
}

/// Save clipboard history in `entries` to `path`.
pub fn save_clipboard(path: &str, entries: &[ClipEntry]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    crate::storage::write_atomic(path, &json)
}
