//! Generation history and user preferences on top of a [`KeyValueStore`].
//!
//! History is a JSON list, most-recent-first, capped at `cap` entries.
//! Storage failures never reach callers: they are logged and reads fall
//! back to an empty history or the default preferences. Read-modify-write
//! operations are serialized through one lock per manager (shared by clones)
//! so concurrent saves never drop each other's entries.
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{DEFAULT_HISTORY_CAP, DEFAULT_SYSTEM_PROMPT};
use crate::history::store::KeyValueStore;
use crate::types::HistoryEntry;

pub const HISTORY_KEY: &str = "ai-image-generator-history";
pub const PREFERENCES_KEY: &str = "ai-image-generator-preferences";
/// Rough quota the usage report is measured against.
pub const STORAGE_ESTIMATE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub default_style: String,
    pub default_dimensions: String,
    pub system_prompt: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            default_style: "photorealistic".to_string(),
            default_dimensions: "1024x1024".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Partial preferences; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub default_style: Option<String>,
    pub default_dimensions: Option<String>,
    pub system_prompt: Option<String>,
}

impl PreferencesUpdate {
    fn apply(self, prefs: &mut Preferences) {
        if let Some(v) = self.theme {
            prefs.theme = v;
        }
        if let Some(v) = self.default_style {
            prefs.default_style = v;
        }
        if let Some(v) = self.default_dimensions {
            prefs.default_dimensions = v;
        }
        if let Some(v) = self.system_prompt {
            prefs.system_prompt = v;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub used: usize,
    pub available: usize,
}

#[derive(Serialize)]
struct ExportRef<'a> {
    history: &'a [HistoryEntry],
    preferences: &'a Preferences,
}

#[derive(Deserialize)]
struct ImportDoc {
    history: Option<Vec<HistoryEntry>>,
    preferences: Option<serde_json::Map<String, Value>>,
}

#[derive(Clone)]
pub struct HistoryManager {
    store: Arc<dyn KeyValueStore>,
    cap: usize,
    defaults: Preferences,
    write_lock: Arc<Mutex<()>>,
}

impl HistoryManager {
    pub fn new(store: Arc<dyn KeyValueStore>, cap: usize) -> Self {
        Self {
            store,
            cap: cap.max(1),
            defaults: Preferences::default(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Defaults stored preferences are merged over.
    pub fn with_default_preferences(mut self, defaults: Preferences) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub async fn list(&self) -> Vec<HistoryEntry> {
        match self.store.get(HISTORY_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::error!("Failed to parse generation history: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!("Failed to load generation history: {}", e);
                Vec::new()
            }
        }
    }

    /// Prepend `entry`, evicting the oldest entries beyond the cap.
    pub async fn save(&self, entry: HistoryEntry) {
        let _guard = self.write_lock.lock().await;
        let mut history = self.list().await;
        history.insert(0, entry);
        history.truncate(self.cap);
        self.write_history(&history, "save generated image").await;
    }

    /// Returns whether an entry with `id` was present.
    pub async fn remove(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut history = self.list().await;
        let before = history.len();
        history.retain(|e| e.id != id);
        if history.len() == before {
            return false;
        }
        self.write_history(&history, "remove generated image").await;
        true
    }

    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.store.remove(HISTORY_KEY).await {
            tracing::error!("Failed to clear generation history: {}", e);
        }
    }

    /// Drop entries older than `max_age`; returns how many were removed.
    /// An age reaching past the representable date range removes nothing.
    pub async fn cleanup_older_than(&self, max_age: Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            tracing::warn!("Cleanup age out of range, nothing removed");
            return 0;
        };
        let _guard = self.write_lock.lock().await;
        let mut history = self.list().await;
        let before = history.len();
        history.retain(|e| e.timestamp > cutoff);
        let removed = before - history.len();
        if removed > 0 {
            self.write_history(&history, "clean up old images").await;
        }
        removed
    }

    /// [`cleanup_older_than`](Self::cleanup_older_than) for a whole number of days.
    pub async fn cleanup_older_than_days(&self, days: i64) -> usize {
        match Duration::try_days(days) {
            Some(max_age) => self.cleanup_older_than(max_age).await,
            None => {
                tracing::warn!("Cleanup age of {} days out of range, nothing removed", days);
                0
            }
        }
    }

    pub async fn preferences(&self) -> Preferences {
        let stored = match self.store.get(PREFERENCES_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return self.defaults.clone(),
            Err(e) => {
                tracing::error!("Failed to load user preferences: {}", e);
                return self.defaults.clone();
            }
        };
        self.merge_over_defaults(&stored).unwrap_or_else(|e| {
            tracing::error!("Failed to parse user preferences: {}", e);
            self.defaults.clone()
        })
    }

    pub async fn update_preferences(&self, update: PreferencesUpdate) -> Preferences {
        let _guard = self.write_lock.lock().await;
        let mut prefs = self.preferences().await;
        update.apply(&mut prefs);
        match serde_json::to_string(&prefs) {
            Ok(raw) => {
                if let Err(e) = self.store.set(PREFERENCES_KEY, &raw).await {
                    tracing::error!("Failed to save user preferences: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to encode user preferences: {}", e),
        }
        prefs
    }

    pub async fn reset_preferences(&self) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.store.remove(PREFERENCES_KEY).await {
            tracing::error!("Failed to reset user preferences: {}", e);
        }
    }

    /// Pretty JSON document `{history, preferences}`.
    pub async fn export(&self) -> String {
        let history = self.list().await;
        let preferences = self.preferences().await;
        serde_json::to_string_pretty(&ExportRef { history: &history, preferences: &preferences })
            .unwrap_or_else(|e| {
                tracing::error!("Failed to export data: {}", e);
                "{}".to_string()
            })
    }

    /// Replace history and/or preferences from an exported document.
    /// Returns `false` if the document could not be parsed or stored.
    pub async fn import(&self, json: &str) -> bool {
        let doc: ImportDoc = match serde_json::from_str(json) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("Failed to import data: {}", e);
                return false;
            }
        };
        let _guard = self.write_lock.lock().await;
        let mut ok = true;
        if let Some(mut history) = doc.history {
            history.truncate(self.cap);
            ok &= self.write_history(&history, "import history").await;
        }
        if let Some(prefs) = doc.preferences {
            let raw = Value::Object(prefs).to_string();
            if let Err(e) = self.store.set(PREFERENCES_KEY, &raw).await {
                tracing::error!("Failed to import preferences: {}", e);
                ok = false;
            }
        }
        ok
    }

    /// Bytes held by all keys against [`STORAGE_ESTIMATE_BYTES`].
    pub async fn usage(&self) -> StorageUsage {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!("Failed to calculate storage usage: {}", e);
                return StorageUsage { used: 0, available: 0 };
            }
        };
        let mut used = 0;
        for k in &keys {
            used += k.len() + self.store.get(k).await.ok().flatten().map_or(0, |v| v.len());
        }
        StorageUsage { used, available: STORAGE_ESTIMATE_BYTES.saturating_sub(used) }
    }

    fn merge_over_defaults(&self, stored: &str) -> Result<Preferences, serde_json::Error> {
        let mut merged = serde_json::to_value(&self.defaults)?;
        let stored: Value = serde_json::from_str(stored)?;
        if let (Some(base), Value::Object(over)) = (merged.as_object_mut(), stored) {
            for (k, v) in over {
                base.insert(k, v);
            }
        }
        serde_json::from_value(merged)
    }

    async fn write_history(&self, history: &[HistoryEntry], action: &str) -> bool {
        let result = match serde_json::to_string(history) {
            Ok(raw) => self.store.set(HISTORY_KEY, &raw).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to {}: {}", action, e);
                false
            }
        }
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(Arc::new(crate::history::store::MemoryStore::new()), DEFAULT_HISTORY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::history::store::MemoryStore;
    use crate::types::Dimensions;
    use async_trait::async_trait;

    fn entry(id: &str, minutes_ago: i64) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            prompt: format!("prompt {}", id),
            image_url: format!("https://x.test/{}.png", id),
            style: "photorealistic".to_string(),
            dimensions: Dimensions::default(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    async fn ids(m: &HistoryManager) -> Vec<String> {
        m.list().await.into_iter().map(|e| e.id).collect()
    }

    #[tokio::test]
    async fn test_save_is_most_recent_first() {
        let m = HistoryManager::new(Arc::new(MemoryStore::new()), 10);
        m.save(entry("a", 3)).await;
        m.save(entry("b", 2)).await;
        m.save(entry("c", 1)).await;
        assert_eq!(ids(&m).await, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_overflow_evicts_exactly_the_oldest() {
        let cap = 4;
        let m = HistoryManager::new(Arc::new(MemoryStore::new()), cap);
        for i in 0..=cap {
            m.save(entry(&i.to_string(), 0)).await;
        }
        assert_eq!(ids(&m).await, vec!["4", "3", "2", "1"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_keep_every_entry() {
        let m = HistoryManager::new(Arc::new(MemoryStore::new()), 10_000);
        let mut tasks = Vec::new();
        for t in 0..16 {
            let m = m.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    m.save(entry(&format!("{}-{}", t, i), 0)).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        let mut saved = ids(&m).await;
        assert_eq!(saved.len(), 16 * 50);
        saved.sort();
        saved.dedup();
        assert_eq!(saved.len(), 16 * 50);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let m = HistoryManager::new(Arc::new(MemoryStore::new()), 10);
        m.save(entry("a", 0)).await;
        m.save(entry("b", 0)).await;
        assert!(m.remove("a").await);
        assert!(!m.remove("a").await);
        assert_eq!(ids(&m).await, vec!["b"]);
        m.clear().await;
        assert!(m.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_older_than() {
        let m = HistoryManager::new(Arc::new(MemoryStore::new()), 10);
        m.save(entry("old", 60 * 24 * 40)).await;
        m.save(entry("new", 5)).await;
        assert_eq!(m.cleanup_older_than(Duration::days(30)).await, 1);
        assert_eq!(ids(&m).await, vec!["new"]);
        assert_eq!(m.cleanup_older_than_days(30).await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_with_out_of_range_age_removes_nothing() {
        let m = HistoryManager::new(Arc::new(MemoryStore::new()), 10);
        m.save(entry("old", 60 * 24 * 40)).await;
        m.save(entry("new", 5)).await;
        assert_eq!(m.cleanup_older_than(Duration::days(100_000_000)).await, 0);
        assert_eq!(m.cleanup_older_than_days(i64::MAX).await, 0);
        assert_eq!(m.cleanup_older_than_days(i64::MIN).await, 0);
        assert_eq!(ids(&m).await, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_corrupt_history_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, "not json").await.unwrap();
        let m = HistoryManager::new(store, 10);
        assert!(m.list().await.is_empty());
        m.save(entry("a", 0)).await;
        assert_eq!(ids(&m).await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_preferences_merge_with_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(PREFERENCES_KEY, r#"{"theme":"dark"}"#).await.unwrap();
        let m = HistoryManager::new(store, 10);
        let prefs = m.preferences().await;
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.default_style, "photorealistic");
        assert_eq!(prefs.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_update_and_reset_preferences() {
        let m = HistoryManager::new(Arc::new(MemoryStore::new()), 10);
        let updated = m
            .update_preferences(PreferencesUpdate {
                default_style: Some("cinematic".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(updated.default_style, "cinematic");
        assert_eq!(m.preferences().await.default_style, "cinematic");
        assert_eq!(m.preferences().await.theme, Theme::System);
        m.reset_preferences().await;
        assert_eq!(m.preferences().await, Preferences::default());
    }

    #[tokio::test]
    async fn test_custom_defaults() {
        let defaults = Preferences { system_prompt: "Draw plainly.".into(), ..Preferences::default() };
        let m = HistoryManager::default().with_default_preferences(defaults);
        assert_eq!(m.preferences().await.system_prompt, "Draw plainly.");
    }

    #[tokio::test]
    async fn test_export_then_import_into_fresh_store() {
        let src = HistoryManager::new(Arc::new(MemoryStore::new()), 10);
        src.save(entry("a", 1)).await;
        src.save(entry("b", 0)).await;
        src.update_preferences(PreferencesUpdate { theme: Some(Theme::Light), ..Default::default() })
            .await;

        let doc = src.export().await;
        let dst = HistoryManager::new(Arc::new(MemoryStore::new()), 10);
        assert!(dst.import(&doc).await);
        assert_eq!(dst.list().await, src.list().await);
        assert_eq!(dst.preferences().await.theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_import_rejects_garbage() {
        let m = HistoryManager::default();
        assert!(!m.import("{{").await);
        assert!(!m.import(r#"{"history": [{"id": 1}]}"#).await);
        assert!(m.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_usage_counts_keys_and_values() {
        let store = Arc::new(MemoryStore::new());
        store.set("k", "12345").await.unwrap();
        let m = HistoryManager::new(store, 10);
        let usage = m.usage().await;
        assert_eq!(usage.used, 6);
        assert_eq!(usage.available, STORAGE_ESTIMATE_BYTES - 6);
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _: &str) -> AppResult<Option<String>> {
            Err(AppError::Storage("disk gone".into()))
        }
        async fn set(&self, _: &str, _: &str) -> AppResult<()> {
            Err(AppError::Storage("disk gone".into()))
        }
        async fn remove(&self, _: &str) -> AppResult<()> {
            Err(AppError::Storage("disk gone".into()))
        }
        async fn keys(&self) -> AppResult<Vec<String>> {
            Err(AppError::Storage("disk gone".into()))
        }
    }

    #[tokio::test]
    async fn test_storage_failures_are_swallowed() {
        let m = HistoryManager::new(Arc::new(BrokenStore), 10);
        m.save(entry("a", 0)).await;
        m.clear().await;
        assert!(m.list().await.is_empty());
        assert!(!m.remove("a").await);
        assert_eq!(m.preferences().await, Preferences::default());
        assert_eq!(m.usage().await, StorageUsage { used: 0, available: 0 });
    }
}
