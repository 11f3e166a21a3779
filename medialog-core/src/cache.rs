//! TTL-bounded cache for composite dashboard results.
//!
//! Analytics are read-mostly and derived, so cached values may lag store
//! writes by up to the TTL. Keys embed the current calendar date, which
//! makes every entry roll over naturally when "today" shifts the window,
//! independent of the TTL.

use crate::config::AnalyticsConfig;
use chrono::NaiveDate;
use moka::sync::Cache;
use std::time::Duration;

/// Cache for composite analytics results, keyed by
/// `{metric}_{user_id}_{window_days}_{today}`.
pub struct DashboardCache {
    entries: Cache<String, serde_json::Value>,
}

impl DashboardCache {
    /// Create a cache with explicit capacity and TTL.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Create a cache from the analytics configuration.
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    /// Build a composite cache key.
    pub fn key(metric: &str, user_id: i64, window_days: i64, today: NaiveDate) -> String {
        format!("{}_{}_{}_{}", metric, user_id, window_days, today)
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: String, value: serde_json::Value) {
        self.entries.insert(key, value);
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.invalidate(key);
    }
}

impl Default for DashboardCache {
    fn default() -> Self {
        Self::from_config(&AnalyticsConfig::default())
    }
}
