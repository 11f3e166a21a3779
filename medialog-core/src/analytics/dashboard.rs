//! Dashboard engine: fans out to every insight generator and assembles one
//! composite result.
//!
//! Generators are held as a declarative registry of `(name, run, default)`
//! entries rather than hand-written per-metric fallback blocks. A generator
//! failure is logged and replaced by its documented default; it never takes
//! the rest of the dashboard down. Composite results are cached per
//! `(user, days)` under a date-stamped key, so entries expire on TTL or at
//! the day rollover, whichever comes first.

use super::window::Window;
use super::{completion, distribution, gaming, milestones, music, streaks, trends, window};
use crate::cache::DashboardCache;
use crate::config::AnalyticsConfig;
use crate::db::Database;
use crate::error::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

type GeneratorFn = Box<dyn Fn(&Database, i64, &Window) -> Result<Value> + Send + Sync>;

/// One named insight: how to compute it and what to substitute on failure.
pub struct InsightGenerator {
    name: &'static str,
    default: Value,
    run: GeneratorFn,
}

impl InsightGenerator {
    pub fn new(
        name: &'static str,
        default: Value,
        run: impl Fn(&Database, i64, &Window) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            default,
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

fn to_value<T: Serialize>(result: Result<T>) -> Result<Value> {
    Ok(serde_json::to_value(result?)?)
}

/// Engine that runs every registered insight generator for a `(user, window)`
/// and assembles the composite dashboard.
pub struct DashboardEngine {
    generators: Vec<InsightGenerator>,
    cache: DashboardCache,
}

impl DashboardEngine {
    /// Engine with no generators registered.
    pub fn empty(config: &AnalyticsConfig) -> Self {
        Self {
            generators: Vec::new(),
            cache: DashboardCache::from_config(config),
        }
    }

    /// Engine with all built-in generators registered.
    pub fn new(config: &AnalyticsConfig) -> Self {
        let mut engine = Self::empty(config);
        let streak_limit = config.streak_limit;

        engine.register(InsightGenerator::new(
            "comprehensive_stats",
            Value::Null,
            |db, user, w| to_value(window::comprehensive_stats(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "platform_distribution",
            Value::Null,
            |db, user, w| to_value(distribution::platform_distribution(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "achievement_efficiency",
            json!({
                "total_achievements": 0,
                "total_gaming_time": "0 minutes",
                "efficiency_per_hour": 0.0,
            }),
            |db, user, w| to_value(gaming::achievement_efficiency(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "gaming_streaks",
            json!([]),
            move |db, user, _w| to_value(streaks::gaming_streaks(db, user, streak_limit)),
        ));
        engine.register(InsightGenerator::new(
            "last_played_time",
            Value::Null,
            |db, user, _w| to_value(gaming::last_played_time(db, user)),
        ));
        engine.register(InsightGenerator::new(
            "weekly_trend",
            json!([]),
            |db, user, w| to_value(trends::weekly_trend(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "monthly_comparison",
            json!({"current_secs": 0, "previous_secs": 0, "change_percentage": 0.0}),
            |db, user, w| to_value(trends::monthly_comparison(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "platform_count",
            json!(0),
            |db, user, w| to_value(distribution::platform_count(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "content_type_distribution",
            json!({"buckets": [], "total_secs": 0}),
            |db, user, w| to_value(distribution::content_type_distribution(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "most_played_game",
            Value::Null,
            |db, user, w| to_value(gaming::most_played_game(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "hardest_achievement",
            Value::Null,
            |db, user, w| to_value(gaming::hardest_achievement(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "completion_summary",
            json!({"steam": 0, "psn": 0, "xbox": 0, "retroachievements": 0, "total": 0}),
            |db, user, _w| to_value(completion::completion_summary(db, user)),
        ));
        engine.register(InsightGenerator::new(
            "top_artist",
            Value::Null,
            |db, user, w| to_value(music::top_artist(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "top_track",
            Value::Null,
            |db, user, w| to_value(music::top_track(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "top_album",
            Value::Null,
            |db, user, w| to_value(music::top_album(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "new_discoveries",
            json!({"new_artists_count": 0, "change_percentage": null}),
            |db, user, w| to_value(music::new_discoveries(db, user, w)),
        ));
        engine.register(InsightGenerator::new(
            "milestones",
            json!([]),
            |db, user, _w| to_value(milestones::milestones(db, user)),
        ));

        engine
    }

    /// Register a generator. A generator with the same name replaces the
    /// existing entry, keeping its position in the composite.
    pub fn register(&mut self, generator: InsightGenerator) {
        if let Some(existing) = self
            .generators
            .iter_mut()
            .find(|g| g.name == generator.name)
        {
            *existing = generator;
        } else {
            self.generators.push(generator);
        }
    }

    /// Names of all registered generators, in composite order.
    pub fn generator_names(&self) -> Vec<&'static str> {
        self.generators.iter().map(|g| g.name).collect()
    }

    /// Full dashboard for `(user, days)`, served from cache when fresh.
    pub fn generate(&self, db: &Database, user_id: i64, days: i64) -> Result<Value> {
        self.generate_inner(db, user_id, days, false)
    }

    /// Full dashboard bypassing the cache (the "force recompute" variant).
    pub fn generate_fresh(&self, db: &Database, user_id: i64, days: i64) -> Result<Value> {
        self.generate_inner(db, user_id, days, true)
    }

    fn generate_inner(
        &self,
        db: &Database,
        user_id: i64,
        days: i64,
        force_refresh: bool,
    ) -> Result<Value> {
        let today = Utc::now().date_naive();
        // Window validation happens once, before any generator runs
        let window = Window::ending(today, days)?;

        let key = DashboardCache::key("analytics", user_id, days, today);
        if force_refresh {
            self.cache.invalidate(&key);
        } else if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(user_id, days, "Dashboard cache hit");
            return Ok(hit);
        }

        tracing::info!(user_id, days, "Computing dashboard");
        let composite = Value::Object(self.assemble(db, user_id, &window));
        self.cache.insert(key, composite.clone());
        Ok(composite)
    }

    /// Run every generator for an explicit window and assemble the composite,
    /// with per-key failure isolation. Uncached.
    pub fn assemble(
        &self,
        db: &Database,
        user_id: i64,
        window: &Window,
    ) -> serde_json::Map<String, Value> {
        let mut composite = serde_json::Map::new();
        for generator in &self.generators {
            let value = match (generator.run)(db, user_id, window) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        generator = generator.name,
                        user_id,
                        error = %e,
                        "Insight generator failed, substituting default"
                    );
                    generator.default.clone()
                }
            };
            composite.insert(generator.name.to_string(), value);
        }
        composite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::NaiveDate;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn test_window() -> Window {
        Window::ending(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(), 30).unwrap()
    }

    #[test]
    fn test_builtin_registry_keys() {
        let engine = DashboardEngine::new(&AnalyticsConfig::default());
        let names = engine.generator_names();
        for expected in [
            "comprehensive_stats",
            "platform_distribution",
            "gaming_streaks",
            "weekly_trend",
            "monthly_comparison",
            "top_track",
            "new_discoveries",
            "milestones",
        ] {
            assert!(names.contains(&expected), "missing generator {expected}");
        }
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut engine = DashboardEngine::new(&AnalyticsConfig::default());
        let before = engine.generator_names();

        engine.register(InsightGenerator::new("top_track", Value::Null, |_, _, _| {
            Ok(json!("replaced"))
        }));
        assert_eq!(engine.generator_names(), before);

        let db = test_db();
        let composite = engine.assemble(&db, 1, &test_window());
        assert_eq!(composite["top_track"], json!("replaced"));
    }

    #[test]
    fn test_failed_generator_substitutes_default() {
        let mut engine = DashboardEngine::new(&AnalyticsConfig::default());
        engine.register(InsightGenerator::new("top_track", Value::Null, |_, _, _| {
            Err(Error::Config("forced failure".to_string()))
        }));

        let db = test_db();
        let composite = engine.assemble(&db, 1, &test_window());

        // The failing key is defaulted, everything else still computes
        assert_eq!(composite["top_track"], Value::Null);
        assert!(composite["comprehensive_stats"].is_object());
        assert!(composite["weekly_trend"].is_array());
    }

    #[test]
    fn test_invalid_days_rejected_before_generators() {
        let engine = DashboardEngine::new(&AnalyticsConfig::default());
        let db = test_db();
        assert!(matches!(
            engine.generate(&db, 1, 0),
            Err(Error::InvalidWindow { days: 0 })
        ));
    }
}
