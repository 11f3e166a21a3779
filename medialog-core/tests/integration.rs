//! Integration tests for the analytics engine.
//!
//! These tests seed an in-memory database the way the platform sync jobs
//! would and exercise the aggregators, generators and dashboard end to end.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use medialog_core::analytics::{
    self, recompute_streaks, DashboardEngine, InsightGenerator, Window,
};
use medialog_core::config::AnalyticsConfig;
use medialog_core::db::Database;
use medialog_core::types::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const USER: i64 = 1;

fn test_db() -> Database {
    let db = Database::open_in_memory().expect("open in-memory db");
    db.migrate().expect("migrate schema");
    db
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ts(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(12, 0, 0).unwrap().and_utc()
}

/// The fixed window used by deterministic tests: March 2025.
fn march_window() -> Window {
    Window::ending(date(2025, 3, 31), 30).unwrap()
}

fn seed_title(
    db: &Database,
    platform: GamePlatform,
    external_id: &str,
    last_played: Option<NaiveDate>,
    playtime_minutes: Option<i64>,
    unlocked: i64,
    total: i64,
) -> i64 {
    db.upsert_title(&TitleRecord {
        id: 0,
        user_id: USER,
        platform,
        external_id: external_id.to_string(),
        name: format!("Title {}", external_id),
        last_played: last_played.map(ts),
        playtime_minutes,
        total_achievements: total,
        unlocked_achievements: unlocked,
    })
    .expect("upsert title")
}

fn seed_achievement(
    db: &Database,
    game_id: i64,
    name: &str,
    tier: Option<&str>,
    unlock_day: Option<NaiveDate>,
    rarity: Option<f64>,
) {
    db.insert_achievement(&AchievementRecord {
        id: 0,
        game_id,
        name: name.to_string(),
        tier: tier.map(str::to_string),
        unlocked: unlock_day.is_some(),
        unlock_time: unlock_day.map(ts),
        rarity,
    })
    .expect("insert achievement");
}

fn seed_movie_watch(db: &Database, movie_id: i64, day: NaiveDate) {
    db.insert_movie_watch(&MovieWatch {
        id: 0,
        movie_id,
        watched_at: ts(day),
    })
    .expect("insert movie watch");
}

fn seed_episode_watch(db: &Database, episode_id: i64, day: NaiveDate) {
    db.insert_episode_watch(&EpisodeWatch {
        id: 0,
        episode_id,
        watched_at: ts(day),
    })
    .expect("insert episode watch");
}

fn seed_song(
    db: &Database,
    title: &str,
    artist: &str,
    played_at: DateTime<Utc>,
    duration_ms: i64,
) {
    db.insert_song_play(&SongPlay {
        id: 0,
        user_id: USER,
        title: title.to_string(),
        artist: artist.to_string(),
        album: Some(format!("{} LP", artist)),
        played_at,
        duration_ms,
        source: MusicSource::Lastfm,
    })
    .expect("insert song");
}

// ============================================
// Window aggregator
// ============================================

#[test]
fn test_comprehensive_stats_totals() {
    let db = test_db();
    let window = march_window();

    // Two games touched in March, one outside
    let g1 = seed_title(&db, GamePlatform::Steam, "g1", Some(date(2025, 3, 10)), Some(300), 1, 10);
    seed_title(&db, GamePlatform::Xbox, "g2", Some(date(2025, 3, 12)), None, 0, 5);
    seed_title(&db, GamePlatform::Steam, "g3", Some(date(2025, 1, 2)), Some(999), 0, 3);
    seed_achievement(&db, g1, "First Blood", None, Some(date(2025, 3, 10)), None);

    // Three songs (one with real duration), one movie, two episodes
    seed_song(&db, "Song A", "Artist A", ts(date(2025, 3, 5)), 240_000);
    seed_song(&db, "Song B", "Artist A", ts(date(2025, 3, 6)), 0);
    seed_song(&db, "Song C", "Artist B", ts(date(2025, 3, 7)), 0);

    let movie = db.upsert_movie(USER, "m1", "A Film", Some(2020)).unwrap();
    seed_movie_watch(&db, movie, date(2025, 3, 8));
    let show = db.upsert_show(USER, "s1", "A Show").unwrap();
    let ep1 = db.upsert_episode(show, 1, 1, Some("Pilot")).unwrap();
    let ep2 = db.upsert_episode(show, 1, 2, None).unwrap();
    seed_episode_watch(&db, ep1, date(2025, 3, 9));
    seed_episode_watch(&db, ep2, date(2025, 3, 9));

    let stats = analytics::window::comprehensive_stats(&db, USER, &window).unwrap();

    assert_eq!(stats.totals.total_games_played, 2);
    assert_eq!(stats.totals.total_achievements_earned, 1);
    assert_eq!(stats.totals.total_gaming_time, "5 hours");
    assert_eq!(stats.totals.total_songs_listened, 3);
    // Real durations reported, so the sum is used: 4 minutes
    assert_eq!(stats.totals.total_listening_time, "4 minutes");
    assert_eq!(stats.totals.total_movies_watched, 1);
    assert_eq!(stats.totals.total_episodes_watched, 2);
    // 2h + 2 * 45min
    assert_eq!(stats.totals.total_watch_time, "3 hours and 30 minutes");
    assert_eq!(stats.averages.avg_songs_per_day, 0.1);
}

#[test]
fn test_window_aggregation_is_idempotent() {
    let db = test_db();
    let window = march_window();

    seed_title(&db, GamePlatform::Steam, "g1", Some(date(2025, 3, 10)), Some(120), 2, 4);
    seed_song(&db, "Song A", "Artist A", ts(date(2025, 3, 5)), 200_000);

    let first = serde_json::to_value(
        analytics::window::comprehensive_stats(&db, USER, &window).unwrap(),
    )
    .unwrap();
    let second = serde_json::to_value(
        analytics::window::comprehensive_stats(&db, USER, &window).unwrap(),
    )
    .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_daily_breakdown_omits_inactive_days() {
    let db = test_db();
    let window = march_window();

    seed_song(&db, "Song A", "Artist A", ts(date(2025, 3, 5)), 0);
    seed_song(&db, "Song B", "Artist A", ts(date(2025, 3, 7)), 0);

    let breakdown = analytics::window::daily_breakdown(&db, USER, &window).unwrap();
    let dates: Vec<NaiveDate> = breakdown.iter().map(|d| d.date).collect();

    assert_eq!(dates, vec![date(2025, 3, 5), date(2025, 3, 7)]);
    assert!(!dates.contains(&date(2025, 3, 6)));
}

#[test]
fn test_daily_snapshot_upsert_is_stable() {
    let db = test_db();
    let day = date(2025, 3, 9);

    seed_song(&db, "Song A", "Artist A", ts(day), 180_000);

    let first = analytics::window::record_daily_snapshot(&db, USER, day).unwrap();
    let second = analytics::window::record_daily_snapshot(&db, USER, day).unwrap();
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );

    let stored = db.get_snapshot(USER, day).unwrap().expect("snapshot stored");
    assert_eq!(stored.songs_listened, 1);
    assert_eq!(stored.listening_secs, 180);
}

// ============================================
// Completion
// ============================================

#[test]
fn test_completion_summary_across_platforms() {
    let db = test_db();

    // Steam: 5/5 completed, 4/5 not, 0/0 never
    seed_title(&db, GamePlatform::Steam, "done", None, None, 5, 5);
    seed_title(&db, GamePlatform::Steam, "close", None, None, 4, 5);
    seed_title(&db, GamePlatform::Steam, "untracked", None, None, 0, 0);

    // PSN: platinum earned on one title, none on the other
    let plat = seed_title(&db, GamePlatform::Psn, "plat", None, None, 20, 40);
    seed_achievement(&db, plat, "The Grand Finale", Some("Platinum"), Some(date(2025, 2, 1)), None);
    let no_plat = seed_title(&db, GamePlatform::Psn, "noplat", None, None, 40, 40);
    seed_achievement(&db, no_plat, "Collector", Some("gold"), Some(date(2025, 2, 1)), None);

    // Retro: score parity
    seed_title(&db, GamePlatform::RetroAchievements, "retro", None, None, 12, 12);

    let summary = analytics::completion::completion_summary(&db, USER).unwrap();
    assert_eq!(summary.steam, 1);
    assert_eq!(summary.psn, 1);
    assert_eq!(summary.xbox, 0);
    assert_eq!(summary.retroachievements, 1);
    assert_eq!(summary.total, 3);
}

// ============================================
// Trends
// ============================================

#[test]
fn test_monthly_comparison_zero_guards() {
    let db = test_db();
    let window = march_window();

    // Both windows empty
    let comparison = analytics::trends::monthly_comparison(&db, USER, &window).unwrap();
    assert_eq!(comparison.change_percentage, 0.0);

    // Activity only in the current window: 100% growth from nothing
    seed_song(&db, "Song A", "Artist A", ts(date(2025, 3, 5)), 300_000);
    let comparison = analytics::trends::monthly_comparison(&db, USER, &window).unwrap();
    assert!(comparison.current_secs > 0);
    assert_eq!(comparison.previous_secs, 0);
    assert_eq!(comparison.change_percentage, 100.0);
}

#[test]
fn test_weekly_trend_caps_gaming_estimate() {
    let db = test_db();
    let window = march_window();
    let heavy_day = date(2025, 3, 30);

    // 50 unlocks in one day: the 30-minute proxy would read as 25+ hours
    let game = seed_title(&db, GamePlatform::Steam, "g1", Some(heavy_day), None, 50, 100);
    for i in 0..50 {
        seed_achievement(&db, game, &format!("Cheevo {}", i), None, Some(heavy_day), None);
    }
    seed_song(&db, "Song A", "Artist A", ts(date(2025, 3, 29)), 240_000);

    let trend = analytics::trends::weekly_trend(&db, USER, &window).unwrap();
    assert_eq!(trend.len(), 7);
    assert_eq!(trend[0].date, date(2025, 3, 25));

    let heavy = trend.iter().find(|d| d.date == heavy_day).unwrap();
    assert_eq!(heavy.gaming_secs, 24 * 3600);
    assert_eq!(heavy.gaming_pct, 100.0);
    assert_eq!(heavy.relative_height, 1.0);

    let quiet = trend.iter().find(|d| d.date == date(2025, 3, 29)).unwrap();
    assert_eq!(quiet.music_secs, 240);
    assert_eq!(quiet.music_pct, 100.0);
    assert!(quiet.relative_height < 0.01);

    // Empty days carry zero percentages, not NaN
    let empty = trend.iter().find(|d| d.date == date(2025, 3, 25)).unwrap();
    assert_eq!(empty.gaming_pct, 0.0);
    assert_eq!(empty.relative_height, 0.0);
}

// ============================================
// Music insights
// ============================================

#[test]
fn test_new_discoveries_respects_prior_history() {
    let db = test_db();
    let window = march_window();

    // Artist A: heard before the window start and again inside it
    seed_song(&db, "Old Song", "Artist A", ts(date(2025, 2, 19)), 0);
    seed_song(&db, "New Song", "Artist A", ts(date(2025, 3, 26)), 0);
    // Artist B: first heard inside the window
    seed_song(&db, "Fresh Song", "Artist B", ts(date(2025, 3, 26)), 0);

    let discoveries = analytics::music::new_discoveries(&db, USER, &window).unwrap();
    assert_eq!(discoveries.new_artists_count, 1);
    // Artist A was itself a discovery of the preceding window
    assert_eq!(discoveries.change_percentage, Some(0.0));
}

#[test]
fn test_top_track_tiebreak_is_most_recent() {
    let db = test_db();
    let window = march_window();

    // Both tracks have two plays; Track Two was played more recently
    seed_song(&db, "Track One", "Artist A", ts(date(2025, 3, 2)), 0);
    seed_song(&db, "Track One", "Artist A", ts(date(2025, 3, 10)), 0);
    seed_song(&db, "Track Two", "Artist A", ts(date(2025, 3, 3)), 0);
    seed_song(&db, "Track Two", "Artist A", ts(date(2025, 3, 20)), 0);

    let top = analytics::music::top_track(&db, USER, &window).unwrap().unwrap();
    assert_eq!(top.title, "Track Two");
    assert_eq!(top.play_count, 2);
}

// ============================================
// Streaks
// ============================================

#[test]
fn test_streaks_split_on_gap_and_sort_longest_first() {
    let db = test_db();

    // Gaming on March 1,2,3 and 5,6: day 4 is inactive
    for (i, day) in [1, 2, 3, 5, 6].iter().enumerate() {
        seed_title(
            &db,
            GamePlatform::Steam,
            &format!("g{}", i),
            Some(date(2025, 3, *day)),
            Some(60),
            0,
            0,
        );
    }

    let streaks = recompute_streaks(&db, USER).unwrap();
    assert_eq!(streaks.len(), 2);

    let top = db.top_streaks(USER, 10).unwrap();
    assert_eq!(top[0].streak_length, 3);
    assert_eq!(top[0].start_date, date(2025, 3, 1));
    assert_eq!(top[0].end_date, date(2025, 3, 3));
    assert_eq!(top[0].games_played, 3);
    assert_eq!(top[1].streak_length, 2);
    assert_eq!(top[1].start_date, date(2025, 3, 5));

    // Rebuilding from unchanged stores yields identical rows
    let again = recompute_streaks(&db, USER).unwrap();
    assert_eq!(streaks, again);
}

// ============================================
// Dashboard engine
// ============================================

#[test]
fn test_partial_failure_isolation_end_to_end() {
    let db = test_db();
    seed_title(&db, GamePlatform::Steam, "g1", Some(date(2025, 3, 10)), Some(120), 1, 4);
    seed_song(&db, "Song A", "Artist A", ts(date(2025, 3, 5)), 200_000);

    let mut engine = DashboardEngine::new(&AnalyticsConfig::default());
    engine.register(InsightGenerator::new("top_track", Value::Null, |_, _, _| {
        Err(medialog_core::Error::Config("forced failure".to_string()))
    }));

    let composite = engine.assemble(&db, USER, &march_window());

    // The failing key carries its default; the rest of the dashboard is intact
    assert_eq!(composite["top_track"], Value::Null);
    let stats = &composite["comprehensive_stats"];
    assert_eq!(stats["totals"]["total_games_played"], json!(1));
    assert_eq!(stats["totals"]["total_songs_listened"], json!(1));
    assert_eq!(composite["top_artist"]["name"], json!("Artist A"));
}

#[test]
fn test_platform_distribution_has_fixed_key_set() {
    let db = test_db();
    let engine = DashboardEngine::new(&AnalyticsConfig::default());

    // No activity at all: every platform key is present and zero-valued
    let composite = engine.assemble(&db, USER, &march_window());
    let distribution = composite["platform_distribution"].as_object().unwrap();

    for key in ["steam", "psn", "xbox", "retroachievements", "spotify", "lastfm", "trakt"] {
        assert!(distribution.contains_key(key), "missing platform {key}");
    }
    assert_eq!(distribution["steam"]["games"], json!(0));
    assert_eq!(distribution["trakt"]["watch_time"], json!("0 minutes"));
    assert_eq!(composite["platform_count"], json!(0));
}

#[test]
fn test_dashboard_caches_and_force_refresh_recomputes() {
    let db = test_db();
    let engine = DashboardEngine::new(&AnalyticsConfig::default());
    let today = Utc::now().date_naive();

    seed_song(&db, "Song A", "Artist A", ts(today - TimeDelta::days(1)), 0);

    let first = engine.generate(&db, USER, 30).unwrap();
    assert_eq!(first["comprehensive_stats"]["totals"]["total_songs_listened"], json!(1));

    // New store data does not appear through the cache...
    seed_song(&db, "Song B", "Artist B", ts(today - TimeDelta::days(2)), 0);
    let cached = engine.generate(&db, USER, 30).unwrap();
    assert_eq!(cached, first);

    // ...but a force refresh recomputes
    let fresh = engine.generate_fresh(&db, USER, 30).unwrap();
    assert_eq!(fresh["comprehensive_stats"]["totals"]["total_songs_listened"], json!(2));
}

#[test]
fn test_invalid_window_is_a_single_validation_failure() {
    let db = test_db();
    let engine = DashboardEngine::new(&AnalyticsConfig::default());

    assert!(matches!(
        engine.generate(&db, USER, 0),
        Err(medialog_core::Error::InvalidWindow { days: 0 })
    ));
    assert!(engine.generate(&db, USER, -3).is_err());
}

#[test]
fn test_on_disk_database_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("medialog.db");

    // Open creates missing parent directories, migrate is idempotent
    let db = Database::open(&db_path).expect("database should open");
    db.migrate().expect("migrations should run");
    db.migrate().expect("second migrate is a no-op");

    seed_song(&db, "Song A", "Artist A", ts(date(2025, 3, 5)), 0);
    drop(db);

    let reopened = Database::open(&db_path).expect("database should reopen");
    reopened.migrate().expect("migrations should run");
    let (songs, _) = reopened
        .music_window_stats(USER, None, date(2025, 3, 1), date(2025, 3, 31))
        .unwrap();
    assert_eq!(songs, 1);
}

#[test]
fn test_watch_events_deduplicate_exact_resync_copies() {
    let db = test_db();
    let window = march_window();

    let movie = db.upsert_movie(USER, "m1", "A Film", None).unwrap();
    // The same watch synced twice, plus a genuine rewatch at another time
    seed_movie_watch(&db, movie, date(2025, 3, 8));
    seed_movie_watch(&db, movie, date(2025, 3, 8));
    seed_movie_watch(&db, movie, date(2025, 3, 15));

    let (movies, episodes) = db.watch_counts(USER, window.start, window.end).unwrap();
    assert_eq!(movies, 2);
    assert_eq!(episodes, 0);
}
