//! Window aggregation: totals, averages and the daily activity breakdown.

use super::estimate;
use crate::db::Database;
use crate::error::Result;
use crate::format::{format_duration, format_duration_secs};
use crate::types::StatisticsSnapshot;
use chrono::{NaiveDate, TimeDelta, Utc};
use serde::Serialize;

/// An inclusive date range `[start, end]` spanning a requested number of days.
///
/// `start` is `end - days`, and both endpoints are included in queries;
/// averages divide by the requested `days`, not the active-day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: i64,
}

impl Window {
    /// Window of the last `days` days ending today.
    pub fn last_days(days: i64) -> Result<Self> {
        Self::ending(Utc::now().date_naive(), days)
    }

    /// Window of `days` days ending on `end`. Rejects `days <= 0` before
    /// any query is issued.
    pub fn ending(end: NaiveDate, days: i64) -> Result<Self> {
        super::check_days(days)?;
        Ok(Self {
            start: end - TimeDelta::days(days),
            end,
            days,
        })
    }

    /// The equal-length window immediately before this one.
    pub fn preceding(&self) -> Self {
        let end = self.start - TimeDelta::days(1);
        Self {
            start: end - TimeDelta::days(self.days),
            end,
            days: self.days,
        }
    }

    /// Iterate every calendar day in the window, oldest first.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|d| *d <= self.end)
    }
}

/// The window the statistics were computed over.
#[derive(Debug, Clone, Serialize)]
pub struct Period {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
}

/// Cross-platform totals for a window. Duration fields are pre-rendered
/// for display.
#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub total_games_played: i64,
    pub total_gaming_time: String,
    pub total_achievements_earned: i64,
    pub total_songs_listened: i64,
    pub total_listening_time: String,
    pub total_movies_watched: i64,
    pub total_episodes_watched: i64,
    pub total_watch_time: String,
    pub total_engagement_time: String,
}

/// Per-day averages over the requested window length.
#[derive(Debug, Clone, Serialize)]
pub struct Averages {
    pub avg_games_per_day: f64,
    pub avg_achievements_per_day: f64,
    pub avg_songs_per_day: f64,
    pub avg_gaming_time_per_day: String,
    pub avg_listening_time_per_day: String,
    pub avg_watch_time_per_day: String,
}

/// One day of the breakdown. Days with no activity in any category are not
/// emitted at all.
#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub games_played: i64,
    pub achievements_earned: i64,
    pub songs_listened: i64,
    pub movies_watched: i64,
    pub episodes_watched: i64,
    pub total_engagement_time: String,
}

/// Comprehensive statistics over one window.
#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveStats {
    pub period: Period,
    pub totals: Totals,
    pub averages: Averages,
    pub daily_stats: Vec<DailyStats>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compute comprehensive statistics for `(user, window)`.
///
/// Counts are plain sums across platforms: a title owned on two platforms
/// counts twice, by design. Gaming time is the playtime the stores actually
/// report; listening and watch time go through the estimators.
pub fn comprehensive_stats(
    db: &Database,
    user_id: i64,
    window: &Window,
) -> Result<ComprehensiveStats> {
    let gaming = db.gaming_totals(user_id, window.start, window.end)?;
    let (songs, duration_ms) = db.music_window_stats(user_id, None, window.start, window.end)?;
    let (movies, episodes) = db.watch_counts(user_id, window.start, window.end)?;

    let gaming_time = TimeDelta::minutes(gaming.playtime_minutes);
    let listening_time = estimate::listening_time(songs, duration_ms);
    let watch_time = estimate::watch_time(movies, episodes);
    let engagement_time = gaming_time + listening_time + watch_time;

    let days = window.days;
    let averages = Averages {
        avg_games_per_day: round1(gaming.games_touched as f64 / days as f64),
        avg_achievements_per_day: round1(gaming.achievements_earned as f64 / days as f64),
        avg_songs_per_day: round1(songs as f64 / days as f64),
        avg_gaming_time_per_day: format_duration_secs(gaming_time.num_seconds() / days),
        avg_listening_time_per_day: format_duration_secs(listening_time.num_seconds() / days),
        avg_watch_time_per_day: format_duration_secs(watch_time.num_seconds() / days),
    };

    Ok(ComprehensiveStats {
        period: Period {
            start_date: window.start,
            end_date: window.end,
            days,
        },
        totals: Totals {
            total_games_played: gaming.games_touched,
            total_gaming_time: format_duration(gaming_time),
            total_achievements_earned: gaming.achievements_earned,
            total_songs_listened: songs,
            total_listening_time: format_duration(listening_time),
            total_movies_watched: movies,
            total_episodes_watched: episodes,
            total_watch_time: format_duration(watch_time),
            total_engagement_time: format_duration(engagement_time),
        },
        averages,
        daily_stats: daily_breakdown(db, user_id, window)?,
    })
}

/// Per-day activity over the window; all-zero days are omitted, not
/// zero-filled.
pub fn daily_breakdown(db: &Database, user_id: i64, window: &Window) -> Result<Vec<DailyStats>> {
    let games = db.daily_games_touched(user_id, window.start, window.end)?;
    let achievements = db.daily_achievements_earned(user_id, window.start, window.end)?;
    let music = db.daily_music_stats(user_id, window.start, window.end)?;
    let movies = db.daily_movie_watches(user_id, window.start, window.end)?;
    let episodes = db.daily_episode_watches(user_id, window.start, window.end)?;

    let mut breakdown = Vec::new();
    for date in window.iter_days() {
        let daily_games = games.get(&date).copied().unwrap_or(0);
        let daily_achievements = achievements.get(&date).copied().unwrap_or(0);
        let daily_songs = music.get(&date).map(|(count, _)| *count).unwrap_or(0);
        let daily_movies = movies.get(&date).copied().unwrap_or(0);
        let daily_episodes = episodes.get(&date).copied().unwrap_or(0);

        // Inclusion is keyed on plays and watches; an unlock with no other
        // activity does not qualify a day. The day's engagement estimate
        // comes from watch counts alone.
        if daily_movies > 0 || daily_episodes > 0 || daily_games > 0 || daily_songs > 0 {
            let engagement = estimate::watch_time(daily_movies, daily_episodes);
            breakdown.push(DailyStats {
                date,
                games_played: daily_games,
                achievements_earned: daily_achievements,
                songs_listened: daily_songs,
                movies_watched: daily_movies,
                episodes_watched: daily_episodes,
                total_engagement_time: format_duration(engagement),
            });
        }
    }

    Ok(breakdown)
}

/// Aggregate a single day and persist it as a statistics snapshot.
///
/// The snapshot table is a pure performance cache with a `(user, date)`
/// uniqueness invariant; re-running this for the same day overwrites the row
/// with identical values as long as the stores have not changed.
pub fn record_daily_snapshot(
    db: &Database,
    user_id: i64,
    date: NaiveDate,
) -> Result<StatisticsSnapshot> {
    let gaming = db.gaming_totals(user_id, date, date)?;
    let (songs, duration_ms) = db.music_window_stats(user_id, None, date, date)?;
    let (movies, episodes) = db.watch_counts(user_id, date, date)?;

    let gaming_secs = gaming.playtime_minutes * 60;
    let listening_secs = estimate::listening_time(songs, duration_ms).num_seconds();
    let watch_secs = estimate::watch_time(movies, episodes).num_seconds();

    let snapshot = StatisticsSnapshot {
        user_id,
        date,
        games_played: gaming.games_touched,
        achievements_earned: gaming.achievements_earned,
        gaming_secs,
        songs_listened: songs,
        listening_secs,
        movies_watched: movies,
        episodes_watched: episodes,
        watch_secs,
        engagement_secs: gaming_secs + listening_secs + watch_secs,
    };

    db.upsert_snapshot(&snapshot)?;
    Ok(snapshot)
}
