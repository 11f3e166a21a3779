//! Time trends: the rolling weekly activity trend and the window-over-window
//! comparison.

use super::estimate;
use super::window::Window;
use crate::db::Database;
use crate::error::Result;
use chrono::TimeDelta;
use serde::Serialize;

/// Hard ceiling on the per-day gaming estimate. The proxy (30 min per
/// achievement, 60 min per title) can overshoot on heavy unlock days; a day
/// has 24 hours.
const DAY_CAP_SECS: i64 = 24 * 3600;

/// One day of the weekly trend, sized for stacked-bar rendering.
#[derive(Debug, Clone, Serialize)]
pub struct TrendDay {
    pub date: chrono::NaiveDate,
    pub gaming_secs: i64,
    pub music_secs: i64,
    pub video_secs: i64,
    /// Share of this day's total, 0 when the day is empty
    pub gaming_pct: f64,
    pub music_pct: f64,
    pub video_pct: f64,
    /// This day's total relative to the window's busiest day, in `[0, 1]`
    pub relative_height: f64,
}

fn share(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Rolling 7-day trend ending on the window's end date (not calendar-week
/// aligned). Gaming time is the achievement/title proxy capped at 24 h/day;
/// music and video go through the estimators.
pub fn weekly_trend(db: &Database, user_id: i64, window: &Window) -> Result<Vec<TrendDay>> {
    let week = Window {
        start: window.end - TimeDelta::days(6),
        end: window.end,
        days: 7,
    };

    let games = db.daily_games_touched(user_id, week.start, week.end)?;
    let achievements = db.daily_achievements_earned(user_id, week.start, week.end)?;
    let music = db.daily_music_stats(user_id, week.start, week.end)?;
    let movies = db.daily_movie_watches(user_id, week.start, week.end)?;
    let episodes = db.daily_episode_watches(user_id, week.start, week.end)?;

    let mut days = Vec::with_capacity(7);
    for date in week.iter_days() {
        let daily_games = games.get(&date).copied().unwrap_or(0);
        let daily_achievements = achievements.get(&date).copied().unwrap_or(0);
        let (daily_songs, daily_ms) = music.get(&date).copied().unwrap_or((0, 0));
        let daily_movies = movies.get(&date).copied().unwrap_or(0);
        let daily_episodes = episodes.get(&date).copied().unwrap_or(0);

        let raw_gaming = estimate::gaming_time(daily_achievements, daily_games).num_seconds();
        let gaming_secs = if raw_gaming > DAY_CAP_SECS {
            // Heuristic saturation, not a real 24-hour session.
            tracing::warn!(
                user_id,
                %date,
                estimated_secs = raw_gaming,
                "Gaming estimate exceeds 24h, capping"
            );
            DAY_CAP_SECS
        } else {
            raw_gaming
        };
        let music_secs = estimate::listening_time(daily_songs, daily_ms).num_seconds();
        let video_secs = estimate::watch_time(daily_movies, daily_episodes).num_seconds();
        let total = gaming_secs + music_secs + video_secs;

        days.push(TrendDay {
            date,
            gaming_secs,
            music_secs,
            video_secs,
            gaming_pct: share(gaming_secs, total),
            music_pct: share(music_secs, total),
            video_pct: share(video_secs, total),
            relative_height: 0.0,
        });
    }

    let max_total = days
        .iter()
        .map(|d| d.gaming_secs + d.music_secs + d.video_secs)
        .max()
        .unwrap_or(0);
    if max_total > 0 {
        for day in &mut days {
            let total = day.gaming_secs + day.music_secs + day.video_secs;
            day.relative_height = total as f64 / max_total as f64;
        }
    }

    Ok(days)
}

/// Estimated engagement comparison of the window against the preceding
/// equal-length window.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyComparison {
    pub current_secs: i64,
    pub previous_secs: i64,
    pub change_percentage: f64,
}

fn engagement_secs(db: &Database, user_id: i64, window: &Window) -> Result<i64> {
    let gaming = db.gaming_totals(user_id, window.start, window.end)?;
    let (songs, duration_ms) = db.music_window_stats(user_id, None, window.start, window.end)?;
    let (movies, episodes) = db.watch_counts(user_id, window.start, window.end)?;

    Ok(gaming.playtime_minutes * 60
        + estimate::listening_time(songs, duration_ms).num_seconds()
        + estimate::watch_time(movies, episodes).num_seconds())
}

/// Compare estimated engagement time with the immediately preceding window.
pub fn monthly_comparison(
    db: &Database,
    user_id: i64,
    window: &Window,
) -> Result<MonthlyComparison> {
    let current_secs = engagement_secs(db, user_id, window)?;
    let previous_secs = engagement_secs(db, user_id, &window.preceding())?;

    Ok(MonthlyComparison {
        current_secs,
        previous_secs,
        change_percentage: super::calc_delta(current_secs, previous_secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_guards_zero() {
        assert_eq!(share(10, 0), 0.0);
        assert_eq!(share(1, 4), 25.0);
    }
}
