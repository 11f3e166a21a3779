//! Duration estimation heuristics.
//!
//! None of the viewing sources report actual watch duration and the
//! scrobbling sources sometimes omit per-track length, so several metrics
//! run on fixed per-item estimates. The constants below are deliberate
//! approximations; changing them changes every downstream statistic, so
//! treat them as part of the metric definitions.

use chrono::TimeDelta;

/// Fallback track length when the source omits `duration_ms`: 3.5 minutes.
const AVG_TRACK_SECS: i64 = 210;

/// Estimated watch time per movie: 2 hours.
const MOVIE_SECS: i64 = 2 * 3600;

/// Estimated watch time per episode: 45 minutes.
const EPISODE_SECS: i64 = 45 * 60;

/// Gaming-time proxy per achievement unlocked: 30 minutes.
const ACHIEVEMENT_SECS: i64 = 30 * 60;

/// Gaming-time proxy per title touched: 60 minutes.
const GAME_SECS: i64 = 3600;

fn non_negative(n: i64) -> i64 {
    n.max(0)
}

/// Estimate listening time for a batch of song plays.
///
/// Uses the real duration sum when the source reported one; otherwise falls
/// back to the average-track heuristic.
pub fn listening_time(song_count: i64, total_duration_ms: i64) -> TimeDelta {
    if total_duration_ms > 0 {
        TimeDelta::milliseconds(total_duration_ms)
    } else {
        TimeDelta::seconds(non_negative(song_count) * AVG_TRACK_SECS)
    }
}

/// Estimate watch time from movie and episode counts.
pub fn watch_time(movie_count: i64, episode_count: i64) -> TimeDelta {
    TimeDelta::seconds(
        non_negative(movie_count) * MOVIE_SECS + non_negative(episode_count) * EPISODE_SECS,
    )
}

/// Estimate gaming time from achievement and title-touch counts.
///
/// Used where no platform playtime is available (e.g., the weekly trend);
/// callers cap the result per day.
pub fn gaming_time(achievement_count: i64, game_count: i64) -> TimeDelta {
    TimeDelta::seconds(
        non_negative(achievement_count) * ACHIEVEMENT_SECS + non_negative(game_count) * GAME_SECS,
    )
}
