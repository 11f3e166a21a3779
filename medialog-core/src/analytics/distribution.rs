//! Platform and content-type distributions.

use super::estimate;
use super::window::Window;
use crate::db::Database;
use crate::error::Result;
use crate::format::format_duration_secs;
use crate::types::{GamePlatform, MusicSource};
use chrono::TimeDelta;
use serde::Serialize;

/// Window usage for one gaming platform.
#[derive(Debug, Clone, Serialize)]
pub struct GamingUsage {
    pub games: i64,
    pub achievements: i64,
    pub playtime: String,
}

/// Window usage for one scrobbling source.
#[derive(Debug, Clone, Serialize)]
pub struct MusicUsage {
    pub songs: i64,
    pub listening_time: String,
}

/// Window usage for the watch-history source.
#[derive(Debug, Clone, Serialize)]
pub struct VideoUsage {
    pub movies: i64,
    pub episodes: i64,
    pub watch_time: String,
}

/// Per-platform usage over a window.
///
/// The key set is fixed and known upfront: a platform with no activity gets
/// a zero-valued entry, never an omitted key.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformDistribution {
    pub steam: GamingUsage,
    pub psn: GamingUsage,
    pub xbox: GamingUsage,
    pub retroachievements: GamingUsage,
    pub spotify: MusicUsage,
    pub lastfm: MusicUsage,
    pub trakt: VideoUsage,
}

fn gaming_usage(
    db: &Database,
    user_id: i64,
    platform: GamePlatform,
    window: &Window,
) -> Result<GamingUsage> {
    let stats = db.gaming_window_stats(user_id, platform, window.start, window.end)?;
    Ok(GamingUsage {
        games: stats.games_touched,
        achievements: stats.achievements_earned,
        playtime: format_duration_secs(TimeDelta::minutes(stats.playtime_minutes).num_seconds()),
    })
}

fn music_usage(
    db: &Database,
    user_id: i64,
    source: MusicSource,
    window: &Window,
) -> Result<MusicUsage> {
    let (songs, duration_ms) =
        db.music_window_stats(user_id, Some(source), window.start, window.end)?;
    Ok(MusicUsage {
        songs,
        listening_time: format_duration_secs(
            estimate::listening_time(songs, duration_ms).num_seconds(),
        ),
    })
}

/// Usage distribution across every platform for a window.
pub fn platform_distribution(
    db: &Database,
    user_id: i64,
    window: &Window,
) -> Result<PlatformDistribution> {
    let (movies, episodes) = db.watch_counts(user_id, window.start, window.end)?;

    Ok(PlatformDistribution {
        steam: gaming_usage(db, user_id, GamePlatform::Steam, window)?,
        psn: gaming_usage(db, user_id, GamePlatform::Psn, window)?,
        xbox: gaming_usage(db, user_id, GamePlatform::Xbox, window)?,
        retroachievements: gaming_usage(db, user_id, GamePlatform::RetroAchievements, window)?,
        spotify: music_usage(db, user_id, MusicSource::Spotify, window)?,
        lastfm: music_usage(db, user_id, MusicSource::Lastfm, window)?,
        trakt: VideoUsage {
            movies,
            episodes,
            watch_time: format_duration_secs(estimate::watch_time(movies, episodes).num_seconds()),
        },
    })
}

/// Number of platforms with at least one event in the window.
pub fn platform_count(db: &Database, user_id: i64, window: &Window) -> Result<i64> {
    let mut count = 0;

    for platform in GamePlatform::ALL {
        let stats = db.gaming_window_stats(user_id, platform, window.start, window.end)?;
        if stats.games_touched > 0 || stats.achievements_earned > 0 {
            count += 1;
        }
    }
    for source in MusicSource::ALL {
        let (songs, _) = db.music_window_stats(user_id, Some(source), window.start, window.end)?;
        if songs > 0 {
            count += 1;
        }
    }
    let (movies, episodes) = db.watch_counts(user_id, window.start, window.end)?;
    if movies > 0 || episodes > 0 {
        count += 1;
    }

    Ok(count)
}

/// One coarse content-type bucket.
#[derive(Debug, Clone, Serialize)]
pub struct ContentTypeBucket {
    pub content_type: &'static str,
    pub secs: i64,
    pub percentage: f64,
}

/// Engagement split across gaming / music / video.
///
/// None of the sources supply genre metadata, so this is the documented
/// coarse fallback; real genre tagging is out of scope.
#[derive(Debug, Clone, Serialize)]
pub struct ContentTypeDistribution {
    pub buckets: Vec<ContentTypeBucket>,
    pub total_secs: i64,
}

/// Distribution of estimated engagement time across content types.
pub fn content_type_distribution(
    db: &Database,
    user_id: i64,
    window: &Window,
) -> Result<ContentTypeDistribution> {
    let gaming = db.gaming_totals(user_id, window.start, window.end)?;
    let (songs, duration_ms) = db.music_window_stats(user_id, None, window.start, window.end)?;
    let (movies, episodes) = db.watch_counts(user_id, window.start, window.end)?;

    let gaming_secs = gaming.playtime_minutes * 60;
    let music_secs = estimate::listening_time(songs, duration_ms).num_seconds();
    let video_secs = estimate::watch_time(movies, episodes).num_seconds();
    let total_secs = gaming_secs + music_secs + video_secs;

    let percentage = |secs: i64| -> f64 {
        if total_secs == 0 {
            0.0
        } else {
            secs as f64 / total_secs as f64 * 100.0
        }
    };

    Ok(ContentTypeDistribution {
        buckets: vec![
            ContentTypeBucket {
                content_type: "gaming",
                secs: gaming_secs,
                percentage: percentage(gaming_secs),
            },
            ContentTypeBucket {
                content_type: "music",
                secs: music_secs,
                percentage: percentage(music_secs),
            },
            ContentTypeBucket {
                content_type: "video",
                secs: video_secs,
                percentage: percentage(video_secs),
            },
        ],
        total_secs,
    })
}
