//! Core domain types for medialog
//!
//! These types represent the canonical data model (Layer 1) that normalizes
//! activity synced from all supported platforms, plus the derived records
//! (Layer 2) the analytics engine may persist as a cache.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Platform** | An external service acting as a source of records (Steam, PSN, Xbox, RetroAchievements, Spotify, Last.fm, Trakt) |
//! | **Title** | A game-like unit owned by one platform's store |
//! | **Achievement** | A trophy/achievement attached to a title |
//! | **Play event** | One song play or one movie/episode watch; repeat plays are distinct events |
//! | **Window** | An inclusive date range `[start, end]` metrics are aggregated over |
//! | **Streak** | A maximal run of consecutive calendar days with gaming activity |
//!
//! Layer 1 tables are written by platform sync jobs (out of scope here) and
//! are read-only to the analytics engine. Layer 2 tables (`StatisticsSnapshot`,
//! `GamingStreak`) are derived and can be deleted and regenerated losslessly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Platforms
// ============================================

/// A title-holding gaming platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePlatform {
    Steam,
    Psn,
    Xbox,
    RetroAchievements,
}

impl GamePlatform {
    /// All gaming platforms, in display order.
    pub const ALL: [GamePlatform; 4] = [
        GamePlatform::Steam,
        GamePlatform::Psn,
        GamePlatform::Xbox,
        GamePlatform::RetroAchievements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GamePlatform::Steam => "steam",
            GamePlatform::Psn => "psn",
            GamePlatform::Xbox => "xbox",
            GamePlatform::RetroAchievements => "retroachievements",
        }
    }
}

impl std::str::FromStr for GamePlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "steam" => Ok(GamePlatform::Steam),
            "psn" => Ok(GamePlatform::Psn),
            "xbox" => Ok(GamePlatform::Xbox),
            "retroachievements" => Ok(GamePlatform::RetroAchievements),
            _ => Err(format!("unknown game platform: {}", s)),
        }
    }
}

/// A music scrobbling source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicSource {
    Spotify,
    Lastfm,
}

impl MusicSource {
    pub const ALL: [MusicSource; 2] = [MusicSource::Spotify, MusicSource::Lastfm];

    pub fn as_str(&self) -> &'static str {
        match self {
            MusicSource::Spotify => "spotify",
            MusicSource::Lastfm => "lastfm",
        }
    }
}

impl std::str::FromStr for MusicSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spotify" => Ok(MusicSource::Spotify),
            "lastfm" => Ok(MusicSource::Lastfm),
            _ => Err(format!("unknown music source: {}", s)),
        }
    }
}

// ============================================
// Titles and achievements (Layer 1)
// ============================================

/// A game-like title as synced from one platform's store.
///
/// `unlocked_achievements <= total_achievements` is an invariant maintained
/// by the sync jobs. Only Steam reliably reports `playtime_minutes`; the
/// other platforms leave it `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRecord {
    /// Row id in the local store
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Which platform this title lives on
    pub platform: GamePlatform,
    /// The platform's identifier for the title (appid, title id, game id)
    pub external_id: String,
    /// Display name
    pub name: String,
    /// Most recent play timestamp, if the platform reports one
    pub last_played: Option<DateTime<Utc>>,
    /// Cumulative playtime in minutes, if the platform reports it
    pub playtime_minutes: Option<i64>,
    /// Number of achievements defined for this title
    pub total_achievements: i64,
    /// Number of achievements the user has unlocked
    pub unlocked_achievements: i64,
}

/// One achievement/trophy attached to a title.
///
/// Platforms are not uniformly consistent about `unlocked` vs `unlock_time`;
/// the analytics engine treats `unlock_time` as ground truth for any
/// time-windowed computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub id: i64,
    /// Title this achievement belongs to
    pub game_id: i64,
    pub name: String,
    /// Trophy tier label for the trophy platform ("platinum", "gold", ...)
    pub tier: Option<String>,
    pub unlocked: bool,
    pub unlock_time: Option<DateTime<Utc>>,
    /// Global unlock percentage where the platform supplies one; lower = rarer
    pub rarity: Option<f64>,
}

// ============================================
// Play events (Layer 1)
// ============================================

/// One scrobbled song play. Repeat plays of the same track are distinct rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongPlay {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub played_at: DateTime<Utc>,
    /// Track length in milliseconds; 0 when the source omits it
    pub duration_ms: i64,
    pub source: MusicSource,
}

/// One movie watch event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieWatch {
    pub id: i64,
    pub movie_id: i64,
    pub watched_at: DateTime<Utc>,
}

/// One episode watch event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeWatch {
    pub id: i64,
    pub episode_id: i64,
    pub watched_at: DateTime<Utc>,
}

// ============================================
// Derived records (Layer 2, regenerable)
// ============================================

/// Per-day statistics snapshot, unique per `(user_id, date)`.
///
/// Purely a performance cache: every field is recomputable live from the
/// platform stores, so the table can be dropped and rebuilt at any time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub user_id: i64,
    pub date: NaiveDate,
    pub games_played: i64,
    pub achievements_earned: i64,
    pub gaming_secs: i64,
    pub songs_listened: i64,
    pub listening_secs: i64,
    pub movies_watched: i64,
    pub episodes_watched: i64,
    pub watch_secs: i64,
    pub engagement_secs: i64,
}

/// A maximal run of consecutive calendar days with gaming activity.
///
/// Derived entirely from title/achievement history; rebuilding from the same
/// source state always yields the same streak boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamingStreak {
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub streak_length: i64,
    pub total_gaming_secs: i64,
    pub games_played: i64,
    pub achievements_earned: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_platform_round_trip() {
        for platform in GamePlatform::ALL {
            assert_eq!(GamePlatform::from_str(platform.as_str()), Ok(platform));
        }
        assert!(GamePlatform::from_str("gog").is_err());
    }

    #[test]
    fn test_music_source_round_trip() {
        for source in MusicSource::ALL {
            assert_eq!(MusicSource::from_str(source.as_str()), Ok(source));
        }
        assert!(MusicSource::from_str("tidal").is_err());
    }
}
