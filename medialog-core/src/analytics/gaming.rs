//! Gaming insights: efficiency, standout titles and achievements.

use super::window::Window;
use crate::db::Database;
use crate::error::Result;
use crate::format::format_duration_secs;
use crate::types::GamePlatform;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Achievements earned per hour of reported playtime over a window.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AchievementEfficiency {
    pub total_achievements: i64,
    pub total_gaming_time: String,
    pub efficiency_per_hour: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Achievements per gaming hour; 0 when no playtime was reported.
pub fn achievement_efficiency(
    db: &Database,
    user_id: i64,
    window: &Window,
) -> Result<AchievementEfficiency> {
    let gaming = db.gaming_totals(user_id, window.start, window.end)?;
    let gaming_time = TimeDelta::minutes(gaming.playtime_minutes);

    let efficiency = if gaming_time.num_seconds() > 0 {
        gaming.achievements_earned as f64 / (gaming_time.num_seconds() as f64 / 3600.0)
    } else {
        0.0
    };

    Ok(AchievementEfficiency {
        total_achievements: gaming.achievements_earned,
        total_gaming_time: format_duration_secs(gaming_time.num_seconds()),
        efficiency_per_hour: round2(efficiency),
    })
}

/// The window's most played title.
#[derive(Debug, Clone, Serialize)]
pub struct MostPlayedGame {
    pub name: String,
    pub platform: GamePlatform,
    pub playtime: String,
}

/// Title with the largest reported playtime among titles touched in the
/// window; `None` when no touched title reports playtime.
pub fn most_played_game(
    db: &Database,
    user_id: i64,
    window: &Window,
) -> Result<Option<MostPlayedGame>> {
    let title = db.most_played_title(user_id, window.start, window.end)?;
    Ok(title.map(|t| MostPlayedGame {
        playtime: format_duration_secs(
            TimeDelta::minutes(t.playtime_minutes.unwrap_or(0)).num_seconds(),
        ),
        name: t.name,
        platform: t.platform,
    }))
}

/// The rarest achievement unlocked in the window.
#[derive(Debug, Clone, Serialize)]
pub struct HardestAchievement {
    pub name: String,
    pub game: String,
    /// Global unlock percentage; lower is rarer
    pub rarity: f64,
}

/// Rarest achievement unlocked in the window; `None` when no unlocked
/// achievement carries rarity data.
pub fn hardest_achievement(
    db: &Database,
    user_id: i64,
    window: &Window,
) -> Result<Option<HardestAchievement>> {
    let rarest = db.rarest_unlocked_achievement(user_id, window.start, window.end)?;
    Ok(rarest.map(|(achievement, game)| HardestAchievement {
        name: achievement.name,
        game,
        rarity: achievement.rarity.unwrap_or(0.0),
    }))
}

/// Most recent play timestamp across every title store.
pub fn last_played_time(db: &Database, user_id: i64) -> Result<Option<DateTime<Utc>>> {
    db.max_last_played(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(2.625), 2.63);
        assert_eq!(round2(2.4949), 2.49);
        assert_eq!(round2(0.0), 0.0);
    }
}
