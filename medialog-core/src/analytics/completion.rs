//! Per-platform completion rules.
//!
//! Each platform has its own notion of "fully done":
//! - Steam and Xbox: every defined achievement unlocked.
//! - PSN: the platinum trophy is earned (the platinum implies the rest, and
//!   some titles ship without one, so parity alone is not the signal there).
//! - RetroAchievements: achieved score parity, `num_achieved` equal to
//!   `num_possible_achievements`.
//!
//! A title with zero defined achievements is never completed; untracked
//! titles must not read as finished.

use crate::db::Database;
use crate::error::Result;
use crate::types::{AchievementRecord, GamePlatform, TitleRecord};
use serde::Serialize;

/// Whether a title counts as completed on its platform.
pub fn is_completed(title: &TitleRecord, achievements: &[AchievementRecord]) -> bool {
    match title.platform {
        GamePlatform::Steam | GamePlatform::Xbox => achievement_parity(title),
        GamePlatform::Psn => has_platinum(achievements),
        // Score parity, same shape as the achievement-count rule
        GamePlatform::RetroAchievements => achievement_parity(title),
    }
}

fn achievement_parity(title: &TitleRecord) -> bool {
    title.total_achievements > 0 && title.unlocked_achievements == title.total_achievements
}

fn has_platinum(achievements: &[AchievementRecord]) -> bool {
    achievements.iter().any(|a| {
        a.unlocked
            && (contains_platinum(a.tier.as_deref()) || contains_platinum(Some(&a.name)))
    })
}

fn contains_platinum(label: Option<&str>) -> bool {
    label
        .map(|l| l.to_lowercase().contains("platinum"))
        .unwrap_or(false)
}

/// Completed-title counts per platform across a user's library.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CompletionSummary {
    pub steam: i64,
    pub psn: i64,
    pub xbox: i64,
    pub retroachievements: i64,
    pub total: i64,
}

/// Evaluate every title the user owns and tally completions per platform.
pub fn completion_summary(db: &Database, user_id: i64) -> Result<CompletionSummary> {
    let titles = db.titles_for_user(user_id)?;
    let achievements = db.achievements_by_title(user_id)?;

    let mut summary = CompletionSummary::default();
    for title in &titles {
        let title_achievements = achievements
            .get(&title.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if is_completed(title, title_achievements) {
            match title.platform {
                GamePlatform::Steam => summary.steam += 1,
                GamePlatform::Psn => summary.psn += 1,
                GamePlatform::Xbox => summary.xbox += 1,
                GamePlatform::RetroAchievements => summary.retroachievements += 1,
            }
            summary.total += 1;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(platform: GamePlatform, unlocked: i64, total: i64) -> TitleRecord {
        TitleRecord {
            id: 1,
            user_id: 1,
            platform,
            external_id: "t".to_string(),
            name: "Test Title".to_string(),
            last_played: None,
            playtime_minutes: None,
            total_achievements: total,
            unlocked_achievements: unlocked,
        }
    }

    fn trophy(name: &str, tier: Option<&str>, unlocked: bool) -> AchievementRecord {
        AchievementRecord {
            id: 1,
            game_id: 1,
            name: name.to_string(),
            tier: tier.map(str::to_string),
            unlocked,
            unlock_time: None,
            rarity: None,
        }
    }

    #[test]
    fn test_parity_platforms() {
        assert!(is_completed(&title(GamePlatform::Steam, 5, 5), &[]));
        assert!(!is_completed(&title(GamePlatform::Steam, 4, 5), &[]));
        assert!(is_completed(&title(GamePlatform::Xbox, 12, 12), &[]));
        assert!(is_completed(&title(GamePlatform::RetroAchievements, 3, 3), &[]));
        assert!(!is_completed(&title(GamePlatform::RetroAchievements, 0, 3), &[]));
    }

    #[test]
    fn test_zero_achievements_never_completed() {
        for platform in GamePlatform::ALL {
            assert!(!is_completed(&title(platform, 0, 0), &[]));
        }
    }

    #[test]
    fn test_platinum_detection() {
        let plat = trophy("The Grand Finale", Some("Platinum"), true);
        assert!(is_completed(&title(GamePlatform::Psn, 10, 40), &[plat]));

        // Case-insensitive, and the name counts too
        let by_name = trophy("PLATINUM Hunter", None, true);
        assert!(is_completed(&title(GamePlatform::Psn, 1, 40), &[by_name]));
    }

    #[test]
    fn test_locked_platinum_does_not_count() {
        let locked = trophy("The Grand Finale", Some("platinum"), false);
        assert!(!is_completed(&title(GamePlatform::Psn, 39, 40), &[locked]));
    }

    #[test]
    fn test_psn_parity_without_platinum_is_not_completed() {
        let gold = trophy("Collector", Some("gold"), true);
        assert!(!is_completed(&title(GamePlatform::Psn, 40, 40), &[gold]));
    }
}
