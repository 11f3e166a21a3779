//! Gaming streak computation.
//!
//! A streak is a maximal run of consecutive calendar days each containing at
//! least one qualifying gaming event (a title touched or an achievement
//! unlocked). Streak rows are derived state: rebuilding from unchanged
//! stores writes identical rows, so the rebuild can run on every read.

use crate::db::Database;
use crate::error::Result;
use crate::format::format_duration_secs;
use crate::types::GamingStreak;
use chrono::NaiveDate;
use serde::Serialize;

/// Find maximal runs of consecutive days in a sorted, distinct date list.
fn scan_streaks(dates: &[NaiveDate]) -> Vec<(NaiveDate, NaiveDate)> {
    let mut runs = Vec::new();
    let mut iter = dates.iter().copied();

    let Some(first) = iter.next() else {
        return runs;
    };
    let mut start = first;
    let mut prev = first;

    for date in iter {
        if (date - prev).num_days() != 1 {
            // Gap day: the open streak closes
            runs.push((start, prev));
            start = date;
        }
        prev = date;
    }
    runs.push((start, prev));
    runs
}

/// Rebuild the user's streak rows from the title stores.
///
/// Runs a single linear scan over the sorted distinct activity dates, then
/// replaces the stored rows atomically. Idempotent by construction.
pub fn recompute_streaks(db: &Database, user_id: i64) -> Result<Vec<GamingStreak>> {
    let dates = db.gaming_activity_dates(user_id)?;

    let mut streaks = Vec::new();
    for (start_date, end_date) in scan_streaks(&dates) {
        let totals = db.gaming_totals(user_id, start_date, end_date)?;
        streaks.push(GamingStreak {
            user_id,
            start_date,
            end_date,
            streak_length: (end_date - start_date).num_days() + 1,
            total_gaming_secs: totals.playtime_minutes * 60,
            games_played: totals.games_touched,
            achievements_earned: totals.achievements_earned,
        });
    }

    db.replace_streaks(user_id, &streaks)?;
    tracing::debug!(user_id, streaks = streaks.len(), "Rebuilt gaming streaks");
    Ok(streaks)
}

/// One streak as reported by the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StreakInsight {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub streak_length: i64,
    pub total_gaming_time: String,
    pub games_played: i64,
    pub achievements_earned: i64,
}

/// The user's longest streaks, longest first.
pub fn gaming_streaks(db: &Database, user_id: i64, limit: usize) -> Result<Vec<StreakInsight>> {
    recompute_streaks(db, user_id)?;

    let streaks = db.top_streaks(user_id, limit)?;
    Ok(streaks
        .into_iter()
        .map(|s| StreakInsight {
            start_date: s.start_date,
            end_date: s.end_date,
            streak_length: s.streak_length,
            total_gaming_time: format_duration_secs(s.total_gaming_secs),
            games_played: s.games_played,
            achievements_earned: s.achievements_earned,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_scan_empty() {
        assert!(scan_streaks(&[]).is_empty());
    }

    #[test]
    fn test_scan_single_day() {
        assert_eq!(scan_streaks(&[date(5)]), vec![(date(5), date(5))]);
    }

    #[test]
    fn test_scan_split_on_gap() {
        // Activity on days 1,2,3,5,6: day 4 closes the first streak
        let dates = [date(1), date(2), date(3), date(5), date(6)];
        assert_eq!(
            scan_streaks(&dates),
            vec![(date(1), date(3)), (date(5), date(6))]
        );
    }

    #[test]
    fn test_scan_across_month_boundary() {
        let dates = [
            NaiveDate::from_ymd_opt(2025, 2, 27).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        ];
        assert_eq!(scan_streaks(&dates).len(), 1);
    }
}
