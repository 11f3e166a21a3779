//! Lifetime activity milestones.

use crate::db::{Database, LifetimeTotals};
use crate::error::Result;
use serde::Serialize;

/// Which lifetime counter a milestone tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneMetric {
    SongsListened,
    AchievementsEarned,
    MoviesWatched,
    EpisodesWatched,
    GamesTracked,
}

struct MilestoneDescriptor {
    name: &'static str,
    metric: MilestoneMetric,
    threshold: i64,
}

const MILESTONES: &[MilestoneDescriptor] = &[
    MilestoneDescriptor {
        name: "First hundred scrobbles",
        metric: MilestoneMetric::SongsListened,
        threshold: 100,
    },
    MilestoneDescriptor {
        name: "A thousand songs",
        metric: MilestoneMetric::SongsListened,
        threshold: 1_000,
    },
    MilestoneDescriptor {
        name: "Ten thousand songs",
        metric: MilestoneMetric::SongsListened,
        threshold: 10_000,
    },
    MilestoneDescriptor {
        name: "Fifty achievements",
        metric: MilestoneMetric::AchievementsEarned,
        threshold: 50,
    },
    MilestoneDescriptor {
        name: "Five hundred achievements",
        metric: MilestoneMetric::AchievementsEarned,
        threshold: 500,
    },
    MilestoneDescriptor {
        name: "Fifty movies",
        metric: MilestoneMetric::MoviesWatched,
        threshold: 50,
    },
    MilestoneDescriptor {
        name: "Five hundred episodes",
        metric: MilestoneMetric::EpisodesWatched,
        threshold: 500,
    },
    MilestoneDescriptor {
        name: "A hundred games",
        metric: MilestoneMetric::GamesTracked,
        threshold: 100,
    },
];

/// One milestone with current progress.
#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub name: &'static str,
    pub metric: MilestoneMetric,
    pub threshold: i64,
    pub current: i64,
    pub completed: bool,
}

fn counter(totals: &LifetimeTotals, metric: MilestoneMetric) -> i64 {
    match metric {
        MilestoneMetric::SongsListened => totals.songs,
        MilestoneMetric::AchievementsEarned => totals.achievements,
        MilestoneMetric::MoviesWatched => totals.movies,
        MilestoneMetric::EpisodesWatched => totals.episodes,
        MilestoneMetric::GamesTracked => totals.games,
    }
}

/// Evaluate every milestone against the user's lifetime totals.
pub fn milestones(db: &Database, user_id: i64) -> Result<Vec<Milestone>> {
    let totals = db.lifetime_totals(user_id)?;

    Ok(MILESTONES
        .iter()
        .map(|m| {
            let current = counter(&totals, m.metric);
            Milestone {
                name: m.name,
                metric: m.metric,
                threshold: m.threshold,
                current,
                completed: current >= m.threshold,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_selects_metric() {
        let totals = LifetimeTotals {
            games: 1,
            achievements: 2,
            songs: 3,
            movies: 4,
            episodes: 5,
        };
        assert_eq!(counter(&totals, MilestoneMetric::GamesTracked), 1);
        assert_eq!(counter(&totals, MilestoneMetric::EpisodesWatched), 5);
    }
}
