//! Derived views over an owner's tracker list.

use crate::types::{Difficulty, Status, Tracker};
use serde::Serialize;

/// Tracker counts per difficulty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DifficultyCounts {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

/// Progress summary for one owner.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStats {
    pub total: usize,
    pub solved: usize,
    pub attempted: usize,
    pub to_review: usize,
    pub by_difficulty: DifficultyCounts,
    /// Sum of `timeSpent`, in minutes.
    pub total_time: f64,
    /// Mean `timeSpent` rounded to a whole minute; 0 for an empty list.
    #[serde(rename = "avgTime")]
    pub average_time: f64,
}

impl From<&[Tracker]> for TrackerStats {
    fn from(trackers: &[Tracker]) -> Self {
        let mut stats = TrackerStats {
            total: trackers.len(),
            ..Default::default()
        };

        for tracker in trackers {
            match tracker.status {
                Status::Solved => stats.solved += 1,
                Status::Attempted => stats.attempted += 1,
                Status::ToReview => stats.to_review += 1,
            }
            match tracker.difficulty {
                Difficulty::Easy => stats.by_difficulty.easy += 1,
                Difficulty::Medium => stats.by_difficulty.medium += 1,
                Difficulty::Hard => stats.by_difficulty.hard += 1,
            }
            stats.total_time += tracker.time_spent;
        }

        if stats.total > 0 {
            stats.average_time = (stats.total_time / stats.total as f64).round();
        }
        stats
    }
}

/// Narrows a tracker list. Every criterion left unset matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackerFilter {
    /// Case-insensitive substring of `problem`.
    pub search: String,
    pub status: Option<Status>,
    pub difficulty: Option<Difficulty>,
}

impl TrackerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = query.into();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn matches(&self, tracker: &Tracker) -> bool {
        self.status.map_or(true, |status| tracker.status == status)
            && self.difficulty.map_or(true, |difficulty| tracker.difficulty == difficulty)
            && tracker
                .problem
                .to_lowercase()
                .contains(&self.search.to_lowercase())
    }

    /// Matching trackers, in list order.
    pub fn apply(&self, trackers: &[Tracker]) -> Vec<Tracker> {
        trackers.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}
