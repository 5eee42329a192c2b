//! Field constraints for tracker inputs.
//!
//! Validation collects every violation instead of stopping at the first, so
//! a rejected request can report all offending fields at once.

use crate::error::{Result, ValidationErrors};
use crate::types::{NewTracker, Tracker, TrackerPatch};

/// Maximum length of `problem`, in characters.
pub const MAX_PROBLEM_LEN: usize = 200;

/// Maximum length of `notes`, in characters.
pub const MAX_NOTES_LEN: usize = 1000;

fn check_problem(problem: &str, errors: &mut ValidationErrors) {
    let len = problem.chars().count();
    if len == 0 {
        errors.push("problem", "Problem name is required");
    } else if len > MAX_PROBLEM_LEN {
        errors.push("problem", "Problem name too long");
    }
}

fn check_notes(notes: &str, errors: &mut ValidationErrors) {
    if notes.chars().count() > MAX_NOTES_LEN {
        errors.push("notes", "Notes too long");
    }
}

fn check_attempts(attempts: i64, errors: &mut ValidationErrors) {
    if attempts < 0 {
        errors.push("attempts", "Attempts must be non-negative");
    }
}

fn check_time_spent(minutes: f64, errors: &mut ValidationErrors) {
    // NaN fails both comparisons, so test for the valid range instead.
    if !(minutes.is_finite() && minutes >= 0.0) {
        errors.push("timeSpent", "Time spent must be non-negative");
    }
}

impl NewTracker {
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        check_problem(&self.problem, &mut errors);
        check_notes(&self.notes, &mut errors);
        check_attempts(self.attempts, &mut errors);
        check_time_spent(self.time_spent, &mut errors);
        errors.into_result()
    }
}

impl TrackerPatch {
    /// Check only the fields the patch provides.
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        if let Some(problem) = &self.problem {
            check_problem(problem, &mut errors);
        }
        if let Some(notes) = &self.notes {
            check_notes(notes, &mut errors);
        }
        if let Some(attempts) = self.attempts {
            check_attempts(attempts, &mut errors);
        }
        if let Some(minutes) = self.time_spent {
            check_time_spent(minutes, &mut errors);
        }
        errors.into_result()
    }
}

impl Tracker {
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        check_problem(&self.problem, &mut errors);
        check_notes(&self.notes, &mut errors);
        check_attempts(self.attempts, &mut errors);
        check_time_spent(self.time_spent, &mut errors);
        errors.into_result()
    }
}
