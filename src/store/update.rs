//! Partial-update compilation.
//!
//! Turns a validated [`TrackerPatch`] into the minimal list of set-clauses
//! for one stored tracker. Fields the patch omits produce no clause, so the
//! backend leaves them as stored.

use crate::backend::{Assignment, CompositeKey};
use crate::error::{Result, StoreError};
use crate::types::{Difficulty, Status, Timestamp, Tracker, TrackerPatch};
use serde_json::Value;

/// A single `field = value` clause.
///
/// Identity fields (`ownerId`, `trackerId`, `createdAt`) have no variant and
/// so can never be assigned by an update.
#[derive(Clone, Debug, PartialEq)]
pub enum SetClause {
    Problem(String),
    Difficulty(Difficulty),
    Status(Status),
    Notes(String),
    Attempts(i64),
    TimeSpent(f64),
    DateCompleted(Option<String>),
    UpdatedAt(Timestamp),
}

impl SetClause {
    /// Stored field name.
    pub fn field(&self) -> &'static str {
        match self {
            SetClause::Problem(_) => "problem",
            SetClause::Difficulty(_) => "difficulty",
            SetClause::Status(_) => "status",
            SetClause::Notes(_) => "notes",
            SetClause::Attempts(_) => "attempts",
            SetClause::TimeSpent(_) => "timeSpent",
            SetClause::DateCompleted(_) => "dateCompleted",
            SetClause::UpdatedAt(_) => "updatedAt",
        }
    }

    fn value(&self) -> Result<Value> {
        let value = match self {
            SetClause::Problem(s) | SetClause::Notes(s) => Value::from(s.as_str()),
            SetClause::Difficulty(d) => serde_json::to_value(d).map_err(StoreError::from)?,
            SetClause::Status(s) => serde_json::to_value(s).map_err(StoreError::from)?,
            SetClause::Attempts(n) => Value::from(*n),
            SetClause::TimeSpent(m) => Value::from(*m),
            SetClause::DateCompleted(d) => match d {
                Some(date) => Value::from(date.as_str()),
                None => Value::Null,
            },
            SetClause::UpdatedAt(t) => serde_json::to_value(t).map_err(StoreError::from)?,
        };
        Ok(value)
    }
}

/// A compiled update against exactly one stored tracker.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdatePlan {
    pub key: CompositeKey,
    pub clauses: Vec<SetClause>,

    /// What the tracker will look like once the plan is applied.
    pub expected: Tracker,
}

impl UpdatePlan {
    /// Compile `patch` against the last known state of the tracker.
    ///
    /// Validation runs on the patch and on the merged result; a failure here
    /// means no store call is made. `updatedAt` is always set and strictly
    /// later than `prior.updated_at`.
    pub fn compile(prior: &Tracker, patch: &TrackerPatch, now: Timestamp) -> Result<Self> {
        patch.validate()?;

        let mut expected = patch.apply_to(prior);
        expected.validate()?;

        let updated_at = if now > prior.updated_at {
            now
        } else {
            Timestamp::after(prior.updated_at)
        };
        expected.updated_at = updated_at;

        let mut clauses = Vec::new();
        if let Some(problem) = &patch.problem {
            clauses.push(SetClause::Problem(problem.clone()));
        }
        if let Some(difficulty) = patch.difficulty {
            clauses.push(SetClause::Difficulty(difficulty));
        }
        if let Some(status) = patch.status {
            clauses.push(SetClause::Status(status));
        }
        if let Some(notes) = &patch.notes {
            clauses.push(SetClause::Notes(notes.clone()));
        }
        if let Some(attempts) = patch.attempts {
            clauses.push(SetClause::Attempts(attempts));
        }
        if let Some(minutes) = patch.time_spent {
            clauses.push(SetClause::TimeSpent(minutes));
        }
        if let Some(date) = &patch.date_completed {
            clauses.push(SetClause::DateCompleted(date.clone()));
        }
        clauses.push(SetClause::UpdatedAt(updated_at));

        Ok(Self {
            key: CompositeKey::tracker(&prior.owner_id, &prior.tracker_id),
            clauses,
            expected,
        })
    }

    /// Lower the clauses to backend assignments.
    pub fn assignments(&self) -> Result<Vec<Assignment>> {
        self.clauses
            .iter()
            .map(|clause| Ok((clause.field().to_string(), clause.value()?)))
            .collect()
    }

    /// Field names touched by this plan, in clause order.
    pub fn fields(&self) -> Vec<&'static str> {
        self.clauses.iter().map(SetClause::field).collect()
    }
}
