//! Core types for the tracker store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix of ids assigned to trackers that only exist in the client cache.
pub const PROVISIONAL_PREFIX: &str = "temp-";

/// Identity of the owning user, as issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({})", self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        OwnerId(s.to_string())
    }
}

/// Unique identifier for a tracker.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerId(pub String);

impl TrackerId {
    /// Fresh globally unique id (UUID v4).
    pub fn generate() -> Self {
        TrackerId(Uuid::new_v4().to_string())
    }

    /// Temporary id for an optimistic create that the server has not confirmed.
    pub fn provisional(n: u64) -> Self {
        TrackerId(format!("{PROVISIONAL_PREFIX}{n}"))
    }

    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackerId({})", self.0)
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackerId {
    fn from(s: &str) -> Self {
        TrackerId(s.to_string())
    }
}

/// UTC wall-clock time, serialized as RFC 3339.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        Timestamp(Utc::now())
    }

    /// Current time, or one microsecond past `prev` if the clock has not moved on.
    pub fn after(prev: Timestamp) -> Self {
        let floor = prev.0 + chrono::Duration::microseconds(1);
        Timestamp(Utc::now().max(floor))
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}

/// Problem difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        })
    }
}

/// Where the owner stands on a problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Solved,
    Attempted,
    #[serde(rename = "To Review")]
    ToReview,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Solved => "Solved",
            Status::Attempted => "Attempted",
            Status::ToReview => "To Review",
        })
    }
}

/// A tracked problem, as stored under its owner's partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracker {
    pub owner_id: OwnerId,

    /// Assigned at creation, never changes.
    pub tracker_id: TrackerId,

    pub problem: String,
    pub difficulty: Difficulty,
    pub status: Status,
    pub notes: String,
    pub attempts: i64,

    /// Minutes.
    pub time_spent: f64,

    pub date_completed: Option<String>,

    /// Never changes after creation.
    pub created_at: Timestamp,

    /// Refreshed on every successful update.
    pub updated_at: Timestamp,
}

impl Tracker {
    /// Build a tracker from creation input, stamping both timestamps with `now`.
    pub fn from_new(owner_id: OwnerId, tracker_id: TrackerId, input: NewTracker, now: Timestamp) -> Self {
        Self {
            owner_id,
            tracker_id,
            problem: input.problem,
            difficulty: input.difficulty,
            status: input.status,
            notes: input.notes,
            attempts: input.attempts,
            time_spent: input.time_spent,
            date_completed: input.date_completed,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a tracker (before id and timestamps are assigned).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTracker {
    pub problem: String,
    pub difficulty: Difficulty,
    pub status: Status,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub time_spent: f64,
    #[serde(default)]
    pub date_completed: Option<String>,
}

impl NewTracker {
    /// Creation input with every optional field at its default.
    pub fn new(problem: impl Into<String>, difficulty: Difficulty, status: Status) -> Self {
        Self {
            problem: problem.into(),
            difficulty,
            status,
            notes: String::new(),
            attempts: 0,
            time_spent: 0.0,
            date_completed: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_attempts(mut self, attempts: i64) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_time_spent(mut self, minutes: f64) -> Self {
        self.time_spent = minutes;
        self
    }
}

/// Sparse update input. `None` leaves the stored field untouched.
///
/// `date_completed` is doubly optional: `Some(None)` clears the stored date,
/// which is how an explicit JSON `null` arrives.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_completed: Option<Option<String>>,
}

impl TrackerPatch {
    pub fn is_empty(&self) -> bool {
        *self == TrackerPatch::default()
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn problem(mut self, problem: impl Into<String>) -> Self {
        self.problem = Some(problem.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn attempts(mut self, attempts: i64) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn time_spent(mut self, minutes: f64) -> Self {
        self.time_spent = Some(minutes);
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn date_completed(mut self, date: Option<String>) -> Self {
        self.date_completed = Some(date);
        self
    }

    /// Overlay the provided fields onto `tracker`. Timestamps are left alone.
    pub fn apply_to(&self, tracker: &Tracker) -> Tracker {
        let mut merged = tracker.clone();
        if let Some(problem) = &self.problem {
            merged.problem = problem.clone();
        }
        if let Some(difficulty) = self.difficulty {
            merged.difficulty = difficulty;
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(notes) = &self.notes {
            merged.notes = notes.clone();
        }
        if let Some(attempts) = self.attempts {
            merged.attempts = attempts;
        }
        if let Some(time_spent) = self.time_spent {
            merged.time_spent = time_spent;
        }
        if let Some(date) = &self.date_completed {
            merged.date_completed = date.clone();
        }
        merged
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
