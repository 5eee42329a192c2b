//! Mutation lifecycle states and the rollback rule.

use crate::cache::{CacheKey, Generation};
use crate::types::TrackerId;
use std::fmt;

/// Lifecycle of one optimistic mutation.
///
/// `Idle → Pending → {Committed | RolledBack} → Settled`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    /// Optimistic projection applied, backend call outstanding.
    Pending,
    Committed,
    RolledBack,
    /// Terminal.
    Settled,
}

impl MutationState {
    pub fn can_advance_to(self, next: MutationState) -> bool {
        use MutationState::*;
        matches!(
            (self, next),
            (Idle, Pending)
                | (Pending, Committed)
                | (Pending, RolledBack)
                | (Committed, Settled)
                | (RolledBack, Settled)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == MutationState::Settled
    }
}

/// What a rollback does to one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollbackDecision {
    /// Put the pre-mutation snapshot back.
    Restore,
    /// Leave the newer value alone (and let it refetch).
    Discard,
}

/// Restore only if the entry is still exactly what this mutation wrote.
///
/// Any later write, invalidation or eviction moves the entry away from
/// `optimistic`, and restoring then would resurrect superseded data.
pub fn rollback_decision(current: Option<Generation>, optimistic: Generation) -> RollbackDecision {
    if current == Some(optimistic) {
        RollbackDecision::Restore
    } else {
        RollbackDecision::Discard
    }
}

/// Identifier for a mutation, unique per reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MutationId(pub u64);

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Carries the provisional id shown until the server confirms.
    Create(TrackerId),
    Update(TrackerId),
    Delete(TrackerId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    RolledBack,
}

/// What settling a mutation did to the cache.
#[derive(Clone, Debug, PartialEq)]
pub struct SettleReport {
    pub id: MutationId,
    pub kind: MutationKind,
    pub outcome: Outcome,
    /// Keys put back to their pre-mutation snapshot.
    pub restored: Vec<CacheKey>,
    /// Keys whose restore was dropped because a newer write landed.
    pub discarded: Vec<CacheKey>,
    /// Keys marked stale for refetch.
    pub invalidated: Vec<CacheKey>,
}
