//! Optimistic mutations over the client cache.
//!
//! A mutation moves through `Idle → Pending → {Committed | RolledBack} →
//! Settled`. While pending, the cache shows its projected result. On
//! failure each touched key is restored only if its generation still
//! equals the one the projection wrote; otherwise the restore is dropped
//! and the key invalidated, so overlapping mutations settling in any order
//! never resurrect superseded data and the cache converges on refetch.
//!
//! ```ignore
//! let reconciler = Reconciler::new(api, Arc::new(MutationCache::default()), owner);
//!
//! let tracker = reconciler.create(NewTracker::new("Two Sum", Difficulty::Easy, Status::Attempted))?;
//! reconciler.update(&tracker.tracker_id, &TrackerPatch::default().status(Status::Solved))?;
//! ```

mod pending;
mod projection;
mod reconciler;
mod state;
mod views;

pub use pending::PendingMutation;
pub use reconciler::Reconciler;
pub use views::{DifficultyCounts, TrackerFilter, TrackerStats};
pub use state::{
    rollback_decision, MutationId, MutationKind, MutationState, Outcome, RollbackDecision, SettleReport,
};
