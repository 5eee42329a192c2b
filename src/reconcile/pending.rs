//! One in-flight optimistic mutation.

use super::state::{
    rollback_decision, MutationId, MutationKind, MutationState, Outcome, RollbackDecision, SettleReport,
};
use crate::cache::{CacheKey, CachedValue, EntrySnapshot, Generation, MutationCache};
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A key this mutation projected onto.
#[derive(Clone, Debug)]
struct Touched {
    key: CacheKey,
    snapshot: EntrySnapshot,
    optimistic: Generation,
}

/// Bookkeeping for a mutation between its optimistic write and settle.
///
/// Consumed by [`commit`](Self::commit), [`roll_back`](Self::roll_back) or
/// [`resolve`](Self::resolve). Dropping it unresolved (the caller abandoned
/// the backend call) rolls it back, so no mutation stays pending.
pub struct PendingMutation {
    id: MutationId,
    kind: MutationKind,
    cache: Arc<MutationCache>,
    touched: Vec<Touched>,
    /// Invalidated when the mutation commits.
    settle_keys: Vec<CacheKey>,
    state: MutationState,
}

impl PendingMutation {
    pub(crate) fn new(id: MutationId, kind: MutationKind, cache: Arc<MutationCache>) -> Self {
        Self {
            id,
            kind,
            cache,
            touched: Vec::new(),
            settle_keys: Vec::new(),
            state: MutationState::Idle,
        }
    }

    /// Apply an optimistic projection to `key` if it holds a fresh value.
    ///
    /// `project` returns `None` to leave the key alone. Must be called before
    /// [`start`](Self::start).
    pub(crate) fn project<F>(&mut self, key: CacheKey, project: F)
    where
        F: FnOnce(&CachedValue) -> Option<CachedValue>,
    {
        debug_assert_eq!(self.state, MutationState::Idle);

        let Some(snapshot) = self.cache.snapshot(&key) else {
            return;
        };
        if snapshot.stale {
            return;
        }
        let Some(projected) = project(&snapshot.value) else {
            return;
        };

        match self
            .cache
            .write_if(key.clone(), projected, Some(snapshot.generation))
        {
            Some(optimistic) => {
                debug!(mutation = %self.id, %key, %optimistic, "applied optimistic projection");
                self.touched.push(Touched {
                    key,
                    snapshot,
                    optimistic,
                });
            }
            None => debug!(mutation = %self.id, %key, "skipped projection, entry moved on"),
        }
    }

    /// Invalidate `key` on commit.
    pub fn invalidate_on_commit(&mut self, key: CacheKey) {
        if !self.settle_keys.contains(&key) {
            self.settle_keys.push(key);
        }
    }

    pub(crate) fn start(&mut self) {
        self.advance(MutationState::Pending);
    }

    pub fn id(&self) -> MutationId {
        self.id
    }

    pub fn kind(&self) -> &MutationKind {
        &self.kind
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Keys that received an optimistic write, in projection order.
    pub fn touched_keys(&self) -> Vec<CacheKey> {
        self.touched.iter().map(|t| t.key.clone()).collect()
    }

    /// The backend accepted the mutation.
    ///
    /// The projection is not kept as truth: every settle key is invalidated
    /// so the next read refetches.
    pub fn commit(mut self) -> SettleReport {
        self.settle(Outcome::Committed)
    }

    /// The backend call failed.
    pub fn roll_back(mut self) -> SettleReport {
        self.settle(Outcome::RolledBack)
    }

    /// Commit on `Ok`, roll back on `Err`.
    pub fn resolve<T>(self, result: &Result<T>) -> SettleReport {
        match result {
            Ok(_) => self.commit(),
            Err(_) => self.roll_back(),
        }
    }

    fn settle(&mut self, outcome: Outcome) -> SettleReport {
        let mut report = SettleReport {
            id: self.id,
            kind: self.kind.clone(),
            outcome,
            restored: Vec::new(),
            discarded: Vec::new(),
            invalidated: Vec::new(),
        };

        match outcome {
            Outcome::Committed => {
                self.advance(MutationState::Committed);
                for key in &self.settle_keys {
                    if self.cache.invalidate(key).is_some() {
                        report.invalidated.push(key.clone());
                    }
                }
                debug!(mutation = %self.id, kind = ?self.kind, "committed");
            }
            Outcome::RolledBack => {
                self.advance(MutationState::RolledBack);
                // Undo in reverse so a key projected twice ends at its oldest snapshot.
                for touched in self.touched.iter().rev() {
                    let restored = self.cache.restore_or_invalidate(&touched.key, &touched.snapshot, |current| {
                        rollback_decision(current, touched.optimistic) == RollbackDecision::Restore
                    });
                    if restored {
                        report.restored.push(touched.key.clone());
                    } else {
                        warn!(
                            mutation = %self.id,
                            key = %touched.key,
                            "rollback discarded, newer write landed"
                        );
                        report.discarded.push(touched.key.clone());
                        report.invalidated.push(touched.key.clone());
                    }
                }
                info!(
                    mutation = %self.id,
                    kind = ?self.kind,
                    restored = report.restored.len(),
                    discarded = report.discarded.len(),
                    "rolled back"
                );
            }
        }

        self.touched.clear();
        self.advance(MutationState::Settled);
        report
    }

    fn advance(&mut self, next: MutationState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal mutation transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}

impl Drop for PendingMutation {
    fn drop(&mut self) {
        if self.state == MutationState::Pending {
            warn!(mutation = %self.id, "pending mutation abandoned, rolling back");
            self.settle(Outcome::RolledBack);
        }
    }
}

impl std::fmt::Debug for PendingMutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingMutation")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("touched", &self.touched_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OwnerId, TrackerId};

    fn list_key() -> CacheKey {
        CacheKey::List(OwnerId::from("u"))
    }

    fn pending(cache: &Arc<MutationCache>) -> PendingMutation {
        PendingMutation::new(
            MutationId(1),
            MutationKind::Delete(TrackerId::from("t")),
            Arc::clone(cache),
        )
    }

    #[test]
    fn test_skips_absent_and_stale_keys() {
        let cache = Arc::new(MutationCache::default());
        let mut m = pending(&cache);
        m.project(list_key(), |_| Some(CachedValue::List(vec![])));
        assert!(m.touched_keys().is_empty());

        cache.write(list_key(), CachedValue::List(vec![]));
        cache.invalidate(&list_key());
        m.project(list_key(), |_| Some(CachedValue::List(vec![])));
        assert!(m.touched_keys().is_empty());
        m.start();
        m.commit();
    }

    #[test]
    fn test_drop_while_pending_rolls_back() {
        let cache = Arc::new(MutationCache::default());
        cache.write(list_key(), CachedValue::List(vec![]));
        let before = cache.read(&list_key());

        {
            let mut m = pending(&cache);
            m.project(list_key(), |_| Some(CachedValue::List(vec![placeholder()])));
            m.start();
            assert_eq!(m.state(), MutationState::Pending);
            assert_ne!(cache.read(&list_key()), before);
        }

        assert_eq!(cache.read(&list_key()), before);
    }

    #[test]
    fn test_commit_invalidates_only_present_keys() {
        let cache = Arc::new(MutationCache::default());
        cache.write(list_key(), CachedValue::List(vec![]));

        let mut m = pending(&cache);
        m.invalidate_on_commit(list_key());
        m.invalidate_on_commit(CacheKey::Detail(TrackerId::from("absent")));
        m.invalidate_on_commit(list_key());
        m.start();

        let report = m.commit();
        assert_eq!(report.outcome, Outcome::Committed);
        assert_eq!(report.invalidated, vec![list_key()]);
        assert!(cache.read(&list_key()).is_none());
    }

    fn placeholder() -> crate::types::Tracker {
        crate::types::Tracker::from_new(
            OwnerId::from("u"),
            TrackerId::from("t"),
            crate::types::NewTracker::new(
                "p",
                crate::types::Difficulty::Easy,
                crate::types::Status::Solved,
            ),
            crate::types::Timestamp::now(),
        )
    }
}
