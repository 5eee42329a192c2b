//! Cache-through reads and optimistic writes for one owner.

use super::pending::PendingMutation;
use super::projection;
use super::state::{MutationId, MutationKind};
use super::views::{TrackerFilter, TrackerStats};
use crate::api::TrackerApi;
use crate::cache::{CacheKey, CachedValue, Generation, MutationCache};
use crate::error::{Result, TrackerError};
use crate::hints::Suggestions;
use crate::types::{NewTracker, OwnerId, Tracker, TrackerId, TrackerPatch};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Client-side coordinator between a [`MutationCache`] and a [`TrackerApi`].
///
/// Writes go through a [`PendingMutation`]: the cache shows the expected
/// result immediately, then the backend call settles it. A commit
/// invalidates the affected keys so they refetch ground truth; a failure
/// restores each key only if nothing newer has been written to it.
///
/// The one-shot methods ([`create`](Self::create), [`update`](Self::update),
/// [`delete`](Self::delete)) do both phases. The `begin_*` methods return
/// the pending mutation so the caller can issue the backend call itself,
/// e.g. on another thread.
pub struct Reconciler<A> {
    api: A,
    cache: Arc<MutationCache>,
    owner: OwnerId,
    next_mutation: AtomicU64,
    next_provisional: AtomicU64,
}

impl<A: TrackerApi> Reconciler<A> {
    pub fn new(api: A, cache: Arc<MutationCache>, owner: OwnerId) -> Self {
        Self {
            api,
            cache,
            owner,
            next_mutation: AtomicU64::new(0),
            next_provisional: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &Arc<MutationCache> {
        &self.cache
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn list_key(&self) -> CacheKey {
        CacheKey::List(self.owner.clone())
    }

    fn next_id(&self) -> MutationId {
        MutationId(self.next_mutation.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn pending(&self, kind: MutationKind) -> PendingMutation {
        PendingMutation::new(self.next_id(), kind, Arc::clone(&self.cache))
    }

    /// The owner's trackers, from cache or fetched.
    pub fn list(&self) -> Result<Vec<Tracker>> {
        let key = self.list_key();
        if let Some(list) = self.cache.read(&key).and_then(CachedValue::into_list) {
            return Ok(list);
        }

        let base = self.cache.generation(&key);
        let fetched = self.api.list()?;
        self.fill(key, CachedValue::List(fetched.clone()), base);
        Ok(fetched)
    }

    /// Progress summary over the current list.
    pub fn stats(&self) -> Result<TrackerStats> {
        Ok(TrackerStats::from(self.list()?.as_slice()))
    }

    pub fn list_filtered(&self, filter: &TrackerFilter) -> Result<Vec<Tracker>> {
        Ok(filter.apply(&self.list()?))
    }

    /// One tracker, from cache or fetched.
    ///
    /// A provisional id is answered from the cached list only; the server
    /// has never heard of it.
    pub fn get(&self, tracker_id: &TrackerId) -> Result<Option<Tracker>> {
        if tracker_id.is_provisional() {
            return Ok(self
                .cache
                .read(&self.list_key())
                .and_then(CachedValue::into_list)
                .and_then(|list| list.into_iter().find(|t| &t.tracker_id == tracker_id)));
        }

        let key = CacheKey::Detail(tracker_id.clone());
        if let Some(tracker) = self.cache.read(&key).and_then(CachedValue::into_detail) {
            return Ok(Some(tracker));
        }

        let base = self.cache.generation(&key);
        let fetched = self.api.get(tracker_id)?;
        if let Some(tracker) = &fetched {
            self.fill(key, CachedValue::Detail(tracker.clone()), base);
        }
        Ok(fetched)
    }

    /// Store a fetch result unless the entry moved on while it was in flight.
    fn fill(&self, key: CacheKey, value: CachedValue, base: Option<Generation>) {
        if self.cache.write_if(key.clone(), value, base).is_none() {
            debug!(%key, "discarded fetch superseded by a newer write");
        }
    }

    /// Validate `input` and show a provisional tracker in the cached list.
    pub fn begin_create(&self, input: &NewTracker) -> Result<PendingMutation> {
        input.validate()?;

        let provisional = TrackerId::provisional(self.next_provisional.fetch_add(1, Ordering::Relaxed) + 1);
        let placeholder = projection::provisional_tracker(&self.owner, provisional.clone(), input);

        let mut pending = self.pending(MutationKind::Create(provisional));
        pending.project(self.list_key(), |value| {
            value
                .as_list()
                .map(|list| CachedValue::List(projection::append(list, placeholder)))
        });
        pending.invalidate_on_commit(self.list_key());
        pending.start();

        info!(mutation = %pending.id(), kind = ?pending.kind(), "began create");
        Ok(pending)
    }

    /// Validate `patch` and merge it into the cached detail and list entries.
    pub fn begin_update(&self, tracker_id: &TrackerId, patch: &TrackerPatch) -> Result<PendingMutation> {
        patch.validate()?;

        let detail_key = CacheKey::Detail(tracker_id.clone());
        let mut pending = self.pending(MutationKind::Update(tracker_id.clone()));
        pending.project(detail_key.clone(), |value| {
            value
                .as_detail()
                .map(|tracker| CachedValue::Detail(projection::merge(tracker, patch)))
        });
        pending.project(self.list_key(), |value| {
            value
                .as_list()
                .and_then(|list| projection::merge_in_list(list, tracker_id, patch))
                .map(CachedValue::List)
        });
        pending.invalidate_on_commit(detail_key);
        pending.invalidate_on_commit(self.list_key());
        pending.start();

        info!(mutation = %pending.id(), kind = ?pending.kind(), "began update");
        Ok(pending)
    }

    /// Remove the tracker from the cached list.
    pub fn begin_delete(&self, tracker_id: &TrackerId) -> PendingMutation {
        let mut pending = self.pending(MutationKind::Delete(tracker_id.clone()));
        pending.project(self.list_key(), |value| {
            value
                .as_list()
                .and_then(|list| projection::remove_from_list(list, tracker_id))
                .map(CachedValue::List)
        });
        pending.invalidate_on_commit(self.list_key());
        pending.invalidate_on_commit(CacheKey::Detail(tracker_id.clone()));
        pending.start();

        info!(mutation = %pending.id(), kind = ?pending.kind(), "began delete");
        pending
    }

    pub fn create(&self, input: NewTracker) -> Result<Tracker> {
        let mut pending = self.begin_create(&input)?;
        let result = self.api.create(input);
        if let Ok(tracker) = &result {
            pending.invalidate_on_commit(CacheKey::Detail(tracker.tracker_id.clone()));
        }
        pending.resolve(&result);
        result
    }

    /// A missing tracker is [`TrackerError::NotFound`] and rolls back.
    pub fn update(&self, tracker_id: &TrackerId, patch: &TrackerPatch) -> Result<Tracker> {
        let pending = self.begin_update(tracker_id, patch)?;
        let result = self
            .api
            .update(tracker_id, patch)
            .and_then(|found| found.ok_or_else(|| TrackerError::NotFound(tracker_id.clone())));
        pending.resolve(&result);
        result
    }

    /// Whether the tracker existed. Deleting a missing id still commits.
    pub fn delete(&self, tracker_id: &TrackerId) -> Result<bool> {
        let pending = self.begin_delete(tracker_id);
        let result = self.api.delete(tracker_id);
        pending.resolve(&result);
        result
    }

    /// Suggestions are not cached.
    pub fn suggestion(&self, tracker_id: &TrackerId) -> Result<Suggestions> {
        if tracker_id.is_provisional() {
            return Err(TrackerError::NotFound(tracker_id.clone()));
        }
        self.api
            .suggestion(tracker_id)?
            .ok_or_else(|| TrackerError::NotFound(tracker_id.clone()))
    }

    /// Invalidate everything cached for this owner. Returns the entry count.
    pub fn refresh(&self) -> usize {
        self.cache.invalidate_owner(&self.owner)
    }
}
