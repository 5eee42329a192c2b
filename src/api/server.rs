//! In-process tracker service.

use super::TrackerApi;
use crate::backend::KvBackend;
use crate::error::Result;
use crate::hints::{HintContext, HintGenerator, HintService, Suggestions};
use crate::store::RecordStore;
use crate::types::{NewTracker, OwnerId, Tracker, TrackerId, TrackerPatch};
use std::sync::Arc;

/// Record store plus hint service: everything the route handlers need.
pub struct TrackerServer<B, G> {
    store: RecordStore<B>,
    hints: HintService<G>,
}

impl<B: KvBackend, G: HintGenerator> TrackerServer<B, G> {
    pub fn new(store: RecordStore<B>, hints: HintService<G>) -> Self {
        Self { store, hints }
    }

    pub fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    /// Look the tracker up and generate suggestions for it.
    ///
    /// `None` when the owner has no such tracker. Generation failures fall
    /// back inside the hint service, so only store errors surface.
    pub fn suggestion(&self, owner: &OwnerId, tracker_id: &TrackerId) -> Result<Option<(Tracker, Suggestions)>> {
        let Some(tracker) = self.store.get(owner, tracker_id)? else {
            return Ok(None);
        };
        let suggestions = self.hints.suggest(&HintContext::from(&tracker));
        Ok(Some((tracker, suggestions)))
    }

    /// A [`TrackerApi`] session bound to `owner`.
    pub fn scoped(self: &Arc<Self>, owner: OwnerId) -> ScopedApi<B, G> {
        ScopedApi {
            server: Arc::clone(self),
            owner,
        }
    }
}

/// [`TrackerApi`] over a shared server, fixed to one owner.
pub struct ScopedApi<B, G> {
    server: Arc<TrackerServer<B, G>>,
    owner: OwnerId,
}

impl<B, G> ScopedApi<B, G> {
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}

impl<B: KvBackend, G: HintGenerator> TrackerApi for ScopedApi<B, G> {
    fn list(&self) -> Result<Vec<Tracker>> {
        self.server.store.list(&self.owner)
    }

    fn get(&self, tracker_id: &TrackerId) -> Result<Option<Tracker>> {
        self.server.store.get(&self.owner, tracker_id)
    }

    fn create(&self, input: NewTracker) -> Result<Tracker> {
        self.server.store.create(&self.owner, input)
    }

    fn update(&self, tracker_id: &TrackerId, patch: &TrackerPatch) -> Result<Option<Tracker>> {
        self.server.store.update(&self.owner, tracker_id, patch)
    }

    fn delete(&self, tracker_id: &TrackerId) -> Result<bool> {
        self.server.store.delete(&self.owner, tracker_id)
    }

    fn suggestion(&self, tracker_id: &TrackerId) -> Result<Option<Suggestions>> {
        Ok(self
            .server
            .suggestion(&self.owner, tracker_id)?
            .map(|(_, suggestions)| suggestions))
    }
}
