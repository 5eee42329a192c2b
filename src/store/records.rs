//! Tracker operations over a composite-key backend.

use super::update::UpdatePlan;
use crate::backend::{CompositeKey, Item, KvBackend};
use crate::error::{Result, StoreError, TrackerError};
use crate::types::{NewTracker, OwnerId, Timestamp, Tracker, TrackerId, TrackerPatch};
use tracing::debug;

/// Translates tracker operations into backend calls.
///
/// Every operation is scoped to one owner's partition; there is no way to
/// reach another owner's trackers through this type. Backend failures are
/// reported as [`TrackerError::StoreUnavailable`] and never retried here.
pub struct RecordStore<B> {
    backend: B,
}

impl<B: KvBackend> RecordStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validate, assign an id and timestamps, and write the new tracker.
    pub fn create(&self, owner: &OwnerId, input: NewTracker) -> Result<Tracker> {
        input.validate()?;

        let tracker = Tracker::from_new(owner.clone(), TrackerId::generate(), input, Timestamp::now());
        let key = CompositeKey::tracker(owner, &tracker.tracker_id);

        // UUID ids cannot collide, so the write is unconditional.
        self.backend.put(&key, to_item(&tracker)?)?;
        debug!(owner = %owner, tracker_id = %tracker.tracker_id, "created tracker");
        Ok(tracker)
    }

    /// `None` when the owner has no tracker with this id.
    pub fn get(&self, owner: &OwnerId, tracker_id: &TrackerId) -> Result<Option<Tracker>> {
        let key = CompositeKey::tracker(owner, tracker_id);
        self.backend.get(&key)?.map(from_item).transpose()
    }

    /// Every tracker in the owner's partition, in no particular order.
    pub fn list(&self, owner: &OwnerId) -> Result<Vec<Tracker>> {
        let partition = CompositeKey::owner_partition(owner);
        self.backend
            .query(&partition)?
            .into_iter()
            .map(from_item)
            .collect()
    }

    /// Apply `patch` to an existing tracker. `None` when it does not exist.
    pub fn update(
        &self,
        owner: &OwnerId,
        tracker_id: &TrackerId,
        patch: &TrackerPatch,
    ) -> Result<Option<Tracker>> {
        patch.validate()?;

        let Some(prior) = self.get(owner, tracker_id)? else {
            return Ok(None);
        };

        let plan = UpdatePlan::compile(&prior, patch, Timestamp::now())?;
        let assignments = plan.assignments()?;

        // The item may have been deleted since it was read.
        let updated = self
            .backend
            .update(&plan.key, &assignments)?
            .map(from_item)
            .transpose()?;

        debug!(
            owner = %owner,
            tracker_id = %tracker_id,
            fields = ?plan.fields(),
            found = updated.is_some(),
            "updated tracker"
        );
        Ok(updated)
    }

    /// Remove a tracker. Succeeds either way; returns whether it existed.
    pub fn delete(&self, owner: &OwnerId, tracker_id: &TrackerId) -> Result<bool> {
        let key = CompositeKey::tracker(owner, tracker_id);
        let existed = self.backend.delete(&key)?.is_some();
        debug!(owner = %owner, tracker_id = %tracker_id, existed, "deleted tracker");
        Ok(existed)
    }

    /// Like [`get`](Self::get), but a missing tracker is an error.
    pub fn require(&self, owner: &OwnerId, tracker_id: &TrackerId) -> Result<Tracker> {
        self.get(owner, tracker_id)?
            .ok_or_else(|| TrackerError::NotFound(tracker_id.clone()))
    }
}

fn to_item(tracker: &Tracker) -> Result<Item> {
    match serde_json::to_value(tracker).map_err(StoreError::from)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::Serialization("tracker did not encode as an object".into()).into()),
    }
}

fn from_item(item: Item) -> Result<Tracker> {
    serde_json::from_value(serde_json::Value::Object(item))
        .map_err(|e| StoreError::Deserialization(e.to_string()).into())
}
