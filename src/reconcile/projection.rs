//! Optimistic projections: what the cache should show before the server answers.

use crate::types::{NewTracker, OwnerId, Timestamp, Tracker, TrackerId, TrackerPatch};

/// Placeholder for a tracker the server has not created yet.
pub fn provisional_tracker(owner: &OwnerId, id: TrackerId, input: &NewTracker) -> Tracker {
    Tracker::from_new(owner.clone(), id, input.clone(), Timestamp::now())
}

pub fn append(list: &[Tracker], tracker: Tracker) -> Vec<Tracker> {
    let mut projected = list.to_vec();
    projected.push(tracker);
    projected
}

pub fn merge(tracker: &Tracker, patch: &TrackerPatch) -> Tracker {
    let mut merged = patch.apply_to(tracker);
    merged.updated_at = Timestamp::after(tracker.updated_at);
    merged
}

/// `None` if the list does not contain the tracker.
pub fn merge_in_list(list: &[Tracker], id: &TrackerId, patch: &TrackerPatch) -> Option<Vec<Tracker>> {
    let index = list.iter().position(|t| &t.tracker_id == id)?;
    let mut projected = list.to_vec();
    projected[index] = merge(&list[index], patch);
    Some(projected)
}

/// `None` if the list does not contain the tracker.
pub fn remove_from_list(list: &[Tracker], id: &TrackerId) -> Option<Vec<Tracker>> {
    if !list.iter().any(|t| &t.tracker_id == id) {
        return None;
    }
    Some(list.iter().filter(|t| &t.tracker_id != id).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, Status};

    fn owner() -> OwnerId {
        OwnerId::from("u")
    }

    fn tracker(id: &str) -> Tracker {
        provisional_tracker(
            &owner(),
            TrackerId::from(id),
            &NewTracker::new(id, Difficulty::Medium, Status::Attempted),
        )
    }

    #[test]
    fn test_append() {
        let list = vec![tracker("a")];
        let projected = append(&list, tracker("b"));
        assert_eq!(projected.len(), 2);
        assert_eq!(projected[1].tracker_id, TrackerId::from("b"));
    }

    #[test]
    fn test_merge_in_list() {
        let list = vec![tracker("a"), tracker("b")];
        let patch = TrackerPatch::default().status(Status::Solved);

        let projected = merge_in_list(&list, &TrackerId::from("b"), &patch).unwrap();
        assert_eq!(projected[0], list[0]);
        assert_eq!(projected[1].status, Status::Solved);
        assert!(projected[1].updated_at > list[1].updated_at);

        assert!(merge_in_list(&list, &TrackerId::from("zzz"), &patch).is_none());
    }

    #[test]
    fn test_remove_from_list() {
        let list = vec![tracker("a"), tracker("b")];
        let projected = remove_from_list(&list, &TrackerId::from("a")).unwrap();
        assert_eq!(projected, vec![list[1].clone()]);
        assert!(remove_from_list(&list, &TrackerId::from("zzz")).is_none());
    }
}
