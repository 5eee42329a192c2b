//! Transport boundary between the reconciler and the tracker service.
//!
//! [`TrackerApi`] is what the client side talks to: an owner-scoped session
//! with the six tracker operations. Two implementations ship here:
//!
//! - [`ScopedApi`], calling a [`TrackerServer`] in-process;
//! - [`HttpClient`], speaking the JSON request/response envelopes through a
//!   [`Transport`], with [`dispatch`] as the matching server-side router.
//!
//! [`LoopbackTransport`] wires the two halves together without a network.

mod client;
mod http;
mod server;

pub use client::{
    ClientConfig, HttpClient, IdentityProvider, LoopbackTransport, StaticIdentity, Transport,
    TransportError,
};
pub use http::{
    dispatch, DeleteEnvelope, ErrorEnvelope, Method, Request, Response, SuggestionEnvelope,
    TrackerEnvelope, TrackerListEnvelope,
};
pub use server::{ScopedApi, TrackerServer};

use crate::error::Result;
use crate::hints::Suggestions;
use crate::types::{NewTracker, Tracker, TrackerId, TrackerPatch};
use std::sync::Arc;

/// Tracker operations for one authenticated owner.
///
/// Lookups of ids the owner does not have return `Ok(None)` (or `false` for
/// delete) rather than an error.
pub trait TrackerApi: Send + Sync {
    fn list(&self) -> Result<Vec<Tracker>>;

    fn get(&self, tracker_id: &TrackerId) -> Result<Option<Tracker>>;

    fn create(&self, input: NewTracker) -> Result<Tracker>;

    fn update(&self, tracker_id: &TrackerId, patch: &TrackerPatch) -> Result<Option<Tracker>>;

    /// Whether the tracker existed.
    fn delete(&self, tracker_id: &TrackerId) -> Result<bool>;

    fn suggestion(&self, tracker_id: &TrackerId) -> Result<Option<Suggestions>>;
}

impl<A: TrackerApi + ?Sized> TrackerApi for Arc<A> {
    fn list(&self) -> Result<Vec<Tracker>> {
        (**self).list()
    }

    fn get(&self, tracker_id: &TrackerId) -> Result<Option<Tracker>> {
        (**self).get(tracker_id)
    }

    fn create(&self, input: NewTracker) -> Result<Tracker> {
        (**self).create(input)
    }

    fn update(&self, tracker_id: &TrackerId, patch: &TrackerPatch) -> Result<Option<Tracker>> {
        (**self).update(tracker_id, patch)
    }

    fn delete(&self, tracker_id: &TrackerId) -> Result<bool> {
        (**self).delete(tracker_id)
    }

    fn suggestion(&self, tracker_id: &TrackerId) -> Result<Option<Suggestions>> {
        (**self).suggestion(tracker_id)
    }
}
