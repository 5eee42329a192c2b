//! Client half of the transport boundary.

use super::http::{
    dispatch, DeleteEnvelope, ErrorEnvelope, Request, Response, SuggestionEnvelope, TrackerEnvelope,
    TrackerListEnvelope,
};
use super::server::TrackerServer;
use super::TrackerApi;
use crate::backend::KvBackend;
use crate::error::{Result, TrackerError, ValidationErrors};
use crate::hints::{HintGenerator, Suggestions};
use crate::types::{NewTracker, OwnerId, Tracker, TrackerId, TrackerPatch};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Prefix for every route, e.g. `/prod`.
    pub base_path: String,

    /// Per-request deadline handed to the transport.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The deadline passed. The server may or may not have acted.
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Carries one request to the service and its response back.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request, timeout: Duration) -> std::result::Result<Response, TransportError>;
}

/// Resolves a bearer token to the owner it was issued for.
pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, bearer: &str) -> Option<OwnerId>;
}

/// Fixed token table.
#[derive(Default)]
pub struct StaticIdentity {
    tokens: RwLock<HashMap<String, OwnerId>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: impl Into<String>, owner: OwnerId) {
        self.tokens.write().insert(token.into(), owner);
    }

    pub fn revoke(&self, token: &str) {
        self.tokens.write().remove(token);
    }
}

impl IdentityProvider for StaticIdentity {
    fn authenticate(&self, bearer: &str) -> Option<OwnerId> {
        self.tokens.read().get(bearer).cloned()
    }
}

/// In-process transport: authenticates and dispatches straight to a server.
///
/// Faults can be injected to exercise client error paths. A timed-out
/// request is still dispatched, only its response is lost.
pub struct LoopbackTransport<B, G, I> {
    server: Arc<TrackerServer<B, G>>,
    identity: I,
    unreachable: AtomicBool,
    pending_timeouts: AtomicUsize,
}

impl<B, G, I> LoopbackTransport<B, G, I> {
    pub fn new(server: Arc<TrackerServer<B, G>>, identity: I) -> Self {
        Self {
            server,
            identity,
            unreachable: AtomicBool::new(false),
            pending_timeouts: AtomicUsize::new(0),
        }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Lose the responses of the next `n` requests.
    pub fn time_out_next(&self, n: usize) {
        self.pending_timeouts.store(n, Ordering::SeqCst);
    }

    fn take_timeout(&self) -> bool {
        self.pending_timeouts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<B, G, I> Transport for LoopbackTransport<B, G, I>
where
    B: KvBackend,
    G: HintGenerator,
    I: IdentityProvider,
{
    fn send(&self, request: Request, _timeout: Duration) -> std::result::Result<Response, TransportError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("loopback unreachable".into()));
        }

        let owner = request
            .bearer
            .as_deref()
            .and_then(|token| self.identity.authenticate(token));
        let response = dispatch(self.server.as_ref(), owner.as_ref(), &request);

        if self.take_timeout() {
            return Err(TransportError::Timeout);
        }
        Ok(response)
    }
}

/// [`TrackerApi`] over a [`Transport`], attaching the bearer to every call.
pub struct HttpClient<T> {
    transport: T,
    config: ClientConfig,
    bearer: RwLock<Option<String>>,
}

impl<T: Transport> HttpClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            bearer: RwLock::new(None),
        }
    }

    pub fn with_bearer(self, token: impl Into<String>) -> Self {
        self.set_bearer(Some(token.into()));
        self
    }

    /// Replace the token used from the next request on.
    pub fn set_bearer(&self, token: Option<String>) {
        *self.bearer.write() = token;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_path.trim_end_matches('/'), path)
    }

    fn send(&self, mut request: Request) -> Result<Response> {
        request.path = self.url(&request.path);
        if let Some(token) = self.bearer.read().clone() {
            request.bearer = Some(token);
        }

        debug!(method = %request.method, path = %request.path, "sending request");
        self.transport
            .send(request, self.config.timeout)
            .map_err(|e| match e {
                TransportError::Timeout => TrackerError::Timeout,
                TransportError::Connection(message) => TrackerError::Transport { status: 0, message },
            })
    }

    /// Decode a successful response, or map the failure status.
    fn decode_ok<R: DeserializeOwned>(&self, response: Response) -> Result<R> {
        if !response.is_success() {
            return Err(status_error(&response));
        }
        response.decode().map_err(|e| TrackerError::Transport {
            status: response.status,
            message: format!("malformed response body: {e}"),
        })
    }

    /// Like [`decode_ok`](Self::decode_ok), with 404 as `None`.
    fn decode_found<R: DeserializeOwned>(&self, response: Response) -> Result<Option<R>> {
        if response.status == 404 {
            return Ok(None);
        }
        self.decode_ok(response).map(Some)
    }
}

fn status_error(response: &Response) -> TrackerError {
    let envelope = response.decode::<ErrorEnvelope>().ok();
    let message = envelope
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| format!("HTTP {}", response.status));

    match response.status {
        401 | 403 => TrackerError::Unauthorized,
        400..=499 => match envelope {
            Some(envelope) if !envelope.errors.is_empty() => {
                TrackerError::Validation(ValidationErrors(envelope.errors))
            }
            _ => TrackerError::Transport {
                status: response.status,
                message,
            },
        },
        status => {
            warn!(status, %message, "request failed");
            TrackerError::Transport { status, message }
        }
    }
}

fn encode<S: serde::Serialize>(value: &S) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| TrackerError::Transport {
        status: 0,
        message: format!("failed to encode request body: {e}"),
    })
}

fn tracker_path(tracker_id: &TrackerId) -> String {
    format!("/trackers/{tracker_id}")
}

impl<T: Transport> TrackerApi for HttpClient<T> {
    fn list(&self) -> Result<Vec<Tracker>> {
        let response = self.send(Request::get("/trackers"))?;
        self.decode_ok::<TrackerListEnvelope>(response).map(|e| e.trackers)
    }

    fn get(&self, tracker_id: &TrackerId) -> Result<Option<Tracker>> {
        let response = self.send(Request::get(tracker_path(tracker_id)))?;
        Ok(self.decode_found::<TrackerEnvelope>(response)?.map(|e| e.tracker))
    }

    fn create(&self, input: NewTracker) -> Result<Tracker> {
        let response = self.send(Request::post("/trackers", encode(&input)?))?;
        self.decode_ok::<TrackerEnvelope>(response).map(|e| e.tracker)
    }

    fn update(&self, tracker_id: &TrackerId, patch: &TrackerPatch) -> Result<Option<Tracker>> {
        let response = self.send(Request::put(tracker_path(tracker_id), encode(patch)?))?;
        Ok(self.decode_found::<TrackerEnvelope>(response)?.map(|e| e.tracker))
    }

    fn delete(&self, tracker_id: &TrackerId) -> Result<bool> {
        let response = self.send(Request::delete(tracker_path(tracker_id)))?;
        self.decode_ok::<DeleteEnvelope>(response).map(|e| e.existed)
    }

    fn suggestion(&self, tracker_id: &TrackerId) -> Result<Option<Suggestions>> {
        let path = format!("{}/suggestion", tracker_path(tracker_id));
        let response = self.send(Request::get(path))?;
        Ok(self
            .decode_found::<SuggestionEnvelope>(response)?
            .map(|e| e.suggestions))
    }
}
