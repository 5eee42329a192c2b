//! Request routing and JSON envelopes.

use super::server::TrackerServer;
use crate::backend::KvBackend;
use crate::error::{FieldError, TrackerError};
use crate::hints::{HintGenerator, Suggestions};
use crate::types::{NewTracker, OwnerId, Tracker, TrackerId, TrackerPatch};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Bearer token from the `Authorization` header.
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(e) => {
                error!(error = %e, "failed to encode response body");
                Self::error(500, "Internal server error")
            }
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorEnvelope {
                message: message.into(),
                errors: Vec::new(),
            },
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.body)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerEnvelope {
    pub message: String,
    pub tracker: Tracker,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerListEnvelope {
    pub message: String,
    pub trackers: Vec<Tracker>,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEnvelope {
    pub message: String,
    pub tracker_id: TrackerId,
    /// `false` when the id was already gone; the delete still succeeds.
    #[serde(default = "existed_default")]
    pub existed: bool,
}

fn existed_default() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionEnvelope {
    pub message: String,
    pub tracker_id: TrackerId,
    pub problem: String,
    pub suggestions: Suggestions,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

enum Route {
    Collection,
    Item(TrackerId),
    Suggestion(TrackerId),
}

enum RouteError {
    Unknown,
    MissingId,
}

fn route(path: &str) -> std::result::Result<Route, RouteError> {
    let path = path.split('?').next().unwrap_or_default();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let id = |raw: &str| {
        if raw.is_empty() {
            Err(RouteError::MissingId)
        } else {
            Ok(TrackerId(raw.to_string()))
        }
    };

    match segments.as_slice() {
        ["trackers"] => Ok(Route::Collection),
        ["trackers", raw] => id(*raw).map(Route::Item),
        ["trackers", raw, "suggestion"] => id(*raw).map(Route::Suggestion),
        _ => Err(RouteError::Unknown),
    }
}

/// Route one request for an authenticated `owner`.
///
/// `owner` is `None` when the caller's identity could not be established.
/// Every outcome, failures included, is a response; this never panics on
/// bad input.
pub fn dispatch<B, G>(server: &TrackerServer<B, G>, owner: Option<&OwnerId>, request: &Request) -> Response
where
    B: KvBackend,
    G: HintGenerator,
{
    let route = match route(&request.path) {
        Ok(route) => route,
        Err(RouteError::Unknown) => return Response::error(404, "Not found"),
        Err(RouteError::MissingId) => return Response::error(400, "Missing tracker ID in path"),
    };

    let Some(owner) = owner else {
        warn!(method = %request.method, path = %request.path, "request without identity");
        return Response::error(401, "Unauthorized - No user ID found");
    };

    debug!(method = %request.method, path = %request.path, owner = %owner, "dispatching");

    let store = server.store();
    let result = match (request.method, route) {
        (Method::Get, Route::Collection) => store.list(owner).map(|trackers| {
            Response::json(
                200,
                &TrackerListEnvelope {
                    message: "Trackers retrieved successfully".into(),
                    count: trackers.len(),
                    trackers,
                },
            )
        }),
        (Method::Post, Route::Collection) => match body::<NewTracker>(request) {
            Ok(input) => store.create(owner, input).map(|tracker| {
                Response::json(
                    201,
                    &TrackerEnvelope {
                        message: "Tracker created successfully".into(),
                        tracker,
                    },
                )
            }),
            Err(response) => Ok(response),
        },
        (Method::Get, Route::Item(id)) => store.get(owner, &id).map(|found| match found {
            Some(tracker) => Response::json(
                200,
                &TrackerEnvelope {
                    message: "Tracker retrieved successfully".into(),
                    tracker,
                },
            ),
            None => Response::error(404, "Tracker not found"),
        }),
        (Method::Put, Route::Item(id)) => match body::<TrackerPatch>(request) {
            Ok(patch) => store.update(owner, &id, &patch).map(|found| match found {
                Some(tracker) => Response::json(
                    200,
                    &TrackerEnvelope {
                        message: "Tracker updated successfully".into(),
                        tracker,
                    },
                ),
                None => Response::error(404, "Tracker not found"),
            }),
            Err(response) => Ok(response),
        },
        (Method::Delete, Route::Item(id)) => store.delete(owner, &id).map(|existed| {
            Response::json(
                200,
                &DeleteEnvelope {
                    message: "Tracker deleted successfully".into(),
                    tracker_id: id,
                    existed,
                },
            )
        }),
        (Method::Get, Route::Suggestion(id)) => server.suggestion(owner, &id).map(|found| match found {
            Some((tracker, suggestions)) => Response::json(
                200,
                &SuggestionEnvelope {
                    message: "Suggestions generated successfully".into(),
                    tracker_id: tracker.tracker_id,
                    problem: tracker.problem,
                    suggestions,
                },
            ),
            None => Response::error(404, "Tracker not found"),
        }),
        _ => Ok(Response::error(405, "Method not allowed")),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

fn body<T: DeserializeOwned>(request: &Request) -> std::result::Result<T, Response> {
    let Some(body) = &request.body else {
        return Err(Response::error(400, "Request body is required"));
    };
    T::deserialize(body).map_err(|e| {
        Response::json(
            400,
            &ErrorEnvelope {
                message: "Invalid request body".into(),
                errors: vec![FieldError {
                    path: "body".into(),
                    message: e.to_string(),
                }],
            },
        )
    })
}

fn error_response(e: &TrackerError) -> Response {
    match e {
        TrackerError::Validation(errors) => Response::json(
            400,
            &ErrorEnvelope {
                message: "Validation failed".into(),
                errors: errors.fields().to_vec(),
            },
        ),
        TrackerError::NotFound(_) => Response::error(404, "Tracker not found"),
        TrackerError::Unauthorized => Response::error(401, "Unauthorized - No user ID found"),
        TrackerError::StoreUnavailable(reason) => {
            warn!(%reason, "store unavailable");
            Response::error(503, "Service unavailable")
        }
        TrackerError::Transport { .. } | TrackerError::Timeout => {
            error!(error = %e, "request failed");
            Response::error(500, "Internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::hints::{HintConfig, HintService, NoopGenerator};
    use crate::store::RecordStore;
    use serde_json::json;

    fn server() -> TrackerServer<MemoryBackend, NoopGenerator> {
        TrackerServer::new(
            RecordStore::new(MemoryBackend::new()),
            HintService::new(NoopGenerator, HintConfig::default()),
        )
    }

    fn owner() -> OwnerId {
        OwnerId::from("alice")
    }

    fn create(server: &TrackerServer<MemoryBackend, NoopGenerator>) -> Tracker {
        let response = dispatch(
            server,
            Some(&owner()),
            &Request::post(
                "/trackers",
                json!({"problem": "Two Sum", "difficulty": "Easy", "status": "Attempted"}),
            ),
        );
        assert_eq!(response.status, 201);
        response.decode::<TrackerEnvelope>().unwrap().tracker
    }

    #[test]
    fn test_create_and_list() {
        let server = server();
        let created = create(&server);
        assert_eq!(created.attempts, 0);
        assert_eq!(created.time_spent, 0.0);

        let response = dispatch(&server, Some(&owner()), &Request::get("/trackers"));
        assert_eq!(response.status, 200);
        let list: TrackerListEnvelope = response.decode().unwrap();
        assert_eq!(list.count, 1);
        assert_eq!(list.trackers[0].tracker_id, created.tracker_id);
    }

    #[test]
    fn test_missing_identity() {
        let server = server();
        let response = dispatch(&server, None, &Request::get("/trackers"));
        assert_eq!(response.status, 401);
    }

    #[test]
    fn test_unknown_route_and_method() {
        let server = server();
        assert_eq!(dispatch(&server, Some(&owner()), &Request::get("/nope")).status, 404);
        assert_eq!(dispatch(&server, Some(&owner()), &Request::delete("/trackers")).status, 405);
        assert_eq!(
            dispatch(&server, Some(&owner()), &Request::get("/trackers//suggestion")).status,
            400
        );
    }

    #[test]
    fn test_validation_errors_listed() {
        let server = server();
        let response = dispatch(
            &server,
            Some(&owner()),
            &Request::post(
                "/trackers",
                json!({"problem": "", "difficulty": "Easy", "status": "Solved", "attempts": -1}),
            ),
        );
        assert_eq!(response.status, 400);
        let envelope: ErrorEnvelope = response.decode().unwrap();
        let paths: Vec<_> = envelope.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["problem", "attempts"]);
    }

    #[test]
    fn test_malformed_body() {
        let server = server();
        let response = dispatch(
            &server,
            Some(&owner()),
            &Request::post("/trackers", json!({"difficulty": "Impossible"})),
        );
        assert_eq!(response.status, 400);
        assert_eq!(
            dispatch(&server, Some(&owner()), &Request::new(Method::Post, "/trackers")).status,
            400
        );
    }

    #[test]
    fn test_update_get_delete() {
        let server = server();
        let created = create(&server);
        let path = format!("/trackers/{}", created.tracker_id);

        let response = dispatch(&server, Some(&owner()), &Request::put(&path, json!({"status": "Solved"})));
        assert_eq!(response.status, 200);
        let updated = response.decode::<TrackerEnvelope>().unwrap().tracker;
        assert_eq!(updated.problem, "Two Sum");

        let response = dispatch(&server, Some(&owner()), &Request::get(&path));
        assert_eq!(response.decode::<TrackerEnvelope>().unwrap().tracker, updated);

        let response = dispatch(&server, Some(&owner()), &Request::delete(&path));
        assert_eq!(response.status, 200);
        assert!(response.decode::<DeleteEnvelope>().unwrap().existed);

        let response = dispatch(&server, Some(&owner()), &Request::delete(&path));
        assert_eq!(response.status, 200);
        assert!(!response.decode::<DeleteEnvelope>().unwrap().existed);

        assert_eq!(dispatch(&server, Some(&owner()), &Request::get(&path)).status, 404);
        assert_eq!(
            dispatch(&server, Some(&owner()), &Request::put(&path, json!({"notes": "x"}))).status,
            404
        );
    }

    #[test]
    fn test_other_owner_sees_not_found() {
        let server = server();
        let created = create(&server);
        let response = dispatch(
            &server,
            Some(&OwnerId::from("mallory")),
            &Request::get(format!("/trackers/{}", created.tracker_id)),
        );
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_suggestion_route() {
        let server = server();
        let created = create(&server);
        let response = dispatch(
            &server,
            Some(&owner()),
            &Request::get(format!("/trackers/{}/suggestion", created.tracker_id)),
        );
        assert_eq!(response.status, 200);
        let envelope: SuggestionEnvelope = response.decode().unwrap();
        assert_eq!(envelope.problem, "Two Sum");
        assert_eq!(envelope.suggestions, Suggestions::fallback());
    }

    #[test]
    fn test_store_outage_is_503() {
        let server = server();
        server.store().backend().set_offline(true);
        assert_eq!(dispatch(&server, Some(&owner()), &Request::get("/trackers")).status, 503);
    }
}
