//! # Tracker Sync
//!
//! Storage and client-side synchronization for a personal problem tracker:
//! each user records the coding problems they work on, with difficulty,
//! status, attempts, time spent and notes.
//!
//! ## Core Concepts
//!
//! - **Record store**: CRUD over an owner-partitioned composite-key backend
//! - **Update compiler**: partial updates that touch only provided fields
//! - **Mutation cache**: generation-stamped client cache with invalidation
//! - **Reconciler**: optimistic writes with generation-checked rollback
//! - **Views**: progress stats and filtering over the reconciled list
//! - **Hints**: AI suggestions with a fixed fallback
//!
//! ## Example
//!
//! ```ignore
//! use tracker_sync::{
//!     HintConfig, HintService, MemoryBackend, MutationCache, NoopGenerator, NewTracker,
//!     Reconciler, RecordStore, TrackerServer,
//! };
//!
//! let server = Arc::new(TrackerServer::new(
//!     RecordStore::new(MemoryBackend::new()),
//!     HintService::new(NoopGenerator, HintConfig::default()),
//! ));
//! let owner = OwnerId::from("user-1");
//! let reconciler = Reconciler::new(server.scoped(owner.clone()), Arc::new(MutationCache::default()), owner);
//!
//! // Shows up in the cached list immediately, committed when the store answers
//! let tracker = reconciler.create(NewTracker::new("Two Sum", Difficulty::Easy, Status::Attempted))?;
//!
//! // Only the status column is written
//! reconciler.update(&tracker.tracker_id, &TrackerPatch::default().status(Status::Solved))?;
//! ```

pub mod api;
pub mod backend;
pub mod cache;
pub mod error;
pub mod hints;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod types;

// Re-exports
pub use api::{
    dispatch, ClientConfig, HttpClient, IdentityProvider, LoopbackTransport, Method, Request, Response,
    ScopedApi, StaticIdentity, TrackerApi, TrackerServer, Transport, TransportError,
};
pub use backend::{
    Assignment, CompositeKey, Item, JournalBackend, JournalConfig, KvBackend, MemoryBackend,
};
pub use cache::{
    CacheConfig, CacheEvent, CacheKey, CacheSubscription, CachedValue, EntrySnapshot, Generation,
    MutationCache, SubscriptionId,
};
pub use error::{FieldError, Result, StoreError, StoreResult, TrackerError, ValidationErrors};
pub use hints::{
    CompletionRequest, HintConfig, HintContext, HintError, HintGenerator, HintService, NoopGenerator,
    Suggestions,
};
pub use reconcile::{
    rollback_decision, DifficultyCounts, MutationId, MutationKind, MutationState, Outcome, PendingMutation,
    Reconciler, RollbackDecision, SettleReport, TrackerFilter, TrackerStats,
};
pub use store::{RecordStore, SetClause, UpdatePlan};
pub use types::*;
