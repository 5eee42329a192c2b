//! Tracker record store.
//!
//! [`RecordStore`] maps create/get/list/update/delete onto a
//! [`KvBackend`](crate::backend::KvBackend); updates go through the
//! [`UpdatePlan`] compiler so only the provided fields are written.

mod records;
mod update;

pub use records::RecordStore;
pub use update::{SetClause, UpdatePlan};
