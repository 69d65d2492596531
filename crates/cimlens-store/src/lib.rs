//! Client-side result state: the held result list, write-through mutation
//! controllers, the detail view, and the backend seam they share.

pub mod api;
pub mod controller;
pub mod detail;
mod error;
pub mod store;

#[cfg(test)]
mod fake;

pub use api::{ResultsApi, Session, StaticToken, TokenProvider, UploadFile, UploadReceipt};
pub use controller::{
    ConfidenceController, Confirmation, DeleteController, DeleteOutcome, RatingController,
    UploadController,
};
pub use detail::{Detail, DetailState, DetailView};
pub use error::{Action, ApiError, MutationError, SESSION_NOTICE};
pub use store::{Interest, Mutation, RecordWrite, Refresh, ResultRow, ResultStore, Snapshot};
