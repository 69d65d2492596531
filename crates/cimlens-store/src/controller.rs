//! Write-through mutation controllers.
//!
//! Each operation converts the user-facing value, issues exactly one backend
//! request, and touches the store only after the backend confirms. A failed
//! request leaves the store as it was and comes back as a [`MutationError`]
//! whose display text is the user notice. Nothing is retried automatically;
//! the backend writes are idempotent, so a user retry is always safe.

use std::sync::Arc;

use cimlens_core::{Rating, RatingToken, ResultId, percent_to_confidence, token_to_rating};
use tracing::{info, warn};

use crate::api::{UploadFile, UploadReceipt};
use crate::store::ResultStore;
use crate::{Action, MutationError};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this CIM analysis?";

/// Thumbs up/down on a result.
pub struct RatingController {
    store: Arc<ResultStore>,
}

impl RatingController {
    pub fn new(store: Arc<ResultStore>) -> Self {
        Self { store }
    }

    /// Store `token` for `id`. Returns the stored 1-5 value.
    pub async fn set(&self, id: &ResultId, token: RatingToken) -> Result<Rating, MutationError> {
        let rating = token_to_rating(token);
        let _write = self.store.lock_record(id).await;

        if let Err(e) = self.store.session().set_rating(id, rating).await {
            warn!(id = %id, error = %e, "rating update failed");
            return Err(MutationError::new(Action::Rating, e));
        }
        self.store.apply_rating_update(id, rating);
        info!(id = %id, rating = rating.get(), "rating updated");
        Ok(rating)
    }
}

/// Confidence slider on a result.
pub struct ConfidenceController {
    store: Arc<ResultStore>,
}

impl ConfidenceController {
    pub fn new(store: Arc<ResultStore>) -> Self {
        Self { store }
    }

    /// Store `percent` for `id`, clamped to 0..=100. Returns the stored
    /// fraction.
    pub async fn set(&self, id: &ResultId, percent: i64) -> Result<f64, MutationError> {
        let confidence = percent_to_confidence(percent);
        let _write = self.store.lock_record(id).await;

        if let Err(e) = self.store.session().set_confidence(id, confidence).await {
            warn!(id = %id, error = %e, "confidence update failed");
            return Err(MutationError::new(Action::Confidence, e));
        }
        self.store.apply_confidence_update(id, confidence);
        info!(id = %id, confidence, "confidence updated");
        Ok(confidence)
    }
}

/// Asks the user before an irreversible action.
pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirmation for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user declined; no request was made.
    Cancelled,
    Deleted,
}

pub struct DeleteController {
    store: Arc<ResultStore>,
}

impl DeleteController {
    pub fn new(store: Arc<ResultStore>) -> Self {
        Self { store }
    }

    pub async fn delete(
        &self,
        id: &ResultId,
        confirmation: &dyn Confirmation,
    ) -> Result<DeleteOutcome, MutationError> {
        if !confirmation.confirm(DELETE_PROMPT) {
            return Ok(DeleteOutcome::Cancelled);
        }
        let _write = self.store.lock_record(id).await;

        if let Err(e) = self.store.session().delete_result(id).await {
            warn!(id = %id, error = %e, "delete failed");
            return Err(MutationError::new(Action::Delete, e));
        }
        self.store.apply_deletion(id);
        info!(id = %id, "result deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

/// Document upload. A confirmed upload refreshes the list so the new record
/// appears.
pub struct UploadController {
    store: Arc<ResultStore>,
}

impl UploadController {
    pub fn new(store: Arc<ResultStore>) -> Self {
        Self { store }
    }

    pub async fn upload(&self, file: UploadFile) -> Result<UploadReceipt, MutationError> {
        let name = file.file_name().to_string();
        let receipt = self
            .store
            .session()
            .upload(file)
            .await
            .map_err(|e| {
                warn!(file = %name, error = %e, "upload failed");
                MutationError::new(Action::Upload, e)
            })?;
        info!(file = %receipt.filename, "upload accepted");

        // The upload itself succeeded; a failed refresh only delays the row.
        if let Err(e) = self.store.fetch_all().await {
            warn!(error = %e, "refresh after upload failed");
        }
        Ok(receipt)
    }
}
