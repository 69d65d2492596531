//! Detail view of a single result.

use std::sync::Arc;

use cimlens_core::{AnalysisResult, AnalysisView, ResultId, Timestamp, render};
use tracing::debug;

use crate::ApiError;
use crate::store::{Interest, Refresh, ResultStore};

/// Everything the detail screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub id: ResultId,
    pub filename: String,
    pub timestamp: Timestamp,
    pub preview_text: Option<String>,
    pub analysis: AnalysisView,
}

impl From<&AnalysisResult> for Detail {
    fn from(r: &AnalysisResult) -> Self {
        Self {
            id: r.id.clone(),
            filename: r.filename.clone(),
            timestamp: r.timestamp,
            preview_text: r.preview_text.clone().filter(|p| !p.trim().is_empty()),
            analysis: render(r.summary.as_ref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loaded(Box<Detail>),
    NotFound,
    /// The view was left before the record arrived.
    Withdrawn,
}

pub struct DetailView {
    store: Arc<ResultStore>,
}

impl DetailView {
    pub fn new(store: Arc<ResultStore>) -> Self {
        Self { store }
    }

    /// Fetch the current list and look up `id`.
    pub async fn open(&self, id: &ResultId, interest: &Interest) -> Result<DetailState, ApiError> {
        match self.store.refresh_for(interest).await? {
            Refresh::Withdrawn => Ok(DetailState::Withdrawn),
            Refresh::Published(snapshot) => {
                let state = lookup(snapshot.iter(), id);
                debug!(id = %id, found = matches!(state, DetailState::Loaded(_)), "detail opened");
                Ok(state)
            }
        }
    }

    /// Look up `id` in the list already held, without a request.
    pub fn cached(&self, id: &ResultId) -> DetailState {
        lookup(self.store.snapshot().iter(), id)
    }
}

fn lookup<'a>(mut rows: impl Iterator<Item = &'a AnalysisResult>, id: &ResultId) -> DetailState {
    rows.find(|r| &r.id == id)
        .map_or(DetailState::NotFound, |r| DetailState::Loaded(Box::new(Detail::from(r))))
}
