//! The authoritative in-memory list of result records.
//!
//! `ResultStore` is the only owner of the list. Readers get whole-list
//! snapshots through a watch channel and never observe a half-applied
//! mutation. Writers are the fetch path and the mutation controllers, which
//! call the `apply_*` methods only after the backend has confirmed a write.
//!
//! A fetch replaces the whole list. If a confirmed mutation lands while a
//! fetch is in flight, the fetched rows may predate it, so mutations are
//! journaled for the duration of any fetch and replayed onto its result
//! before publication.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cimlens_core::{
    AnalysisResult, ConfidenceDisplay, Rating, RatingToken, ResultId, Timestamp, card_title,
    sort_recent_first,
};
use tokio::sync::{OwnedMutexGuard, watch};
use tracing::{debug, info};

use crate::ApiError;
use crate::api::Session;

/// An immutable view of the list at one point in time.
pub type Snapshot = Arc<Vec<AnalysisResult>>;

/// A confirmed change to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Rating(ResultId, Rating),
    Confidence(ResultId, f64),
    Deletion(ResultId),
}

impl Mutation {
    pub fn id(&self) -> &ResultId {
        match self {
            Mutation::Rating(id, _) | Mutation::Confidence(id, _) | Mutation::Deletion(id) => id,
        }
    }

    fn touches(&self, list: &[AnalysisResult]) -> bool {
        list.iter().any(|r| &r.id == self.id())
    }

    fn apply_to(&self, list: &mut Vec<AnalysisResult>) {
        match self {
            Mutation::Rating(id, rating) => {
                for r in list.iter_mut().filter(|r| &r.id == id) {
                    r.rating = Some(*rating);
                }
            }
            Mutation::Confidence(id, confidence) => {
                for r in list.iter_mut().filter(|r| &r.id == id) {
                    r.confidence = Some(*confidence);
                }
            }
            Mutation::Deletion(id) => list.retain(|r| &r.id != id),
        }
    }
}

/// Cooperative cancellation for a view waiting on a fetch.
///
/// Clones share one flag. Once withdrawn, late results are not published.
#[derive(Debug, Clone, Default)]
pub struct Interest(Arc<AtomicBool>);

impl Interest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn withdraw(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        !self.0.load(Ordering::Acquire)
    }
}

/// Outcome of [`ResultStore::refresh_for`].
#[derive(Debug, Clone)]
pub enum Refresh {
    Published(Snapshot),
    /// The caller lost interest before the response arrived. The held list
    /// was left as it was.
    Withdrawn,
}

/// Dashboard projection of one record. Derived on every read, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub id: ResultId,
    pub title: String,
    pub filename: String,
    pub timestamp: Timestamp,
    pub rating: Option<RatingToken>,
    pub confidence: ConfidenceDisplay,
}

impl From<&AnalysisResult> for ResultRow {
    fn from(r: &AnalysisResult) -> Self {
        Self {
            id: r.id.clone(),
            title: card_title(r.summary.as_ref(), &r.filename),
            filename: r.filename.clone(),
            timestamp: r.timestamp,
            rating: r.rating_token(),
            confidence: r.confidence_display(),
        }
    }
}

#[derive(Default)]
struct Journal {
    fetches_in_flight: usize,
    next_seq: u64,
    entries: Vec<(u64, Mutation)>,
}

pub struct ResultStore {
    session: Session,
    state: watch::Sender<Snapshot>,
    journal: Mutex<Journal>,
    write_locks: Mutex<HashMap<ResultId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResultStore {
    pub fn new(session: Session) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            session,
            state,
            journal: Mutex::new(Journal::default()),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ── Readers ──

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn get(&self, id: &ResultId) -> Option<AnalysisResult> {
        self.state.borrow().iter().find(|r| &r.id == id).cloned()
    }

    pub fn rows(&self) -> Vec<ResultRow> {
        self.snapshot().iter().map(ResultRow::from).collect()
    }

    // ── Fetch ──

    /// Fetch, sort and publish the full list.
    pub async fn fetch_all(&self) -> Result<Snapshot, ApiError> {
        match self.refresh_for(&Interest::new()).await? {
            Refresh::Published(snapshot) => Ok(snapshot),
            Refresh::Withdrawn => Ok(self.snapshot()),
        }
    }

    /// Like [`fetch_all`](Self::fetch_all), but drops the response if
    /// `interest` was withdrawn while the request was in flight.
    pub async fn refresh_for(&self, interest: &Interest) -> Result<Refresh, ApiError> {
        let in_flight = InFlightFetch::begin(self);
        let fetched = self.session.list_results().await;

        let mut list = fetched?;
        if !interest.is_active() {
            debug!("fetch completed after interest was withdrawn");
            return Ok(Refresh::Withdrawn);
        }
        sort_recent_first(&mut list);

        let journal = self.lock_journal();
        let mut replayed = 0usize;
        for (_, mutation) in journal.entries.iter().filter(|(seq, _)| *seq >= in_flight.start_seq) {
            mutation.apply_to(&mut list);
            replayed += 1;
        }
        let snapshot = Arc::new(list);
        self.state.send_replace(snapshot.clone());
        drop(journal);

        info!(count = snapshot.len(), replayed, "results refreshed");
        Ok(Refresh::Published(snapshot))
    }

    // ── Confirmed mutations ──

    /// Set a record's rating. Returns whether a held record matched.
    pub fn apply_rating_update(&self, id: &ResultId, rating: Rating) -> bool {
        self.apply(Mutation::Rating(id.clone(), rating))
    }

    /// Set a record's confidence fraction. Returns whether a held record matched.
    pub fn apply_confidence_update(&self, id: &ResultId, confidence: f64) -> bool {
        self.apply(Mutation::Confidence(id.clone(), confidence))
    }

    /// Remove a record. Returns whether a held record matched.
    pub fn apply_deletion(&self, id: &ResultId) -> bool {
        self.apply(Mutation::Deletion(id.clone()))
    }

    fn apply(&self, mutation: Mutation) -> bool {
        let mut journal = self.lock_journal();
        let matched = self.state.send_if_modified(|snapshot| {
            if !mutation.touches(snapshot.as_slice()) {
                return false;
            }
            mutation.apply_to(Arc::make_mut(snapshot));
            true
        });
        if journal.fetches_in_flight > 0 {
            let seq = journal.next_seq;
            journal.next_seq += 1;
            journal.entries.push((seq, mutation));
        }
        matched
    }

    /// Serialize writes to one record. Held by a controller across the
    /// backend request and the local apply.
    pub async fn lock_record(&self, id: &ResultId) -> RecordWrite<'_> {
        let lock = self.lock_write_locks().entry(id.clone()).or_default().clone();
        RecordWrite {
            store: self,
            id: id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn lock_write_locks(&self) -> MutexGuard<'_, HashMap<ResultId, Arc<tokio::sync::Mutex<()>>>> {
        self.write_locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn write_lock_count(&self) -> usize {
        self.lock_write_locks().len()
    }

    fn lock_journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive write access to one record, from [`ResultStore::lock_record`].
///
/// The per-id lock entry is removed on release once no other writer holds or
/// awaits it.
pub struct RecordWrite<'a> {
    store: &'a ResultStore,
    id: ResultId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RecordWrite<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Clones are only taken under the map lock, so a count of one means
        // nobody is waiting.
        let mut locks = self.store.lock_write_locks();
        if let Some(lock) = locks.get(&self.id)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(&self.id);
        }
    }
}

/// Marks a fetch as in flight for the journal; cleared on drop so a
/// cancelled fetch future does not pin the journal.
struct InFlightFetch<'a> {
    store: &'a ResultStore,
    start_seq: u64,
}

impl<'a> InFlightFetch<'a> {
    fn begin(store: &'a ResultStore) -> Self {
        let mut journal = store.lock_journal();
        journal.fetches_in_flight += 1;
        let start_seq = journal.next_seq;
        Self { store, start_seq }
    }
}

impl Drop for InFlightFetch<'_> {
    fn drop(&mut self) {
        let mut journal = self.store.lock_journal();
        journal.fetches_in_flight -= 1;
        if journal.fetches_in_flight == 0 {
            journal.entries.clear();
        }
    }
}
