//! In-memory `ResultsApi` for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cimlens_core::{AnalysisResult, Rating, ResultId, Timestamp};
use tokio::sync::Notify;

use crate::api::{ResultsApi, UploadFile, UploadReceipt};
use crate::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Rating(ResultId, f64),
    Confidence(ResultId, f64),
    Delete(ResultId),
    Upload(String),
    Register(String),
}

/// Pauses `list_results` after it has read the backend rows.
pub struct ListGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct FakeApi {
    rows: Mutex<Vec<AnalysisResult>>,
    calls: Mutex<Vec<Call>>,
    fail_with: Mutex<Option<ApiError>>,
    gate: Mutex<Option<ListGate>>,
}

impl FakeApi {
    pub fn with_rows(rows: Vec<AnalysisResult>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Every following call fails with `err`.
    pub fn fail_with(&self, err: ApiError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    pub fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    /// Install a gate; returns (entered, release) handles.
    pub fn gate_list(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(ListGate {
            entered: entered.clone(),
            release: release.clone(),
        });
        (entered, release)
    }

    pub fn set_rows(&self, rows: Vec<AnalysisResult>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rows(&self) -> Vec<AnalysisResult> {
        self.rows.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        match self.fail_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn update(&self, id: &ResultId, f: impl FnOnce(&mut AnalysisResult)) -> Result<(), ApiError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| &r.id == id) {
            Some(row) => {
                f(row);
                Ok(())
            }
            None => Err(ApiError::Server {
                status: 404,
                detail: "Result not found".into(),
            }),
        }
    }
}

#[async_trait]
impl ResultsApi for FakeApi {
    async fn list_results(&self, _token: &str) -> Result<Vec<AnalysisResult>, ApiError> {
        self.record(Call::List)?;
        let rows = self.rows();
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(rows)
    }

    async fn set_rating(&self, _token: &str, id: &ResultId, rating: Rating) -> Result<(), ApiError> {
        self.record(Call::Rating(id.clone(), rating.get()))?;
        self.update(id, |r| r.rating = Some(rating))
    }

    async fn set_confidence(
        &self,
        _token: &str,
        id: &ResultId,
        confidence: f64,
    ) -> Result<(), ApiError> {
        self.record(Call::Confidence(id.clone(), confidence))?;
        self.update(id, |r| r.confidence = Some(confidence))
    }

    async fn delete_result(&self, _token: &str, id: &ResultId) -> Result<(), ApiError> {
        self.record(Call::Delete(id.clone()))?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| &r.id != id);
        if rows.len() == before {
            return Err(ApiError::Server {
                status: 404,
                detail: "Result not found".into(),
            });
        }
        Ok(())
    }

    async fn upload(&self, _token: &str, file: UploadFile) -> Result<UploadReceipt, ApiError> {
        self.record(Call::Upload(file.file_name().to_string()))?;
        let mut rows = self.rows.lock().unwrap();
        let id = ResultId::new((rows.len() + 100).to_string());
        rows.push(AnalysisResult {
            id,
            filename: file.file_name().to_string(),
            timestamp: Timestamp::parse("2030-01-01T00:00:00"),
            summary: None,
            preview_text: None,
            confidence: None,
            rating: None,
        });
        Ok(UploadReceipt {
            filename: file.file_name().to_string(),
            message: Some("File uploaded and analyzed!".into()),
            preview_text: None,
            note: None,
        })
    }

    async fn register(&self, email: &str, _password: &str) -> Result<String, ApiError> {
        self.record(Call::Register(email.to_string()))?;
        Ok("User registered successfully".into())
    }
}

/// A record with the given id, timestamp and metadata.
pub fn row(id: &str, ts: &str, rating: Option<f64>, confidence: Option<f64>) -> AnalysisResult {
    AnalysisResult {
        id: ResultId::from(id),
        filename: format!("{id}.pdf"),
        timestamp: Timestamp::parse(ts),
        summary: None,
        preview_text: None,
        confidence,
        rating: rating.and_then(Rating::new),
    }
}
