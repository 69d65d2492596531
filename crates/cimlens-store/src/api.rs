//! The backend seam: token acquisition and the REST operations the client
//! consumes.
//!
//! [`Session`] pairs a [`TokenProvider`] with a [`ResultsApi`] and enforces
//! that no authenticated request is attempted without a token.

use std::sync::Arc;

use async_trait::async_trait;
use cimlens_core::{AnalysisResult, Rating, ResultId, UploadRejected, check_upload};
use serde::{Deserialize, Serialize};

use crate::ApiError;

/// Source of bearer tokens, owned by the external identity provider.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A current bearer token, or `None` when the user is not signed in.
    async fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl From<Option<String>> for StaticToken {
    fn from(token: Option<String>) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A document ready to be sent as the multipart `file` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    file_name: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    /// Checks the backend's published limits before anything is sent.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, UploadRejected> {
        let file_name = file_name.into();
        check_upload(&file_name, bytes.len() as u64)?;
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.file_name, self.bytes)
    }
}

/// Descriptor returned by `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub filename: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub preview_text: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// REST operations on the analysis backend.
///
/// Implementations map HTTP 401 to [`ApiError::Auth`] and any other non-2xx
/// status to [`ApiError::Server`].
#[async_trait]
pub trait ResultsApi: Send + Sync {
    async fn list_results(&self, token: &str) -> Result<Vec<AnalysisResult>, ApiError>;

    async fn set_rating(&self, token: &str, id: &ResultId, rating: Rating) -> Result<(), ApiError>;

    async fn set_confidence(
        &self,
        token: &str,
        id: &ResultId,
        confidence: f64,
    ) -> Result<(), ApiError>;

    async fn delete_result(&self, token: &str, id: &ResultId) -> Result<(), ApiError>;

    async fn upload(&self, token: &str, file: UploadFile) -> Result<UploadReceipt, ApiError>;

    /// Create an account. Not authenticated. Returns the backend's message.
    async fn register(&self, email: &str, password: &str) -> Result<String, ApiError>;
}

/// Authenticated access to the backend.
#[derive(Clone)]
pub struct Session {
    tokens: Arc<dyn TokenProvider>,
    api: Arc<dyn ResultsApi>,
}

impl Session {
    pub fn new(tokens: Arc<dyn TokenProvider>, api: Arc<dyn ResultsApi>) -> Self {
        Self { tokens, api }
    }

    async fn token(&self) -> Result<String, ApiError> {
        match self.tokens.bearer_token().await {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ApiError::Auth("no bearer token available".into())),
        }
    }

    pub async fn list_results(&self) -> Result<Vec<AnalysisResult>, ApiError> {
        let token = self.token().await?;
        self.api.list_results(&token).await
    }

    pub async fn set_rating(&self, id: &ResultId, rating: Rating) -> Result<(), ApiError> {
        let token = self.token().await?;
        self.api.set_rating(&token, id, rating).await
    }

    pub async fn set_confidence(&self, id: &ResultId, confidence: f64) -> Result<(), ApiError> {
        let token = self.token().await?;
        self.api.set_confidence(&token, id, confidence).await
    }

    pub async fn delete_result(&self, id: &ResultId) -> Result<(), ApiError> {
        let token = self.token().await?;
        self.api.delete_result(&token, id).await
    }

    pub async fn upload(&self, file: UploadFile) -> Result<UploadReceipt, ApiError> {
        let token = self.token().await?;
        self.api.upload(&token, file).await
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<String, ApiError> {
        self.api.register(email, password).await
    }
}
