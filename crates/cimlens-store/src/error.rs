use thiserror::Error;

/// Failure of a backend call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// No bearer token, or the backend answered 401. The session is invalid
    /// and the user has to sign in again.
    #[error("not signed in: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Network(String),

    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

/// User-facing operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Refresh,
    Rating,
    Confidence,
    Delete,
    Upload,
    Register,
}

impl Action {
    fn notice(self) -> &'static str {
        match self {
            Action::Refresh => "Could not load your results. Please try again.",
            Action::Rating => "Failed to update rating. Please try again.",
            Action::Confidence => "Failed to update confidence. Please try again.",
            Action::Delete => "Failed to delete CIM. Please try again.",
            Action::Upload => "Upload failed. Please try again.",
            Action::Register => "Registration failed.",
        }
    }
}

pub const SESSION_NOTICE: &str = "Your session is no longer valid. Please sign in again.";

/// A failed user action, carrying the backend cause.
///
/// `Display` is the notice shown to the user.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}", self.notice())]
pub struct MutationError {
    pub action: Action,
    #[source]
    pub cause: ApiError,
}

impl MutationError {
    pub fn new(action: Action, cause: ApiError) -> Self {
        Self { action, cause }
    }

    pub fn is_session_invalid(&self) -> bool {
        self.cause.is_session_invalid()
    }

    pub fn notice(&self) -> String {
        match (&self.cause, self.action) {
            (ApiError::Auth(_), _) => SESSION_NOTICE.to_string(),
            // Registration surfaces the backend's own explanation.
            (ApiError::Server { detail, .. }, Action::Register) if !detail.is_empty() => {
                detail.clone()
            }
            (_, action) => action.notice().to_string(),
        }
    }
}
