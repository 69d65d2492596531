//! HTTP client for the CIMLens analysis backend.

use std::time::Duration;

use async_trait::async_trait;
use cimlens_core::{AnalysisResult, Rating, ResultId};
use cimlens_store::{ApiError, ResultsApi, UploadFile, UploadReceipt};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Server { status: 401, body } => ApiError::Auth(detail_message(&body)),
            ClientError::Server { status, body } => ApiError::Server {
                status,
                detail: detail_message(&body),
            },
            ClientError::Json(e) => ApiError::Decode(e.to_string()),
            ClientError::Http(e) if e.is_decode() => ApiError::Decode(e.to_string()),
            ClientError::Http(e) => ApiError::Network(e.to_string()),
        }
    }
}

/// The backend reports failures as `{"detail": "..."}`; fall back to the raw
/// body for anything else.
fn detail_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[derive(Serialize)]
struct RatingBody {
    rating: f64,
}

#[derive(Serialize)]
struct ConfidenceBody {
    confidence: f64,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the backend's `/api` and `/register` endpoints.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given backend base URL.
    ///
    /// `base_url` should be like `http://127.0.0.1:8000`; a trailing slash is
    /// trimmed.
    pub fn new(base_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client whose requests time out after `timeout`.
    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn result_url(&self, id: &ResultId, suffix: &str) -> String {
        format!("{}/api/results/{}{}", self.base_url, id, suffix)
    }

    /// Send a request and return its body, or the status and body on non-2xx.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<String, ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.text().await?)
    }

    pub async fn fetch_results(&self, token: &str) -> Result<Vec<AnalysisResult>, ClientError> {
        let url = self.url("/api/results");
        debug!(url = %url, "listing results");
        let body = self.send(self.client.get(&url).bearer_auth(token)).await?;
        let results: Vec<AnalysisResult> = serde_json::from_str(&body)?;
        info!(count = results.len(), "fetched results");
        Ok(results)
    }

    pub async fn put_rating(
        &self,
        token: &str,
        id: &ResultId,
        rating: Rating,
    ) -> Result<(), ClientError> {
        let url = self.result_url(id, "/rating");
        debug!(url = %url, rating = rating.get(), "setting rating");
        let body = RatingBody {
            rating: rating.get(),
        };
        self.send(self.client.put(&url).bearer_auth(token).json(&body))
            .await?;
        Ok(())
    }

    pub async fn put_confidence(
        &self,
        token: &str,
        id: &ResultId,
        confidence: f64,
    ) -> Result<(), ClientError> {
        let url = self.result_url(id, "/confidence");
        debug!(url = %url, confidence, "setting confidence");
        let body = ConfidenceBody { confidence };
        self.send(self.client.put(&url).bearer_auth(token).json(&body))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, token: &str, id: &ResultId) -> Result<(), ClientError> {
        let url = self.result_url(id, "");
        debug!(url = %url, "deleting result");
        self.send(self.client.delete(&url).bearer_auth(token)).await?;
        Ok(())
    }

    pub async fn post_upload(
        &self,
        token: &str,
        file: UploadFile,
    ) -> Result<UploadReceipt, ClientError> {
        let url = self.url("/api/upload");
        let (file_name, bytes) = file.into_parts();
        info!(url = %url, file = %file_name, size = bytes.len(), "uploading document");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);
        let body = self
            .send(self.client.post(&url).bearer_auth(token).multipart(form))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn post_register(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let url = self.url("/register");
        info!(url = %url, email = %email, "registering account");
        let body = self
            .send(self.client.post(&url).json(&RegisterBody { email, password }))
            .await?;
        let resp: MessageResponse = serde_json::from_str(&body)?;
        Ok(resp
            .message
            .unwrap_or_else(|| "Registration successful.".to_string()))
    }
}

#[async_trait]
impl ResultsApi for ApiClient {
    async fn list_results(&self, token: &str) -> Result<Vec<AnalysisResult>, ApiError> {
        Ok(self.fetch_results(token).await?)
    }

    async fn set_rating(&self, token: &str, id: &ResultId, rating: Rating) -> Result<(), ApiError> {
        Ok(self.put_rating(token, id, rating).await?)
    }

    async fn set_confidence(
        &self,
        token: &str,
        id: &ResultId,
        confidence: f64,
    ) -> Result<(), ApiError> {
        Ok(self.put_confidence(token, id, confidence).await?)
    }

    async fn delete_result(&self, token: &str, id: &ResultId) -> Result<(), ApiError> {
        Ok(self.delete(token, id).await?)
    }

    async fn upload(&self, token: &str, file: UploadFile) -> Result<UploadReceipt, ApiError> {
        Ok(self.post_upload(token, file).await?)
    }

    async fn register(&self, email: &str, password: &str) -> Result<String, ApiError> {
        Ok(self.post_register(email, password).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn id(s: &str) -> ResultId {
        ResultId::from(s)
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = ApiClient::new("http://127.0.0.1:8000/".into());
        assert_eq!(client.base_url, "http://127.0.0.1:8000");
        assert_eq!(
            client.result_url(&id("12"), "/rating"),
            "http://127.0.0.1:8000/api/results/12/rating"
        );
    }

    #[test]
    fn unauthorized_maps_to_auth() {
        let err = ApiError::from(ClientError::Server {
            status: 401,
            body: r#"{"detail": "Could not validate credentials"}"#.into(),
        });
        assert_eq!(err, ApiError::Auth("Could not validate credentials".into()));
    }

    #[test]
    fn server_detail_is_extracted() {
        let err = ApiError::from(ClientError::Server {
            status: 404,
            body: r#"{"detail": "Result not found"}"#.into(),
        });
        assert_eq!(
            err,
            ApiError::Server {
                status: 404,
                detail: "Result not found".into()
            }
        );
        let err = ApiError::from(ClientError::Server {
            status: 502,
            body: "Bad Gateway\n".into(),
        });
        assert_eq!(
            err,
            ApiError::Server {
                status: 502,
                detail: "Bad Gateway".into()
            }
        );
    }

    #[tokio::test]
    async fn lists_results_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results"))
            .and(header("authorization", "Bearer jwt-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1,
                    "filename": "acme.pdf",
                    "preview_text": "Acme",
                    "summary_json": "{\"SUMMARY\": \"ok\"}",
                    "timestamp": "2025-06-01T10:00:00.000001",
                    "user_rating": 5.0,
                    "confidence_score": 0.5
                },
                {
                    "id": 2,
                    "filename": "beta.pdf",
                    "preview_text": null,
                    "summary_json": null,
                    "timestamp": "2025-06-02T10:00:00",
                    "user_rating": null,
                    "confidence_score": null
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let results = client.list_results("jwt-123").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, id("1"));
        assert_eq!(results[0].rating.map(Rating::get), Some(5.0));
        assert!(results[1].rating.is_none());
    }

    #[tokio::test]
    async fn expired_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})),
            )
            .mount(&server)
            .await;

        let err = ApiClient::new(server.uri())
            .list_results("old")
            .await
            .unwrap_err();
        assert!(err.is_session_invalid());
    }

    #[tokio::test]
    async fn malformed_list_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = ApiClient::new(server.uri())
            .list_results("jwt")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn puts_rating_and_confidence_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/results/9/rating"))
            .and(header("authorization", "Bearer jwt"))
            .and(body_json(json!({"rating": 5.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"message": "Rating updated successfully", "rating": 5.0}),
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/results/9/confidence"))
            .and(body_json(json!({"confidence": 0.73})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"message": "Confidence updated successfully", "confidence": 0.73}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        client.set_rating("jwt", &id("9"), Rating::MAX).await.unwrap();
        client.set_confidence("jwt", &id("9"), 0.73).await.unwrap();
    }

    #[tokio::test]
    async fn missing_record_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/results/404"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Result not found"})),
            )
            .mount(&server)
            .await;

        let err = ApiClient::new(server.uri())
            .delete_result("jwt", &id("404"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 404,
                detail: "Result not found".into()
            }
        );
    }

    #[tokio::test]
    async fn deletes_result() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/results/3"))
            .and(header("authorization", "Bearer jwt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "Result deleted successfully"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        ApiClient::new(server.uri())
            .delete_result("jwt", &id("3"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn uploads_multipart_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .and(body_string_contains("name=\"file\"; filename=\"acme.pdf\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "filename": "acme.pdf",
                "message": "File uploaded and analyzed!",
                "preview_text": "Acme Corp",
                "llm_analysis": "{}",
                "note": "This is a first-pass summary."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = UploadFile::new("acme.pdf", b"%PDF-1.7 test".to_vec()).unwrap();
        let receipt = ApiClient::new(server.uri())
            .upload("jwt", file)
            .await
            .unwrap();
        assert_eq!(receipt.filename, "acme.pdf");
        assert_eq!(receipt.message.as_deref(), Some("File uploaded and analyzed!"));
    }

    #[tokio::test]
    async fn register_reports_backend_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .and(body_json(json!({"email": "a@b.com", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"detail": "Email already registered"})),
            )
            .mount(&server)
            .await;

        let err = ApiClient::new(server.uri())
            .register("a@b.com", "pw")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 400,
                detail: "Email already registered".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = ApiClient::new(format!("http://{addr}"))
            .list_results("jwt")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
