//! Request/response gateway to the Identifo HTTP API.
//!
//! One call per auth operation, no retries, no caching — retry policy belongs
//! to callers, not here. [`HttpQueryGateway`] is the production
//! implementation; the trait exists so the session manager can be exercised
//! against scripted fakes.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ErrorResponse, Result};
use crate::types::{
    DeanonymizeRequest, DeanonymizeResponse, FederatedLoginRequest, FederatedLoginResponse,
    LoginRequest, LoginResponse, PhoneLoginRequest, PhoneLoginResponse, RegisterRequest,
    RegisterResponse, RequestPhoneCodeRequest, RequestPhoneCodeResponse, ResetPasswordRequest,
    ResetPasswordResponse,
};

/// One request/response call per auth operation.
#[async_trait]
pub trait QueryGateway: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse>;
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;
    async fn phone_login(&self, request: &PhoneLoginRequest) -> Result<PhoneLoginResponse>;
    async fn federated_login(
        &self,
        request: &FederatedLoginRequest,
    ) -> Result<FederatedLoginResponse>;
    async fn request_phone_code(
        &self,
        request: &RequestPhoneCodeRequest,
    ) -> Result<RequestPhoneCodeResponse>;
    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<ResetPasswordResponse>;
    async fn deanonymize(&self, request: &DeanonymizeRequest) -> Result<DeanonymizeResponse>;
    /// Invalidate the session server-side. The current access token rides
    /// along as a bearer credential when one is held.
    async fn logout(&self, access_token: Option<&str>) -> Result<()>;
}

/// App credentials header sent with every request.
const CLIENT_ID_HEADER: &str = "X-Identifo-Clientid";

/// Error envelope the identity service wraps failures in.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Identifo REST API client.
#[derive(Clone)]
pub struct HttpQueryGateway {
    http_client: Client,
    base_url: String,
    app_id: String,
    secret: String,
}

impl HttpQueryGateway {
    /// Create a gateway bound to a base URL and app credentials.
    pub fn new(
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client: Client::new(),
            base_url,
            app_id: app_id.into(),
            secret: secret.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, path: &str, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let mut builder = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.app_id, Some(&self.secret))
            .header(CLIENT_ID_HEADER, &self.app_id);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send a prepared request and map transport/status failures.
    async fn execute(
        &self,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let start = std::time::Instant::now();

        let response = builder.send().await.map_err(|e| {
            warn!(path, error = %e, "Identifo request failed");
            ErrorResponse::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!(path, status = %status, message = %message, "Identifo API error");
            return Err(if status == StatusCode::BAD_REQUEST {
                ErrorResponse::Validation(message)
            } else {
                ErrorResponse::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        debug!(
            path,
            duration_ms = start.elapsed().as_millis() as u64,
            "Identifo call succeeded"
        );

        Ok(response)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(path, self.authorized(path, None).json(body))
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ErrorResponse::Parse(e.to_string()))
    }
}

/// Pull the human-readable message out of the service's error envelope,
/// falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no error details provided".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

#[async_trait]
impl QueryGateway for HttpQueryGateway {
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        self.post("/auth/register", request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.post("/auth/login", request).await
    }

    async fn phone_login(&self, request: &PhoneLoginRequest) -> Result<PhoneLoginResponse> {
        self.post("/auth/phone_login", request).await
    }

    async fn federated_login(
        &self,
        request: &FederatedLoginRequest,
    ) -> Result<FederatedLoginResponse> {
        self.post("/auth/federated", request).await
    }

    async fn request_phone_code(
        &self,
        request: &RequestPhoneCodeRequest,
    ) -> Result<RequestPhoneCodeResponse> {
        self.post("/auth/request_phone_code", request).await
    }

    async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<ResetPasswordResponse> {
        self.post("/password/reset", request).await
    }

    async fn deanonymize(&self, request: &DeanonymizeRequest) -> Result<DeanonymizeResponse> {
        self.post("/auth/deanonymize", request).await
    }

    async fn logout(&self, access_token: Option<&str>) -> Result<()> {
        self.execute("/me/logout", self.authorized("/me/logout", access_token))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> HttpQueryGateway {
        HttpQueryGateway::new(server.uri(), "app-id", "app-secret")
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            username: "alice".to_string(),
            password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_parses_session_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(header("X-Identifo-Clientid", "app-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": "u1", "username": "alice"},
                "access_token": "AT1",
                "refresh_token": "RT1",
            })))
            .mount(&server)
            .await;

        let response = gateway(&server).login(&login_request()).await.unwrap();

        assert_eq!(response.user.id, "u1");
        assert_eq!(response.user.username, "alice");
        assert_eq!(response.access_token, "AT1");
        assert_eq!(response.refresh_token, "RT1");
    }

    #[tokio::test]
    async fn test_bad_request_maps_to_validation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"id": "error.api.request.password.weak", "message": "password is too weak"},
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .register(&RegisterRequest {
                username: "alice".to_string(),
                password: "p".to_string(),
                anonymous: false,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ErrorResponse::Validation(m) if m == "password is too weak"));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = gateway(&server).login(&login_request()).await.unwrap_err();

        assert!(matches!(err, ErrorResponse::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let err = gateway(&server).login(&login_request()).await.unwrap_err();

        assert!(matches!(err, ErrorResponse::Parse(_)));
    }

    #[tokio::test]
    async fn test_logout_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/logout"))
            .and(header("Authorization", "Bearer AT1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        gateway(&server).logout(Some("AT1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Nothing listens on the discard port.
        let gateway = HttpQueryGateway::new("http://127.0.0.1:9", "app-id", "app-secret");

        let err = gateway.login(&login_request()).await.unwrap_err();

        assert!(matches!(err, ErrorResponse::Network(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let gateway = HttpQueryGateway::new("https://auth.example.com/", "app-id", "secret");

        assert_eq!(gateway.base_url(), "https://auth.example.com");
    }
}
