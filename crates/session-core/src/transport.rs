//! HTTP transport seam.
//!
//! [`Transport`] executes one request against the backend and reports the
//! raw status and body. It knows nothing about sessions; the gateway decides
//! which bearer token to attach and what to do with a 401.

use crate::wire::ErrorBody;
use crate::{SessionError, SessionResult};
use async_trait::async_trait;
use quill_config_and_utils::Config;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request relative to the API base URL.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `blogs/7/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn post<T: Serialize>(path: impl Into<String>, body: &T) -> SessionResult<Self> {
        Self::new(Method::Post, path).with_json(body)
    }

    pub fn put<T: Serialize>(path: impl Into<String>, body: &T) -> SessionResult<Self> {
        Self::new(Method::Put, path).with_json(body)
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> SessionResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| SessionError::Decode(format!("Could not encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

// Bodies carry passwords and refresh tokens.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Deserialize the body.
    pub fn json<T: DeserializeOwned>(&self) -> SessionResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            SessionError::Decode(format!("status {}: {}", self.status, e))
        })
    }

    pub fn error_body(&self) -> ErrorBody {
        ErrorBody::parse(&self.body)
    }

    /// Best human-readable message for a failed response.
    pub fn error_message(&self) -> String {
        self.error_body()
            .summary()
            .unwrap_or_else(|| format!("request failed with status {}", self.status))
    }

    /// Generic error for a status the caller has no special handling for.
    pub fn into_http_error(self) -> SessionError {
        SessionError::Http {
            status: self.status,
            message: self.error_message(),
        }
    }
}

/// Executes requests against the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, attaching `Authorization: Bearer <token>` when given.
    ///
    /// Any HTTP status is a successful execution; only transport failures
    /// return an error.
    async fn execute(&self, request: &ApiRequest, bearer: Option<&str>)
        -> SessionResult<ApiResponse>;
}

/// Production transport over reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport for `base_url`, which must end with a slash.
    pub fn new(base_url: Url, timeout: Duration) -> SessionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SessionError::Config(format!("Could not build HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> SessionResult<Self> {
        Self::new(
            config.api_base_url()?,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> SessionResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> SessionResult<ApiResponse> {
        let url = self.url_for(&request.path)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(method = %request.method, path = %request.path, status, "Received response");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_builders() {
        let request = ApiRequest::get("blogs/").with_query("page", "2");
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query, vec![("page".to_string(), "2".to_string())]);
        assert!(request.body.is_none());

        let request = ApiRequest::post("login/", &json!({ "email": "a@b.com" })).unwrap();
        assert_eq!(request.body, Some(json!({ "email": "a@b.com" })));
    }

    #[test]
    fn debug_omits_body() {
        let request = ApiRequest::post("login/", &json!({ "password": "hunter2" })).unwrap();
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("has_body: true"));
    }

    #[test]
    fn response_classification() {
        assert!(ApiResponse::new(204, "").is_success());
        assert!(!ApiResponse::new(301, "").is_success());
        assert!(ApiResponse::new(401, "").is_unauthorized());
    }

    #[test]
    fn http_error_uses_server_detail() {
        let err = ApiResponse::json_body(500, &json!({ "detail": "boom" })).into_http_error();
        assert_eq!(
            err,
            SessionError::Http {
                status: 500,
                message: "boom".to_string()
            }
        );

        let err = ApiResponse::new(418, "").into_http_error();
        assert!(matches!(err, SessionError::Http { message, .. } if message.contains("418")));
    }

    #[test]
    fn urls_join_under_base_path() {
        let transport = ReqwestTransport::new(
            Url::parse("http://localhost:8000/api/").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            transport.url_for("token/refresh/").unwrap().as_str(),
            "http://localhost:8000/api/token/refresh/"
        );
        assert_eq!(
            transport.url_for("/blogs/7/").unwrap().as_str(),
            "http://localhost:8000/api/blogs/7/"
        );
    }

    #[test]
    fn from_config_rejects_bad_url() {
        let config = Config {
            api_base_url: "::nope".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            ReqwestTransport::from_config(&config),
            Err(SessionError::Config(_))
        ));
    }
}
