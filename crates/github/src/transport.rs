use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
        }
    }
}

/// One outbound API call. `path` is relative to the configured api_base.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Raw response: status plus body bytes. Classification happens in the
/// error normalizer, never here.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// The request never produced a response at all.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

pub struct HttpTransport {
    client: Client,
    api_base: String,
    token: String,
}

impl HttpTransport {
    /// Fails when the underlying client cannot be built (for example when
    /// TLS backend init fails). The User-Agent is mandatory: GitHub rejects
    /// requests without one.
    pub fn new(token: String, api_base: String) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent("Octogate/0.1")
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.api_base, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json");

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?
            .to_vec();

        Ok(ApiResponse { status, body })
    }
}
