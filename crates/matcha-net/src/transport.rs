//! Request model and the `reqwest`-backed transport.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    Json(Value),
    /// Single-file multipart upload.
    Multipart {
        field: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// One backend call. `path` is relative to the API base URL.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub token: Option<String>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            token: None,
            body: RequestBody::None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn queries(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(
        mut self,
        field: &str,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field: field.to_string(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        };
        self
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("authenticated", &self.token.is_some())
            .field("body", &self.body)
            .finish()
    }
}

/// Sends one request and returns the decoded JSON body (`null` for empty
/// bodies). Implementations must not retry.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// Production transport over `reqwest`.
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::None => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart {
                field,
                file_name,
                mime,
                bytes,
            } => {
                let part = Part::bytes(bytes).file_name(file_name).mime_str(&mime)?;
                builder.multipart(Form::new().part(field, part))
            }
        };

        debug!(method = %request.method, path = %request.path, "Sending request");

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        parse_response(status, &text)
    }
}

/// Map a status and raw body onto the transport contract.
pub(crate) fn parse_response(status: u16, body: &str) -> Result<Value, ApiError> {
    if status == 401 {
        return Err(ApiError::Unauthorized(error_message(body)));
    }
    if !(200..300).contains(&status) {
        return Err(ApiError::Server {
            status,
            message: error_message(body),
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| ApiError::Decode(format!("response body: {e}")))
}

/// Pull the backend's `{"error": "..."}` message out of a body, falling
/// back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
