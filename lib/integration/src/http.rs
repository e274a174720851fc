//! Outbound HTTP collaborator.
//!
//! Workflow `http` nodes hand a fully-resolved [`HttpRequest`] to an
//! [`HttpDispatcher`]. The production dispatcher wraps reqwest; the mock
//! records requests for tests.

use crate::error::HttpError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;

/// An outbound request assembled by the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Fully-resolved target URL.
    pub url: String,
    /// Uppercased HTTP method (GET, POST, ...).
    pub method: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// JSON body; `None` for bodiless requests.
    pub body: Option<JsonValue>,
}

impl HttpRequest {
    /// Creates a GET request for the given URL.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Creates a request with an explicit method.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into().to_uppercase(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful response from an outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body, parsed as JSON when possible, else a JSON string.
    pub body: JsonValue,
}

/// Trait for outbound HTTP execution.
#[async_trait]
pub trait HttpDispatcher: Send + Sync {
    /// Issues the request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures and for responses with a
    /// 4xx/5xx status; the error carries whatever status/body was received.
    async fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Production dispatcher backed by reqwest.
pub struct ReqwestDispatcher {
    client: reqwest::Client,
}

impl ReqwestDispatcher {
    /// Creates a dispatcher with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Creates a dispatcher from an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpDispatcher for ReqwestDispatcher {
    async fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HttpError::transport(format!("invalid method: {}", request.method)))?;

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::transport(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(JsonValue::String(text));

        if status >= 400 {
            return Err(HttpError::status(status, body));
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// A dispatcher double that records requests and replays canned results.
pub struct MockDispatcher {
    /// Requests seen by this dispatcher, in order.
    pub requests: Mutex<Vec<HttpRequest>>,
    /// The result returned for every dispatch.
    pub result: Result<HttpResponse, HttpError>,
}

impl MockDispatcher {
    /// Creates a dispatcher that answers every request with the response.
    #[must_use]
    pub fn responding(response: HttpResponse) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            result: Ok(response),
        }
    }

    /// Creates a dispatcher that fails every request.
    #[must_use]
    pub fn failing(error: HttpError) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            result: Err(error),
        }
    }
}

#[async_trait]
impl HttpDispatcher for MockDispatcher {
    async fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(request.clone());
        self.result.clone()
    }
}
