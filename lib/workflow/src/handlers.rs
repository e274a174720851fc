//! Built-in node handlers.
//!
//! One handler per node type tag:
//!
//! | tag         | behavior                                              |
//! |-------------|-------------------------------------------------------|
//! | `input`     | passthrough of the run's initial payload              |
//! | `output`    | passthrough of the upstream value (terminal)          |
//! | `llm`       | template-resolved prompt through the LLM provider     |
//! | `email`     | read / send / search via the email connector          |
//! | `condition` | boolean branch selection                              |
//! | `transform` | `$.`-path extraction or restricted expression         |
//! | `http`      | outbound call via the HTTP dispatcher                 |
//!
//! Handlers holding a collaborator take it at construction; the registry
//! wiring happens once in [`builtin_registry`].

use crate::condition::{evaluate_condition, evaluate_expression};
use crate::error::HandlerError;
use crate::handler::{HandlerRegistry, NodeHandler};
use crate::node::NodeRecord;
use crate::template;
use async_trait::async_trait;
use loomflow_ai::{LlmProvider, LlmRequest};
use loomflow_integration::{EmailConnector, HttpDispatcher, HttpRequest, OutgoingEmail};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Model used when an `llm` node does not name one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Temperature used when an `llm` node does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Builds a registry with all built-in handlers wired to the given
/// collaborators.
#[must_use]
pub fn builtin_registry(
    llm: Arc<dyn LlmProvider>,
    email: Arc<dyn EmailConnector>,
    http: Arc<dyn HttpDispatcher>,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("input", Arc::new(InputHandler));
    registry.register("output", Arc::new(OutputHandler));
    registry.register("llm", Arc::new(LlmHandler::new(llm)));
    registry.register("email", Arc::new(EmailHandler::new(email)));
    registry.register("condition", Arc::new(ConditionHandler));
    registry.register("transform", Arc::new(TransformHandler));
    registry.register("http", Arc::new(HttpHandler::new(http)));
    registry
}

/// Passes the run's initial payload through unchanged.
pub struct InputHandler;

#[async_trait]
impl NodeHandler for InputHandler {
    async fn handle(
        &self,
        context: &JsonValue,
        _node: &NodeRecord,
    ) -> Result<JsonValue, HandlerError> {
        Ok(context.clone())
    }
}

/// Passes the upstream value through unchanged (terminal node).
pub struct OutputHandler;

#[async_trait]
impl NodeHandler for OutputHandler {
    async fn handle(
        &self,
        context: &JsonValue,
        _node: &NodeRecord,
    ) -> Result<JsonValue, HandlerError> {
        Ok(context.clone())
    }
}

/// Resolves the prompt template and invokes the language model.
pub struct LlmHandler {
    provider: Arc<dyn LlmProvider>,
}

impl LlmHandler {
    /// Creates a handler backed by the given provider.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl NodeHandler for LlmHandler {
    async fn handle(
        &self,
        context: &JsonValue,
        node: &NodeRecord,
    ) -> Result<JsonValue, HandlerError> {
        let prompt = node.setting_str("prompt").unwrap_or_default();
        let model = node.setting_str("model").unwrap_or(DEFAULT_MODEL);
        let temperature = node.setting_f64("temperature").unwrap_or(DEFAULT_TEMPERATURE);

        let resolved = template::resolve(prompt, context);
        let request = LlmRequest::new(resolved, model).with_temperature(temperature as f32);

        let response =
            self.provider
                .invoke(&request)
                .await
                .map_err(|e| HandlerError::Collaborator {
                    service: "llm".to_string(),
                    message: e.to_string(),
                })?;

        Ok(json!({"text": response.text, "usage": response.usage}))
    }
}

/// Delegates read/send/search to the email connector.
pub struct EmailHandler {
    connector: Arc<dyn EmailConnector>,
}

impl EmailHandler {
    /// Creates a handler backed by the given connector.
    #[must_use]
    pub fn new(connector: Arc<dyn EmailConnector>) -> Self {
        Self { connector }
    }

    /// Looks up a send field in the node config, then the input context.
    fn field<'a>(node: &'a NodeRecord, context: &'a JsonValue, key: &str) -> Option<&'a str> {
        node.setting_str(key)
            .or_else(|| context.get(key).and_then(JsonValue::as_str))
    }
}

#[async_trait]
impl NodeHandler for EmailHandler {
    async fn handle(
        &self,
        context: &JsonValue,
        node: &NodeRecord,
    ) -> Result<JsonValue, HandlerError> {
        let collaborator = |e: loomflow_integration::EmailError| HandlerError::Collaborator {
            service: "email".to_string(),
            message: e.to_string(),
        };

        let action = node.setting_str("action").unwrap_or("read");
        match action {
            "read" => self.connector.read().await.map_err(collaborator),
            "send" => {
                let require = |key: &str| {
                    Self::field(node, context, key).ok_or_else(|| HandlerError::MissingInput {
                        field: key.to_string(),
                    })
                };
                let message = OutgoingEmail::new(
                    require("recipient")?,
                    require("subject")?,
                    require("body")?,
                );
                self.connector.send(&message).await.map_err(collaborator)
            }
            "search" => {
                let query = Self::field(node, context, "query").unwrap_or_default();
                self.connector.search(query).await.map_err(collaborator)
            }
            other => Err(HandlerError::InvalidConfig {
                reason: format!("unknown email action: {other}"),
            }),
        }
    }
}

/// Evaluates the node's condition and selects a branch.
pub struct ConditionHandler;

#[async_trait]
impl NodeHandler for ConditionHandler {
    async fn handle(
        &self,
        context: &JsonValue,
        node: &NodeRecord,
    ) -> Result<JsonValue, HandlerError> {
        let condition =
            node.setting_str("condition")
                .ok_or_else(|| HandlerError::InvalidConfig {
                    reason: "no condition specified".to_string(),
                })?;

        // Conditions may embed {{...}} placeholders; resolve them before
        // evaluation so `{{score}} == 10` compares the actual value.
        let resolved = template::resolve(condition, context);
        let result = evaluate_condition(&resolved, context);

        Ok(json!({
            "result": result,
            "branch": if result { "true" } else { "false" },
        }))
    }
}

/// Extracts or derives a value from the input context.
pub struct TransformHandler;

#[async_trait]
impl NodeHandler for TransformHandler {
    async fn handle(
        &self,
        context: &JsonValue,
        node: &NodeRecord,
    ) -> Result<JsonValue, HandlerError> {
        let Some(transformation) = node.setting_str("transformation") else {
            return Ok(context.clone());
        };

        if let Some(path) = transformation.strip_prefix("$.") {
            return Ok(template::lookup_path(context, path)
                .cloned()
                .unwrap_or(JsonValue::Null));
        }

        evaluate_expression(transformation, context).map_err(|e| HandlerError::InvalidConfig {
            reason: format!("transform error: {e}"),
        })
    }
}

/// Issues an outbound HTTP call.
pub struct HttpHandler {
    dispatcher: Arc<dyn HttpDispatcher>,
}

impl HttpHandler {
    /// Creates a handler backed by the given dispatcher.
    #[must_use]
    pub fn new(dispatcher: Arc<dyn HttpDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl NodeHandler for HttpHandler {
    async fn handle(
        &self,
        context: &JsonValue,
        node: &NodeRecord,
    ) -> Result<JsonValue, HandlerError> {
        let url_template =
            node.setting_str("url")
                .ok_or_else(|| HandlerError::InvalidConfig {
                    reason: "no url specified".to_string(),
                })?;

        let url = template::resolve(url_template, context);
        let method = node
            .setting_str("method")
            .unwrap_or("GET")
            .to_uppercase();

        let headers: HashMap<String, String> = node
            .setting("headers")
            .and_then(JsonValue::as_object)
            .map(|map| {
                map.iter()
                    .map(|(k, v)| {
                        let value = match v {
                            JsonValue::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), value)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let body = node
            .setting("body")
            .cloned()
            .unwrap_or_else(|| context.clone());

        let request = HttpRequest {
            url,
            method: method.clone(),
            headers,
            body: (method != "GET").then_some(body),
        };

        // Transport and status failures become the node's value, not a
        // failure marker: downstream nodes see the error shape.
        match self.dispatcher.dispatch(&request).await {
            Ok(response) => Ok(json!({
                "status": response.status,
                "data": response.body,
                "headers": response.headers,
            })),
            Err(error) => Ok(json!({
                "error": error.message,
                "status": error.status,
                "data": error.body,
            })),
        }
    }
}
