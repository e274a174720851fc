//! Language-model collaborator boundary for the loomflow platform.
//!
//! This crate defines the interface the workflow engine uses to invoke a
//! language model:
//!
//! - **Provider**: the [`LlmProvider`] trait plus request/response types
//! - **Errors**: [`LlmError`] for provider failures
//!
//! Concrete provider implementations (hosted APIs, local inference) live
//! outside the execution core and are injected at construction time.

pub mod error;
pub mod provider;

pub use error::LlmError;
pub use provider::{
    EchoProvider, LlmProvider, LlmRequest, LlmResponse, ScriptedProvider, TokenUsage,
};
