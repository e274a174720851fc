//! Email and outbound HTTP collaborator boundaries for the loomflow platform.
//!
//! This crate defines the interfaces the workflow engine uses for
//! side-effecting integrations:
//!
//! - **Email**: read/search/send over a mail account ([`EmailConnector`])
//! - **HTTP**: generic outbound request execution ([`HttpDispatcher`])
//! - **Credentials**: opaque passthrough of stored secrets ([`Credential`])
//!
//! Protocol implementations beyond the reqwest-backed HTTP dispatcher live
//! outside the execution core.

pub mod credential;
pub mod email;
pub mod error;
pub mod http;

pub use credential::Credential;
pub use email::{EmailConnector, MockEmailConnector, OutgoingEmail};
pub use error::{EmailError, HttpError};
pub use http::{HttpDispatcher, HttpRequest, HttpResponse, MockDispatcher, ReqwestDispatcher};
