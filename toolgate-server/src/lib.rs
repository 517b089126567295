//! # Toolgate Server
//!
//! The HTTP surface: axum routes terminating the two client-facing MCP
//! endpoints, bearer-token validation, locale negotiation for error
//! bodies, and the wiring that assembles the runtime from configuration.
//! A well-formed JSON-RPC exchange always answers HTTP 200; only
//! transport-level failures (bad token, disabled feature, unknown
//! resource) use 4xx with a localised JSON body.

pub mod app;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod i18n;
pub mod startup;

pub use app::create_router;
pub use context::AppContext;
pub use errors::WebError;
pub use i18n::Locale;
pub use startup::{build_context, serve};
