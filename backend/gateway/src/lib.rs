//! cligate HTTP gateway.
//!
//! Provides the OpenAI-compatible REST surface and maps the core's typed
//! errors onto HTTP status codes. Authentication and rate limiting are
//! deliberately absent — they belong to whatever fronts this process.

pub mod health_api;
pub mod openai_compat;
pub mod server;

pub use server::{build_router, GatewayState};
