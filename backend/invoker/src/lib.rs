//! CLI invoker: owns the lifecycle of one external process per request.
//!
//! Launches the CLI with mode-specific arguments, hands the rendered prompt
//! over stdin, and forwards stdout as an ordered fragment stream. The process
//! is guaranteed dead on every exit path: natural exit, timeout, read error,
//! and consumer cancellation.

pub mod fragments;
pub mod invoker;

pub use invoker::{CliInvoker, InvokerConfig};
