//! Structured logging bootstrap for cligate.
//!
//! Console output for operators, daily-rolling NDJSON files for machines.

pub mod logger;

pub use logger::init_logger;
