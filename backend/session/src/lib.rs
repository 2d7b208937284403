//! Session store: process-wide conversation state keyed by an opaque
//! identifier, bounded in length and evicted when idle.

pub mod store;

pub use store::{SessionStore, SessionStoreConfig};
