//! Model routing: map an externally requested model alias to one of the two
//! CLI execution modes.

pub mod select_mode;

pub use select_mode::{known_aliases, select_mode};
