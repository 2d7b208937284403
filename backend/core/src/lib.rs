pub mod chat;
pub mod error;
pub mod fragment;
pub mod mode;
pub mod prompt;
pub mod traits;

pub use chat::{ChatMessage, ContentPart, MessageContent, Role, Turn};
pub use error::GateError;
pub use fragment::{Fragment, FragmentSender, FragmentStream};
pub use mode::ExecutionMode;
pub use traits::Engine;
