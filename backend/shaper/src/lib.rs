//! Response shaper: turns the invoker's opaque fragment sequence into
//! OpenAI-compatible envelopes — one complete object for non-streaming
//! requests, an SSE chunk sequence closed by a terminal chunk and the
//! `[DONE]` sentinel for streaming ones.

pub mod complete;
pub mod envelope;
pub mod stream;

pub use complete::complete;
pub use envelope::{error_body, estimate_tokens, ChatCompletion, ErrorBody, ShapeContext, Usage};
pub use stream::{stream_chunks, StreamOutcome, DONE_FRAME};
