use async_trait::async_trait;

use crate::error::GateError;
use crate::fragment::FragmentStream;
use crate::mode::ExecutionMode;

/// The seam between transports and the CLI engine.
///
/// The HTTP gateway is one caller; any other transport relaying the same
/// capability consumes this trait instead of the concrete invoker.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Launch one invocation in the given mode, feeding it the rendered
    /// prompt, and expose its output as a fragment stream.
    async fn invoke(&self, mode: ExecutionMode, prompt: &str)
        -> Result<FragmentStream, GateError>;

    /// Cheap liveness check of the underlying tool, for health reporting.
    async fn probe(&self) -> Result<String, GateError>;
}
