use thiserror::Error;

/// Top-level error type for the cligate runtime.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("unsupported model alias: {0}")]
    UnsupportedModel(String),

    #[error("CLI execution failed: {detail}")]
    Execution { detail: String },

    #[error("CLI exceeded the {budget_secs}s wall-clock budget")]
    Timeout { budget_secs: u64 },

    #[error("request cancelled by caller")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GateError {
    pub fn execution(detail: impl Into<String>) -> Self {
        GateError::Execution {
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code, used by the error envelope on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            GateError::UnsupportedModel(_) => "unsupported_model",
            GateError::Execution { .. } => "execution_error",
            GateError::Timeout { .. } => "timeout",
            GateError::Cancelled => "cancelled",
            GateError::Other(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(GateError::UnsupportedModel("x".into()).code(), "unsupported_model");
        assert_eq!(GateError::Timeout { budget_secs: 60 }.code(), "timeout");
        assert_eq!(GateError::execution("boom").code(), "execution_error");
    }

    #[test]
    fn display_carries_detail() {
        let err = GateError::execution("exit status 2: bad flag");
        assert!(err.to_string().contains("bad flag"));
    }
}
