use std::fmt;

use serde::{Deserialize, Serialize};

/// The two operating modes of the wrapped CLI.
///
/// A closed enumeration on purpose: the external tool exposes exactly these
/// two engines, and nothing here should dispatch on an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Current-information / coding engine.
    Current,
    /// General / multimodal engine — the only one with vision and file support.
    General,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Current => "current",
            ExecutionMode::General => "general",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ExecutionMode::Current).unwrap(),
            "\"current\""
        );
        assert_eq!(
            serde_json::to_string(&ExecutionMode::General).unwrap(),
            "\"general\""
        );
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ExecutionMode::General.to_string(), "general");
    }
}
