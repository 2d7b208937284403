/// Mode selector — pure function from (alias, message contents) to the
/// execution mode the CLI is launched in.
use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use cligate_core::{ChatMessage, ExecutionMode, GateError};

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// Static alias → mode table. Closed on purpose: an alias outside this table
/// is a client error, never a silent default.
static ALIAS_TABLE: Lazy<HashMap<&'static str, ExecutionMode>> = Lazy::new(|| {
    HashMap::from([
        // Current-information / coding engine.
        ("gpt-3.5-turbo", ExecutionMode::Current),
        ("gpt-4", ExecutionMode::Current),
        ("gpt-4-turbo", ExecutionMode::Current),
        ("current", ExecutionMode::Current),
        // General / multimodal engine.
        ("gpt-4o", ExecutionMode::General),
        ("gpt-4o-mini", ExecutionMode::General),
        ("general", ExecutionMode::General),
    ])
});

/// All aliases the router accepts, sorted, for the models listing.
pub fn known_aliases() -> Vec<&'static str> {
    let mut aliases: Vec<_> = ALIAS_TABLE.keys().copied().collect();
    aliases.sort_unstable();
    aliases
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Resolve the execution mode for a request.
///
/// The alias must be known. Any message carrying an image or file part forces
/// general mode — vision and file handling live only in that engine — and
/// that override beats whatever the alias asked for.
pub fn select_mode(
    requested_model: &str,
    messages: &[ChatMessage],
) -> Result<ExecutionMode, GateError> {
    let mapped = ALIAS_TABLE
        .get(requested_model)
        .copied()
        .ok_or_else(|| GateError::UnsupportedModel(requested_model.to_string()))?;

    if messages.iter().any(ChatMessage::has_attachment) {
        if mapped != ExecutionMode::General {
            debug!(
                model = requested_model,
                "attachment present, overriding alias mapping to general mode"
            );
        }
        return Ok(ExecutionMode::General);
    }

    Ok(mapped)
}
