//! Transcript rendering: session turns plus request messages, flattened into
//! the plain-text prompt the CLI reads from stdin.

use crate::chat::{ChatMessage, Role, Turn};

/// Render prior session turns followed by the request's messages into one
/// flat transcript, closed with an empty `Assistant:` line so the CLI
/// continues the conversation rather than narrating it.
pub fn render_prompt(history: &[Turn], messages: &[ChatMessage]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(history.len() + messages.len());

    for turn in history {
        parts.push(render_line(turn.role, &turn.content));
    }
    for msg in messages {
        parts.push(render_line(msg.role, &msg.flattened()));
    }

    let mut prompt = parts.join("\n\n");
    if !prompt.ends_with("Assistant:") {
        prompt.push_str("\n\nAssistant:");
    }
    prompt
}

fn render_line(role: Role, content: &str) -> String {
    let label = match role {
        Role::System => "System",
        Role::User => "Human",
        Role::Assistant => "Assistant",
    };
    format!("{label}: {content}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MessageContent;

    #[test]
    fn renders_roles_and_trailing_assistant() {
        let messages = vec![
            ChatMessage::text(Role::System, "be terse"),
            ChatMessage::text(Role::User, "hi"),
        ];
        let prompt = render_prompt(&[], &messages);
        assert_eq!(prompt, "System: be terse\n\nHuman: hi\n\nAssistant:");
    }

    #[test]
    fn history_precedes_request_messages() {
        let history = vec![
            Turn::new(Role::User, "earlier question"),
            Turn::new(Role::Assistant, "earlier answer"),
        ];
        let messages = vec![ChatMessage::text(Role::User, "follow-up")];
        let prompt = render_prompt(&history, &messages);

        let q = prompt.find("earlier question").unwrap();
        let a = prompt.find("earlier answer").unwrap();
        let f = prompt.find("follow-up").unwrap();
        assert!(q < a && a < f);
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn flattens_part_content() {
        let messages = vec![ChatMessage {
            role: Role::User,
            content: MessageContent::Parts(vec![crate::chat::ContentPart::Text {
                text: "look at this".into(),
            }]),
            name: None,
        }];
        let prompt = render_prompt(&[], &messages);
        assert!(prompt.contains("Human: look at this"));
    }
}
