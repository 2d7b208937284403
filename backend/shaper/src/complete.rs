//! Non-streaming shape: `Idle → Buffering → Closed`.

use cligate_core::{FragmentStream, GateError};

use crate::envelope::{ChatCompletion, ShapeContext};

/// Buffer the entire fragment stream, then emit exactly one complete
/// envelope whose content is the concatenation of every fragment. Any
/// invoker failure surfaces as the error itself — a partial object is never
/// produced.
pub async fn complete(
    ctx: &ShapeContext,
    mut fragments: FragmentStream,
) -> Result<ChatCompletion, GateError> {
    let mut content = String::new();
    while let Some(item) = fragments.recv().await {
        content.push_str(&item?);
    }
    Ok(ChatCompletion::new(ctx, content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn content_equals_fragment_concatenation() {
        let (tx, stream) = FragmentStream::channel(8);
        for piece in ["The ", "answer ", "is 42."] {
            tx.send(Ok(piece.into())).await.unwrap();
        }
        drop(tx);

        let ctx = ShapeContext::new("gpt-4", 5);
        let envelope = complete(&ctx, stream).await.unwrap();
        assert_eq!(envelope.choices[0].message.content, "The answer is 42.");
        assert_eq!(envelope.id, ctx.id);
        assert_eq!(envelope.object, "chat.completion");
    }

    #[tokio::test]
    async fn empty_output_is_an_empty_success() {
        let (tx, stream) = FragmentStream::channel(1);
        drop(tx);

        let ctx = ShapeContext::new("gpt-4", 5);
        let envelope = complete(&ctx, stream).await.unwrap();
        assert_eq!(envelope.choices[0].message.content, "");
    }

    #[tokio::test]
    async fn invoker_error_means_no_partial_object() {
        let (tx, stream) = FragmentStream::channel(8);
        tx.send(Ok("half an ans".into())).await.unwrap();
        tx.send(Err(GateError::Timeout { budget_secs: 1 })).await.unwrap();
        drop(tx);

        let ctx = ShapeContext::new("gpt-4", 5);
        let err = complete(&ctx, stream).await.unwrap_err();
        assert!(matches!(err, GateError::Timeout { .. }));
    }
}
