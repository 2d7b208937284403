//! Streaming shape: `Idle → Streaming → Closed`.
//!
//! One chunk per fragment, in arrival order — fragments are never
//! re-segmented into words or sentences. The sequence always closes with a
//! terminal chunk (empty delta, completion marker) followed by the `[DONE]`
//! sentinel, including after a mid-stream invoker failure: the wire contract
//! has no way to signal an error once chunks have been sent, so already
//! delivered content stands and the stream simply ends.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use cligate_core::{FragmentStream, GateError};

use crate::envelope::{ChatCompletionChunk, ShapeContext};

/// The stream-closing sentinel frame.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// What a finished streaming shape produced: the assembled assistant text
/// (for session write-back) and the failure that cut the stream short, if
/// any.
#[derive(Debug)]
pub struct StreamOutcome {
    pub content: String,
    pub error: Option<GateError>,
}

/// Pump the fragment stream into SSE frames on `tx` until the invoker is
/// done or the consumer goes away. The shaper performs no retries; a single
/// invoker failure ends the output for this request.
pub async fn stream_chunks(
    ctx: &ShapeContext,
    mut fragments: FragmentStream,
    tx: &mpsc::Sender<String>,
) -> StreamOutcome {
    let mut content = String::new();
    let mut error = None;
    let mut first = true;

    while let Some(item) = fragments.recv().await {
        match item {
            Ok(fragment) => {
                let chunk = ChatCompletionChunk::content(ctx, &fragment, first);
                first = false;
                content.push_str(&fragment);
                if send_frame(tx, &chunk).await.is_err() {
                    error = Some(GateError::Cancelled);
                    break;
                }
            }
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    match &error {
        Some(GateError::Cancelled) => {
            // Client went away; dropping `fragments` below kills the child.
            info!(id = %ctx.id, "client disconnected mid-stream");
            return StreamOutcome { content, error };
        }
        Some(e) => {
            warn!(id = %ctx.id, error = %e, "stream cut short, closing envelope");
        }
        None => {}
    }

    let _ = send_frame(tx, &ChatCompletionChunk::terminal(ctx)).await;
    let _ = tx.send(DONE_FRAME.to_string()).await;

    StreamOutcome { content, error }
}

async fn send_frame<T: Serialize>(tx: &mpsc::Sender<String>, value: &T) -> Result<(), ()> {
    if let Ok(json) = serde_json::to_string(value) {
        tx.send(format!("data: {json}\n\n")).await.map_err(|_| ())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn run_shaper(
        items: Vec<Result<String, GateError>>,
    ) -> (Vec<String>, StreamOutcome) {
        let (frag_tx, frag_stream) = FragmentStream::channel(16);
        for item in items {
            frag_tx.send(item).await.unwrap();
        }
        drop(frag_tx);

        let ctx = ShapeContext::new("gpt-4o", 3);
        let (tx, mut rx) = mpsc::channel(64);
        let outcome = stream_chunks(&ctx, frag_stream, &tx).await;
        drop(tx);

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        (frames, outcome)
    }

    fn delta_of(frame: &str) -> Value {
        let json: Value =
            serde_json::from_str(frame.strip_prefix("data: ").unwrap().trim()).unwrap();
        json["choices"][0].clone()
    }

    #[tokio::test]
    async fn deltas_concatenate_to_full_content() {
        let (frames, outcome) = run_shaper(vec![
            Ok("Hel".into()),
            Ok("lo wo".into()),
            Ok("rld".into()),
        ])
        .await;

        // 3 content chunks + terminal + sentinel.
        assert_eq!(frames.len(), 5);
        assert_eq!(frames.last().unwrap(), DONE_FRAME);

        let mut assembled = String::new();
        for frame in &frames[..3] {
            let choice = delta_of(frame);
            assert!(choice["finish_reason"].is_null());
            assembled.push_str(choice["delta"]["content"].as_str().unwrap());
        }
        assert_eq!(assembled, "Hello world");
        assert_eq!(outcome.content, "Hello world");
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn first_chunk_carries_role_later_ones_do_not() {
        let (frames, _) = run_shaper(vec![Ok("a".into()), Ok("b".into())]).await;
        assert_eq!(delta_of(&frames[0])["delta"]["role"], "assistant");
        assert!(delta_of(&frames[1])["delta"]["role"].is_null());
    }

    #[tokio::test]
    async fn terminal_chunk_is_empty_and_last_before_sentinel() {
        let (frames, _) = run_shaper(vec![Ok("x".into())]).await;
        let terminal = delta_of(&frames[frames.len() - 2]);
        assert_eq!(terminal["finish_reason"], "stop");
        assert_eq!(terminal["delta"], serde_json::json!({}));
        assert_eq!(frames.last().unwrap(), DONE_FRAME);
    }

    #[tokio::test]
    async fn empty_stream_still_closes_properly() {
        let (frames, outcome) = run_shaper(vec![]).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(delta_of(&frames[0])["finish_reason"], "stop");
        assert_eq!(frames[1], DONE_FRAME);
        assert_eq!(outcome.content, "");
    }

    #[tokio::test]
    async fn midstream_failure_preserves_partial_and_closes() {
        let (frames, outcome) = run_shaper(vec![
            Ok("partial ".into()),
            Err(GateError::Timeout { budget_secs: 1 }),
        ])
        .await;

        // 1 content chunk + terminal + sentinel, nothing retracted.
        assert_eq!(frames.len(), 3);
        assert_eq!(
            delta_of(&frames[0])["delta"]["content"].as_str().unwrap(),
            "partial "
        );
        assert_eq!(delta_of(&frames[1])["finish_reason"], "stop");
        assert_eq!(frames[2], DONE_FRAME);

        assert_eq!(outcome.content, "partial ");
        assert!(matches!(outcome.error, Some(GateError::Timeout { .. })));
    }

    #[tokio::test]
    async fn all_chunks_share_one_envelope_id() {
        let (frames, _) = run_shaper(vec![Ok("a".into()), Ok("b".into())]).await;
        let ids: Vec<String> = frames[..frames.len() - 1]
            .iter()
            .map(|f| {
                let json: Value =
                    serde_json::from_str(f.strip_prefix("data: ").unwrap().trim()).unwrap();
                json["id"].as_str().unwrap().to_string()
            })
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert!(ids[0].starts_with("chatcmpl-"));
    }

    #[tokio::test]
    async fn dropped_receiver_reports_cancellation() {
        let (frag_tx, frag_stream) = FragmentStream::channel(4);
        frag_tx.send(Ok("never seen".into())).await.unwrap();

        let ctx = ShapeContext::new("gpt-4", 1);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = stream_chunks(&ctx, frag_stream, &tx).await;
        assert!(matches!(outcome.error, Some(GateError::Cancelled)));
    }
}
