use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::Stream;

use crate::error::GateError;

/// One chunk of raw text emitted by the external process. Fragments carry no
/// semantic structure; boundaries are whatever the pipe delivered.
pub type Fragment = String;

/// Producer half of a fragment channel.
pub type FragmentSender = mpsc::Sender<Result<Fragment, GateError>>;

/// Ordered, lazy, finite sequence of fragments from one CLI invocation.
///
/// The final item is `Err` when the invocation timed out or failed after
/// producing zero or more fragments. Dropping the stream cancels the
/// invocation: the producing side observes the closed channel and kills the
/// child process.
#[derive(Debug)]
pub struct FragmentStream {
    rx: mpsc::Receiver<Result<Fragment, GateError>>,
}

impl FragmentStream {
    pub fn new(rx: mpsc::Receiver<Result<Fragment, GateError>>) -> Self {
        Self { rx }
    }

    /// Create a connected sender/stream pair. Producers (the invoker, test
    /// fakes) keep the sender; consumers take the stream.
    pub fn channel(capacity: usize) -> (FragmentSender, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    pub async fn recv(&mut self) -> Option<Result<Fragment, GateError>> {
        self.rx.recv().await
    }
}

impl Stream for FragmentStream {
    type Item = Result<Fragment, GateError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
