//! Cancellable output stream for batch retrieval.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vertex_block_primitives::Block;

/// Blocks produced by a batch retrieval.
///
/// Wraps the receiving half of the producer's bounded queue. The stream
/// ends when the producer finishes, or as soon as `ctx` is cancelled: once
/// cancellation is observed no further block is yielded, even if some are
/// already queued.
#[derive(Debug)]
pub struct BlockStream {
    rx: mpsc::Receiver<Block>,
    ctx: CancellationToken,
}

impl BlockStream {
    /// Create a stream draining `rx` until it closes or `ctx` is cancelled.
    pub fn new(rx: mpsc::Receiver<Block>, ctx: CancellationToken) -> Self {
        Self { rx, ctx }
    }

    /// Returns true if the stream's context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
    }
}

impl Stream for BlockStream {
    type Item = Block;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.ctx.is_cancelled() {
            // Stop the producer at its next send.
            this.rx.close();
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}
