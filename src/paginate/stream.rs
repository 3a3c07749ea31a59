//! Single-pass record stream fed by the pagination driver

use crate::error::Result;
use crate::types::Record;
use futures::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A lazy, single-pass stream of records from one paginated fetch.
///
/// Page batches produced by the driver task are interleaved into this stream
/// through a bounded channel; within a batch the server order is preserved.
/// After the first `Err` the stream is exhausted.
pub struct RecordStream {
    rx: mpsc::Receiver<Result<Vec<Record>>>,
    buffer: VecDeque<Record>,
    done: bool,
}

impl RecordStream {
    pub(crate) fn new(rx: mpsc::Receiver<Result<Vec<Record>>>) -> Self {
        Self {
            rx,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Drain the stream into a vector, failing on the first error.
    ///
    /// A partial batch is never returned: any failure discards the records
    /// collected so far.
    pub async fn collect_records(mut self) -> Result<Vec<Record>> {
        use futures::StreamExt;

        let mut records = Vec::new();
        while let Some(item) = self.next().await {
            records.push(item?);
        }
        Ok(records)
    }
}

impl Stream for RecordStream {
    type Item = Result<Record>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(record) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(record)));
            }
            if this.done {
                return Poll::Ready(None);
            }
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(Ok(batch))) => this.buffer.extend(batch),
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("buffered", &self.buffer.len())
            .field("done", &self.done)
            .finish()
    }
}
