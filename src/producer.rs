//! Request bodies produced on a background task while the request is in flight.
//!
//! The producer writes chunks into a bounded channel; the HTTP client drains
//! the other end. Memory use is bounded by the channel capacity regardless
//! of the body size. A producer failure is recorded before the write end
//! closes, so the consumer sees an error instead of a clean end of body and
//! the dispatcher can report the failure without waiting on the task.

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::DeeplError;

/// Number of in-flight chunks between producer and consumer.
pub const PIPE_CAPACITY: usize = 4;

/// Source of a body that has to be generated afresh for every attempt.
pub trait BodyProducer: Send + Sync {
    /// Starts a new producer for one attempt.
    fn produce(&self) -> StreamingBody;
}

#[derive(Debug)]
struct ConsumerGone;

impl fmt::Display for ConsumerGone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("request body consumer went away")
    }
}

impl std::error::Error for ConsumerGone {}

fn is_consumer_gone(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<ConsumerGone>())
}

/// State shared by the producer task, the body stream and the handle.
#[derive(Debug, Default)]
struct Outcome {
    failure: Mutex<Option<io::Error>>,
    stopped: AtomicBool,
}

impl Outcome {
    fn record(&self, err: io::Error) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    fn take_failure(&self) -> Option<io::Error> {
        let failure = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if failure.is_some() {
            self.stopped.store(true, Ordering::SeqCst);
        }
        failure
    }

    /// Error the consumer sees once the pipe is closed and empty, if the body
    /// did not end cleanly.
    fn end_of_body(&self) -> Option<io::Error> {
        if let Some(err) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Some(io::Error::new(err.kind(), err.to_string()));
        }
        self.stopped.load(Ordering::SeqCst).then(|| {
            io::Error::new(
                io::ErrorKind::Interrupted,
                "request body production was stopped",
            )
        })
    }
}

/// Write end of the body pipe handed to a producer.
#[derive(Debug)]
pub struct BodyWriter {
    tx: mpsc::Sender<Bytes>,
}

impl BodyWriter {
    /// Sends one chunk, waiting while the pipe is full.
    ///
    /// Fails once the consumer dropped its end, so a producer bails out with
    /// `?` instead of writing into the void.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> io::Result<()> {
        self.tx
            .send(chunk.into())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, ConsumerGone))
    }
}

/// Read end of the pipe plus the handle of the task feeding it.
#[derive(Debug)]
pub struct StreamingBody {
    chunks: mpsc::Receiver<Bytes>,
    production: ProductionHandle,
}

impl StreamingBody {
    /// Splits into a `reqwest` body and the producer's completion handle.
    pub fn into_parts(self) -> (reqwest::Body, ProductionHandle) {
        let (stream, production) = self.into_stream();
        (reqwest::Body::wrap_stream(stream), production)
    }

    fn into_stream(
        self,
    ) -> (impl Stream<Item = io::Result<Bytes>>, ProductionHandle) {
        let state = Some((self.chunks, Arc::clone(&self.production.outcome)));
        let stream = futures_util::stream::unfold(state, |state| async move {
            let (mut chunks, outcome) = state?;
            match chunks.recv().await {
                Some(chunk) => Some((Ok(chunk), Some((chunks, outcome)))),
                None => outcome.end_of_body().map(|err| (Err(err), None)),
            }
        });
        (stream, self.production)
    }

    #[cfg(test)]
    pub(crate) fn into_raw(self) -> (mpsc::Receiver<Bytes>, ProductionHandle) {
        (self.chunks, self.production)
    }
}

/// Completion of a body producer task.
///
/// Dropping the handle aborts the task, which releases whatever the
/// producer holds open.
#[derive(Debug)]
pub struct ProductionHandle {
    task: Option<JoinHandle<()>>,
    outcome: Arc<Outcome>,
}

impl ProductionHandle {
    /// Reports the producer's failure, if any, without waiting for a producer
    /// that is still writing.
    ///
    /// Once the exchange is over nobody drains the pipe any more, so a
    /// producer that has not finished is stopped instead of awaited. That, and
    /// a producer that only stopped because the consumer went away, is not a
    /// production failure; the consumer-side error stays the one the caller
    /// sees.
    pub async fn finish(mut self) -> Result<(), DeeplError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let finished = task.is_finished();
        if !finished {
            self.outcome.stopped.store(true, Ordering::SeqCst);
            task.abort();
        }
        if let Some(err) = self.outcome.take_failure() {
            return Err(DeeplError::Production(err));
        }
        if !finished {
            return Ok(());
        }
        match task.await {
            Err(join) if join.is_panic() => {
                Err(DeeplError::Production(io::Error::other(join.to_string())))
            }
            _ => Ok(()),
        }
    }
}

impl Drop for ProductionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.outcome.stopped.store(true, Ordering::SeqCst);
            task.abort();
        }
    }
}

/// Spawns `produce` on the runtime and returns the body it writes.
///
/// The write end closes when the task ends, so the consumer never waits for
/// data that cannot arrive. A failure is recorded first, which turns that
/// close into an error item rather than a truncated body.
pub fn spawn_producer<F, Fut>(capacity: usize, produce: F) -> StreamingBody
where
    F: FnOnce(BodyWriter) -> Fut,
    Fut: Future<Output = io::Result<()>> + Send + 'static,
{
    let (tx, chunks) = mpsc::channel(capacity.max(1));
    let outcome = Arc::new(Outcome::default());
    let production = produce(BodyWriter { tx: tx.clone() });
    let recorder = Arc::clone(&outcome);
    let task = tokio::spawn(async move {
        if let Err(err) = production.await {
            if !is_consumer_gone(&err) {
                recorder.record(err);
            }
        }
        drop(tx);
    });
    StreamingBody {
        chunks,
        production: ProductionHandle {
            task: Some(task),
            outcome,
        },
    }
}
