//! Buffering flush worker: batches serialized entries on a timer and writes
//! each batch to a [`BatchSink`] from an isolated tokio task.
//!
//! Callers only ever hold a [`FlushHandle`], which sends owned messages down
//! an unbounded channel. The worker owns the queue and the sink; nothing is
//! shared with the caller.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, trace};

use crate::error::{SinkWriteError, WorkerError, DIAGNOSTIC_TARGET};
use crate::rotating::RotatingSink;

/// Delay between the first enqueue into an empty queue and the flush.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Sink seam
// ---------------------------------------------------------------------------

/// Destination for concatenated batches. Runs on the blocking pool.
pub trait BatchSink: Send + 'static {
    fn write_batch(&mut self, payload: &[u8]) -> Result<(), SinkWriteError>;
}

impl BatchSink for RotatingSink {
    fn write_batch(&mut self, payload: &[u8]) -> Result<(), SinkWriteError> {
        self.write(payload)
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPhase {
    /// Queue empty, no timer armed.
    Idle,
    /// Timer armed; entries are accumulating.
    Scheduled,
    /// A batch write is in progress.
    Flushing,
}

/// IDLE → SCHEDULED → FLUSHING → IDLE transitions of one worker.
///
/// Each method reports what the driver has to do next; the scheduler itself
/// owns no timer and no queue. At most one flush is ever in progress.
#[derive(Debug, Clone)]
pub struct FlushScheduler {
    phase: FlushPhase,
}

impl FlushScheduler {
    pub fn new() -> Self {
        Self {
            phase: FlushPhase::Idle,
        }
    }

    pub fn phase(&self) -> FlushPhase {
        self.phase
    }

    /// An entry was queued. Returns `true` when the timer must be armed.
    pub fn on_enqueue(&mut self) -> bool {
        if self.phase == FlushPhase::Idle {
            self.phase = FlushPhase::Scheduled;
            true
        } else {
            false
        }
    }

    /// The timer fired. Returns `true` when a flush must start; firing in
    /// any phase other than SCHEDULED is a no-op.
    pub fn on_timer(&mut self) -> bool {
        if self.phase == FlushPhase::Scheduled {
            self.phase = FlushPhase::Flushing;
            true
        } else {
            false
        }
    }

    /// The in-progress write finished. `pending` says whether entries were
    /// queued meanwhile; if so the scheduler goes straight back to
    /// SCHEDULED and returns `true` so the timer is re-armed.
    pub fn on_flush_complete(&mut self, pending: bool) -> bool {
        if pending {
            self.phase = FlushPhase::Scheduled;
            true
        } else {
            self.phase = FlushPhase::Idle;
            false
        }
    }

    /// Start a flush outside the timer (shutdown drain). Returns `false` if
    /// one is already in progress.
    pub fn begin_drain(&mut self) -> bool {
        if self.phase == FlushPhase::Flushing {
            false
        } else {
            self.phase = FlushPhase::Flushing;
            true
        }
    }
}

impl Default for FlushScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

enum Command {
    Entry(Vec<u8>),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap, cloneable sender side of a flush worker.
#[derive(Clone)]
pub struct FlushHandle {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for FlushHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushHandle")
            .field("name", &self.name)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl FlushHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue one serialized entry. Never blocks. Fails only once the worker
    /// has shut down.
    pub fn enqueue(&self, line: Vec<u8>) -> Result<(), WorkerError> {
        self.tx
            .send(Command::Entry(line))
            .map_err(|_| WorkerError::Closed)
    }

    /// Ask the worker to flush everything queued so far and stop, waiting at
    /// most `timeout` for it to finish.
    ///
    /// The request travels down the same channel as entries, so every entry
    /// enqueued before this call is part of the final flush.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), WorkerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(ack_tx))
            .map_err(|_| WorkerError::Closed)?;

        match tokio::time::timeout(timeout, ack_rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(WorkerError::Closed),
            Err(_) => {
                error!(
                    target: DIAGNOSTIC_TARGET,
                    worker = %self.name,
                    ?timeout,
                    "flush worker did not drain before the shutdown deadline"
                );
                Err(WorkerError::ShutdownTimeout(timeout))
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Spawn a flush worker writing to `sink` and return its handle together
/// with the task's join handle.
///
/// The worker:
///
/// * Arms a one-shot timer of `interval` on the first enqueue into an idle
///   queue.
/// * On expiry, swaps the queue out, concatenates it in enqueue order and
///   writes it to the sink as one payload.
/// * On shutdown (explicit, or when every handle is dropped) cancels the
///   timer and performs one final flush before exiting.
///
/// Must be called from within a tokio runtime.
pub fn spawn<S: BatchSink>(
    name: impl Into<String>,
    sink: S,
    interval: Duration,
) -> (FlushHandle, JoinHandle<()>) {
    let name: Arc<str> = Arc::from(name.into());
    let (tx, rx) = mpsc::unbounded_channel();

    let worker = Worker {
        name: Arc::clone(&name),
        sink: Arc::new(Mutex::new(sink)),
        interval,
        scheduler: FlushScheduler::new(),
        queue: Vec::new(),
    };
    let handle = tokio::spawn(worker.run(rx));

    (FlushHandle { name, tx }, handle)
}

type InFlight = (usize, JoinHandle<Result<(), SinkWriteError>>);

struct Worker<S> {
    name: Arc<str>,
    sink: Arc<Mutex<S>>,
    interval: Duration,
    scheduler: FlushScheduler,
    queue: Vec<Vec<u8>>,
}

impl<S: BatchSink> Worker<S> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let timer = tokio::time::sleep(self.interval);
        tokio::pin!(timer);
        let mut armed = false;
        let mut in_flight: Option<InFlight> = None;
        let mut acks = Vec::new();

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Entry(line)) => {
                        self.queue.push(line);
                        if self.scheduler.on_enqueue() {
                            timer.as_mut().reset(tokio::time::Instant::now() + self.interval);
                            armed = true;
                        }
                    }
                    Some(Command::Shutdown(ack)) => {
                        acks.push(ack);
                        break;
                    }
                    None => break,
                },

                () = &mut timer, if armed => {
                    armed = false;
                    if self.scheduler.on_timer() {
                        match self.start_flush() {
                            Some(flush) => in_flight = Some(flush),
                            None => {
                                self.scheduler.on_flush_complete(false);
                            }
                        }
                    }
                }

                joined = async {
                    match in_flight.as_mut() {
                        Some((_, handle)) => handle.await,
                        None => std::future::pending().await,
                    }
                }, if in_flight.is_some() => {
                    let count = in_flight.take().map(|(count, _)| count).unwrap_or(0);
                    self.report(count, joined);
                    if self.scheduler.on_flush_complete(!self.queue.is_empty()) {
                        timer.as_mut().reset(tokio::time::Instant::now() + self.interval);
                        armed = true;
                    }
                }
            }
        }

        // Shutdown: the timer is simply never polled again. Stop accepting
        // entries, then pick up anything that raced in behind the request.
        rx.close();
        while let Ok(command) = rx.try_recv() {
            match command {
                Command::Entry(line) => self.queue.push(line),
                Command::Shutdown(ack) => acks.push(ack),
            }
        }

        if let Some((count, handle)) = in_flight.take() {
            self.report(count, handle.await);
            self.scheduler.on_flush_complete(!self.queue.is_empty());
        }

        if !self.queue.is_empty() && self.scheduler.begin_drain() {
            if let Some((count, handle)) = self.start_flush() {
                self.report(count, handle.await);
            }
            self.scheduler.on_flush_complete(false);
        }

        debug!(worker = %self.name, "flush worker shutting down");
        for ack in acks {
            let _ = ack.send(());
        }
    }

    /// Swap the queue out and hand the concatenated batch to the blocking
    /// pool. Returns `None` for an empty queue.
    fn start_flush(&mut self) -> Option<InFlight> {
        if self.queue.is_empty() {
            return None;
        }

        let batch = std::mem::take(&mut self.queue);
        let count = batch.len();
        let payload = batch.concat();
        let sink = Arc::clone(&self.sink);

        let handle = tokio::task::spawn_blocking(move || {
            let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
            sink.write_batch(&payload)
        });
        Some((count, handle))
    }

    fn report(&self, count: usize, joined: Result<Result<(), SinkWriteError>, JoinError>) {
        match joined {
            Ok(Ok(())) => trace!(worker = %self.name, entries = count, "flushed batch"),
            Ok(Err(err)) => error!(
                target: DIAGNOSTIC_TARGET,
                worker = %self.name,
                lost = count,
                %err,
                "batch write failed; entries dropped"
            ),
            Err(err) => error!(
                target: DIAGNOSTIC_TARGET,
                worker = %self.name,
                lost = count,
                %err,
                "batch write task aborted; entries dropped"
            ),
        }
    }
}
