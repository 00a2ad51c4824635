//! Batched private delivery of the chat-wide apartment list.
//!
//! A single worker task drains pre-rendered chunks to one recipient with a
//! fixed delay between sends. The gate serializes batches process-wide and is
//! consulted by the dispatcher, which drops inbound updates while a batch is
//! running.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::catalog::MessageCatalog;
use crate::domain::ChatId;
use crate::messaging::port::MessagingPort;

/// Observable delivery state of the one allowed in-flight batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Sending,
    Failed,
}

#[derive(Clone, Copy, Debug)]
enum GateInner {
    Idle,
    Sending { since: Instant },
    Failed,
}

/// Serializes batch sends and suppresses dispatch while one is in flight.
///
/// The timeout bounds how long a batch may hold the gate: a worker that died
/// without releasing it (crash, runtime teardown) stops wedging dispatch once
/// the timeout elapses.
#[derive(Debug)]
pub struct BatchGate {
    state: Mutex<GateInner>,
    timeout: Duration,
}

impl BatchGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(GateInner::Idle),
            timeout,
        }
    }

    // The guarded state is a plain enum, so recovering a poisoned lock is safe.
    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Idle/Failed → Sending. False while a live batch holds the gate.
    pub fn try_begin(&self) -> bool {
        let mut state = self.lock();
        match *state {
            GateInner::Sending { since } if since.elapsed() < self.timeout => false,
            _ => {
                *state = GateInner::Sending {
                    since: Instant::now(),
                };
                true
            }
        }
    }

    /// Release the gate after a batch concludes, recording the outcome.
    pub fn finish(&self, success: bool) {
        *self.lock() = if success {
            GateInner::Idle
        } else {
            GateInner::Failed
        };
    }

    /// True while a live (non-expired) batch is in flight.
    pub fn is_sending(&self) -> bool {
        matches!(*self.lock(), GateInner::Sending { since } if since.elapsed() < self.timeout)
    }

    pub fn state(&self) -> BatchState {
        match *self.lock() {
            GateInner::Idle => BatchState::Idle,
            GateInner::Sending { since } if since.elapsed() < self.timeout => BatchState::Sending,
            GateInner::Sending { .. } => BatchState::Idle,
            GateInner::Failed => BatchState::Failed,
        }
    }
}

/// Pack lines into messages no longer than `limit` characters.
///
/// Lines never split across messages; before a line is added, the current
/// chunk is closed if the line plus its joining newline would push it past
/// the limit. A single line longer than the limit is emitted alone, whole,
/// in its own message. Empty chunks are never emitted.
pub fn build_messages(lines: &[String], limit: usize) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = String::new();
    for line in lines {
        if !current.is_empty() && current.len() + line.len() + 1 > limit {
            messages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

/// Spawns and owns the background drain of one batch at a time.
#[derive(Clone)]
pub struct BatchNotifier {
    messenger: Arc<dyn MessagingPort>,
    gate: Arc<BatchGate>,
    catalog: Arc<MessageCatalog>,
    delay: Duration,
    shutdown: CancellationToken,
}

impl BatchNotifier {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        gate: Arc<BatchGate>,
        catalog: Arc<MessageCatalog>,
        delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            messenger,
            gate,
            catalog,
            delay,
            shutdown,
        }
    }

    /// Start draining `chunks` to `recipient` on a background task.
    ///
    /// The caller must have moved the gate to Sending; the worker releases it
    /// when the drain concludes, whatever the outcome.
    pub fn spawn(&self, recipient: ChatId, chunks: Vec<String>) {
        let messenger = self.messenger.clone();
        let gate = self.gate.clone();
        let catalog = self.catalog.clone();
        let delay = self.delay;
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let success = drain(
                messenger.as_ref(),
                recipient,
                &chunks,
                delay,
                &shutdown,
                &catalog,
            )
            .await;
            gate.finish(success);
        });
    }
}

async fn drain(
    messenger: &dyn MessagingPort,
    recipient: ChatId,
    chunks: &[String],
    delay: Duration,
    shutdown: &CancellationToken,
    catalog: &MessageCatalog,
) -> bool {
    for (index, chunk) in chunks.iter().enumerate() {
        if index > 0 {
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("batch send cancelled at chunk {index}/{}", chunks.len());
                    return false;
                }
            }
        }
        if let Err(error) = messenger.send_markdown(recipient, chunk).await {
            tracing::error!(stage = "batch send", %error, "aborting remaining chunks");
            sleep(delay).await;
            if let Err(error) = messenger.send_text(recipient, &catalog.batch_failed).await {
                tracing::warn!(stage = "batch failure notice", %error, "failure notice undelivered");
            }
            return false;
        }
    }
    true
}
