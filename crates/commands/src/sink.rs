//! Buffered, rate-limited delivery of streamed text to one conversation.
//!
//! Fragments are appended to a buffer and a periodic timer emits at most one
//! chat message per tick, each no longer than [`MAX_MESSAGE_CHARS`].

use std::{sync::Arc, time::Duration};

use {
    tokio::{
        sync::Mutex,
        task::JoinHandle,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, trace, warn},
};

use warden_channels::{ChannelOutbound, send_best_effort};

/// Discord rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Byte offset just past the first `max_chars` characters of `text`.
fn char_boundary(text: &str, max_chars: usize) -> usize {
    text.char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(idx, _)| idx)
}

/// Cut `text` into consecutive pieces of at most `max_chars` characters.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut buffer = OutputBuffer::default();
    buffer.push(text);
    std::iter::from_fn(|| buffer.take_chunk(max_chars)).collect()
}

/// Text waiting to be flushed.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    text: String,
}

impl OutputBuffer {
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Remove and return the next message: the first `max_chars` characters
    /// when the buffer is longer, otherwise everything. `None` when empty.
    pub fn take_chunk(&mut self, max_chars: usize) -> Option<String> {
        if self.text.is_empty() {
            return None;
        }
        let cut = char_boundary(&self.text, max_chars.max(1));
        if cut == self.text.len() {
            return Some(std::mem::take(&mut self.text));
        }
        let rest = self.text.split_off(cut);
        Some(std::mem::replace(&mut self.text, rest))
    }
}

/// Per-session buffer bound to the conversation it flushes into.
#[derive(Clone)]
pub struct BufferedSink {
    buffer: Arc<Mutex<OutputBuffer>>,
    outbound: Arc<dyn ChannelOutbound>,
    to: String,
}

impl BufferedSink {
    pub fn new(outbound: Arc<dyn ChannelOutbound>, to: impl Into<String>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(OutputBuffer::default())),
            outbound,
            to: to.into(),
        }
    }

    pub async fn append(&self, fragment: &str) {
        self.buffer.lock().await.push(fragment);
    }

    /// Emit at most one message. Returns false when there was nothing to send.
    pub async fn flush(&self) -> bool {
        let chunk = self.buffer.lock().await.take_chunk(MAX_MESSAGE_CHARS);
        let Some(chunk) = chunk else {
            return false;
        };
        trace!(channel = %self.to, chars = chunk.chars().count(), "flushing output");
        send_best_effort(self.outbound.as_ref(), &self.to, &chunk).await;
        true
    }

    /// Flush until the buffer is empty.
    pub async fn drain(&self) {
        while self.flush().await {}
    }

    /// Start flushing once per `period`, the first tick one period from now.
    pub fn start_timer(&self, period: Duration) -> FlushTimer {
        let sink = self.clone();
        let cancel = CancellationToken::new();
        let stop = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {},
                }
                // Outside the select so a stop request never cuts a send short.
                sink.flush().await;
            }
        });

        FlushTimer {
            cancel,
            handle: Some(handle),
        }
    }
}

/// Handle to a running flush timer.
///
/// [`FlushTimer::stop`] lets an in-progress flush finish; dropping the handle
/// without stopping aborts the task.
pub struct FlushTimer {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl FlushTimer {
    /// Stop the timer and wait for it to exit. Returns false if it was
    /// already stopped.
    pub async fn stop(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        self.cancel.cancel();
        if let Err(e) = handle.await {
            warn!(error = %e, "flush timer task failed");
        }
        debug!("flush timer stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
