//! In-memory stand-ins for the chat transport, the remote host and the wake
//! signal.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {anyhow::Result, async_trait::async_trait};

use {
    warden_channels::ChannelOutbound,
    warden_remote::{
        EventStream, HostControl, OutputEvent, Prober, RemoteError, WakeError, WakeSignal,
    },
};

/// A real `reqwest::Error` without touching the network.
pub fn transport_error() -> RemoteError {
    match reqwest::Client::new().get("not a url").build() {
        Err(e) => RemoteError::Transport(e),
        Ok(_) => panic!("relative url should not build"),
    }
}

#[derive(Default)]
pub struct RecordingOutbound {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingOutbound {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        Ok(())
    }
}

/// Scripted remote host. Every queue pops one answer per call; empty queues
/// fall back to "offline" / HTTP 500.
#[derive(Default)]
pub struct FakeHost {
    pub probes: Mutex<VecDeque<bool>>,
    pub shutdown: Mutex<VecDeque<Result<(), RemoteError>>>,
    pub reboot: Mutex<VecDeque<Result<(), RemoteError>>>,
    pub scripts: Mutex<VecDeque<Result<Vec<String>, RemoteError>>>,
    pub show: Mutex<VecDeque<Result<String, RemoteError>>>,
    pub runs: Mutex<VecDeque<Vec<Result<OutputEvent, RemoteError>>>>,
    calls: Mutex<Vec<String>>,
    probe_count: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_probes(answers: &[bool]) -> Arc<Self> {
        let host = Self::default();
        host.probes.lock().unwrap().extend(answers.iter().copied());
        Arc::new(host)
    }

    /// Calls other than probes, in order (`"shutdown"`, `"show:name"`, ...).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T, RemoteError>>>) -> Result<T, RemoteError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(RemoteError::Status(500)))
    }
}

#[async_trait]
impl Prober for FakeHost {
    async fn probe(&self) -> bool {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        self.probes.lock().unwrap().pop_front().unwrap_or(false)
    }
}

#[async_trait]
impl HostControl for FakeHost {
    async fn shutdown(&self) -> Result<(), RemoteError> {
        self.record("shutdown".into());
        Self::pop(&self.shutdown)
    }

    async fn reboot(&self) -> Result<(), RemoteError> {
        self.record("reboot".into());
        Self::pop(&self.reboot)
    }

    async fn list_scripts(&self) -> Result<Vec<String>, RemoteError> {
        self.record("scripts".into());
        Self::pop(&self.scripts)
    }

    async fn show_script(&self, name: &str) -> Result<String, RemoteError> {
        self.record(format!("show:{name}"));
        Self::pop(&self.show)
    }

    fn run_script(&self, name: &str) -> EventStream {
        self.record(format!("run:{name}"));
        let events = self.runs.lock().unwrap().pop_front().unwrap_or_default();
        Box::pin(futures::stream::iter(events))
    }
}

#[derive(Default)]
pub struct FakeWake {
    pub fail: bool,
    sends: AtomicUsize,
}

impl FakeWake {
    pub fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            sends: AtomicUsize::new(0),
        })
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WakeSignal for FakeWake {
    async fn wake(&self) -> Result<(), WakeError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WakeError::Io(std::io::Error::other("network unreachable")));
        }
        Ok(())
    }
}
