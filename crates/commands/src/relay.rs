//! Relays a remote script run into a conversation.
//!
//! Events are rendered into a [`BufferedSink`]; a flush timer delivers the
//! buffer at a fixed cadence while the script runs, and the remainder is
//! drained once the run ends.

use std::{sync::Arc, time::Duration};

use {
    futures::StreamExt,
    tracing::{debug, info, warn},
};

use {
    warden_channels::ChannelOutbound,
    warden_remote::{EventStream, HostControl, OutputEvent, RemoteError, ScriptErrorCode},
};

use crate::{
    reply::notice,
    sink::{BufferedSink, FlushTimer},
};

/// How a script run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited; `None` when the host sent no usable code.
    Exited(Option<i64>),
    /// The host reported an `err` event.
    Failed(ScriptErrorCode),
    /// The host has no script of that name.
    NotFound,
    /// Scripts are switched off on the host.
    Disabled,
    /// The stream broke or ended before a terminal event.
    Disconnected,
}

/// State of one `run` invocation: the open event stream, the output buffer
/// and its flush timer.
pub struct ScriptRunSession {
    script: String,
    stream: Option<EventStream>,
    sink: BufferedSink,
    timer: FlushTimer,
    finished: bool,
}

impl ScriptRunSession {
    /// Take ownership of `stream` and start flushing `sink` every
    /// `flush_interval`.
    pub fn start(
        script: impl Into<String>,
        stream: EventStream,
        sink: BufferedSink,
        flush_interval: Duration,
    ) -> Self {
        let timer = sink.start_timer(flush_interval);
        Self {
            script: script.into(),
            stream: Some(stream),
            sink,
            timer,
            finished: false,
        }
    }

    /// Consume events until the run ends, then tear the session down.
    pub async fn run(mut self) -> RunOutcome {
        let outcome = loop {
            let Some(stream) = self.stream.as_mut() else {
                break RunOutcome::Disconnected;
            };
            let next = stream.next().await;
            match next {
                Some(Ok(event)) => {
                    if let Some(outcome) = self.on_event(event).await {
                        break outcome;
                    }
                },
                Some(Err(e)) => break self.on_error(e).await,
                None => {
                    warn!(script = %self.script, "script stream ended without exit event");
                    self.sink.append(&notice::offline()).await;
                    break RunOutcome::Disconnected;
                },
            }
        };
        self.finish().await;
        outcome
    }

    /// Render one event. Returns the outcome once the event ends the run.
    async fn on_event(&mut self, event: OutputEvent) -> Option<RunOutcome> {
        let script = self.script.as_str();
        match event {
            OutputEvent::Start => {
                debug!(script, "script started");
                self.sink.append(&notice::started(script)).await;
                None
            },
            OutputEvent::Stdout(line) => {
                if let Some(text) = notice::stdout(&line) {
                    self.sink.append(&text).await;
                }
                None
            },
            OutputEvent::Stderr(line) => {
                if let Some(text) = notice::stderr(&line) {
                    self.sink.append(&text).await;
                }
                None
            },
            OutputEvent::Exit(code) => {
                info!(script, code, "script exited");
                self.sink.append(&notice::exited(script, code)).await;
                Some(RunOutcome::Exited(code))
            },
            OutputEvent::Error(code) => {
                warn!(script, code = %code, "host failed to run script");
                self.sink.append(&notice::failed(script, &code)).await;
                if code.is_not_found() {
                    Some(RunOutcome::NotFound)
                } else {
                    Some(RunOutcome::Failed(code))
                }
            },
        }
    }

    /// Map a stream failure. Status errors only occur while opening the
    /// stream; transport errors may occur at any point.
    async fn on_error(&mut self, error: RemoteError) -> RunOutcome {
        let script = self.script.as_str();
        let (text, outcome) = if error.is_not_found() {
            (notice::not_found(script), RunOutcome::NotFound)
        } else if error.is_forbidden() {
            (notice::disabled(), RunOutcome::Disabled)
        } else {
            warn!(script, error = %error, "script stream failed");
            (notice::offline(), RunOutcome::Disconnected)
        };
        self.sink.append(&text).await;
        outcome
    }

    /// Close the stream, stop the timer and drain the buffer. Only the first
    /// call does anything.
    pub async fn finish(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        self.stream = None;
        self.timer.stop().await;
        self.sink.drain().await;
        debug!(script = %self.script, "script session closed");
        true
    }
}

/// Run `script` on the host and relay its output to `to`.
pub async fn run_script(
    host: &dyn HostControl,
    outbound: Arc<dyn ChannelOutbound>,
    to: &str,
    script: &str,
    flush_interval: Duration,
) -> RunOutcome {
    info!(script, channel = to, "running script");
    let sink = BufferedSink::new(outbound, to);
    ScriptRunSession::start(script, host.run_script(script), sink, flush_interval)
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{FakeHost, RecordingOutbound, transport_error},
    };

    const TICK: Duration = Duration::from_millis(1000);

    async fn relay(events: Vec<Result<OutputEvent, RemoteError>>) -> (RunOutcome, String) {
        let host = FakeHost::new();
        host.runs.lock().unwrap().push_back(events);
        let out = RecordingOutbound::new();
        let outcome = run_script(host.as_ref(), out.clone(), "c1", "job.sh", TICK).await;
        assert_eq!(host.calls(), vec!["run:job.sh"]);
        (outcome, out.texts().concat())
    }

    #[tokio::test(start_paused = true)]
    async fn successful_run_is_relayed_in_order() {
        let (outcome, text) = relay(vec![
            Ok(OutputEvent::Start),
            Ok(OutputEvent::Stdout("  building  ".into())),
            Ok(OutputEvent::Stdout("   ".into())),
            Ok(OutputEvent::Stderr("warning: unused".into())),
            Ok(OutputEvent::Stdout("done\n".into())),
            Ok(OutputEvent::Exit(Some(0))),
        ])
        .await;

        assert_eq!(outcome, RunOutcome::Exited(Some(0)));
        assert_eq!(
            text,
            concat!(
                ":clock2: Running *job.sh*...\n",
                ":small_blue_diamond: building\n",
                ":small_orange_diamond: warning: unused\n",
                ":small_blue_diamond: done\n",
                ":white_check_mark: Script *job.sh* exited with code 0",
            )
        );
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test(start_paused = true)]
    async fn session_future_is_send() {
        let out = RecordingOutbound::new();
        let sink = BufferedSink::new(out.clone(), "c1");
        let events: Vec<Result<OutputEvent, RemoteError>> = vec![Ok(OutputEvent::Exit(Some(0)))];
        let stream: EventStream = Box::pin(futures::stream::iter(events));
        let run = ScriptRunSession::start("job.sh", stream, sink, TICK).run();
        assert_send(&run);
        assert_eq!(run.await, RunOutcome::Exited(Some(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn exit_without_code() {
        let (outcome, text) = relay(vec![
            Ok(OutputEvent::Start),
            Ok(OutputEvent::Exit(None)),
        ])
        .await;
        assert_eq!(outcome, RunOutcome::Exited(None));
        assert!(text.ends_with(":warning: Script *job.sh* exited without an exit code"));
    }

    #[tokio::test(start_paused = true)]
    async fn events_after_exit_are_not_read() {
        let (outcome, text) = relay(vec![
            Ok(OutputEvent::Exit(Some(3))),
            Ok(OutputEvent::Stdout("late".into())),
        ])
        .await;
        assert_eq!(outcome, RunOutcome::Exited(Some(3)));
        assert_eq!(text, ":warning: Script *job.sh* exited with code 3");
    }

    #[tokio::test(start_paused = true)]
    async fn err_event_not_found() {
        let (outcome, text) = relay(vec![
            Ok(OutputEvent::Start),
            Ok(OutputEvent::Error(ScriptErrorCode("404".into()))),
        ])
        .await;
        assert_eq!(outcome, RunOutcome::NotFound);
        assert!(text.ends_with(":x: Script *job.sh* not found.\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn err_event_permission_hint() {
        let (outcome, text) =
            relay(vec![Ok(OutputEvent::Error(ScriptErrorCode("EACCES".into())))]).await;
        assert_eq!(outcome, RunOutcome::Failed(ScriptErrorCode("EACCES".into())));
        assert!(text.contains("Error Code: EACCES"));
        assert!(text.contains("execute permissions"));
    }

    #[tokio::test(start_paused = true)]
    async fn stream_ending_early_is_a_disconnect() {
        let (outcome, text) = relay(vec![
            Ok(OutputEvent::Start),
            Ok(OutputEvent::Stdout("partial".into())),
        ])
        .await;
        assert_eq!(outcome, RunOutcome::Disconnected);
        assert!(text.starts_with(":clock2: Running *job.sh*...\n:small_blue_diamond: partial\n"));
        assert!(text.ends_with("Maybe, the client is offline?\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_mid_run_keeps_buffered_output() {
        let (outcome, text) = relay(vec![
            Ok(OutputEvent::Stdout("first".into())),
            Err(transport_error()),
        ])
        .await;
        assert_eq!(outcome, RunOutcome::Disconnected);
        assert_eq!(
            text,
            ":small_blue_diamond: first\n:x: An error occurred while running the script. Maybe, the client is offline?\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn open_status_classification() {
        let (outcome, text) = relay(vec![Err(RemoteError::Status(403))]).await;
        assert_eq!(outcome, RunOutcome::Disabled);
        assert_eq!(text, notice::disabled());

        let (outcome, text) = relay(vec![Err(RemoteError::Status(404))]).await;
        assert_eq!(outcome, RunOutcome::NotFound);
        assert_eq!(text, notice::not_found("job.sh"));

        let (outcome, text) = relay(vec![Err(RemoteError::Status(502))]).await;
        assert_eq!(outcome, RunOutcome::Disconnected);
        assert_eq!(text, notice::offline());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_run_is_flushed_by_the_timer() {
        let events: Vec<Result<OutputEvent, RemoteError>> = vec![
            Ok(OutputEvent::Start),
            Ok(OutputEvent::Stdout("step".into())),
            Ok(OutputEvent::Exit(Some(0))),
        ];
        let stream: EventStream = Box::pin(futures::stream::iter(events).then(|event| async move {
            tokio::time::sleep(Duration::from_millis(1700)).await;
            event
        }));
        let out = RecordingOutbound::new();
        let sink = BufferedSink::new(out.clone(), "c1");

        let outcome = ScriptRunSession::start("job.sh", stream, sink, TICK).run().await;

        assert_eq!(outcome, RunOutcome::Exited(Some(0)));
        assert_eq!(out.texts(), vec![
            ":clock2: Running *job.sh*...\n".to_string(),
            ":small_blue_diamond: step\n".to_string(),
            ":white_check_mark: Script *job.sh* exited with code 0".to_string(),
        ]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(out.texts().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn finish_runs_once() {
        let out = RecordingOutbound::new();
        let sink = BufferedSink::new(out.clone(), "c1");
        sink.append("pending").await;
        let stream: EventStream = Box::pin(futures::stream::pending::<Result<OutputEvent, RemoteError>>());

        let mut session = ScriptRunSession::start("job.sh", stream, sink, TICK);
        assert!(session.finish().await);
        assert!(!session.finish().await);
        assert!(session.stream.is_none());
        assert!(!session.timer.is_running());
        assert_eq!(out.texts(), vec!["pending".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn long_output_is_split_on_final_flush() {
        let host = FakeHost::new();
        host.runs.lock().unwrap().push_back(vec![
            Ok(OutputEvent::Stdout("x".repeat(4500))),
            Ok(OutputEvent::Exit(Some(0))),
        ]);
        let out = RecordingOutbound::new();
        run_script(host.as_ref(), out.clone(), "c1", "job.sh", TICK).await;

        let lens: Vec<_> = out.texts().iter().map(|t| t.chars().count()).collect();
        assert_eq!(lens[..2], [2000, 2000]);
        assert_eq!(lens.len(), 3);
    }
}
