//! Server-sent events emitted by `GET /scripts/{name}/run`.
//!
//! The host streams `start`, `stdout`, `stderr`, `exit` and `err` events; the
//! data of all but `start` is a small JSON object.

use std::{fmt, pin::Pin};

use {serde::Deserialize, tokio_stream::Stream, tracing::trace};

use crate::error::RemoteError;

/// Decoded events of a running script, ending when the connection closes.
///
/// An `Err` item is a transport or open failure and is always the last item.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<OutputEvent, RemoteError>> + Send>>;

/// One event of a remote script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// The process was spawned.
    Start,
    Stdout(String),
    Stderr(String),
    /// The process exited; `None` when it was killed by a signal.
    Exit(Option<i64>),
    /// The host could not run the script.
    Error(ScriptErrorCode),
}

impl OutputEvent {
    /// Whether the host closes the run after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exit(_) | Self::Error(_))
    }

    /// Map a raw frame to an event. Unknown event names yield `Ok(None)`.
    pub fn from_frame(frame: &SseFrame) -> Result<Option<Self>, serde_json::Error> {
        let event = match frame.event.as_str() {
            "start" => Self::Start,
            "stdout" => Self::Stdout(serde_json::from_str::<LinePayload>(&frame.data)?.message),
            "stderr" => Self::Stderr(serde_json::from_str::<LinePayload>(&frame.data)?.message),
            "exit" => {
                let payload: CodePayload = serde_json::from_str(&frame.data)?;
                Self::Exit(payload.code.as_ref().and_then(serde_json::Value::as_i64))
            },
            "err" => {
                let payload: CodePayload = serde_json::from_str(&frame.data)?;
                Self::Error(ScriptErrorCode::from_json(payload.code.as_ref()))
            },
            other => {
                trace!(event = other, "ignoring unknown script event");
                return Ok(None);
            },
        };
        Ok(Some(event))
    }
}

#[derive(Deserialize)]
struct LinePayload {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct CodePayload {
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Error code attached to an `err` event.
///
/// The host sends either an HTTP-like number (`404`) or an errno name
/// (`"EACCES"`); both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptErrorCode(pub String);

impl ScriptErrorCode {
    fn from_json(value: Option<&serde_json::Value>) -> Self {
        match value {
            Some(serde_json::Value::String(s)) => Self(s.clone()),
            Some(serde_json::Value::Null) | None => Self("unknown".into()),
            Some(other) => Self(other.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.0.as_str(), "404" | "ENOENT")
    }

    /// The script exists but the host may not execute it.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.0.as_str(), "EACCES" | "EPERM")
    }
}

impl fmt::Display for ScriptErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser.
///
/// Feed arbitrary chunks; complete frames come out once their terminating
/// blank line has arrived. Lines are split on raw bytes so multi-byte
/// characters cut across chunks survive.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.handle_line(&line) {
                frames.push(frame);
            }
        }

        frames
    }

    fn handle_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // `id` and `retry` only matter for reconnection, which a script
            // run never attempts.
            _ => {},
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if event.is_none() && self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.unwrap_or_else(|| "message".into()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.into(),
            data: data.into(),
        }
    }

    #[test]
    fn parses_complete_frames() {
        let mut parser = SseParser::default();
        let frames = parser.feed(
            b"event: start\ndata: {}\n\nevent: stdout\ndata: {\"message\":\"hi\"}\n\n",
        );
        assert_eq!(frames, vec![
            frame("start", "{}"),
            frame("stdout", "{\"message\":\"hi\"}"),
        ]);
    }

    #[test]
    fn frames_split_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"event: exi").is_empty());
        assert!(parser.feed(b"t\r\ndata: {\"code\"").is_empty());
        let frames = parser.feed(b":0}\r\n\r\n");
        assert_eq!(frames, vec![frame("exit", "{\"code\":0}")]);
    }

    #[test]
    fn multibyte_character_across_chunks() {
        let mut parser = SseParser::default();
        let bytes = "event: stdout\ndata: {\"message\":\"größe\"}\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xc3).unwrap() + 1;
        assert!(parser.feed(&bytes[..split]).is_empty());
        let frames = parser.feed(&bytes[split..]);
        assert_eq!(frames[0].data, "{\"message\":\"größe\"}");
    }

    #[test]
    fn comments_and_unknown_fields_are_ignored() {
        let mut parser = SseParser::default();
        let frames = parser.feed(b": keep-alive\n\nid: 7\nretry: 1000\ndata: x\n\n");
        assert_eq!(frames, vec![frame("message", "x")]);
    }

    #[test]
    fn multiline_data_is_joined() {
        let mut parser = SseParser::default();
        let frames = parser.feed(b"data: a\ndata: b\n\n");
        assert_eq!(frames, vec![frame("message", "a\nb")]);
    }

    #[test]
    fn decodes_every_event_kind() {
        let decode = |e: &str, d: &str| OutputEvent::from_frame(&frame(e, d)).unwrap();
        assert_eq!(decode("start", ""), Some(OutputEvent::Start));
        assert_eq!(
            decode("stdout", r#"{"message":"line"}"#),
            Some(OutputEvent::Stdout("line".into()))
        );
        assert_eq!(
            decode("stderr", r#"{"message":"oops"}"#),
            Some(OutputEvent::Stderr("oops".into()))
        );
        assert_eq!(decode("exit", r#"{"code":3}"#), Some(OutputEvent::Exit(Some(3))));
        assert_eq!(decode("exit", r#"{"code":null}"#), Some(OutputEvent::Exit(None)));
        assert_eq!(
            decode("err", r#"{"code":"EACCES"}"#),
            Some(OutputEvent::Error(ScriptErrorCode("EACCES".into())))
        );
        assert_eq!(decode("open", ""), None);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(OutputEvent::from_frame(&frame("stdout", "not json")).is_err());
    }

    #[rstest]
    #[case(r#"{"code":404}"#, true, false)]
    #[case(r#"{"code":"ENOENT"}"#, true, false)]
    #[case(r#"{"code":"EACCES"}"#, false, true)]
    #[case(r#"{"code":"EPERM"}"#, false, true)]
    #[case(r#"{"code":500}"#, false, false)]
    #[case(r#"{}"#, false, false)]
    fn error_code_classification(
        #[case] data: &str,
        #[case] not_found: bool,
        #[case] permission: bool,
    ) {
        let Some(OutputEvent::Error(code)) =
            OutputEvent::from_frame(&frame("err", data)).unwrap()
        else {
            panic!("expected an error event");
        };
        assert_eq!(code.is_not_found(), not_found);
        assert_eq!(code.is_permission_denied(), permission);
    }

    #[test]
    fn terminal_events() {
        assert!(OutputEvent::Exit(Some(0)).is_terminal());
        assert!(OutputEvent::Error(ScriptErrorCode("1".into())).is_terminal());
        assert!(!OutputEvent::Stdout(String::new()).is_terminal());
    }
}
