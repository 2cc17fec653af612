//! Operator command handling.
//!
//! Inbound chat text is parsed into a [`request::CommandRequest`], the
//! [`dispatcher::Dispatcher`] runs the matching flow against the remote host,
//! and script output is relayed through a rate-limited [`sink::BufferedSink`].

pub mod dispatcher;
pub mod relay;
pub mod reply;
pub mod request;
pub mod sink;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod testing;

pub use {
    dispatcher::{DispatchSettings, Dispatcher},
    relay::{RunOutcome, ScriptRunSession},
    reply::Reply,
    request::{Command, CommandRequest},
};
