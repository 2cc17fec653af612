//! Client side of the remote host's control API.
//!
//! - [`client::RemoteClient`] talks HTTP to the host (`/ping`, `/shutdown`,
//!   `/reboot`, `/scripts/...`).
//! - [`probe`] turns single liveness checks into a bounded poll.
//! - [`events`] decodes the server-sent event stream of a running script.
//! - [`wake`] builds and broadcasts Wake-on-LAN magic packets.

pub mod client;
pub mod control;
pub mod error;
pub mod events;
pub mod probe;
pub mod wake;

pub use {
    client::RemoteClient,
    control::HostControl,
    error::RemoteError,
    events::{EventStream, OutputEvent, ScriptErrorCode},
    probe::{Prober, WaitOptions, wait_until_online},
    wake::{MacAddress, MagicPacketSender, WakeError, WakeSignal},
};
