//! Chat transport seam.
//!
//! The command core never talks to a chat platform directly; it sends text
//! through [`ChannelOutbound`], which the Discord crate implements.

pub mod plugin;

pub use plugin::{ChannelOutbound, Conversation, send_best_effort};
