use async_trait::async_trait;

use crate::{error::RemoteError, events::EventStream, probe::Prober};

/// Everything the command dispatcher asks of the remote host.
#[async_trait]
pub trait HostControl: Prober {
    /// `GET /shutdown`; `Ok` only on an explicit 200.
    async fn shutdown(&self) -> Result<(), RemoteError>;

    /// `GET /reboot`; `Ok` only on an explicit 200.
    async fn reboot(&self) -> Result<(), RemoteError>;

    /// `GET /scripts`, in the order the host lists them.
    async fn list_scripts(&self) -> Result<Vec<String>, RemoteError>;

    /// `GET /scripts/{name}/show`.
    async fn show_script(&self, name: &str) -> Result<String, RemoteError>;

    /// Open `GET /scripts/{name}/run`. Dropping the stream closes the connection.
    fn run_script(&self, name: &str) -> EventStream;
}
