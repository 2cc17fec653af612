//! HTTP client for the remote host's control API.

use std::time::Duration;

use {
    async_trait::async_trait,
    futures::StreamExt,
    reqwest::{Client, Response, StatusCode, header::ACCEPT},
    tracing::{debug, warn},
};

use crate::{
    control::HostControl,
    error::RemoteError,
    events::{EventStream, OutputEvent, SseParser},
    probe::Prober,
};

/// Talks to one host's control API over plain HTTP.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl RemoteClient {
    /// `base_url` is e.g. `http://192.168.1.20:3000`, without trailing slash.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeouts(base_url, Duration::from_secs(3), Duration::from_secs(10))
    }

    /// The probe timeout bounds `/ping`; the request timeout bounds every
    /// other call and the connect phase of a script run. A running script's
    /// stream itself has no deadline.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        probe_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build tuned http client, using defaults");
                Client::new()
            });
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            probe_timeout,
            request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn script_url(&self, name: &str, action: &str) -> String {
        self.url(&format!("/scripts/{}/{action}", urlencoding::encode(name)))
    }

    async fn get(&self, url: &str) -> Result<Response, RemoteError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        debug!(url, status = resp.status().as_u16(), "control request");
        Ok(resp)
    }

    /// Fail with [`RemoteError::Status`] unless the answer is exactly 200.
    fn expect_ok(resp: Response) -> Result<Response, RemoteError> {
        match resp.status() {
            StatusCode::OK => Ok(resp),
            status => Err(RemoteError::Status(status.as_u16())),
        }
    }

    async fn command(&self, path: &str) -> Result<(), RemoteError> {
        let resp = self.get(&self.url(path)).await?;
        Self::expect_ok(resp).map(|_| ())
    }
}

#[async_trait]
impl Prober for RemoteClient {
    async fn probe(&self) -> bool {
        let result = self
            .client
            .get(self.url("/ping"))
            .timeout(self.probe_timeout)
            .send()
            .await;
        match result {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(e) => {
                debug!(error = %e, "ping failed");
                false
            },
        }
    }
}

#[async_trait]
impl HostControl for RemoteClient {
    async fn shutdown(&self) -> Result<(), RemoteError> {
        self.command("/shutdown").await
    }

    async fn reboot(&self) -> Result<(), RemoteError> {
        self.command("/reboot").await
    }

    async fn list_scripts(&self) -> Result<Vec<String>, RemoteError> {
        let resp = Self::expect_ok(self.get(&self.url("/scripts")).await?)?;
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn show_script(&self, name: &str) -> Result<String, RemoteError> {
        let resp = Self::expect_ok(self.get(&self.script_url(name, "show")).await?)?;
        Ok(resp.text().await?)
    }

    fn run_script(&self, name: &str) -> EventStream {
        let request = self
            .client
            .get(self.script_url(name, "run"))
            .header(ACCEPT, "text/event-stream");
        let script = name.to_string();

        Box::pin(async_stream::stream! {
            let resp = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    yield Err(RemoteError::from(e));
                    return;
                }
            };
            let resp = match RemoteClient::expect_ok(resp) {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            debug!(script = %script, "script event stream opened");

            let mut bytes = resp.bytes_stream();
            let mut parser = SseParser::default();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(RemoteError::from(e));
                        return;
                    }
                };
                for frame in parser.feed(&chunk) {
                    match OutputEvent::from_frame(&frame) {
                        Ok(Some(event)) => yield Ok(event),
                        Ok(None) => {},
                        Err(e) => {
                            warn!(script = %script, event = %frame.event, error = %e, "malformed script event");
                        }
                    }
                }
            }
            debug!(script = %script, "script event stream closed");
        })
    }
}
