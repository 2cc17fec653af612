/// Failure talking to the remote control API.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The host could not be reached, or the connection broke mid-request.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The host answered with a status other than 200.
    #[error("unexpected status {0}")]
    Status(u16),
    /// The host answered 200 but the body was not what the endpoint promises.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl RemoteError {
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;

    /// True when the failure says nothing about the host's intent, only that
    /// it could not be talked to.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The explicit HTTP status, if the host answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }

    /// Remote features (scripts) switched off in the host's configuration.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(Self::FORBIDDEN)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(Self::NOT_FOUND)
    }
}
