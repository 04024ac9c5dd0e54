use std::io;

use thiserror::Error;

/// The error type returned by boxed handler callbacks.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can happen while notifying a collector.
#[derive(Debug, Error)]
pub enum Error {
    /// The notification could not be encoded as JSON.
    ///
    /// No network attempt is made and no handler is invoked for this.
    #[error("failed to serialize notification")]
    Serialization(#[from] serde_json::Error),
    /// Delivery to a single host failed.
    ///
    /// When returned from a notify call this is the last failure observed
    /// after every configured host was tried.
    #[error("failed to deliver notification to {host}")]
    Transport {
        /// The collector host the failed attempt targeted.
        host: String,
        /// What went wrong on the wire.
        #[source]
        source: TransportError,
    },
    /// A collector rejected the API key.
    #[error(
        "could not authenticate yeller client against {host}, check your API key \
         and that your subscription is active"
    )]
    Auth {
        /// The collector host that answered with 401.
        host: String,
    },
    /// The caller's cancellation token fired before delivery finished.
    #[error("notification was cancelled")]
    Cancelled,
    /// The client options are unusable.
    #[error("invalid client options: {0}")]
    InvalidOptions(String),
    /// The HTTP transport could not be created.
    #[error("failed to create transport: {0}")]
    TransportInit(String),
}

impl Error {
    /// Returns `true` if this is a collector authentication failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth { .. })
    }

    /// Returns `true` if this is a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

/// The outcome of a single failed delivery attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established or broke down.
    #[error("connection failed")]
    Connect(#[source] HandlerError),
    /// The attempt ran into the connect or request timeout.
    #[error("request timed out")]
    Timeout,
    /// The collector answered with a status that is neither 2xx nor 401.
    #[error("received a non 2xx HTTP status: {0}")]
    Status(u16),
    /// Any other transport level failure.
    #[error("transport failure")]
    Other(#[source] HandlerError),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> TransportError {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Connect(Box::new(err)),
        }
    }
}
