//! Delivery of serialized notifications to a single collector.
//!
//! A [`Transport`] performs exactly one HTTP attempt and reports the status
//! code it got back.  Host rotation and failure classification live in the
//! [`Client`](crate::Client).
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clientoptions::ClientOptions;
use crate::error::{Error, TransportError};

/// Sends a serialized notification to one collector url.
pub trait Transport: Send + Sync + 'static {
    /// POSTs `body` as `application/json` to `url` and returns the HTTP status.
    ///
    /// Only failures that prevented a response from arriving are errors.
    /// Implementations must give up once the client's request timeout has
    /// elapsed.
    fn send_notification(&self, url: &str, body: &[u8]) -> Result<u16, TransportError>;
}

/// Creates the transport a client uses.
pub trait TransportFactory: Send + Sync {
    /// Builds a transport for the given options.
    fn create_transport(&self, options: &ClientOptions) -> Result<Arc<dyn Transport>, Error>;
}

impl<T: Transport> TransportFactory for Arc<T> {
    fn create_transport(&self, _options: &ClientOptions) -> Result<Arc<dyn Transport>, Error> {
        Ok(self.clone())
    }
}

/// Creates the default HTTP transport.
///
/// This is the default value for `transport` on the client options.  If no
/// http transport was compiled into the library creating a client fails.
#[derive(Clone, Debug, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create_transport(&self, options: &ClientOptions) -> Result<Arc<dyn Transport>, Error> {
        #[cfg(feature = "with_reqwest_transport")]
        {
            Ok(Arc::new(ReqwestHttpTransport::new(options)?))
        }
        #[cfg(not(feature = "with_reqwest_transport"))]
        {
            let _ = options;
            Err(Error::TransportInit(
                "yeller was compiled without an http transport".into(),
            ))
        }
    }
}

#[cfg(feature = "with_reqwest_transport")]
pub use self::reqwest_transport::ReqwestHttpTransport;

#[cfg(feature = "with_reqwest_transport")]
mod reqwest_transport {
    use reqwest::blocking::Client as ReqwestClient;
    use reqwest::header::{CONTENT_TYPE, USER_AGENT};

    use super::Transport;
    use crate::clientoptions::ClientOptions;
    use crate::error::{Error, TransportError};

    /// A [`Transport`] that sends notifications via the blocking [`reqwest`] client.
    ///
    /// The connect timeout is kept short so a dead collector is skipped quickly.
    ///
    /// [`reqwest`]: https://crates.io/crates/reqwest
    #[derive(Debug, Clone)]
    pub struct ReqwestHttpTransport {
        client: ReqwestClient,
        user_agent: String,
    }

    impl ReqwestHttpTransport {
        /// Creates a new transport from the client options.
        pub fn new(options: &ClientOptions) -> Result<ReqwestHttpTransport, Error> {
            let client = ReqwestClient::builder()
                .connect_timeout(options.connect_timeout)
                .timeout(options.request_timeout)
                .build()
                .map_err(|err| Error::TransportInit(err.to_string()))?;
            Ok(ReqwestHttpTransport::with_client(options, client))
        }

        /// Creates a new transport that uses the specified [`ReqwestClient`].
        pub fn with_client(options: &ClientOptions, client: ReqwestClient) -> ReqwestHttpTransport {
            ReqwestHttpTransport {
                client,
                user_agent: options.user_agent.to_string(),
            }
        }
    }

    impl Transport for ReqwestHttpTransport {
        fn send_notification(&self, url: &str, body: &[u8]) -> Result<u16, TransportError> {
            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .header(USER_AGENT, self.user_agent.as_str())
                .body(body.to_vec())
                .send()
                .map_err(classify)?;
            let status = response.status().as_u16();
            match response.text() {
                Ok(text) => yeller_debug!("collector answered {}: `{}`", status, text),
                Err(err) => yeller_debug!("failed to read collector response: {}", err),
            }
            Ok(status)
        }
    }

    fn classify(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() || err.is_request() {
            TransportError::Connect(Box::new(err))
        } else {
            TransportError::Other(Box::new(err))
        }
    }
}

/// Lets a caller abandon a notify call that is still in progress.
///
/// Clones share the same flag.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Cancels every notify call observing this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
