use std::borrow::Cow;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{
    CLIENT_VERSION, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOSTNAMES, DEFAULT_REQUEST_TIMEOUT,
    MAX_STACK_DEPTH, USER_AGENT,
};
use crate::handler::{ErrorHandler, LogErrorHandler};
use crate::transport::{DefaultTransportFactory, TransportFactory};

/// What a notify call reports when a collector rejects the API key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AuthFailurePolicy {
    /// The auth handler is invoked and the call reports success.
    ///
    /// This matches what existing yeller clients do.
    #[default]
    Suppress,
    /// The auth handler is invoked and the call returns [`Error::Auth`](crate::Error::Auth).
    Propagate,
}

/// Configuration settings for the client.
///
/// The `Default` implementation reads the API key from `YELLER_API_KEY` and
/// the environment from `YELLER_ENV`.
///
/// # Examples
///
/// ```
/// let options = yeller::ClientOptions {
///     api_key: Some("api-key".into()),
///     environment: "staging".into(),
///     ..Default::default()
/// };
/// assert_eq!(options.hostnames.len(), 5);
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// The credential notifications are posted with.
    pub api_key: Option<Cow<'static, str>>,
    /// The deployment tag sent with every notification.
    pub environment: Cow<'static, str>,
    /// Collector hosts, tried in order starting at a random one.
    pub hostnames: Vec<Cow<'static, str>>,
    /// Identifies this library in notifications.
    pub client_version: Cow<'static, str>,
    /// The user agent sent with every request.
    pub user_agent: Cow<'static, str>,
    /// How long to wait for a collector connection before moving on.
    pub connect_timeout: Duration,
    /// End-to-end timeout of a single attempt. `None` disables it.
    ///
    /// [`Client::notify_cancellable`](crate::Client::notify_cancellable)
    /// refuses to run without it.
    pub request_timeout: Option<Duration>,
    /// Whether rejected API keys surface to the caller.
    pub auth_failure_policy: AuthFailurePolicy,
    /// Maximum number of stack frames captured per notification.
    pub max_stack_depth: usize,
    /// Invoked when delivery ultimately fails.
    pub error_handler: Arc<dyn ErrorHandler>,
    /// The transport to use.
    ///
    /// This is typically a [`DefaultTransportFactory`].
    pub transport: Option<Arc<dyn TransportFactory>>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("environment", &self.environment)
            .field("hostnames", &self.hostnames)
            .field("client_version", &self.client_version)
            .field("user_agent", &self.user_agent)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("auth_failure_policy", &self.auth_failure_policy)
            .field("max_stack_depth", &self.max_stack_depth)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> ClientOptions {
        ClientOptions {
            api_key: env::var("YELLER_API_KEY").ok().map(Cow::Owned),
            environment: env::var("YELLER_ENV")
                .map(Cow::Owned)
                .unwrap_or(Cow::Borrowed("production")),
            hostnames: DEFAULT_HOSTNAMES.iter().map(|&h| Cow::Borrowed(h)).collect(),
            client_version: Cow::Owned(CLIENT_VERSION.clone()),
            user_agent: Cow::Owned(USER_AGENT.clone()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            auth_failure_policy: AuthFailurePolicy::default(),
            max_stack_depth: MAX_STACK_DEPTH,
            error_handler: Arc::new(LogErrorHandler::default()),
            transport: Some(Arc::new(DefaultTransportFactory)),
        }
    }
}

impl ClientOptions {
    /// Creates options for the given API key with defaults for everything else.
    pub fn new<K: Into<Cow<'static, str>>>(api_key: K) -> ClientOptions {
        ClientOptions {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Sets the error handler.
    #[must_use]
    pub fn error_handler<H: ErrorHandler + 'static>(mut self, handler: H) -> ClientOptions {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Replaces the collector hosts.
    #[must_use]
    pub fn hostnames<I, S>(mut self, hostnames: I) -> ClientOptions
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        self.hostnames = hostnames.into_iter().map(Into::into).collect();
        self
    }
}

impl From<&'static str> for ClientOptions {
    fn from(api_key: &'static str) -> ClientOptions {
        ClientOptions::new(api_key)
    }
}

impl From<String> for ClientOptions {
    fn from(api_key: String) -> ClientOptions {
        ClientOptions::new(api_key)
    }
}

impl<K, E> From<(K, E)> for ClientOptions
where
    K: Into<Cow<'static, str>>,
    E: Into<Cow<'static, str>>,
{
    fn from((api_key, environment): (K, E)) -> ClientOptions {
        ClientOptions {
            environment: environment.into(),
            ..ClientOptions::new(api_key)
        }
    }
}
