use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use url::Url;

use crate::clientoptions::{AuthFailurePolicy, ClientOptions};
use crate::error::{Error, TransportError};
use crate::handler::ErrorHandler;
use crate::protocol::{build_notification_with_depth, CustomData, ErrorNotification};
use crate::transport::{CancellationToken, Transport};

/// How often a pending attempt checks its cancellation token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The yeller client.
///
/// A client owns the list of collector hosts and a cursor pointing at the
/// host the next attempt goes to.  The cursor starts at a random host and
/// moves forward whenever a host fails; it is never reset, so the next
/// notify call starts where the previous one ended up.
///
/// The cursor is atomic, so one client can be shared between threads, for
/// instance behind an `Arc`.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use yeller::{Client, CustomData, LogErrorHandler};
///
/// let client = Client::new("api-key", "production", Arc::new(LogErrorHandler::new())).unwrap();
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
/// if let Err(err) = client.notify_error(&err, CustomData::new()) {
///     eprintln!("could not report error: {}", err);
/// }
/// ```
pub struct Client {
    options: ClientOptions,
    endpoints: Vec<String>,
    transport: Arc<dyn Transport>,
    cursor: AtomicUsize,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("current_host", &self.current_host())
            .finish()
    }
}

/// The outcome of a single delivery attempt.
enum Attempt {
    Delivered,
    Unauthorized,
    Failed(TransportError),
    Cancelled,
}

impl Client {
    /// Creates a client posting to the default collectors.
    pub fn new<K, E>(
        api_key: K,
        environment: E,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Result<Client, Error>
    where
        K: Into<Cow<'static, str>>,
        E: Into<Cow<'static, str>>,
    {
        Client::with_options(ClientOptions {
            environment: environment.into(),
            error_handler,
            ..ClientOptions::new(api_key)
        })
    }

    /// Creates a client posting to the given collector hosts.
    ///
    /// Fails if `hostnames` is empty.
    pub fn with_hostnames<K, E, I, S>(
        api_key: K,
        environment: E,
        error_handler: Arc<dyn ErrorHandler>,
        hostnames: I,
    ) -> Result<Client, Error>
    where
        K: Into<Cow<'static, str>>,
        E: Into<Cow<'static, str>>,
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        Client::with_options(
            ClientOptions {
                environment: environment.into(),
                error_handler,
                ..ClientOptions::new(api_key)
            }
            .hostnames(hostnames),
        )
    }

    /// Creates a new client for the given options.
    pub fn with_options(options: ClientOptions) -> Result<Client, Error> {
        let api_key = match options.api_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(Error::InvalidOptions("no API key configured".into())),
        };
        if options.hostnames.is_empty() {
            return Err(Error::InvalidOptions("at least one hostname is required".into()));
        }
        let endpoints = options
            .hostnames
            .iter()
            .map(|host| endpoint_url(host, &api_key))
            .collect::<Result<Vec<_>, _>>()?;

        let transport = match options.transport {
            Some(ref factory) => factory.create_transport(&options)?,
            None => return Err(Error::TransportInit("no transport configured".into())),
        };

        let cursor = rand::random_range(0..endpoints.len());
        yeller_debug!(
            "created client for {} collector(s), starting at {}",
            endpoints.len(),
            options.hostnames[cursor]
        );

        Ok(Client {
            options,
            endpoints,
            transport,
            cursor: AtomicUsize::new(cursor),
        })
    }

    /// Returns the options of this client.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the collector hosts in rotation order.
    pub fn hostnames(&self) -> &[Cow<'static, str>] {
        &self.options.hostnames
    }

    /// Returns the index of the host the next attempt goes to.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst) % self.endpoints.len()
    }

    /// Moves the cursor to the host at `index` (modulo the number of hosts).
    pub fn set_cursor(&self, index: usize) {
        self.cursor
            .store(index % self.endpoints.len(), Ordering::SeqCst);
    }

    /// Returns the host the next attempt goes to.
    pub fn current_host(&self) -> &str {
        &self.options.hostnames[self.cursor()]
    }

    /// Builds a notification for `err` with this client's environment.
    ///
    /// The stack is captured at the call site.
    pub fn build_notification<E: fmt::Display + ?Sized>(
        &self,
        err: &E,
        custom_data: CustomData,
    ) -> ErrorNotification {
        build_notification_with_depth(
            err,
            &self.options.environment,
            &self.options.client_version,
            custom_data,
            self.options.max_stack_depth,
        )
    }

    /// Reports an error together with the caller's stack.
    pub fn notify_error<E: std::error::Error + ?Sized>(
        &self,
        err: &E,
        custom_data: CustomData,
    ) -> Result<(), Error> {
        let notification = self.build_notification(err, custom_data);
        self.notify(&notification)
    }

    /// Reports a plain message together with the caller's stack.
    pub fn notify_message(&self, message: &str, custom_data: CustomData) -> Result<(), Error> {
        let notification = self.build_notification(message, custom_data);
        self.notify(&notification)
    }

    /// Delivers a notification to one of the collectors.
    ///
    /// Hosts are tried one after the other starting at the cursor, each at
    /// most once.  The call blocks until a collector accepted the
    /// notification, rejected the API key, or every host failed.
    ///
    /// # Errors
    ///
    /// - [`Error::Serialization`] if the notification cannot be encoded.  No
    ///   request is made and the error handler is not invoked.
    /// - [`Error::Transport`] with the last failure once every host failed.
    ///   The error handler's `handle_io_error` is invoked first.
    /// - [`Error::Auth`] if a collector answered 401 and the client uses
    ///   [`AuthFailurePolicy::Propagate`].  With the default
    ///   [`AuthFailurePolicy::Suppress`] the call reports success instead.
    ///   Either way `handle_auth_error` is invoked and no other host is tried.
    pub fn notify(&self, notification: &ErrorNotification) -> Result<(), Error> {
        let body = notification.to_json()?;
        self.dispatch(Arc::from(body), None)
    }

    /// Like [`notify`](Self::notify), but gives up once `token` is cancelled.
    ///
    /// Cancellation is observed between attempts and while an attempt is in
    /// flight.  A cancelled call returns [`Error::Cancelled`], invokes no
    /// handler and leaves the cursor where it was.  An abandoned attempt keeps
    /// running in the background until the request timeout ends it, so this
    /// requires [`ClientOptions::request_timeout`] to be set and fails with
    /// [`Error::InvalidOptions`] otherwise.
    pub fn notify_cancellable(
        &self,
        notification: &ErrorNotification,
        token: &CancellationToken,
    ) -> Result<(), Error> {
        if self.options.request_timeout.is_none() {
            return Err(Error::InvalidOptions(
                "cancellable notifications require a request timeout".into(),
            ));
        }
        let body = notification.to_json()?;
        self.dispatch(Arc::from(body), Some(token))
    }

    fn dispatch(&self, body: Arc<[u8]>, token: Option<&CancellationToken>) -> Result<(), Error> {
        let count = self.endpoints.len();
        let start = self.cursor();
        let mut last_error = None;

        for offset in 0..count {
            let index = (start + offset) % count;
            let host = &self.options.hostnames[index];

            if token.is_some_and(CancellationToken::is_cancelled) {
                yeller_debug!("notification cancelled before contacting {}", host);
                return Err(Error::Cancelled);
            }

            match self.attempt(&self.endpoints[index], &body, token) {
                Attempt::Delivered => {
                    yeller_debug!("notification delivered to {}", host);
                    return Ok(());
                }
                Attempt::Unauthorized => {
                    let error = Error::Auth {
                        host: host.to_string(),
                    };
                    yeller_debug!("{}", error);
                    if let Err(err) = self.options.error_handler.handle_auth_error(&error) {
                        yeller_debug!("auth error handler did not handle failure: {}", err);
                    }
                    return match self.options.auth_failure_policy {
                        AuthFailurePolicy::Suppress => Ok(()),
                        AuthFailurePolicy::Propagate => Err(error),
                    };
                }
                Attempt::Failed(source) => {
                    yeller_debug!("attempt against {} failed: {}", host, source);
                    self.advance_cursor(index);
                    last_error = Some(Error::Transport {
                        host: host.to_string(),
                        source,
                    });
                }
                Attempt::Cancelled => {
                    yeller_debug!("notification cancelled while contacting {}", host);
                    return Err(Error::Cancelled);
                }
            }
        }

        let Some(error) = last_error else {
            return Ok(());
        };
        if let Err(err) = self.options.error_handler.handle_io_error(&error) {
            yeller_debug!("io error handler did not handle failure: {}", err);
        }
        Err(error)
    }

    fn attempt(&self, url: &str, body: &Arc<[u8]>, token: Option<&CancellationToken>) -> Attempt {
        let result = match token {
            Some(token) => match self.send_cancellable(url, body, token) {
                Some(result) => result,
                None => return Attempt::Cancelled,
            },
            None => self.transport.send_notification(url, body),
        };

        match result {
            Ok(401) => Attempt::Unauthorized,
            Ok(status) if (200..300).contains(&status) => Attempt::Delivered,
            Ok(status) => Attempt::Failed(TransportError::Status(status)),
            Err(err) => Attempt::Failed(err),
        }
    }

    /// Runs one attempt on a helper thread so the caller can stop waiting.
    ///
    /// Returns `None` if the token was cancelled first.  An abandoned attempt
    /// finishes in the background and its result is dropped.
    fn send_cancellable(
        &self,
        url: &str,
        body: &Arc<[u8]>,
        token: &CancellationToken,
    ) -> Option<Result<u16, TransportError>> {
        let (sender, receiver) = sync_channel(1);
        let transport = self.transport.clone();
        let owned_url = url.to_string();
        let owned_body = body.clone();
        let spawned = thread::Builder::new()
            .name("yeller-attempt".into())
            .spawn(move || {
                let _ = sender.send(transport.send_notification(&owned_url, &owned_body));
            });
        if let Err(err) = spawned {
            yeller_debug!("could not spawn attempt thread, sending inline: {}", err);
            return Some(self.transport.send_notification(url, body));
        }

        loop {
            match receiver.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(result) => return Some(result),
                Err(RecvTimeoutError::Timeout) => {
                    if token.is_cancelled() {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Some(Err(TransportError::Other(
                        "attempt thread exited without a result".into(),
                    )))
                }
            }
        }
    }

    /// Moves the cursor past a failed host unless another call already moved it.
    fn advance_cursor(&self, failed: usize) {
        let next = (failed + 1) % self.endpoints.len();
        let _ = self
            .cursor
            .compare_exchange(failed, next, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// Builds `http://{host}/{api_key}`.
fn endpoint_url(host: &str, api_key: &str) -> Result<String, Error> {
    let invalid = || Error::InvalidOptions(format!("invalid collector hostname `{}`", host));
    let mut url = Url::parse(&format!("http://{}/", host)).map_err(|_| invalid())?;
    if url.host_str().is_none() || url.path() != "/" || url.query().is_some() {
        return Err(invalid());
    }
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .push(api_key);
    Ok(url.into())
}
