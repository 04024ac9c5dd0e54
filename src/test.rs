//! This provides testing functionality for building tests.
//!
//! **Feature:** `test` (*disabled by default*)
//!
//! The [`TestTransport`] never touches the network.  Every collector host
//! answers with a scripted response and every attempt is recorded so tests
//! can check which hosts were tried in which order.
//!
//! # Example usage
//!
//! ```ignore
//! use yeller::test::{TestResponse, TestTransport};
//! use yeller::{Client, ClientOptions, CustomData, SilentErrorHandler};
//!
//! let transport = TestTransport::new();
//! transport.respond("a", TestResponse::Status(503));
//!
//! let mut options = ClientOptions::new("key")
//!     .hostnames(["a", "b"])
//!     .error_handler(SilentErrorHandler);
//! options.transport = Some(std::sync::Arc::new(transport.clone()));
//! let client = Client::with_options(options).unwrap();
//! client.set_cursor(0);
//!
//! client.notify_message("boom", CustomData::new()).unwrap();
//! assert_eq!(transport.attempted_hosts(), vec!["a", "b"]);
//! ```
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use url::Url;

use crate::error::TransportError;
use crate::protocol::ErrorNotification;
use crate::transport::Transport;

/// A scripted collector response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestResponse {
    /// Answer with the given HTTP status.
    Status(u16),
    /// Fail to connect.
    ConnectError,
    /// Run into a timeout.
    Timeout,
    /// Wait before answering with the inner response.
    Delayed(Duration, Box<TestResponse>),
}

/// One recorded delivery attempt.
#[derive(Clone, Debug)]
pub struct RecordedAttempt {
    /// The collector host, including the port if there was one.
    pub host: String,
    /// The full url that was posted to.
    pub url: String,
    /// The request body.
    pub body: Vec<u8>,
}

impl RecordedAttempt {
    /// Parses the body back into a notification.
    pub fn notification(&self) -> Option<ErrorNotification> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[derive(Default)]
struct Inner {
    responses: HashMap<String, TestResponse>,
    attempts: Vec<RecordedAttempt>,
}

/// Collects delivery attempts instead of sending them.
///
/// Hosts without a scripted response answer `200`.
#[derive(Default)]
pub struct TestTransport {
    inner: Mutex<Inner>,
}

impl TestTransport {
    /// Creates a new test transport.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> Arc<TestTransport> {
        Arc::new(TestTransport::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Makes `host` answer every attempt with `response`.
    pub fn respond<H: Into<String>>(&self, host: H, response: TestResponse) {
        self.lock().responses.insert(host.into(), response);
    }

    /// Returns all attempts made so far.
    pub fn attempts(&self) -> Vec<RecordedAttempt> {
        self.lock().attempts.clone()
    }

    /// Returns the hosts of all attempts made so far, in order.
    pub fn attempted_hosts(&self) -> Vec<String> {
        self.lock().attempts.iter().map(|a| a.host.clone()).collect()
    }

    /// Fetches and clears the recorded attempts.
    pub fn fetch_and_clear_attempts(&self) -> Vec<RecordedAttempt> {
        std::mem::take(&mut self.lock().attempts)
    }
}

fn host_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        },
        Err(_) => String::new(),
    }
}

impl Transport for TestTransport {
    fn send_notification(&self, url: &str, body: &[u8]) -> Result<u16, TransportError> {
        let host = host_of(url);
        let response = {
            let mut inner = self.lock();
            inner.attempts.push(RecordedAttempt {
                host: host.clone(),
                url: url.to_string(),
                body: body.to_vec(),
            });
            inner
                .responses
                .get(&host)
                .cloned()
                .unwrap_or(TestResponse::Status(200))
        };

        let mut response = response;
        loop {
            match response {
                TestResponse::Status(status) => return Ok(status),
                TestResponse::ConnectError => {
                    return Err(TransportError::Connect(
                        format!("connection to {} refused", host).into(),
                    ))
                }
                TestResponse::Timeout => return Err(TransportError::Timeout),
                TestResponse::Delayed(delay, next) => {
                    thread::sleep(delay);
                    response = *next;
                }
            }
        }
    }
}
