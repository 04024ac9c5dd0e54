use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yeller::{
    AuthFailurePolicy, Client, ClientOptions, CustomData, Error, ErrorHandler, HandlerError,
};

/// Nothing listens on port 1, so connecting fails right away.
const DEAD_HOST: &str = "127.0.0.1:1";

#[derive(Default)]
struct CountingHandler {
    io_errors: AtomicUsize,
    auth_errors: AtomicUsize,
}

impl ErrorHandler for CountingHandler {
    fn handle_io_error(&self, _error: &Error) -> Result<(), HandlerError> {
        self.io_errors.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn handle_auth_error(&self, _error: &Error) -> Result<(), HandlerError> {
        self.auth_errors.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn collector(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/test-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

fn host(server: &MockServer) -> String {
    server.address().to_string()
}

/// Runs one notify call on a blocking thread and returns the result and
/// the cursor afterwards.
async fn notify_once(
    hostnames: Vec<String>,
    handler: Arc<CountingHandler>,
    policy: AuthFailurePolicy,
) -> (Result<(), Error>, usize) {
    tokio::task::spawn_blocking(move || {
        let mut options = ClientOptions::new("test-key").hostnames(hostnames);
        options.error_handler = handler;
        options.auth_failure_policy = policy;
        let client = Client::with_options(options).unwrap();
        client.set_cursor(0);
        let result = client.notify_message("boom", CustomData::new());
        (result, client.cursor())
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_posts_json_notification() {
    let server = collector(200).await;
    let handler = Arc::new(CountingHandler::default());

    let (result, cursor) =
        notify_once(vec![host(&server)], handler.clone(), AuthFailurePolicy::Suppress).await;

    result.unwrap();
    assert_eq!(cursor, 0);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["type"], "error");
    assert_eq!(body["message"], "boom");
    assert_eq!(body["custom-data"], serde_json::json!({}));
    assert!(body["client-version"]
        .as_str()
        .unwrap()
        .starts_with("yeller-rust: "));
    assert!(body["stacktrace"][0].is_array());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fails_over_from_dead_host() {
    let server = collector(200).await;
    let handler = Arc::new(CountingHandler::default());

    let (result, cursor) = notify_once(
        vec![DEAD_HOST.to_string(), host(&server)],
        handler.clone(),
        AuthFailurePolicy::Suppress,
    )
    .await;

    result.unwrap();
    assert_eq!(cursor, 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(handler.io_errors.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_all_hosts_failing_reports_last_error() {
    let first = collector(500).await;
    let second = collector(503).await;
    let handler = Arc::new(CountingHandler::default());

    let (result, cursor) = notify_once(
        vec![host(&first), DEAD_HOST.to_string(), host(&second)],
        handler.clone(),
        AuthFailurePolicy::Suppress,
    )
    .await;

    match result {
        Err(Error::Transport { host: failed, source }) => {
            assert_eq!(failed, host(&second));
            assert!(matches!(source, yeller::TransportError::Status(503)));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(cursor, 0);
    assert_eq!(first.received_requests().await.unwrap().len(), 1);
    assert_eq!(second.received_requests().await.unwrap().len(), 1);
    assert_eq!(handler.io_errors.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_is_not_retried() {
    let rejecting = collector(401).await;
    let other = collector(200).await;
    let handler = Arc::new(CountingHandler::default());

    let (result, cursor) = notify_once(
        vec![host(&rejecting), host(&other)],
        handler.clone(),
        AuthFailurePolicy::Suppress,
    )
    .await;

    result.unwrap();
    assert_eq!(cursor, 0);
    assert_eq!(rejecting.received_requests().await.unwrap().len(), 1);
    assert!(other.received_requests().await.unwrap().is_empty());
    assert_eq!(handler.auth_errors.load(Ordering::SeqCst), 1);
    assert_eq!(handler.io_errors.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_propagates_when_configured() {
    let rejecting = collector(401).await;
    let handler = Arc::new(CountingHandler::default());

    let (result, _) = notify_once(
        vec![host(&rejecting)],
        handler.clone(),
        AuthFailurePolicy::Propagate,
    )
    .await;

    assert!(result.unwrap_err().is_auth());
    assert_eq!(handler.auth_errors.load(Ordering::SeqCst), 1);
}
