use std::time::Duration;

/// The version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The collectors notifications go to unless other hostnames are configured.
pub const DEFAULT_HOSTNAMES: &[&str] = &[
    "collector1.yellerapp.com",
    "collector2.yellerapp.com",
    "collector3.yellerapp.com",
    "collector4.yellerapp.com",
    "collector5.yellerapp.com",
];

/// Upper bound on the number of frames in a captured stack.
pub const MAX_STACK_DEPTH: usize = 256;

/// How long to wait for a TCP connection before moving on to the next host.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// The end-to-end timeout applied to a single delivery attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

lazy_static::lazy_static! {
    /// Sent as `client-version` with every notification.
    pub static ref CLIENT_VERSION: String = format!("yeller-rust: {}", VERSION);
    /// The user agent of the HTTP transport.
    pub static ref USER_AGENT: String = format!("yeller-rust/{}", VERSION);
}
