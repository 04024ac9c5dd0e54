//! This crate provides support for reporting errors to [Yeller].
//!
//! A [`Client`] serializes an [`ErrorNotification`] (the error message, the
//! caller's stack and some custom data) and posts it to one of several
//! collector hosts.  When a host cannot be reached the next one is tried, and
//! the client remembers which host worked so the next notification starts
//! there.  Reporting is best effort: failures are handed to an
//! [`ErrorHandler`] and returned to the caller, but never panic.
//!
//! # Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use yeller::{Client, CustomData, LogErrorHandler};
//!
//! let client = Client::new("api-key", "production", Arc::new(LogErrorHandler::new())).unwrap();
//!
//! let mut info = CustomData::new();
//! info.insert("user_id".into(), 42.into());
//! let err = "x".parse::<u32>().unwrap_err();
//! client.notify_error(&err, info).ok();
//! ```
//!
//! Applications that prefer a process-wide client can use [`init`] and the
//! free functions [`notify`] and [`notify_info`]:
//!
//! ```no_run
//! let _yeller = yeller::init(("api-key", "production")).unwrap();
//! yeller::integrations::panic::register_panic_handler();
//!
//! let err = "x".parse::<u32>().unwrap_err();
//! yeller::notify(&err);
//! ```
//!
//! # Features
//!
//! - `with_default_transport` (default): posts with a blocking `reqwest` client.
//! - `with_panic` (default): the panic hook in [`integrations::panic`].
//! - `with_native_tls` / `with_rustls`: TLS support for the reqwest transport.
//! - `test`: the [`test`] module with a scripted in-memory transport.
//!
//! [Yeller]: https://yellerapp.com
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod api;
mod backtrace_support;
mod client;
mod clientoptions;
mod constants;
mod error;
mod handler;
pub mod integrations;
pub mod protocol;
#[cfg(any(test, feature = "test"))]
pub mod test;
pub mod transport;

pub use crate::api::{
    bind_client, current_client, init, message_from_panic_payload, notify, notify_info,
    notify_message, notify_panic, notify_panic_info, ClientInitGuard,
};
pub use crate::backtrace_support::{capture_stack, capture_stack_with_depth};
pub use crate::client::Client;
pub use crate::clientoptions::{AuthFailurePolicy, ClientOptions};
pub use crate::constants::{
    CLIENT_VERSION, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOSTNAMES, DEFAULT_REQUEST_TIMEOUT,
    MAX_STACK_DEPTH, USER_AGENT, VERSION,
};
pub use crate::error::{Error, HandlerError, TransportError};
pub use crate::handler::{ErrorHandler, LogErrorHandler, SilentErrorHandler, WriterErrorHandler};
pub use crate::protocol::{build_notification, CustomData, ErrorNotification, StackFrame};
pub use crate::transport::{CancellationToken, DefaultTransportFactory, Transport, TransportFactory};
