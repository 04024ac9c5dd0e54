//! Panic handler support.
//!
//! **Feature:** `with_panic` (enabled by default)
//!
//! A panic handler can be installed that will automatically report every
//! panic through the client bound with [`init`](crate::init).
//!
//! # Configuration
//!
//! ```no_run
//! use yeller::integrations::panic::register_panic_handler;
//! register_panic_handler();
//! ```
//!
//! Additionally panics are forwarded to the previously registered panic hook.
use std::panic::{self, PanicHookInfo};
use std::sync::Once;

use crate::api::{current_client, message_from_panic_payload};
use crate::protocol::{CustomData, ErrorNotification};

static INIT: Once = Once::new();

/// Creates a notification from the given panic info.
///
/// The stack is captured at the panic site and the panic location is sent
/// as the notification's location.
pub fn notification_from_panic_info(
    client: &crate::Client,
    info: &PanicHookInfo<'_>,
) -> ErrorNotification {
    let message = message_from_panic_payload(info.payload());
    let notification = client.build_notification(message, CustomData::new());
    match info.location() {
        Some(location) => {
            notification.with_location(format!("{}:{}", location.file(), location.line()))
        }
        None => notification,
    }
}

/// A panic handler that sends to yeller.
///
/// Nothing happens while no client is bound.
pub fn panic_handler(info: &PanicHookInfo<'_>) {
    if let Some(client) = current_client() {
        let notification = notification_from_panic_info(&client, info);
        if let Err(err) = client.notify(&notification) {
            log::warn!(target: "yeller", "failed to report panic: {}", err);
        }
    }
}

/// Registers the panic handler.
///
/// This registers the panic handler (`panic_handler`) as panic hook and
/// dispatches automatically to the one that was there before.  Calling this
/// more than once has no further effect.
pub fn register_panic_handler() {
    INIT.call_once(|| {
        yeller_debug!("installing panic hook");
        let next = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            panic_handler(info);
            next(info);
        }));
    });
}
