//! A process-wide client for applications that do not want to pass one around.
//!
//! Everything here is a thin wrapper around a bound [`Client`]; nothing is
//! reported while no client is bound.  Failures are logged, never returned.
use std::any::Any;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::client::Client;
use crate::clientoptions::ClientOptions;
use crate::error::Error;
use crate::protocol::CustomData;

lazy_static! {
    static ref CLIENT: RwLock<Option<Arc<Client>>> = RwLock::new(None);
}

/// Returns the currently bound client if there is one.
pub fn current_client() -> Option<Arc<Client>> {
    match CLIENT.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Binds a client process wide, replacing the previous one.
///
/// Passing `None` unbinds the current client.
pub fn bind_client(client: Option<Arc<Client>>) {
    match CLIENT.write() {
        Ok(mut guard) => *guard = client,
        Err(poisoned) => *poisoned.into_inner() = client,
    }
}

/// Helper struct that is returned from `init`.
///
/// When this is dropped the client is unbound again.
#[must_use = "when the init guard is dropped the client is unbound"]
pub struct ClientInitGuard(Arc<Client>);

impl ClientInitGuard {
    /// Returns the client created by `init`.
    pub fn client(&self) -> Arc<Client> {
        self.0.clone()
    }
}

impl Drop for ClientInitGuard {
    fn drop(&mut self) {
        let still_bound = current_client().is_some_and(|client| Arc::ptr_eq(&client, &self.0));
        if still_bound {
            bind_client(None);
        }
    }
}

/// Creates a client from the given options and binds it process wide.
///
/// # Examples
///
/// ```no_run
/// let _yeller = yeller::init(("api-key", "production")).unwrap();
/// ```
pub fn init<O: Into<ClientOptions>>(options: O) -> Result<ClientInitGuard, Error> {
    let client = Arc::new(Client::with_options(options.into())?);
    bind_client(Some(client.clone()));
    Ok(ClientInitGuard(client))
}

/// Reports an error through the bound client.
pub fn notify<E: std::error::Error + ?Sized>(err: &E) {
    notify_info(err, CustomData::new())
}

/// Reports an error with custom data through the bound client.
pub fn notify_info<E: std::error::Error + ?Sized>(err: &E, info: CustomData) {
    if let Some(client) = current_client() {
        let notification = client.build_notification(err, info);
        if let Err(err) = client.notify(&notification) {
            log::warn!(target: "yeller", "failed to report error: {}", err);
        }
    }
}

/// Reports a message through the bound client.
pub fn notify_message(message: &str, info: CustomData) {
    if let Some(client) = current_client() {
        let notification = client.build_notification(message, info);
        if let Err(err) = client.notify(&notification) {
            log::warn!(target: "yeller", "failed to report message: {}", err);
        }
    }
}

/// Reports a panic payload, as returned by `std::panic::catch_unwind`.
pub fn notify_panic(payload: &(dyn Any + Send)) {
    notify_panic_info(payload, CustomData::new())
}

/// Reports a panic payload with custom data.
pub fn notify_panic_info(payload: &(dyn Any + Send), info: CustomData) {
    notify_message(message_from_panic_payload(payload), info)
}

/// Extracts the message of a panic payload.
pub fn message_from_panic_payload(payload: &(dyn Any + Send)) -> &str {
    match payload.downcast_ref::<&'static str>() {
        Some(s) => s,
        None => match payload.downcast_ref::<String>() {
            Some(s) => &s[..],
            None => "Box<dyn Any>",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_panic_payload() {
        let payload = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(message_from_panic_payload(&*payload), "static message");

        let payload =
            std::panic::catch_unwind(|| panic!("formatted {}", "message")).unwrap_err();
        assert_eq!(message_from_panic_payload(&*payload), "formatted message");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42)).unwrap_err();
        assert_eq!(message_from_panic_payload(&*payload), "Box<dyn Any>");
    }
}
