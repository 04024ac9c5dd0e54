//! The notification payload sent to yeller collectors.
//!
//! The JSON shape produced here is what the collectors accept today, so
//! field names and the array encoding of stack frames must not change.
use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::backtrace_support::capture_stack_with_depth;
use crate::constants::MAX_STACK_DEPTH;

/// Arbitrary caller supplied data attached to a notification.
pub type CustomData = BTreeMap<String, serde_json::Value>;

/// The record type every notification carries.
pub const NOTIFICATION_TYPE: &str = "error";

/// A single call site in a captured stack.
///
/// On the wire this is a `[filename, line, function]` array, not an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// Absolute path of the source file.
    pub filename: String,
    /// The source line, kept as a string.
    pub line_number: String,
    /// Fully qualified function name or `???`.
    pub function_name: String,
}

impl StackFrame {
    /// Placeholder used when a function name cannot be resolved.
    pub const UNKNOWN_FUNCTION: &'static str = "???";

    /// Creates a frame from possibly unresolved parts.
    pub fn new(filename: Option<String>, line: Option<u32>, function: Option<String>) -> StackFrame {
        StackFrame {
            filename: filename.unwrap_or_default(),
            line_number: line.unwrap_or(0).to_string(),
            function_name: function.unwrap_or_else(|| Self::UNKNOWN_FUNCTION.to_string()),
        }
    }

    /// Creates a frame for a call site nothing could be resolved for.
    pub fn unresolved() -> StackFrame {
        StackFrame::new(None, None, None)
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.function_name, self.filename, self.line_number)
    }
}

impl Serialize for StackFrame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.filename)?;
        tuple.serialize_element(&self.line_number)?;
        tuple.serialize_element(&self.function_name)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for StackFrame {
    fn deserialize<D>(deserializer: D) -> Result<StackFrame, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (filename, line_number, function_name) =
            <(String, String, String)>::deserialize(deserializer)?;
        Ok(StackFrame {
            filename,
            line_number,
            function_name,
        })
    }
}

/// An error notification as accepted by the collectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotification {
    /// Always `"error"`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Human readable error text.
    pub message: String,
    /// Captured frames, the caller of the notify call first.
    pub stacktrace: Vec<StackFrame>,
    /// The request url the error happened in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Hostname of the reporting machine.
    pub host: String,
    /// Deployment tag such as `production`.
    ///
    /// Collectors read it from the `application-environment` key.
    #[serde(rename = "application-environment")]
    pub environment: String,
    /// Caller supplied context, always present on the wire.
    #[serde(rename = "custom-data", default)]
    pub custom_data: CustomData,
    /// A free form location, e.g. a controller action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Identifies the reporting library.
    #[serde(rename = "client-version")]
    pub client_version: String,
}

impl ErrorNotification {
    /// Sets the url the error occurred on.
    #[must_use]
    pub fn with_url<S: Into<String>>(mut self, url: S) -> ErrorNotification {
        self.url = Some(url.into());
        self
    }

    /// Sets the location the error occurred at.
    #[must_use]
    pub fn with_location<S: Into<String>>(mut self, location: S) -> ErrorNotification {
        self.location = Some(location.into());
        self
    }

    /// Serializes the notification into its wire form.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Builds a notification for `err`, capturing the caller's stack.
///
/// The hostname is looked up on every call; if that fails the host is left
/// empty.  `custom_data` is attached verbatim.
pub fn build_notification<E: fmt::Display + ?Sized>(
    err: &E,
    environment: &str,
    client_version: &str,
    custom_data: CustomData,
) -> ErrorNotification {
    build_notification_with_depth(err, environment, client_version, custom_data, MAX_STACK_DEPTH)
}

/// Like [`build_notification`] with an explicit bound on the stack depth.
pub fn build_notification_with_depth<E: fmt::Display + ?Sized>(
    err: &E,
    environment: &str,
    client_version: &str,
    custom_data: CustomData,
    max_stack_depth: usize,
) -> ErrorNotification {
    ErrorNotification {
        ty: NOTIFICATION_TYPE.into(),
        message: err.to_string(),
        stacktrace: capture_stack_with_depth(0, max_stack_depth),
        url: None,
        host: current_hostname(),
        environment: environment.into(),
        custom_data,
        location: None,
        client_version: client_version.into(),
    }
}

/// Returns the local hostname or an empty string if it cannot be resolved.
pub fn current_hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
