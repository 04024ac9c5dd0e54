//! Policies for reacting to delivery failures.
//!
//! The client never panics or returns early because of a handler.  It calls
//! the handler as a side channel when all collectors failed or when the API
//! key was rejected, and the handler decides what to make of it.
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::error::{Error, HandlerError};

/// Receives delivery failures from a [`Client`](crate::Client).
///
/// Both callbacks return `Ok(())` to signal that the failure was handled.
/// The dispatch loop only logs a returned error; it does not change course.
pub trait ErrorHandler: Send + Sync {
    /// Called once per notify call after every collector failed.
    fn handle_io_error(&self, error: &Error) -> Result<(), HandlerError>;

    /// Called when a collector rejected the API key.
    fn handle_auth_error(&self, error: &Error) -> Result<(), HandlerError>;
}

/// Reports failures through the `log` crate.
///
/// This is the default handler.
#[derive(Debug, Clone)]
pub struct LogErrorHandler {
    target: Cow<'static, str>,
    level: log::Level,
}

impl Default for LogErrorHandler {
    fn default() -> LogErrorHandler {
        LogErrorHandler {
            target: Cow::Borrowed("yeller"),
            level: log::Level::Error,
        }
    }
}

impl LogErrorHandler {
    /// Creates a handler logging at error level to the `yeller` target.
    pub fn new() -> LogErrorHandler {
        LogErrorHandler::default()
    }

    /// Sets the log target.
    #[must_use]
    pub fn target<T: Into<Cow<'static, str>>>(mut self, target: T) -> LogErrorHandler {
        self.target = target.into();
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn level(mut self, level: log::Level) -> LogErrorHandler {
        self.level = level;
        self
    }

    fn log(&self, error: &Error) {
        log::log!(target: &*self.target, self.level, "{}", DisplayChain(error));
    }
}

impl ErrorHandler for LogErrorHandler {
    fn handle_io_error(&self, error: &Error) -> Result<(), HandlerError> {
        self.log(error);
        Ok(())
    }

    fn handle_auth_error(&self, error: &Error) -> Result<(), HandlerError> {
        self.log(error);
        Ok(())
    }
}

/// Writes one line per failure to an [`io::Write`] sink.
pub struct WriterErrorHandler<W> {
    prefix: Cow<'static, str>,
    writer: Mutex<W>,
}

impl<W> fmt::Debug for WriterErrorHandler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterErrorHandler")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl WriterErrorHandler<io::Stderr> {
    /// Creates a handler writing `yeller: <error>` lines to stderr.
    pub fn stderr() -> WriterErrorHandler<io::Stderr> {
        WriterErrorHandler::new("yeller", io::stderr())
    }
}

impl<W: Write + Send> WriterErrorHandler<W> {
    /// Creates a handler writing prefixed lines to `writer`.
    pub fn new<P: Into<Cow<'static, str>>>(prefix: P, writer: W) -> WriterErrorHandler<W> {
        WriterErrorHandler {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self, error: &Error) -> Result<(), HandlerError> {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(writer, "{}: {}", self.prefix, DisplayChain(error))?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> ErrorHandler for WriterErrorHandler<W> {
    fn handle_io_error(&self, error: &Error) -> Result<(), HandlerError> {
        self.write(error)
    }

    fn handle_auth_error(&self, error: &Error) -> Result<(), HandlerError> {
        self.write(error)
    }
}

/// Ignores every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentErrorHandler;

impl ErrorHandler for SilentErrorHandler {
    fn handle_io_error(&self, _error: &Error) -> Result<(), HandlerError> {
        Ok(())
    }

    fn handle_auth_error(&self, _error: &Error) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Formats an error together with its sources, `outer: inner: innermost`.
struct DisplayChain<'a>(&'a (dyn std::error::Error + 'static));

impl fmt::Display for DisplayChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}
