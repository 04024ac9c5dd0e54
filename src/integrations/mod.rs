//! This module provides support for various integrations.
//!
//! Which integrations are available depends on the features that were compiled in.

#[cfg(feature = "with_panic")]
pub mod panic;
