//! Drive and application lifecycle rules.
//!
//! Everything here is synchronous over a shared [`Database`]; callers on an
//! async runtime run it on the blocking pool. The only long-lived task is the
//! [`reconciler`].

pub mod accounts;
pub mod applications;
pub mod eligibility;
pub mod error;
pub mod import;
pub mod lifecycle;
pub mod listing;
pub mod notifier;
pub mod reconciler;
pub mod storage;

pub use error::{EngineError, Result};

#[cfg(test)]
pub(crate) mod test_support;
