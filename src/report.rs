use std::fmt::Display;

use crate::record::Shape;

/// Observability hooks called at fixed points of extraction, classification and fetching.
///
/// The core never writes to stdout or stderr on its own; everything it wants to say goes
/// through one of these.
pub trait Reporter {
    /// A record named `name` was classified as `shape`.
    fn shape_detected(&self, name: &str, shape: Shape);

    /// A tag was found but its value could not be read, so an empty string was stored.
    fn field_fallback(&self, tag: &str, reason: &str);

    /// A fetch attempt for `url` failed. `attempt` starts at 1.
    fn fetch_failed(&self, url: &str, attempt: u8, error: &dyn Display);
}

/// Forwards every notice to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn shape_detected(&self, name: &str, shape: Shape) {
        tracing::info!(record = name, %shape, "{shape} reference found");
    }

    fn field_fallback(&self, tag: &str, reason: &str) {
        tracing::warn!(tag, reason, "citation_{tag} unreadable, stored as empty");
    }

    fn fetch_failed(&self, url: &str, attempt: u8, error: &dyn Display) {
        if attempt == 1 {
            tracing::debug!(url, %error, "could not access page, retrying with browser agent");
        } else {
            tracing::warn!(url, %error, attempt, "could not access page");
        }
    }
}

/// Drops every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn shape_detected(&self, _name: &str, _shape: Shape) {}
    fn field_fallback(&self, _tag: &str, _reason: &str) {}
    fn fetch_failed(&self, _url: &str, _attempt: u8, _error: &dyn Display) {}
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn shape_detected(&self, name: &str, shape: Shape) {
        (**self).shape_detected(name, shape)
    }

    fn field_fallback(&self, tag: &str, reason: &str) {
        (**self).field_fallback(tag, reason)
    }

    fn fetch_failed(&self, url: &str, attempt: u8, error: &dyn Display) {
        (**self).fetch_failed(url, attempt, error)
    }
}
