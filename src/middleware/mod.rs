//! Middleware layer.
//!
//! Middleware is itself a [`Handler`](crate::Handler): it holds the next
//! handler, and on every exchange passes the request through with a
//! decorated [`ResponseSink`](crate::ResponseSink) in place of the one it
//! was given. Stacking is just nesting.
//!
//! Built-in middleware:
//! - [`timestamp`] — request and response timestamps as response headers

pub mod timestamp;

pub use timestamp::{StampedSink, TimestampHeaders};
