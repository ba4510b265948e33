//! # timestamp-headers
//!
//! HTTP middleware that tells you when a request arrived and when its
//! response left. Two headers, nothing else.
//!
//! ## The contract
//!
//! Wrap any [`Handler`] in [`TimestampHeaders`] and every response it
//! produces carries:
//!
//! | Header (default name) | Value |
//! |---|---|
//! | `REQUEST-TIMESTAMP`  | clock reading when the exchange entered the middleware |
//! | `RESPONSE-TIMESTAMP` | clock reading when the response head was committed |
//!
//! The difference is the time spent in this proxy plus everything it wraps.
//! Both names and the timestamp [`Layout`] come from [`Config`].
//!
//! What the surrounding proxy already owns, this crate ignores:
//!
//! - **Plugin loading** — the host decides when to build a middleware
//! - **TLS and connection pooling** — transport concerns
//! - **Logging sinks and metrics** — the crate emits `tracing` events only
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use timestamp_headers::{handler_fn, Config, Request, ResponseSink, Server, TimestampHeaders};
//!
//! #[tokio::main]
//! async fn main() {
//!     let hello = handler_fn(|_req: &Request, sink: &mut dyn ResponseSink| {
//!         sink.write_head(StatusCode::OK);
//!         sink.write_body(b"Hello World")?;
//!         Ok(())
//!     });
//!
//!     let app = TimestampHeaders::new(hello, Config::default(), "timestamps").unwrap();
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

mod clock;
mod config;
mod error;
mod handler;
mod layout;
mod request;
mod response;
mod server;

pub mod middleware;

pub use clock::{Clock, SystemClock};
pub use config::{Config, DEFAULT_DATE_FORMAT, DEFAULT_REQUEST_HEADER, DEFAULT_RESPONSE_HEADER};
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, FnHandler, Handler, handler_fn};
pub use layout::{Formatted, Layout};
pub use middleware::{StampedSink, TimestampHeaders};
pub use request::Request;
pub use response::{BufferedResponse, ResponseSink};
pub use server::Server;
