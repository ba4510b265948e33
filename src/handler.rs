//! Handler trait and adapters.
//!
//! # How a handler writes its response
//!
//! A handler is given the request by value and the sink by `&mut`. It
//! writes into the sink and returns `Ok(())`, or fails with an [`Error`]:
//!
//! ```text
//! server                                 handler
//!   │  serve(req, &mut BufferedResponse)   │
//!   │ ───────────────────────────────────▶ │  sink.headers_mut() …
//!   │                                      │  sink.write_head(200)
//!   │                                      │  sink.write_body(b"…")
//!   │ ◀─────────────────────────────────── │  Ok(())
//!   ▼  sink.into_response()
//! ```
//!
//! Because the returned future borrows the sink, `serve` carries an explicit
//! lifetime and returns a [`BoxFuture`] tied to it. Middleware implements the
//! same trait and hands its own decorated sink further down.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::ResponseSink;

/// A heap-allocated, type-erased future borrowing from `'a`.
///
/// `Send` lets tokio move the future across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Handler trait ─────────────────────────────────────────────────────────────

/// Something that serves one exchange by writing into a [`ResponseSink`].
pub trait Handler: Send + Sync + 'static {
    fn serve<'a>(
        &'a self,
        req: Request,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<(), Error>>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve<'a>(
        &'a self,
        req: Request,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<(), Error>> {
        (**self).serve(req, sink)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve<'a>(
        &'a self,
        req: Request,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<(), Error>> {
        (**self).serve(req, sink)
    }
}

// ── Closure adapter ───────────────────────────────────────────────────────────

/// Turns a synchronous closure into a [`Handler`].
///
/// ```rust
/// use timestamp_headers::{handler_fn, Request, ResponseSink};
/// use http::StatusCode;
///
/// let hello = handler_fn(|_req: &Request, sink: &mut dyn ResponseSink| {
///     sink.write_head(StatusCode::OK);
///     sink.write_body(b"Hello World")?;
///     Ok(())
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Request, &mut dyn ResponseSink) -> Result<(), Error> + Send + Sync + 'static,
{
    FnHandler(f)
}

/// Newtype wrapper produced by [`handler_fn`].
pub struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Request, &mut dyn ResponseSink) -> Result<(), Error> + Send + Sync + 'static,
{
    fn serve<'a>(
        &'a self,
        req: Request,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<(), Error>> {
        // The closure runs to completion right here; the future is already ready.
        let result = (self.0)(&req, sink);
        Box::pin(std::future::ready(result))
    }
}
