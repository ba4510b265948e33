//! Request and response timestamp headers.
//!
//! [`TimestampHeaders`] reads the clock when an exchange starts and again
//! when the downstream handler commits the response head, and adds both
//! readings as headers:
//!
//! ```text
//! REQUEST-TIMESTAMP:  2024-03-05T07:08:09.123Z   ← exchange entered the middleware
//! RESPONSE-TIMESTAMP: 2024-03-05T07:08:09.184Z   ← first write_head
//! ```
//!
//! Injection happens once per exchange, on the first `write_head`. A handler
//! that writes body bytes without ever calling `write_head` gets the same
//! treatment on its first body write, since that write implicitly commits
//! `200 OK`. A handler that returns `Ok` without writing anything gets an
//! empty `200 OK` committed for it, stamped. A handler that fails is left
//! alone: its error goes back to the caller as-is.

use std::io;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Error;
use crate::handler::{BoxFuture, Handler};
use crate::layout::Layout;
use crate::request::Request;
use crate::response::ResponseSink;

// ── Stamps ────────────────────────────────────────────────────────────────────

/// The compiled, read-only half of a [`Config`], shared by every exchange.
struct Stamps {
    request_header: HeaderName,
    response_header: HeaderName,
    layout: Layout,
    clock: Arc<dyn Clock>,
}

impl Stamps {
    fn compile(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            request_header: header_name(&config.request_header_name)?,
            response_header: header_name(&config.response_header_name)?,
            layout: Layout::parse(&config.date_format),
            clock: Arc::new(SystemClock),
        })
    }

    fn now(&self) -> HeaderValue {
        header_value(self.layout.format(&self.clock.now()))
    }
}

fn header_name(name: &str) -> Result<HeaderName, Error> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|source| Error::InvalidHeaderName {
        name: name.to_owned(),
        source,
    })
}

/// Turns a formatted timestamp into a header value.
///
/// A layout can contain anything, including bytes HTTP does not allow in a
/// header value. Those become spaces instead of failing the exchange.
fn header_value(stamp: String) -> HeaderValue {
    let mut bytes = stamp.into_bytes();
    for b in &mut bytes {
        if (*b < b' ' && *b != b'\t') || *b == 0x7f {
            *b = b' ';
        }
    }
    HeaderValue::from_bytes(&bytes).unwrap_or_else(|_| HeaderValue::from_static(""))
}

// ── TimestampHeaders ──────────────────────────────────────────────────────────

/// Middleware adding request and response timestamp headers.
///
/// Beyond stamping, the middleware does one thing on its own: if the
/// downstream handler returns `Ok` without writing a head or any body, it
/// commits `200 OK` itself so that response is stamped as well. Hosts that
/// would otherwise send a different implicit status should write the head
/// in their handler.
///
/// ```rust
/// use timestamp_headers::{handler_fn, Config, Request, ResponseSink, TimestampHeaders};
/// use http::StatusCode;
///
/// let hello = handler_fn(|_req: &Request, sink: &mut dyn ResponseSink| {
///     sink.write_head(StatusCode::OK);
///     sink.write_body(b"Hello World")?;
///     Ok(())
/// });
///
/// let config = Config::new()
///     .request_header("X-Request-Time")
///     .response_header("X-Response-Time");
///
/// let app = TimestampHeaders::new(hello, config, "timestamps").unwrap();
/// # let _ = app;
/// ```
pub struct TimestampHeaders<H> {
    next: H,
    config: Config,
    stamps: Stamps,
    name: String,
}

impl<H: Handler> TimestampHeaders<H> {
    /// Wraps `next`.
    ///
    /// `next` is already built, so whatever could go wrong building it has
    /// already been reported to the caller.
    ///
    /// # Errors
    ///
    /// Both header names must be non-empty, valid HTTP header tokens. This
    /// is checked here, once, and reported as [`Error::InvalidHeaderName`];
    /// no other configuration is ever rejected.
    pub fn new(next: H, config: Config, name: impl Into<String>) -> Result<Self, Error> {
        let stamps = Stamps::compile(&config)?;
        let name = name.into();
        debug!(
            middleware = %name,
            request_header = %stamps.request_header,
            response_header = %stamps.response_header,
            date_format = %config.date_format,
            "timestamp headers configured",
        );
        Ok(Self { next, config, stamps, name })
    }

    /// Replaces the clock both timestamps are read from.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.stamps.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<H: Handler> TimestampHeaders<H> {
    async fn stamp(&self, req: Request, sink: &mut dyn ResponseSink) -> Result<(), Error> {
        let mut stamped = StampedSink {
            inner: sink,
            stamps: &self.stamps,
            middleware: &self.name,
            request_stamp: self.stamps.now(),
            finalized: false,
        };
        self.next.serve(req, &mut stamped).await?;

        // A handler that wrote nothing leaves the host to send an empty
        // 200; commit it here so that response is stamped too.
        if !stamped.finalized {
            stamped.write_head(StatusCode::OK);
        }
        Ok(())
    }
}

impl<H: Handler> Handler for TimestampHeaders<H> {
    fn serve<'a>(
        &'a self,
        req: Request,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(self.stamp(req, sink))
    }
}

// ── StampedSink ───────────────────────────────────────────────────────────────

/// The per-exchange sink decorator handed to the downstream handler.
///
/// Holds the request timestamp and a one-shot `finalized` flag. Everything
/// except the first head commit passes straight through to the wrapped sink.
pub struct StampedSink<'a> {
    inner: &'a mut dyn ResponseSink,
    stamps: &'a Stamps,
    middleware: &'a str,
    request_stamp: HeaderValue,
    finalized: bool,
}

impl StampedSink<'_> {
    fn inject(&mut self) {
        let response_stamp = self.stamps.now();
        trace!(
            middleware = %self.middleware,
            request = ?self.request_stamp,
            response = ?response_stamp,
            "stamping response",
        );
        let headers = self.inner.headers_mut();
        headers.insert(self.stamps.request_header.clone(), self.request_stamp.clone());
        headers.insert(self.stamps.response_header.clone(), response_stamp);
        self.finalized = true;
    }
}

impl ResponseSink for StampedSink<'_> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_head(&mut self, status: StatusCode) {
        if !self.finalized {
            self.inject();
        }
        self.inner.write_head(status);
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        if !self.finalized {
            self.write_head(StatusCode::OK);
        }
        self.inner.write_body(chunk)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use bytes::Bytes;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::handler::handler_fn;
    use crate::response::BufferedResponse;

    /// Moves forward one second on every reading.
    struct StepClock {
        start: DateTime<Utc>,
        ticks: AtomicI64,
    }

    impl StepClock {
        fn new() -> Self {
            Self {
                start: Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap(),
                ticks: AtomicI64::new(0),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            self.start + TimeDelta::seconds(self.ticks.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn request() -> Request {
        http::Request::get("http://localhost/").body(Bytes::new()).unwrap().into()
    }

    fn noop() -> impl Handler {
        handler_fn(|_, _| Ok(()))
    }

    async fn run(app: &impl Handler) -> BufferedResponse {
        let mut sink = BufferedResponse::new();
        app.serve(request(), &mut sink).await.unwrap();
        sink
    }

    #[tokio::test]
    async fn stamps_on_first_head() {
        let hello = handler_fn(|_, sink| {
            sink.write_head(StatusCode::OK);
            sink.write_body(b"Hello World")?;
            Ok(())
        });
        let app = TimestampHeaders::new(hello, Config::new(), "stamps")
            .unwrap()
            .with_clock(StepClock::new());

        let sink = run(&app).await;
        let headers = sink.committed_headers().unwrap();
        assert_eq!(headers["REQUEST-TIMESTAMP"], "2024-03-05T07:08:09.000Z");
        assert_eq!(headers["RESPONSE-TIMESTAMP"], "2024-03-05T07:08:10.000Z");
        assert_eq!(sink.body(), b"Hello World");
    }

    #[tokio::test]
    async fn repeated_head_does_not_restamp() {
        let twice = handler_fn(|_, sink| {
            sink.write_head(StatusCode::ACCEPTED);
            sink.write_head(StatusCode::OK);
            Ok(())
        });
        let app = TimestampHeaders::new(twice, Config::new(), "stamps")
            .unwrap()
            .with_clock(StepClock::new());

        let sink = run(&app).await;
        assert_eq!(sink.status(), Some(StatusCode::ACCEPTED));
        // The live map would show a third tick had the second call restamped.
        assert_eq!(sink.headers()["RESPONSE-TIMESTAMP"], "2024-03-05T07:08:10.000Z");
        assert_eq!(sink.headers()["REQUEST-TIMESTAMP"], "2024-03-05T07:08:09.000Z");
    }

    #[tokio::test]
    async fn body_without_head_stamps_lazily() {
        let streaming = handler_fn(|_, sink| {
            sink.write_body(b"chunk one, ")?;
            sink.write_body(b"chunk two")?;
            Ok(())
        });
        let app = TimestampHeaders::new(streaming, Config::new(), "stamps")
            .unwrap()
            .with_clock(StepClock::new());

        let sink = run(&app).await;
        assert_eq!(sink.status(), Some(StatusCode::OK));
        let headers = sink.committed_headers().unwrap();
        assert_eq!(headers["REQUEST-TIMESTAMP"], "2024-03-05T07:08:09.000Z");
        assert_eq!(headers["RESPONSE-TIMESTAMP"], "2024-03-05T07:08:10.000Z");
        assert_eq!(sink.body(), b"chunk one, chunk two");
    }

    #[tokio::test]
    async fn other_header_mutations_pass_through() {
        let tagged = handler_fn(|_, sink| {
            sink.headers_mut().insert("x-app", HeaderValue::from_static("demo"));
            assert_eq!(sink.headers()["x-app"], "demo");
            sink.write_head(StatusCode::NO_CONTENT);
            Ok(())
        });
        let app = TimestampHeaders::new(tagged, Config::new(), "stamps").unwrap();

        let sink = run(&app).await;
        let headers = sink.committed_headers().unwrap();
        assert_eq!(headers["x-app"], "demo");
        assert!(headers.contains_key("REQUEST-TIMESTAMP"));
        assert!(headers.contains_key("RESPONSE-TIMESTAMP"));
        assert_eq!(sink.status(), Some(StatusCode::NO_CONTENT));
    }

    #[tokio::test]
    async fn downstream_error_is_returned_unchanged() {
        let failing = handler_fn(|_, _| Err(Error::handler("upstream refused")));
        let app = TimestampHeaders::new(failing, Config::new(), "stamps").unwrap();

        let mut sink = BufferedResponse::new();
        let err = app.serve(request(), &mut sink).await.unwrap_err();
        match err {
            Error::Handler(e) => assert_eq!(e.to_string(), "upstream refused"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!sink.is_committed());
        assert!(sink.headers().is_empty());
    }

    #[tokio::test]
    async fn silent_handler_gets_stamped_200() {
        let app = TimestampHeaders::new(noop(), Config::new(), "stamps")
            .unwrap()
            .with_clock(StepClock::new());

        let sink = run(&app).await;
        assert_eq!(sink.status(), Some(StatusCode::OK));
        let headers = sink.committed_headers().unwrap();
        assert_eq!(headers["REQUEST-TIMESTAMP"], "2024-03-05T07:08:09.000Z");
        assert_eq!(headers["RESPONSE-TIMESTAMP"], "2024-03-05T07:08:10.000Z");
        assert!(sink.body().is_empty());
    }

    #[tokio::test]
    async fn nested_instances_each_stamp() {
        let inner = TimestampHeaders::new(
            noop(),
            Config::new().request_header("x-inner-in").response_header("x-inner-out"),
            "inner",
        )
        .unwrap();
        let outer = TimestampHeaders::new(inner, Config::new(), "outer").unwrap();

        let sink = run(&outer).await;
        let res = sink.into_response();
        for name in ["x-inner-in", "x-inner-out", "REQUEST-TIMESTAMP", "RESPONSE-TIMESTAMP"] {
            assert!(res.headers().contains_key(name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn same_name_for_both_keeps_response_stamp() {
        let config = Config::new().request_header("x-stamp").response_header("x-stamp");
        let ok = handler_fn(|_, sink| {
            sink.write_head(StatusCode::OK);
            Ok(())
        });
        let app = TimestampHeaders::new(ok, config, "stamps")
            .unwrap()
            .with_clock(StepClock::new());

        let sink = run(&app).await;
        let values: Vec<_> = sink.committed_headers().unwrap().get_all("x-stamp").iter().collect();
        assert_eq!(values, ["2024-03-05T07:08:10.000Z"]);
    }

    #[tokio::test]
    async fn each_exchange_starts_fresh() {
        let hello = handler_fn(|_, sink| {
            sink.write_head(StatusCode::OK);
            Ok(())
        });
        let app = TimestampHeaders::new(hello, Config::new(), "stamps")
            .unwrap()
            .with_clock(StepClock::new());

        let first = run(&app).await;
        let second = run(&app).await;

        let first = first.committed_headers().unwrap();
        assert_eq!(first["REQUEST-TIMESTAMP"], "2024-03-05T07:08:09.000Z");
        assert_eq!(first["RESPONSE-TIMESTAMP"], "2024-03-05T07:08:10.000Z");

        // A leftover `finalized` flag would leave the second head unstamped.
        let second = second.committed_headers().unwrap();
        assert_eq!(second["REQUEST-TIMESTAMP"], "2024-03-05T07:08:11.000Z");
        assert_eq!(second["RESPONSE-TIMESTAMP"], "2024-03-05T07:08:12.000Z");
    }

    #[test]
    fn rejects_unusable_header_names() {
        for bad in ["", "has space", "new\nline"] {
            let Err(err) = TimestampHeaders::new(noop(), Config::new().request_header(bad), "t") else {
                panic!("`{bad:?}` accepted as a header name");
            };
            assert!(matches!(err, Error::InvalidHeaderName { ref name, .. } if name == bad));
        }

        let Err(err) = TimestampHeaders::new(noop(), Config::new().response_header(""), "t") else {
            panic!("empty response header name accepted");
        };
        assert!(matches!(err, Error::InvalidHeaderName { .. }));
    }

    #[test]
    fn keeps_config_and_name() {
        let config = Config::new().date_format("15:04");
        let app = TimestampHeaders::new(noop(), config.clone(), "clock-in").unwrap();
        assert_eq!(app.config(), &config);
        assert_eq!(app.name(), "clock-in");
    }

    #[test]
    fn control_bytes_become_spaces() {
        assert_eq!(header_value("07:08\r\n09\u{7f}".to_owned()), "07:08  09 ");
        assert_eq!(header_value("tab\tkept".to_owned()), "tab\tkept");
        assert_eq!(header_value("2024年".to_owned()).as_bytes(), "2024年".as_bytes());
    }
}
