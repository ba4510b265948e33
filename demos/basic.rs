//! Minimal timestamp-headers example — one endpoint behind the middleware.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/slow
//!
//! Every response carries `x-request-time` and `x-response-time`.

use std::time::Duration;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use timestamp_headers::{Config, Handler, Request, ResponseSink, Server, TimestampHeaders};
use timestamp_headers::{BoxFuture, Error};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::new()
        .request_header("X-Request-Time")
        .response_header("X-Response-Time")
        .date_format("2006-01-02T15:04:05.000000Z07:00");

    let app = TimestampHeaders::new(Hello, config, "timestamps").expect("invalid config");

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /      → 200 "Hello World"
// GET /slow  → same, after 250 ms, so the two timestamps visibly differ
struct Hello;

impl Handler for Hello {
    fn serve<'a>(
        &'a self,
        req: Request,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(hello(req, sink))
    }
}

async fn hello(req: Request, sink: &mut dyn ResponseSink) -> Result<(), Error> {
    if req.path() == "/slow" {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    sink.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    sink.write_head(StatusCode::OK);
    sink.write_body(b"Hello World")?;
    Ok(())
}
