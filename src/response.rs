//! Response sinks.
//!
//! Handlers do not return a response; they write one. A [`ResponseSink`]
//! accepts header mutations, one head (status + headers) and then body
//! bytes, in that order. That shape is what lets middleware intercept the
//! exact moment the head is committed.
//!
//! ```text
//! headers_mut() … headers_mut()   ← free to change
//!        ↓ write_head(status)      ← head committed, later mutations ignored
//! write_body(…) … write_body(…)
//! ```

use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

// ── ResponseSink ──────────────────────────────────────────────────────────────

/// The capability set a handler writes its response into.
///
/// `Send` so a `&mut dyn ResponseSink` can be held across `.await` inside a
/// handler future that tokio moves between threads.
pub trait ResponseSink: Send {
    /// Headers that will be (or were) sent with the head.
    fn headers(&self) -> &HeaderMap;

    /// Mutable headers. Changes only matter before [`write_head`](Self::write_head).
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the status line and current headers.
    ///
    /// May be called more than once; what a repeated call does is up to the
    /// sink, but it must not panic.
    fn write_head(&mut self, status: StatusCode);

    /// Appends body bytes. Commits `200 OK` first if no head was written yet.
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
}

// ── BufferedResponse ──────────────────────────────────────────────────────────

/// An in-memory sink that becomes an [`http::Response`] once the handler is done.
///
/// This is what the server hands to every handler, and what tests use to
/// inspect a handler's output.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    headers: HeaderMap,
    head: Option<(StatusCode, HeaderMap)>,
    body: BytesMut,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of the committed head, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|(status, _)| *status)
    }

    /// Headers as committed by `write_head`, if it has happened.
    pub fn committed_headers(&self) -> Option<&HeaderMap> {
        self.head.as_ref().map(|(_, headers)| headers)
    }

    pub fn is_committed(&self) -> bool {
        self.head.is_some()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts into an `http::Response`.
    ///
    /// A handler that never wrote anything produces an empty `200 OK` with
    /// whatever headers it set.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let (status, headers) = self.head.unwrap_or((StatusCode::OK, self.headers));
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl ResponseSink for BufferedResponse {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        if let Some((committed, _)) = &self.head {
            warn!(%committed, ignored = %status, "superfluous write_head");
            return;
        }
        self.head = Some((status, self.headers.clone()));
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.head.is_none() {
            self.write_head(StatusCode::OK);
        }
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}
