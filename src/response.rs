//! Outgoing HTTP response type and the streaming body channel.
//!
//! Buffered responses (the index page, the rendered error page) carry their
//! whole body up front. Streamed responses are built with
//! [`ResponseBuilder::streamed`], which splits the response into a
//! [`ResponseSink`] for the producer and a `Response` whose body drains the
//! sink — that is how archive bytes reach the client while the compressor
//! is still running.

use std::io;

use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::error;

/// The body type carried by every [`Response`].
pub type Body = BoxBody<Bytes, io::Error>;

/// How many chunks a streamed body buffers between producer and client.
///
/// A full channel suspends the producer, so a slow client can hold at most
/// `STREAM_CAPACITY` chunks of archive output in memory per request.
const STREAM_CAPACITY: usize = 4;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values served by this crate.
pub enum ContentType {
    Html, // text/html; charset=utf-8
    Text, // text/plain; charset=utf-8
    Zip,  // application/zip
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
            Self::Zip => "application/zip",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use zipserve::Response;
/// use http::StatusCode;
///
/// Response::html("<h1>downloads</h1>");
/// Response::status(StatusCode::NOT_FOUND);
/// ```
///
/// # Builder (custom status, extra headers, or a streamed body)
///
/// ```rust
/// use zipserve::{ContentType, Response};
/// use http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::NOT_FOUND)
///     .html("<h1>archive not found</h1>");
///
/// let (sink, response) = Response::builder()
///     .header("content-disposition", "attachment; filename=\"photos.zip\"")
///     .streamed(ContentType::Zip);
/// ```
pub struct Response {
    inner: http::Response<Body>,
}

impl Response {
    /// `200 OK` — `text/html; charset=utf-8`.
    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::builder().html(body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with the given status and no body.
    pub fn status(status: StatusCode) -> Self {
        let mut inner = http::Response::new(Empty::new().map_err(io::Error::other).boxed());
        *inner.status_mut() = status;
        Self { inner }
    }

    /// Builder for responses that need a custom status, extra headers, or a
    /// streamed body.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: Vec::new() }
    }

    /// Consumes the wrapper, yielding the raw `http` response the server
    /// hands to hyper.
    pub fn into_inner(self) -> http::Response<Body> {
        self.inner
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method — you always know what you're sending.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl ResponseBuilder {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a response header. A name or value that is not legal in a header
    /// is dropped and logged rather than poisoning the response.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(n), Ok(v)) => self.headers.push((n, v)),
            _ => error!(header = name, "dropping invalid header"),
        }
        self
    }

    /// Terminate with an HTML body (`text/html; charset=utf-8`).
    pub fn html(self, body: impl Into<Bytes>) -> Response {
        self.finish(ContentType::Html, full(body.into()))
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, full(body.into().into_bytes().into()))
    }

    /// Terminate with a streamed body fed through the returned sink.
    ///
    /// The response's headers are committed the moment the server sends it;
    /// everything written to the sink afterwards goes out as body chunks, in
    /// order. Dropping the sink ends the body. Dropping the response (the
    /// client went away) closes the sink: the next
    /// [`send`](ResponseSink::send) fails and
    /// [`closed`](ResponseSink::closed) resolves.
    pub fn streamed(self, content_type: ContentType) -> (ResponseSink, Response) {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let body = StreamBody::new(ReceiverStream::new(rx)).boxed();
        (ResponseSink { tx }, self.finish(content_type, body))
    }

    fn finish(self, content_type: ContentType, body: Body) -> Response {
        let mut inner = http::Response::new(body);
        *inner.status_mut() = self.status;
        inner.headers_mut().insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static(content_type.as_str()),
        );
        for (name, value) in self.headers {
            inner.headers_mut().append(name, value);
        }
        Response { inner }
    }
}

fn full(body: Bytes) -> Body {
    Full::new(body).map_err(io::Error::other).boxed()
}

// ── ResponseSink ─────────────────────────────────────────────────────────────

/// Write half of a streamed response body.
///
/// Held by the archive pump for the lifetime of one download. All three
/// operations are cancellation-aware: `send` applies backpressure through
/// the bounded channel, `closed` resolves as soon as the reading side is
/// gone, and `abort` terminates the body with an error so the transport
/// tears the transfer down instead of ending it cleanly.
pub struct ResponseSink {
    tx: mpsc::Sender<Result<Frame<Bytes>, io::Error>>,
}

impl ResponseSink {
    /// Queue one chunk for delivery. Suspends while the channel is full.
    ///
    /// Fails with [`SinkClosed`] when the body has been dropped — there is
    /// no client left to deliver to.
    pub async fn send(&self, chunk: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(Ok(Frame::data(chunk))).await.map_err(|_| SinkClosed)
    }

    /// Resolves when the reading side of the body has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// End the body with an error instead of a clean EOF. Best effort: if
    /// the client is already gone there is nothing left to abort.
    pub async fn abort(&self, error: io::Error) {
        let _ = self.tx.send(Err(error)).await;
    }
}

/// Error returned by [`ResponseSink::send`] once the client is gone.
#[derive(Debug)]
pub struct SinkClosed;

impl std::fmt::Display for SinkClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("response body closed")
    }
}

impl std::error::Error for SinkClosed {}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn streamed_body_delivers_chunks_in_order() {
        let (sink, response) = Response::builder().streamed(ContentType::Zip);
        let mut body = response.into_inner().into_body();

        sink.send(Bytes::from_static(b"one")).await.unwrap();
        sink.send(Bytes::from_static(b"two")).await.unwrap();

        for expected in [&b"one"[..], &b"two"[..]] {
            let frame = body.frame().await.unwrap().unwrap();
            assert_eq!(frame.into_data().unwrap(), expected);
        }

        drop(sink);
        assert!(body.frame().await.is_none(), "body ends after the sink is dropped");
    }

    #[tokio::test]
    async fn dropping_the_body_closes_the_sink() {
        let (sink, response) = Response::builder().streamed(ContentType::Zip);
        drop(response);

        tokio::time::timeout(Duration::from_secs(1), sink.closed())
            .await
            .expect("closed() resolves once the body is gone");
        assert!(sink.send(Bytes::from_static(b"late")).await.is_err());
    }

    #[tokio::test]
    async fn abort_surfaces_as_a_body_error() {
        let (sink, response) = Response::builder().streamed(ContentType::Zip);
        let mut body = response.into_inner().into_body();

        sink.abort(io::Error::other("producer failed")).await;
        drop(sink);

        assert!(body.frame().await.unwrap().is_err());
    }

    #[test]
    fn buffered_responses_carry_status_and_content_type() {
        let res = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .html("<h1>missing</h1>")
            .into_inner();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()["content-type"], "text/html; charset=utf-8");
    }
}
