//! Incoming HTTP request type.

use std::collections::HashMap;

use http::Method;

/// An incoming HTTP request, as seen by a handler.
///
/// Wraps the request head together with the parameters captured by the
/// router, so a handler registered at `/archive/{archive_hash}/` can read
/// the hash with [`param`](Self::param).
pub struct Request {
    parts: http::request::Parts,
    params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, params: HashMap<String, String>) -> Self {
        Self { parts, params }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Request path, exactly as sent by the client. Not percent-decoded.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value captured for the named route parameter, if the matched route
    /// declares one.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
