//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. No magic, no middleware
//! stack, no reflection. You register a path, you get a handler. That is all.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};

/// The application router.
///
/// One radix tree per HTTP method — O(path-length) lookup, no allocations on
/// the hot path. Build it once at startup; pass it to
/// [`Server::serve`](crate::Server::serve). Each registration returns `self`
/// so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them.
    /// Trailing slashes are significant: `/archive/{archive_hash}/` does not
    /// match `/archive/abc123`.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route pattern. Routes are registered
    /// once at startup, so this fails fast rather than at request time.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Shorthand for [`on`](Self::on) with `GET`.
    ///
    /// ```rust,no_run
    /// # use zipserve::{Request, Response, Router};
    /// # async fn index(_: Request) -> Response { Response::text("") }
    /// # async fn archive(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .get("/", index)
    ///     .get("/archive/{archive_hash}/", archive);
    /// ```
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
