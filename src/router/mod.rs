//! Request routing — map path patterns and HTTP methods to handler chains.
//!
//! [`Router`] holds an insertion-ordered list of routes. Dispatch scans the
//! list and invokes the composed handler chain of the **first** route whose
//! method and pattern both match; registering specific routes before a
//! catch-all therefore gives them priority. When nothing matches, dispatch
//! returns [`Outcome::NotFound`] and the transport decides what a 404 looks
//! like on the wire.
//!
//! Routes are registered through the fluent [`HandlerBuilder`]:
//!
//! ```
//! use microroute::{Method, Router};
//!
//! let mut router = Router::new();
//! router
//!     .build("/things/:id")
//!     .on(Method::Get, |ctx| {
//!         let id = ctx.path_value("id").unwrap_or("").to_owned();
//!         ctx.response_mut().json_mut()["id"] = id.into();
//!     })
//!     .on_json(Method::Put, |ctx| {
//!         let body = ctx.json_body().clone();
//!         ctx.response_mut().json_mut()["saved"] = body;
//!     });
//! ```
//!
//! Registration is a build-phase operation: finish adding routes before
//! serving traffic. Dispatch takes `&self` and is safe to run concurrently
//! across independent transports once registration is done.

use std::sync::Arc;

use tracing::debug;

use crate::auth::{AuthProvider, SimpleAuthProvider};
use crate::context::RequestContext;
use crate::http::Method;
use crate::pattern;
use crate::pipeline::{self, BodyMode, DispatchFn, UploadDispatchFn};
use crate::transport::{Transport, UploadChunk};

/// Result of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A route matched and its handler chain produced a response.
    Handled,
    /// No registered route matched; the transport should answer 404.
    NotFound,
}

// A registered route: method + pattern + the composed handler chains.
// Immutable after construction; owned by the router.
struct Route {
    method: Method,
    pattern: String,
    request: Option<DispatchFn>,
    upload: Option<UploadDispatchFn>,
}

impl Route {
    // True iff the route's method (or ANY) and its pattern both accept the request.
    fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.matches(method) && pattern::matches(&self.pattern, path)
    }
}

/// HTTP request router dispatching to composed handler chains.
pub struct Router {
    routes: Vec<Route>,
    auth: Arc<dyn AuthProvider>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a router whose routes require no authentication (backed by a
    /// disabled [`SimpleAuthProvider`]).
    pub fn new() -> Self {
        Self::with_auth(Arc::new(SimpleAuthProvider::new()))
    }

    /// Creates a router whose protected routes consult `auth`.
    ///
    /// Keep a clone of the `Arc` to toggle authentication at runtime:
    ///
    /// ```
    /// use std::sync::Arc;
    /// use microroute::{Router, auth::SimpleAuthProvider};
    ///
    /// let auth = Arc::new(SimpleAuthProvider::new());
    /// let router = Router::with_auth(auth.clone());
    /// auth.require_authentication("admin", "secret");
    /// # let _ = router;
    /// ```
    pub fn with_auth(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            routes: Vec::new(),
            auth,
        }
    }

    /// Starts registering handlers for `pattern` (e.g. `"/things/:id"`).
    pub fn build(&mut self, pattern: impl Into<String>) -> HandlerBuilder<'_> {
        HandlerBuilder {
            router: self,
            pattern: pattern.into(),
            disable_auth: false,
        }
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatches a request to the first matching route.
    ///
    /// On a match, extracts the path variable bindings and runs the route's
    /// composed handler chain against `transport` — the chain always hands
    /// the transport exactly one response (or auth challenge). Returns
    /// [`Outcome::NotFound`] without touching the transport when no route
    /// matches.
    pub fn dispatch(&self, method: &Method, path: &str, transport: &mut dyn Transport) -> Outcome {
        for route in &self.routes {
            let Some(handler) = &route.request else {
                continue;
            };
            if route.matches(method, path) {
                debug!(%method, path, pattern = %route.pattern, "dispatching request");
                let bindings = pattern::bind(&route.pattern, path);
                handler(transport, &bindings);
                return Outcome::Handled;
            }
        }

        debug!(%method, path, "no matching route");
        Outcome::NotFound
    }

    /// Dispatches one upload chunk to the first matching upload route.
    ///
    /// The transport guarantees chunk ordering; this forwards each chunk to
    /// the route's upload chain, which serializes a response only on the
    /// final chunk.
    pub fn dispatch_upload(
        &self,
        method: &Method,
        path: &str,
        chunk: &UploadChunk<'_>,
        transport: &mut dyn Transport,
    ) -> Outcome {
        for route in &self.routes {
            let Some(handler) = &route.upload else {
                continue;
            };
            if route.matches(method, path) {
                debug!(
                    %method,
                    path,
                    index = chunk.index,
                    is_final = chunk.is_final,
                    "dispatching upload chunk"
                );
                let bindings = pattern::bind(&route.pattern, path);
                handler(transport, &bindings, chunk);
                return Outcome::Handled;
            }
        }

        Outcome::NotFound
    }
}

/// Fluent registration of handler chains against one path pattern.
///
/// Each `on_*` call registers one route immediately. Call
/// [`disable_auth`](Self::disable_auth) first to exempt the subsequent
/// registrations from the router's authentication provider.
pub struct HandlerBuilder<'r> {
    router: &'r mut Router,
    pattern: String,
    disable_auth: bool,
}

impl HandlerBuilder<'_> {
    /// Exempts subsequently registered handlers from authentication, taking
    /// precedence over the global provider setting.
    #[must_use]
    pub fn disable_auth(mut self) -> Self {
        self.disable_auth = true;
        self
    }

    /// Registers a plain handler. The request body is not exposed.
    pub fn on<F>(self, method: Method, handler: F) -> Self
    where
        F: Fn(&mut RequestContext<'_>) + Send + Sync + 'static,
    {
        self.register(method, BodyMode::Ignore, handler)
    }

    /// Registers a handler with lazy access to the raw request body.
    pub fn on_body<F>(self, method: Method, handler: F) -> Self
    where
        F: Fn(&mut RequestContext<'_>) + Send + Sync + 'static,
    {
        self.register(method, BodyMode::Raw, handler)
    }

    /// Registers a JSON handler: the request body is parsed before the
    /// handler runs (malformed JSON answers `400` without invoking it), and
    /// the response JSON document is serialized automatically.
    pub fn on_json<F>(self, method: Method, handler: F) -> Self
    where
        F: Fn(&mut RequestContext<'_>) + Send + Sync + 'static,
    {
        self.register(method, BodyMode::Json, handler)
    }

    /// Registers an upload chunk handler for `POST` requests.
    pub fn on_upload<U>(self, upload: U) -> Self
    where
        U: Fn(&mut RequestContext<'_>, &UploadChunk<'_>) + Send + Sync + 'static,
    {
        self.register_upload(Arc::new(upload), None)
    }

    /// Registers an upload chunk handler plus a completion handler that runs
    /// after the final chunk, before the response is serialized.
    pub fn on_upload_with<F, U>(self, completion: F, upload: U) -> Self
    where
        F: Fn(&mut RequestContext<'_>) + Send + Sync + 'static,
        U: Fn(&mut RequestContext<'_>, &UploadChunk<'_>) + Send + Sync + 'static,
    {
        self.register_upload(Arc::new(upload), Some(Arc::new(completion)))
    }

    fn auth_for_route(&self) -> Option<Arc<dyn AuthProvider>> {
        (!self.disable_auth).then(|| self.router.auth.clone())
    }

    fn register<F>(self, method: Method, body_mode: BodyMode, handler: F) -> Self
    where
        F: Fn(&mut RequestContext<'_>) + Send + Sync + 'static,
    {
        let chain = pipeline::compose(Arc::new(handler), body_mode, self.auth_for_route());
        self.router.routes.push(Route {
            method,
            pattern: self.pattern.clone(),
            request: Some(chain),
            upload: None,
        });
        self
    }

    fn register_upload(
        self,
        upload: crate::pipeline::UploadHandler,
        completion: Option<crate::pipeline::RequestHandler>,
    ) -> Self {
        let chain = pipeline::compose_upload(upload, completion, self.auth_for_route());
        self.router.routes.push(Route {
            method: Method::Post,
            pattern: self.pattern.clone(),
            request: None,
            upload: Some(chain),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;
    use crate::test_support::MockTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn router_starts_empty() {
        let router = Router::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn path_variable_reaches_handler() {
        // end-to-end scenario: GET /things/:id with /things/42
        let mut router = Router::new();
        router.build("/things/:id").on(Method::Get, |ctx| {
            let id = ctx.path_value("id").unwrap_or("").to_owned();
            ctx.response_mut().json_mut()["id"] = id.into();
        });

        let mut transport = MockTransport::new();
        let outcome = router.dispatch(&Method::Get, "/things/42", &mut transport);

        assert_eq!(outcome, Outcome::Handled);
        let sent = transport.sent.unwrap();
        assert_eq!(sent.status, StatusCode::Ok);
        assert_eq!(sent.body_str(), r#"{"id":"42"}"#);
    }

    #[test]
    fn extra_segment_is_not_found() {
        let mut router = Router::new();
        router.build("/things/:id").on(Method::Get, |_ctx| {});

        let mut transport = MockTransport::new();
        let outcome = router.dispatch(&Method::Get, "/things/42/sub", &mut transport);

        assert_eq!(outcome, Outcome::NotFound);
        assert!(transport.sent.is_none());
    }

    #[test]
    fn method_mismatch_is_not_found() {
        let mut router = Router::new();
        router.build("/things").on(Method::Get, |_ctx| {});

        let mut transport = MockTransport::new();
        let outcome = router.dispatch(&Method::Post, "/things", &mut transport);
        assert_eq!(outcome, Outcome::NotFound);
    }

    #[test]
    fn any_route_matches_every_method() {
        let mut router = Router::new();
        router.build("/anything").on(Method::Any, |ctx| {
            ctx.response_mut().set_status(StatusCode::NoContent);
        });

        for method in [Method::Get, Method::Post, Method::Delete, Method::Patch] {
            let mut transport = MockTransport::new();
            let outcome = router.dispatch(&method, "/anything", &mut transport);
            assert_eq!(outcome, Outcome::Handled);
            assert_eq!(transport.sent.unwrap().status, StatusCode::NoContent);
        }
    }

    #[test]
    fn first_registered_matching_route_wins() {
        let mut router = Router::new();
        router.build("/things/special").on(Method::Get, |ctx| {
            ctx.response_mut().json_mut()["which"] = "specific".into();
        });
        router.build("/things/:id").on(Method::Get, |ctx| {
            ctx.response_mut().json_mut()["which"] = "variable".into();
        });

        let mut transport = MockTransport::new();
        router.dispatch(&Method::Get, "/things/special", &mut transport);
        assert_eq!(
            transport.sent.unwrap().body_str(),
            r#"{"which":"specific"}"#
        );

        let mut transport = MockTransport::new();
        router.dispatch(&Method::Get, "/things/99", &mut transport);
        assert_eq!(
            transport.sent.unwrap().body_str(),
            r#"{"which":"variable"}"#
        );
    }

    #[test]
    fn registration_order_breaks_ties() {
        let mut router = Router::new();
        router.build("/path").on(Method::Get, |ctx| {
            ctx.response_mut().set_status(StatusCode::Ok);
        });
        router.build("/path").on(Method::Get, |ctx| {
            ctx.response_mut().set_status(StatusCode::Accepted);
        });

        let mut transport = MockTransport::new();
        router.dispatch(&Method::Get, "/path", &mut transport);
        assert_eq!(transport.sent.unwrap().status, StatusCode::Ok);
    }

    #[test]
    fn json_route_rejects_truncated_body_without_invoking_handler() {
        // end-to-end scenario: POST /items with truncated JSON
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_handler = calls.clone();
        let mut router = Router::new();
        router.build("/items").on_json(Method::Post, move |_ctx| {
            calls_in_handler.fetch_add(1, Ordering::SeqCst);
        });

        let mut transport = MockTransport::with_body(br#"{"a":1"#);
        let outcome = router.dispatch(&Method::Post, "/items", &mut transport);

        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let sent = transport.sent.unwrap();
        assert_eq!(sent.status, StatusCode::BadRequest);
        let envelope: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
        assert_eq!(envelope["error"]["message"], "Error parsing JSON");
        assert!(envelope["error"]["id"].is_string());
    }

    #[test]
    fn protected_routes_challenge_then_accept() {
        // end-to-end scenario: auth enabled, then request without and with credentials
        let auth = Arc::new(SimpleAuthProvider::new());
        let mut router = Router::with_auth(auth.clone());
        router.build("/protected").on(Method::Get, |ctx| {
            ctx.response_mut().json_mut()["ok"] = true.into();
        });
        auth.require_authentication("admin", "secret");

        let mut anonymous = MockTransport::new();
        router.dispatch(&Method::Get, "/protected", &mut anonymous);
        assert!(anonymous.challenged);
        assert!(anonymous.sent.is_none());

        let mut authed = MockTransport::new().with_client_credentials("admin", "secret");
        router.dispatch(&Method::Get, "/protected", &mut authed);
        assert!(!authed.challenged);
        assert_eq!(authed.sent.unwrap().body_str(), r#"{"ok":true}"#);
    }

    #[test]
    fn disable_auth_overrides_enabled_provider() {
        let auth = Arc::new(SimpleAuthProvider::new());
        auth.require_authentication("admin", "secret");
        let mut router = Router::with_auth(auth);
        router
            .build("/public")
            .disable_auth()
            .on(Method::Get, |ctx| {
                ctx.response_mut().json_mut()["open"] = true.into();
            });

        let mut transport = MockTransport::new();
        router.dispatch(&Method::Get, "/public", &mut transport);
        assert!(!transport.challenged);
        assert_eq!(transport.sent.unwrap().body_str(), r#"{"open":true}"#);
    }

    #[test]
    fn trailing_slash_does_not_match() {
        let mut router = Router::new();
        router.build("/a/b").on(Method::Get, |_ctx| {});

        let mut transport = MockTransport::new();
        assert_eq!(
            router.dispatch(&Method::Get, "/a/b/", &mut transport),
            Outcome::NotFound
        );
    }

    #[test]
    fn upload_route_receives_chunks_in_order() {
        let offsets: Arc<std::sync::Mutex<Vec<usize>>> = Arc::default();
        let offsets_in_handler = offsets.clone();
        let mut router = Router::new();
        router.build("/firmware").on_upload_with(
            |ctx| {
                ctx.response_mut().json_mut()["flashed"] = true.into();
            },
            move |_ctx, chunk| {
                offsets_in_handler.lock().unwrap().push(chunk.index);
            },
        );

        let mut transport = MockTransport::new();
        for (index, is_final) in [(0, false), (1024, false), (2048, true)] {
            let chunk = UploadChunk {
                filename: "image.bin",
                index,
                data: b"data",
                is_final,
            };
            let outcome =
                router.dispatch_upload(&Method::Post, "/firmware", &chunk, &mut transport);
            assert_eq!(outcome, Outcome::Handled);
        }

        assert_eq!(*offsets.lock().unwrap(), vec![0, 1024, 2048]);
        assert_eq!(transport.sent.unwrap().body_str(), r#"{"flashed":true}"#);
    }

    #[test]
    fn upload_routes_are_invisible_to_plain_dispatch() {
        let mut router = Router::new();
        router.build("/firmware").on_upload(|_ctx, _chunk| {});

        let mut transport = MockTransport::new();
        assert_eq!(
            router.dispatch(&Method::Post, "/firmware", &mut transport),
            Outcome::NotFound
        );
    }

    #[test]
    fn multiple_methods_on_one_pattern() {
        let mut router = Router::new();
        router
            .build("/things/:id")
            .on(Method::Get, |ctx| {
                ctx.response_mut().json_mut()["op"] = "read".into();
            })
            .on(Method::Delete, |ctx| {
                ctx.response_mut().json_mut()["op"] = "delete".into();
            });

        let mut transport = MockTransport::new();
        router.dispatch(&Method::Delete, "/things/9", &mut transport);
        assert_eq!(transport.sent.unwrap().body_str(), r#"{"op":"delete"}"#);
    }
}
