//! Handler composition — wraps a user callback in the cross-cutting layers a
//! route is configured with, producing a single callback with the
//! transport-native dispatch signature.
//!
//! Wrapping order is fixed, outermost to innermost:
//!
//! 1. **Authentication gate** — short-circuits to an auth challenge when the
//!    provider requires credentials the transport cannot validate.
//! 2. **Body/JSON loading** — for JSON routes, parses the body exactly once
//!    before the user callback; a parse failure short-circuits to the `400`
//!    error envelope without invoking the callback.
//! 3. **User callback** — business logic, mutating the request context.
//! 4. **Serialization** — resolves the response builder (raw body first,
//!    then JSON document, then empty) and hands it to the transport.
//!
//! For uploads the same auth gate applies per chunk; chunks are forwarded
//! without buffering and the response is serialized only on the final chunk.

use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::context::{RequestContext, ResponseBuilder};
use crate::http::StatusCode;
use crate::pattern::Bindings;
use crate::transport::{Transport, UploadChunk};

/// A user-supplied request handler: mutates the per-request context.
pub type RequestHandler = Arc<dyn Fn(&mut RequestContext<'_>) + Send + Sync + 'static>;

/// A user-supplied upload handler: receives each chunk in delivery order.
pub type UploadHandler =
    Arc<dyn Fn(&mut RequestContext<'_>, &UploadChunk<'_>) + Send + Sync + 'static>;

/// The transport-native callback a route stores for ordinary requests.
pub type DispatchFn = Arc<dyn Fn(&mut dyn Transport, &Bindings) + Send + Sync + 'static>;

/// The transport-native callback a route stores for upload chunks.
pub type UploadDispatchFn =
    Arc<dyn Fn(&mut dyn Transport, &Bindings, &UploadChunk<'_>) + Send + Sync + 'static>;

/// How a route treats the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// The context reports no body; nothing is ever loaded.
    Ignore,
    /// The raw body is available lazily via `RequestContext::body`.
    Raw,
    /// The body is parsed as JSON before the user callback runs; a parse
    /// failure skips the callback and answers with the error envelope.
    Json,
}

/// Composes a user callback with the configured wrappers into a single
/// dispatch callback.
///
/// `auth` is `None` when the route opted out of authentication; otherwise
/// the provider is consulted on every request.
pub(crate) fn compose(
    user: RequestHandler,
    body_mode: BodyMode,
    auth: Option<Arc<dyn AuthProvider>>,
) -> DispatchFn {
    with_auth_gate(auth, with_context(user, body_mode))
}

/// Composes an upload chunk handler, with an optional completion handler
/// that runs once after the final chunk, before the response is serialized.
pub(crate) fn compose_upload(
    upload: UploadHandler,
    completion: Option<RequestHandler>,
    auth: Option<Arc<dyn AuthProvider>>,
) -> UploadDispatchFn {
    Arc::new(move |transport, bindings, chunk| {
        if let Some(provider) = &auth {
            if !authorized(provider.as_ref(), transport) {
                return;
            }
        }

        let mut ctx = RequestContext::new(&mut *transport, bindings, false);
        upload(&mut ctx, chunk);

        // Intermediate chunks produce no response; the transport keeps the
        // connection in its upload state until the final chunk arrives.
        if chunk.is_final {
            if let Some(done) = &completion {
                done(&mut ctx);
            }
            let response = ctx.into_response();
            send(transport, response);
        }
    })
}

/// Innermost stages: build the context, load/parse the body as configured,
/// run the user callback, serialize the response.
fn with_context(user: RequestHandler, body_mode: BodyMode) -> DispatchFn {
    Arc::new(move |transport, bindings| {
        let has_body = body_mode != BodyMode::Ignore && transport.has_body();
        let mut ctx = RequestContext::new(&mut *transport, bindings, has_body);

        let mut run_user = true;
        if body_mode == BodyMode::Json {
            ctx.json_body();
            // The context is fresh, so a 400 here can only mean the parse
            // failed and the error envelope is already in place.
            if ctx.response().status() == StatusCode::BadRequest {
                run_user = false;
            }
        }

        if run_user {
            user(&mut ctx);
        }

        let response = ctx.into_response();
        send(transport, response);
    })
}

/// Outermost stage: the authentication gate.
fn with_auth_gate(auth: Option<Arc<dyn AuthProvider>>, next: DispatchFn) -> DispatchFn {
    match auth {
        None => next,
        Some(provider) => Arc::new(move |transport, bindings| {
            if authorized(provider.as_ref(), transport) {
                next(transport, bindings);
            }
        }),
    }
}

/// Checks the provider against the transport. Emits the auth challenge and
/// returns `false` when credentials are required but invalid or missing.
fn authorized(provider: &dyn AuthProvider, transport: &mut dyn Transport) -> bool {
    if !provider.is_authentication_enabled() {
        return true;
    }

    let valid = provider
        .credentials()
        .is_some_and(|c| transport.authenticate(&c.username, &c.password));

    if !valid {
        transport.request_authentication();
    }

    valid
}

/// Resolves the response builder and hands exactly one response to the
/// transport.
fn send(transport: &mut dyn Transport, response: ResponseBuilder) {
    let (status, content_type, body) = response.into_parts();
    transport.send_response(status, &content_type, &body);
}
