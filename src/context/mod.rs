//! Per-request facade over path bindings, the lazily-loaded body, the parsed
//! JSON document, and the outgoing response.
//!
//! A [`RequestContext`] is created for exactly one request and destroyed when
//! its response is sent. The raw body and the JSON document are loaded at
//! most once each and cached — most handlers need only one of the two, so
//! both are deferred until first access.

use bytes::Bytes;
use serde_json::{Value, json};

use crate::http::{CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT, StatusCode};
use crate::pattern::Bindings;
use crate::transport::Transport;

/// Mutable response state filled in by handlers.
///
/// Starts as status `200` with no body. A handler either sets a raw body
/// (verbatim bytes plus a content type) or writes into the JSON document;
/// at serialization time the raw body takes precedence, then the JSON
/// document, then an empty body. Exactly one of those paths is taken.
///
/// # Examples
///
/// ```
/// use microroute::context::ResponseBuilder;
/// use microroute::http::StatusCode;
///
/// let mut response = ResponseBuilder::new();
/// response.json_mut()["state"] = "on".into();
/// response.set_status(StatusCode::Ok);
///
/// let (status, content_type, body) = response.into_parts();
/// assert_eq!(status, StatusCode::Ok);
/// assert_eq!(content_type, "application/json");
/// assert_eq!(&body[..], br#"{"state":"on"}"#);
/// ```
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    raw_body: Option<(String, Bytes)>,
    json: Value,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    /// Creates a builder with status `200` and no body.
    pub fn new() -> Self {
        Self {
            status: StatusCode::Ok,
            raw_body: None,
            json: Value::Null,
        }
    }

    /// Returns the current status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets a raw body with its content type, overriding any JSON document
    /// at serialization time.
    pub fn send_raw(
        &mut self,
        status: StatusCode,
        content_type: impl Into<String>,
        body: impl Into<Bytes>,
    ) {
        self.status = status;
        self.raw_body = Some((content_type.into(), body.into()));
    }

    /// Returns `true` if a raw body has been set.
    pub fn is_raw_body_set(&self) -> bool {
        self.raw_body.is_some()
    }

    /// Returns the response JSON document.
    pub fn json(&self) -> &Value {
        &self.json
    }

    /// Returns the response JSON document for writing.
    pub fn json_mut(&mut self) -> &mut Value {
        &mut self.json
    }

    /// Resolves the builder into `(status, content type, body)` for the
    /// transport: the raw body verbatim if set, else the serialized JSON
    /// document, else an empty plain-text body.
    pub fn into_parts(self) -> (StatusCode, String, Bytes) {
        if let Some((content_type, body)) = self.raw_body {
            return (self.status, content_type, body);
        }

        if !self.json.is_null() {
            // Serializing a Value never fails.
            let body = serde_json::to_vec(&self.json).unwrap_or_default();
            return (self.status, CONTENT_TYPE_JSON.to_owned(), body.into());
        }

        (self.status, CONTENT_TYPE_TEXT.to_owned(), Bytes::new())
    }
}

/// Per-request facade handed to user handlers.
///
/// Borrows the transport for the duration of the handler so the body can be
/// pulled on demand; owns the [`ResponseBuilder`] the handler writes into.
///
/// # Examples
///
/// ```no_run
/// use microroute::context::RequestContext;
///
/// fn show_thing(ctx: &mut RequestContext<'_>) {
///     let id = ctx.path_value("id").unwrap_or("unknown").to_owned();
///     ctx.response_mut().json_mut()["id"] = id.into();
/// }
/// ```
pub struct RequestContext<'t> {
    transport: &'t mut dyn Transport,
    bindings: &'t Bindings,
    response: ResponseBuilder,
    body: Bytes,
    body_loaded: bool,
    json: Value,
    json_parsed: bool,
    has_body: bool,
}

impl<'t> RequestContext<'t> {
    /// Creates a context for one request. `has_body` tells the context
    /// whether the transport has a body to offer; plain handlers are built
    /// with it forced to `false`.
    pub fn new(transport: &'t mut dyn Transport, bindings: &'t Bindings, has_body: bool) -> Self {
        Self {
            transport,
            bindings,
            response: ResponseBuilder::new(),
            body: Bytes::new(),
            body_loaded: false,
            json: Value::Null,
            json_parsed: false,
            has_body,
        }
    }

    /// Looks up a path variable bound from the matched pattern.
    ///
    /// Returns `None` when the variable is not present in the pattern — a
    /// programmer error surfaced as a missing value, not a panic.
    pub fn path_value(&self, name: &str) -> Option<&str> {
        self.bindings.get(name)
    }

    /// Returns the full binding table.
    pub fn bindings(&self) -> &Bindings {
        self.bindings
    }

    /// Returns `true` if this request carries a body.
    pub fn has_body(&self) -> bool {
        self.has_body
    }

    /// Returns the raw request body, loading it from the transport on first
    /// access and caching it for the rest of the request.
    pub fn body(&mut self) -> &Bytes {
        if !self.body_loaded {
            if self.has_body {
                self.body = self.transport.load_body();
            }
            self.body_loaded = true;
        }
        &self.body
    }

    /// Returns the request body parsed as JSON, parsing at most once.
    ///
    /// On a parse failure the response is set to `400` with the error
    /// envelope `{"error": {"message": "Error parsing JSON", "id": …}}` and
    /// `Value::Null` is returned; the failure is cached like a success, so a
    /// second call does not re-parse. Callers must tolerate the null
    /// document.
    pub fn json_body(&mut self) -> &Value {
        if !self.json_parsed {
            let bytes = self.body().clone();
            self.json = match serde_json::from_slice(&bytes) {
                Ok(document) => document,
                Err(err) => {
                    self.response.set_status(StatusCode::BadRequest);
                    *self.response.json_mut() = json!({
                        "error": {
                            "message": "Error parsing JSON",
                            "id": err.to_string(),
                        }
                    });
                    Value::Null
                }
            };
            self.json_parsed = true;
        }
        &self.json
    }

    /// Deserializes the request body into a typed value.
    ///
    /// Unlike [`json_body`](Self::json_body), a failure here is reported to
    /// the caller and leaves the response untouched.
    pub fn deserialize_body<T>(&mut self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.body())
    }

    /// Returns the outgoing response state.
    pub fn response(&self) -> &ResponseBuilder {
        &self.response
    }

    /// Returns the outgoing response state for writing.
    pub fn response_mut(&mut self) -> &mut ResponseBuilder {
        &mut self.response
    }

    /// Consumes the context, releasing the transport borrow and yielding the
    /// response for serialization.
    pub fn into_response(self) -> ResponseBuilder {
        self.response
    }
}
