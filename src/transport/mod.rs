//! The narrow interface between the router core and an HTTP transport.
//!
//! The router and pipeline never talk to a socket or a server loop; they see
//! one [`Transport`] value per request. Both transport styles fit behind it:
//! a blocking request/response loop that calls
//! [`dispatch`](crate::router::Router::dispatch) to completion before
//! accepting the next request, and an event-driven server with one transport
//! value per in-flight connection (the bundled
//! [`HttpServer`](crate::server::HttpServer) is one such implementation).

use bytes::Bytes;

/// Per-request capability handed to the composed handler chain.
///
/// Exactly one [`send_response`](Transport::send_response) or
/// [`request_authentication`](Transport::request_authentication) call is made
/// per dispatched request; the transport owns what those mean on the wire.
/// A `Transport` value must never be shared or reused across requests.
pub trait Transport {
    /// Sends the final response for the current request.
    fn send_response(&mut self, status: crate::http::StatusCode, content_type: &str, body: &[u8]);

    /// Challenges the client for credentials (e.g. a `401` with a
    /// `WWW-Authenticate` header).
    fn request_authentication(&mut self);

    /// Validates the configured credentials against the current request.
    fn authenticate(&mut self, username: &str, password: &str) -> bool;

    /// Loads the raw request body. The request context calls this at most
    /// once per request and caches the result.
    fn load_body(&mut self) -> Bytes;

    /// Returns `true` if the current request carries a body.
    fn has_body(&self) -> bool;
}

/// One chunk of a multi-part upload, delivered in transport order.
///
/// The pipeline forwards each chunk to the route's upload handler without
/// buffering; aggregation (e.g. streaming to flash or disk) belongs to the
/// handler. `index` is monotonically non-decreasing across the chunks of one
/// upload, and exactly one chunk has `is_final` set.
#[derive(Debug, Clone, Copy)]
pub struct UploadChunk<'a> {
    /// Client-supplied name of the uploaded file.
    pub filename: &'a str,
    /// Byte offset of this chunk within the overall upload.
    pub index: usize,
    /// Payload of this chunk.
    pub data: &'a [u8],
    /// Set on the last chunk of the upload.
    pub is_final: bool,
}

impl UploadChunk<'_> {
    /// Returns the number of payload bytes in this chunk.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if this chunk carries no payload (legal for the final
    /// marker chunk).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
