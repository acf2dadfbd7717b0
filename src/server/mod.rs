//! Bundled event-driven transport: an async HTTP/1.1 server using Tokio.
//!
//! Accepts TCP connections, parses requests, and hands each one to a
//! [`Router`] through a per-request [`Transport`] implementation. Multiple
//! connections progress concurrently, each with its own request context;
//! the router itself is shared immutably. HTTP/1.1 persistent connections
//! (keep-alive) are supported out of the box.
//!
//! Basic authentication is validated here: `authenticate` compares the
//! request's `Authorization` header against the credentials configured on
//! the router's [`AuthProvider`](crate::auth::AuthProvider), and
//! `request_authentication` answers with a `401` challenge.

use std::net::SocketAddr;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::request::RequestError;
use crate::http::{Request, Response, StatusCode};
use crate::router::{Outcome, Router};
use crate::transport::Transport;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// Realm announced in the Basic auth challenge.
const BASIC_AUTH_REALM: &str = "microroute";

/// Async HTTP/1.1 server that feeds requests to a [`Router`].
///
/// # Examples
///
/// ```rust,no_run
/// use microroute::{HttpServer, Method, Router};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut router = Router::new();
///     router.build("/ping").on(Method::Get, |ctx| {
///         ctx.response_mut().json_mut()["pong"] = true.into();
///     });
///
///     let server = HttpServer::bind("127.0.0.1:8080").await?;
///     server.run(router).await?;
///     Ok(())
/// }
/// ```
pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl HttpServer {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and dispatching requests to `router`.
    ///
    /// Complete all route registration before calling this — the router is
    /// frozen behind an `Arc` and shared across connection tasks.
    ///
    /// This method runs until the process is terminated or an unrecoverable
    /// listener error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run(self, router: Router) -> Result<(), ServerError> {
        let router = Arc::new(router);
        info!(address = %self.local_addr, routes = router.len(), "listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let router = Arc::clone(&router);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, router).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: we loop, reading one
/// request per iteration, until the peer closes the connection or signals
/// `Connection: close`.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let bytes_read = stream.read_buf(&mut buf).await?;

        if bytes_read == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        // Guard against excessively large requests.
        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large — sending 413");
            let response = Response::new(StatusCode::PayloadTooLarge)
                .body("Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        }

        // Attempt to parse the buffered data as an HTTP request.
        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                // Headers not yet fully received — read more data.
                continue;
            }
            Err(RequestError::UnsupportedMethod(e)) => {
                warn!(peer = %peer_addr, error = %e, "unsupported method — sending 501");
                let response = Response::new(StatusCode::NotImplemented)
                    .body(e.to_string())
                    .keep_alive(false);
                stream.write_all(&response.into_bytes()).await?;
                break;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request — sending 400");
                let response = Response::new(StatusCode::BadRequest)
                    .body(format!("Bad Request: {e}"))
                    .keep_alive(false);
                stream.write_all(&response.into_bytes()).await?;
                break;
            }
        };

        // Wait for the full body to arrive if Content-Length is set.
        let content_length = request.content_length().unwrap_or(0);
        let total_needed = body_offset + content_length;
        if buf.len() < total_needed {
            continue;
        }

        let keep_alive = request.is_keep_alive();

        let mut transport = HttpTransport::new(&request);
        let outcome = router.dispatch(request.method(), request.path(), &mut transport);

        let response = match outcome {
            Outcome::Handled => transport.into_wire_response(),
            Outcome::NotFound => Response::new(StatusCode::NotFound),
        };

        stream
            .write_all(&response.keep_alive(keep_alive).into_bytes())
            .await?;
        stream.flush().await?;

        // Drop the consumed request bytes from the buffer.
        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close — shutting down");
            break;
        }
    }

    Ok(())
}

/// Per-request [`Transport`] implementation over a parsed HTTP request.
///
/// Collects the single response produced by the handler chain; the
/// connection loop serializes it onto the socket afterwards.
struct HttpTransport<'r> {
    request: &'r Request,
    response: Option<Response>,
}

impl<'r> HttpTransport<'r> {
    fn new(request: &'r Request) -> Self {
        Self {
            request,
            response: None,
        }
    }

    /// Resolves the collected response; a matched route that somehow sent
    /// nothing is a pipeline bug and answered with a 500.
    fn into_wire_response(self) -> Response {
        self.response.unwrap_or_else(|| {
            error!("handler chain produced no response");
            Response::new(StatusCode::InternalServerError)
        })
    }
}

impl Transport for HttpTransport<'_> {
    fn send_response(&mut self, status: StatusCode, content_type: &str, body: &[u8]) {
        let mut response = Response::new(status);
        if !body.is_empty() {
            response = response
                .header("Content-Type", content_type)
                .body_bytes(body.to_vec());
        }
        self.response = Some(response);
    }

    fn request_authentication(&mut self) {
        self.response = Some(Response::new(StatusCode::Unauthorized).header(
            "WWW-Authenticate",
            format!("Basic realm=\"{BASIC_AUTH_REALM}\""),
        ));
    }

    fn authenticate(&mut self, username: &str, password: &str) -> bool {
        let Some(header) = self.request.headers().get("authorization") else {
            return false;
        };
        let Some(encoded) = header.strip_prefix("Basic ") else {
            return false;
        };
        // Compare in encoded form; no need to decode what the client sent.
        encoded.trim() == BASE64.encode(format!("{username}:{password}"))
    }

    fn load_body(&mut self) -> Bytes {
        // Trim to Content-Length; pipelined bytes after the body belong to
        // the next request.
        let declared = self.request.content_length().unwrap_or(0);
        let body = self.request.body();
        body.slice(..declared.min(body.len()))
    }

    fn has_body(&self) -> bool {
        self.request.content_length().unwrap_or(0) > 0 && !self.request.body().is_empty()
    }
}
