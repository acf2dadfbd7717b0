//! # microroute
//!
//! A transport-agnostic HTTP request router aimed at resource-constrained
//! devices: pattern matching with `:variable` path segments, a per-request
//! context with lazily-loaded bodies and JSON documents, and handler chains
//! composed from authentication, JSON parsing, and response serialization
//! wrappers.
//!
//! The routing core is synchronous and transport-neutral — any request loop
//! that can implement the [`Transport`] trait can drive it. An async
//! HTTP/1.1 transport built on Tokio ships in [`server`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use microroute::{HttpServer, Method, Router, auth::SimpleAuthProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = Arc::new(SimpleAuthProvider::new());
//!     let mut router = Router::with_auth(auth.clone());
//!
//!     router.build("/things/:id").on_json(Method::Put, |ctx| {
//!         let id = ctx.path_value("id").unwrap_or("").to_owned();
//!         let body = ctx.json_body().clone();
//!         let response = ctx.response_mut().json_mut();
//!         response["id"] = id.into();
//!         response["saved"] = body;
//!     });
//!
//!     auth.require_authentication("admin", "secret");
//!
//!     let server = HttpServer::bind("0.0.0.0:8080").await?;
//!     server.run(router).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod context;
pub mod http;
pub mod pattern;
pub mod pipeline;
pub mod router;
pub mod server;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use context::{RequestContext, ResponseBuilder};
pub use http::{Method, StatusCode};
pub use router::{HandlerBuilder, Outcome, Router};
pub use server::{HttpServer, ServerError};
pub use transport::{Transport, UploadChunk};
