//! Shared test doubles for the routing core.

use bytes::Bytes;

use crate::http::StatusCode;
use crate::transport::Transport;

/// A response recorded by [`MockTransport::send_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Bytes,
}

impl SentResponse {
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }
}

/// Recording transport double: counts body loads, captures the sent
/// response, and validates credentials against a configurable pair the
/// simulated client "presented".
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    body: Bytes,
    /// Credentials the simulated client sent with the request, if any.
    pub client_credentials: Option<(String, String)>,
    pub body_loads: usize,
    pub sent: Option<SentResponse>,
    pub challenged: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(body: &[u8]) -> Self {
        Self {
            body: Bytes::copy_from_slice(body),
            ..Self::default()
        }
    }

    pub fn with_client_credentials(mut self, username: &str, password: &str) -> Self {
        self.client_credentials = Some((username.to_owned(), password.to_owned()));
        self
    }
}

impl Transport for MockTransport {
    fn send_response(&mut self, status: StatusCode, content_type: &str, body: &[u8]) {
        self.sent = Some(SentResponse {
            status,
            content_type: content_type.to_owned(),
            body: Bytes::copy_from_slice(body),
        });
    }

    fn request_authentication(&mut self) {
        self.challenged = true;
    }

    fn authenticate(&mut self, username: &str, password: &str) -> bool {
        self.client_credentials
            .as_ref()
            .is_some_and(|(user, pass)| user == username && pass == password)
    }

    fn load_body(&mut self) -> Bytes {
        self.body_loads += 1;
        self.body.clone()
    }

    fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}
