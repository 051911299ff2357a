//! Request and response descriptors exchanged with the invoking edge environment.
//!
//! The gateway never owns a socket. An edge runtime (CDN function, reverse proxy, test
//! harness) hands it an [`EdgeRequest`] and acts on the returned [`EdgeOutcome`]: either
//! forward the (possibly rewritten) request toward the resource store, or answer the client
//! with the [`EdgeResponse`] directly.

// self
use crate::{_prelude::*, error::ErrorKind};

/// Single request or response header, keeping the name exactly as received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
	/// Header name in its original casing.
	pub name: String,
	/// Header value.
	pub value: String,
}
impl Header {
	/// Creates a header from any string-like name/value pair.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into() }
	}

	/// Case-insensitive name comparison.
	pub fn is_named(&self, name: &str) -> bool {
		self.name.eq_ignore_ascii_case(name)
	}
}

/// Inbound request as seen by the edge: method, raw path, raw query, headers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRequest {
	/// HTTP method, upper-case.
	pub method: String,
	/// Raw request path, starting with `/`.
	pub path: String,
	/// Raw query string without the leading `?`; empty when absent.
	pub query: String,
	/// Headers in arrival order.
	pub headers: Vec<Header>,
}
impl EdgeRequest {
	/// Creates a request with no query and no headers.
	pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
		Self { method: method.into(), path: path.into(), query: String::new(), headers: Vec::new() }
	}

	/// Builds a request targeting the path and query of `url`.
	pub fn from_url(method: impl Into<String>, url: &Url) -> Self {
		Self::new(method, url.path()).with_query(url.query().unwrap_or_default())
	}

	/// Replaces the raw query string.
	pub fn with_query(mut self, query: impl Into<String>) -> Self {
		self.query = query.into();

		self
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push(Header::new(name, value));

		self
	}

	/// Returns the raw query, or `None` when it is empty.
	pub fn query(&self) -> Option<&str> {
		Some(self.query.as_str()).filter(|q| !q.is_empty())
	}

	/// First header value whose name matches case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|header| header.is_named(name)).map(|header| header.value.as_str())
	}
}

/// Response generated by the gateway instead of forwarding the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeResponse {
	/// HTTP status code.
	pub status: u16,
	/// Reason phrase reported alongside the status.
	pub status_description: String,
	/// Response headers.
	pub headers: Vec<Header>,
	/// Response body.
	pub body: String,
}
impl EdgeResponse {
	/// Plain-text response carrying the fixed content-type/content-encoding headers.
	pub fn plain_text(
		status: u16,
		status_description: impl Into<String>,
		body: impl Into<String>,
	) -> Self {
		Self {
			status,
			status_description: status_description.into(),
			headers: vec![
				Header::new("Content-Type", "text/plain"),
				Header::new("Content-Encoding", "UTF-8"),
			],
			body: body.into(),
		}
	}

	/// `200 OK` JSON response.
	pub fn json(body: impl Into<String>) -> Self {
		Self {
			status: 200,
			status_description: "OK".into(),
			headers: vec![Header::new("Content-Type", "application/json")],
			body: body.into(),
		}
	}

	/// `400 Bad Request`.
	pub fn bad_request() -> Self {
		Self::plain_text(400, "Bad Request", "Bad request")
	}

	/// `403 Forbidden`.
	pub fn forbidden() -> Self {
		Self::plain_text(403, "Forbidden", "Forbidden")
	}

	/// `500 Internal Server Error`.
	pub fn internal_error() -> Self {
		Self::plain_text(500, "InternalServerError", "Internal Server Error")
	}

	/// Fixed response for a terminal error class.
	pub fn for_kind(kind: ErrorKind) -> Self {
		match kind {
			ErrorKind::BadRequest => Self::bad_request(),
			ErrorKind::Forbidden => Self::forbidden(),
			ErrorKind::InternalError | ErrorKind::IntegrityError => Self::internal_error(),
		}
	}

	/// First header value whose name matches case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|header| header.is_named(name)).map(|header| header.value.as_str())
	}
}
impl From<&Error> for EdgeResponse {
	fn from(error: &Error) -> Self {
		Self::for_kind(error.kind())
	}
}

/// Decision returned to the edge runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdgeOutcome {
	/// Let the request continue toward the resource store.
	Forward(EdgeRequest),
	/// Answer the client directly.
	Respond(EdgeResponse),
}
impl EdgeOutcome {
	/// Returns `true` when the request is forwarded.
	pub fn is_forward(&self) -> bool {
		matches!(self, Self::Forward(_))
	}

	/// Status the client observes from the gateway; `None` when forwarded.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Forward(_) => None,
			Self::Respond(response) => Some(response.status),
		}
	}
}
