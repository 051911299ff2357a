//! Shared reqwest transport for the HTTP-backed ledger, config provider, and audit sink.
//!
//! Every remote collaborator holds a [`ReqwestHttpClient`] so callers can inject one tuned
//! client (timeouts, TLS roots, proxies) and share its connection pool. Unexpected responses
//! are summarized through [`ResponseMetadata`], which keeps the status code and any
//! `Retry-After` hint so operators can see throttling in the surfaced error message.

// std
use std::ops::Deref;
// crates.io
use reqwest::{
	Response,
	header::{HeaderMap, RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Status and retry hint captured from a response the caller did not expect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}
impl ResponseMetadata {
	/// Captures metadata from a received response.
	pub fn from_response(response: &Response) -> Self {
		Self {
			status: response.status().as_u16(),
			retry_after: parse_retry_after(response.headers()),
		}
	}
}
impl Display for ResponseMetadata {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self.retry_after {
			Some(delay) => {
				write!(f, "status {} (retry after {}s)", self.status, delay.whole_seconds())
			},
			None => write!(f, "status {}", self.status),
		}
	}
}

/// Error raised when a collaborator answers with a status the caller cannot interpret.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unexpected response: {0}.")]
pub struct UnexpectedResponse(pub ResponseMetadata);

/// Ensures `base` can carry path segments.
pub(crate) fn require_base(base: &Url) -> Result<(), String> {
	if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
		return Err(format!("Endpoint `{base}` is not an http(s) base URL"));
	}

	Ok(())
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
