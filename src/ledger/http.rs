//! Remote [`UsageLedger`] speaking HTTP conditional writes.

// crates.io
use reqwest::header::IF_NONE_MATCH;
// self
use crate::{
	_prelude::*,
	http::{self, ReqwestHttpClient, ResponseMetadata},
	ledger::{LedgerError, LedgerFuture, LedgerKey, PutOutcome, UsageLedger},
};

/// Ledger backed by a key-value service addressed as `{base}/{table}/{fingerprint}`.
///
/// - `PUT` with `If-None-Match: *`: `200`/`201`/`204` mean created, `409`/`412` mean the entry
///   already exists.
/// - `HEAD`: `200` means present, `404` means absent.
///
/// Any other status or a transport error is a backend failure.
#[derive(Clone, Debug)]
pub struct HttpLedger {
	base: Url,
	client: ReqwestHttpClient,
}
impl HttpLedger {
	/// Creates a ledger client rooted at `base`.
	pub fn new(base: Url) -> Result<Self, LedgerError> {
		http::require_base(&base).map_err(|message| LedgerError::Backend { message })?;

		Ok(Self { base, client: ReqwestHttpClient::default() })
	}

	/// Replaces the HTTP client used for every request.
	pub fn with_client(mut self, client: ReqwestHttpClient) -> Self {
		self.client = client;

		self
	}

	fn entry_url(&self, key: &LedgerKey) -> Result<Url, LedgerError> {
		let mut url = self.base.clone();

		url.path_segments_mut()
			.map_err(|_| LedgerError::Backend {
				message: format!("Ledger endpoint `{}` cannot carry a path", self.base),
			})?
			.pop_if_empty()
			.push(key.table.as_str())
			.push(&key.fingerprint.to_hex());

		Ok(url)
	}
}
impl UsageLedger for HttpLedger {
	fn put_if_absent<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, PutOutcome> {
		Box::pin(async move {
			let url = self.entry_url(key)?;
			let response =
				self.client.put(url).header(IF_NONE_MATCH, "*").send().await.map_err(|e| {
					LedgerError::Backend { message: format!("Conditional put for {key} failed: {e}") }
				})?;

			match response.status().as_u16() {
				200 | 201 | 204 => Ok(PutOutcome::Created),
				409 | 412 => Ok(PutOutcome::AlreadyExists),
				_ => Err(LedgerError::Backend {
					message: format!(
						"Conditional put for {key} answered {}",
						ResponseMetadata::from_response(&response)
					),
				}),
			}
		})
	}

	fn exists<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, bool> {
		Box::pin(async move {
			let url = self.entry_url(key)?;
			let response = self.client.head(url).send().await.map_err(|e| LedgerError::Backend {
				message: format!("Existence check for {key} failed: {e}"),
			})?;

			match response.status().as_u16() {
				200 => Ok(true),
				404 => Ok(false),
				_ => Err(LedgerError::Backend {
					message: format!(
						"Existence check for {key} answered {}",
						ResponseMetadata::from_response(&response)
					),
				}),
			}
		})
	}
}
