//! Descriptor issuance: sign a resource URL, fingerprint it, and point it at the gatekeeper.

// self
use crate::{
	_prelude::*,
	edge::EdgeResponse,
	fingerprint::{self, Fingerprint},
	gateway::Gateway,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	signer::{Operation, ResourceKey},
};

/// Signed access descriptor handed to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessDescriptor {
	/// Resource the descriptor grants access to.
	pub key: ResourceKey,
	/// Granted operation.
	pub operation: Operation,
	/// Usage fingerprint of the signed URL.
	pub fingerprint: Fingerprint,
	/// URL exactly as produced by the storage signer.
	pub original_url: Url,
	/// Same path and query on the gatekeeper's host, with the fingerprint parameter appended.
	pub modified_url: Url,
	/// Instant after which the storage signature lapses.
	pub expires_at: OffsetDateTime,
}

/// Which issuance endpoint is being served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueVariant {
	/// Upload descriptor; `key` is optional and falls back to the default write key.
	Write,
	/// Download descriptor; `key` is required.
	Read,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteIssueBody<'a> {
	modified_url: &'a str,
	original_url: &'a str,
}

#[derive(Serialize)]
struct ReadIssueBody<'a> {
	url: &'a str,
}

impl Gateway {
	/// Issues a descriptor granting `operation` on `key`.
	///
	/// Makes exactly one signer call and never touches the usage ledger.
	pub async fn issue(&self, key: &ResourceKey, operation: Operation) -> Result<AccessDescriptor> {
		let span = FlowSpan::new(FlowKind::Issue, "issue");

		obs::record_flow_outcome(FlowKind::Issue, FlowOutcome::Attempt);

		let result = span.instrument(self.issue_descriptor(key, operation)).await;

		obs::record_flow_result(FlowKind::Issue, &result);

		result
	}

	/// Serves an issuance endpoint, turning every failure into a fixed response.
	///
	/// `query` is the raw request query; only its `key` parameter is read.
	pub async fn handle_issue(&self, variant: IssueVariant, query: &str) -> EdgeResponse {
		let requested = url::form_urlencoded::parse(query.as_bytes())
			.find(|(name, _)| name == "key")
			.map(|(_, value)| value.into_owned());
		let key = match (variant, requested) {
			(_, Some(raw)) => match ResourceKey::new(raw) {
				Ok(key) => key,
				Err(_) => return EdgeResponse::bad_request(),
			},
			(IssueVariant::Write, None) => self.default_write_key.clone(),
			(IssueVariant::Read, None) => return EdgeResponse::bad_request(),
		};
		let operation = match variant {
			IssueVariant::Write => Operation::Write,
			IssueVariant::Read => Operation::Read,
		};
		let descriptor = match self.issue(&key, operation).await {
			Ok(descriptor) => descriptor,
			Err(e) => return EdgeResponse::from(&e),
		};
		let body = match variant {
			IssueVariant::Write => serde_json::to_string(&WriteIssueBody {
				modified_url: descriptor.modified_url.as_str(),
				original_url: descriptor.original_url.as_str(),
			}),
			IssueVariant::Read =>
				serde_json::to_string(&ReadIssueBody { url: descriptor.modified_url.as_str() }),
		};

		match body {
			Ok(body) => EdgeResponse::json(body),
			Err(_) => EdgeResponse::internal_error(),
		}
	}

	async fn issue_descriptor(
		&self,
		key: &ResourceKey,
		operation: Operation,
	) -> Result<AccessDescriptor> {
		let signed = self.signer.sign(key, self.validity, operation).await?;
		let (path, query) = signed_identity(&signed.url)?;

		if query.is_some_and(|q| {
			!fingerprint::split_query_param(q, &self.fingerprint_param).values.is_empty()
		}) {
			return Err(Error::integrity(format!(
				"signed URL already carries the `{}` parameter",
				self.fingerprint_param
			)));
		}

		let fingerprint = Fingerprint::of_request(path, query);
		let mut modified_url = self.gateway_url.clone();

		modified_url.set_path(path);
		modified_url.set_query(Some(&fingerprint::append_query_param(
			query,
			&self.fingerprint_param,
			&fingerprint.to_hex(),
		)));
		modified_url.set_fragment(None);

		Ok(AccessDescriptor {
			key: key.to_owned(),
			operation,
			fingerprint,
			modified_url,
			expires_at: signed.expires_at,
			original_url: signed.url,
		})
	}
}

fn signed_identity(url: &Url) -> Result<(&str, Option<&str>)> {
	let path = url.path();

	if url.cannot_be_a_base() || !path.starts_with('/') {
		return Err(Error::integrity(format!("signed URL `{url}` has no usable path")));
	}

	Ok((path, url.query().filter(|q| !q.is_empty())))
}
