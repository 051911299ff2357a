//! Redemption gatekeeper: admit each fingerprint at most once.

// self
use crate::{
	_prelude::*,
	edge::{EdgeOutcome, EdgeRequest, EdgeResponse},
	fingerprint::{self, Fingerprint, FingerprintMode},
	gateway::Gateway,
	ledger::{LedgerKey, PutOutcome},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	signer::Operation,
};

impl Gateway {
	/// Decides whether `request` may proceed to the resource store.
	///
	/// `Ok` carries the fingerprint that was consumed; `Err` is a denial whose
	/// [`kind`](Error::kind) fixes the status. Exactly one of any number of concurrent callers
	/// presenting the same fingerprint is admitted. Nothing is retried here.
	pub async fn admit(&self, request: &EdgeRequest) -> Result<Fingerprint> {
		let span = FlowSpan::new(FlowKind::Admit, "admit");

		self.metrics.record_attempt();
		obs::record_flow_outcome(FlowKind::Admit, FlowOutcome::Attempt);

		let result = span.instrument(self.admit_request(request)).await;

		self.metrics.record_result(&result);
		obs::record_flow_result(FlowKind::Admit, &result);

		result
	}

	/// Edge entry point: forwards admitted requests untouched, answers everything else.
	pub async fn handle_viewer_request(&self, request: EdgeRequest) -> EdgeOutcome {
		match self.admit(&request).await {
			Ok(_) => EdgeOutcome::Forward(request),
			Err(e) => EdgeOutcome::Respond(EdgeResponse::from(&e)),
		}
	}

	async fn admit_request(&self, request: &EdgeRequest) -> Result<Fingerprint> {
		let settings = self.settings.resolve().await?;
		let (fingerprint, remainder) = self.derive_fingerprint(request)?;

		if let Some(verifier) = &self.verifier {
			let operation = Operation::from_method(&request.method).ok_or_else(|| {
				Error::forbidden(format!("method `{}` is not redeemable", request.method))
			})?;

			verifier
				.verify(operation, &request.path, &remainder, OffsetDateTime::now_utc())
				.map_err(|e| Error::forbidden(e.to_string()))?;
		}

		let key = LedgerKey::new(settings.ledger_table.clone(), fingerprint);

		match self.ledger.put_if_absent(&key).await? {
			PutOutcome::Created => Ok(fingerprint),
			PutOutcome::AlreadyExists => Err(Error::forbidden("fingerprint already consumed")),
		}
	}

	/// Derives the request fingerprint and returns it with the query minus the fingerprint
	/// parameter.
	fn derive_fingerprint(&self, request: &EdgeRequest) -> Result<(Fingerprint, String)> {
		let split = fingerprint::split_query_param(&request.query, &self.fingerprint_param);
		let recomputed = Fingerprint::of_request(&request.path, Some(split.remainder.as_str()));

		match self.fingerprint_mode {
			FingerprintMode::Recompute => Ok((recomputed, split.remainder)),
			FingerprintMode::Explicit => {
				let [presented] = split.values.as_slice() else {
					return Err(Error::bad_request(format!(
						"expected exactly one `{}` parameter, found {}",
						self.fingerprint_param,
						split.values.len()
					)));
				};
				let presented = presented
					.parse::<Fingerprint>()
					.map_err(|e| Error::bad_request(e.to_string()))?;

				if presented != recomputed {
					return Err(Error::bad_request("fingerprint does not match the request"));
				}

				Ok((presented, split.remainder))
			},
		}
	}
}
