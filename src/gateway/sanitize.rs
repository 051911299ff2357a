//! Header sanitizer run immediately before the origin fetch.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	audit::{AuditRecord, PRE_MODIFICATION_MESSAGE},
	edge::EdgeRequest,
	gateway::Gateway,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl Gateway {
	/// Audits the incoming headers, then removes every configured credential header.
	///
	/// The snapshot is taken before anything is removed. The audit append is fire-and-forget:
	/// it gets at most [`Gateway::audit_timeout`], and a failed or timed-out append is logged
	/// and dropped. The request is sanitized and forwarded regardless. Remaining headers keep
	/// their values and order.
	///
	/// Must run inside a Tokio runtime with the time driver enabled.
	pub async fn handle_origin_request(&self, mut request: EdgeRequest) -> EdgeRequest {
		let span = FlowSpan::new(FlowKind::Sanitize, "handle_origin_request");

		obs::record_flow_outcome(FlowKind::Sanitize, FlowOutcome::Attempt);

		let record = AuditRecord::new(
			PRE_MODIFICATION_MESSAGE,
			&request.headers,
			OffsetDateTime::now_utc(),
		);
		let limit = StdDuration::try_from(self.audit_timeout).unwrap_or_default();

		match tokio::time::timeout(limit, span.instrument(self.audit.append(&record))).await {
			Ok(Ok(())) => {},
			Ok(Err(e)) => {
				obs::record_audit_dropped("error");
				obs::warn_event("audit", &format!("dropping pre-modification record: {e}"));
			},
			Err(_) => {
				obs::record_audit_dropped("timeout");
				obs::warn_event(
					"audit",
					&format!(
						"dropping pre-modification record: sink did not answer within {}ms",
						limit.as_millis()
					),
				);
			},
		}

		request
			.headers
			.retain(|header| !self.stripped_headers.iter().any(|name| header.is_named(name)));
		obs::record_flow_outcome(FlowKind::Sanitize, FlowOutcome::Success);

		request
	}
}
