//! Remote [`AuditSink`] posting log events to a collector endpoint.

// crates.io
use reqwest::header::CONTENT_TYPE;
// self
use crate::{
	_prelude::*,
	audit::{AuditError, AuditFuture, AuditRecord, AuditSink},
	http::{self, ReqwestHttpClient, ResponseMetadata},
};

/// Posts `{"logGroupName", "logStreamName", "logEvents": [{"message", "timestamp"}]}` to the
/// collector, with the JSON-encoded record as the event message.
#[derive(Clone, Debug)]
pub struct HttpAuditSink {
	endpoint: Url,
	log_group: String,
	log_stream: String,
	client: ReqwestHttpClient,
}
impl HttpAuditSink {
	/// Creates a sink writing into `log_group`/`log_stream` at `endpoint`.
	pub fn new(
		endpoint: Url,
		log_group: impl Into<String>,
		log_stream: impl Into<String>,
	) -> Result<Self, AuditError> {
		http::require_base(&endpoint).map_err(|message| AuditError::Backend { message })?;

		Ok(Self {
			endpoint,
			log_group: log_group.into(),
			log_stream: log_stream.into(),
			client: ReqwestHttpClient::default(),
		})
	}

	/// Replaces the HTTP client used for every request.
	pub fn with_client(mut self, client: ReqwestHttpClient) -> Self {
		self.client = client;

		self
	}

	fn body(&self, record: &AuditRecord) -> Result<Vec<u8>, AuditError> {
		let batch = LogBatch {
			log_group_name: &self.log_group,
			log_stream_name: &self.log_stream,
			log_events: [LogEvent { message: record.to_json()?, timestamp: record.timestamp }],
		};

		serde_json::to_vec(&batch).map_err(|e| AuditError::Serialization {
			message: format!("Failed to encode log batch: {e}"),
		})
	}
}
impl AuditSink for HttpAuditSink {
	fn append<'a>(&'a self, record: &'a AuditRecord) -> AuditFuture<'a> {
		Box::pin(async move {
			let body = self.body(record)?;
			let response = self
				.client
				.post(self.endpoint.clone())
				.header(CONTENT_TYPE, "application/json")
				.body(body)
				.send()
				.await
				.map_err(|e| AuditError::Backend { message: format!("Log delivery failed: {e}") })?;

			if response.status().is_success() {
				Ok(())
			} else {
				Err(AuditError::Backend {
					message: format!(
						"Collector answered {}",
						ResponseMetadata::from_response(&response)
					),
				})
			}
		})
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogBatch<'a> {
	log_group_name: &'a str,
	log_stream_name: &'a str,
	log_events: [LogEvent; 1],
}

#[derive(Serialize)]
struct LogEvent {
	message: String,
	timestamp: i64,
}
