//! Audit records emitted by the header sanitizer and the sinks that collect them.

pub mod file;
#[cfg(feature = "reqwest")] pub mod http;

pub use file::FileAuditSink;
#[cfg(feature = "reqwest")] pub use http::HttpAuditSink;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{_prelude::*, edge::Header};

/// Message attached to the header snapshot taken before credentials are stripped.
pub const PRE_MODIFICATION_MESSAGE: &str = "pre modification";

/// Boxed future returned by [`AuditSink::append`].
pub type AuditFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AuditError>> + 'a + Send>>;

/// Append-only log collector.
pub trait AuditSink
where
	Self: Send + Sync,
{
	/// Appends one record.
	fn append<'a>(&'a self, record: &'a AuditRecord) -> AuditFuture<'a>;
}

/// Structured record of a request's headers at one point in the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
	/// Short description of the snapshot.
	pub message: String,
	/// Headers exactly as observed.
	pub headers: Vec<Header>,
	/// Capture time in milliseconds since the unix epoch.
	pub timestamp: i64,
}
impl AuditRecord {
	/// Snapshot of `headers` taken at `now`.
	pub fn new(message: impl Into<String>, headers: &[Header], now: OffsetDateTime) -> Self {
		Self {
			message: message.into(),
			headers: headers.to_vec(),
			timestamp: (now.unix_timestamp_nanos() / 1_000_000) as i64,
		}
	}

	/// JSON form shipped to remote collectors.
	pub fn to_json(&self) -> Result<String, AuditError> {
		serde_json::to_string(self).map_err(|e| AuditError::Serialization {
			message: format!("Failed to encode audit record: {e}"),
		})
	}
}

/// Failures raised by [`AuditSink`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuditError {
	/// The record could not be encoded.
	#[error("Audit serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// The collector could not be reached or rejected the record.
	#[error("Audit sink failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// In-process sink for tests and demos; can be switched into a failing mode.
#[derive(Clone, Debug, Default)]
pub struct MemoryAuditSink {
	records: Arc<Mutex<Vec<AuditRecord>>>,
	failing: Arc<AtomicBool>,
}
impl MemoryAuditSink {
	/// Makes every later append fail (`true`) or succeed (`false`).
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	/// Records appended so far.
	pub fn records(&self) -> Vec<AuditRecord> {
		self.records.lock().clone()
	}
}
impl AuditSink for MemoryAuditSink {
	fn append<'a>(&'a self, record: &'a AuditRecord) -> AuditFuture<'a> {
		Box::pin(async move {
			if self.failing.load(Ordering::SeqCst) {
				return Err(AuditError::Backend { message: "memory sink is failing".into() });
			}

			self.records.lock().push(record.to_owned());

			Ok(())
		})
	}
}

/// Sink that discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;
impl AuditSink for NoopAuditSink {
	fn append<'a>(&'a self, _record: &'a AuditRecord) -> AuditFuture<'a> {
		Box::pin(async { Ok(()) })
	}
}
