//! Gateway-level error types and the status taxonomy every flow reports through.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
///
/// Every variant maps onto exactly one [`ErrorKind`], which in turn fixes the HTTP status the
/// edge and issuance handlers answer with.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Usage ledger failure.
	#[error("{0}")]
	Ledger(
		#[from]
		#[source]
		crate::ledger::LedgerError,
	),
	/// Resource signer failure.
	#[error(transparent)]
	Signing(#[from] crate::signer::SigningError),
	/// Runtime configuration could not be resolved.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The request is missing or carries a malformed identifying parameter.
	#[error("Request is malformed: {reason}.")]
	BadRequest {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// The fingerprint was already consumed or the descriptor is no longer honored.
	#[error("Access denied: {reason}.")]
	Forbidden {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// An internal invariant was violated (for example an unparseable signed URL).
	#[error("Integrity violation: {reason}.")]
	Integrity {
		/// Description of the broken invariant.
		reason: String,
	},
}
impl Error {
	/// Builds a [`Error::BadRequest`] from any displayable reason.
	pub fn bad_request(reason: impl Into<String>) -> Self {
		Self::BadRequest { reason: reason.into() }
	}

	/// Builds a [`Error::Forbidden`] from any displayable reason.
	pub fn forbidden(reason: impl Into<String>) -> Self {
		Self::Forbidden { reason: reason.into() }
	}

	/// Builds a [`Error::Integrity`] from any displayable reason.
	pub fn integrity(reason: impl Into<String>) -> Self {
		Self::Integrity { reason: reason.into() }
	}

	/// Classifies the error into the terminal taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::BadRequest { .. } => ErrorKind::BadRequest,
			Self::Forbidden { .. } => ErrorKind::Forbidden,
			Self::Ledger(_) | Self::Signing(_) | Self::Config(_) => ErrorKind::InternalError,
			Self::Integrity { .. } => ErrorKind::IntegrityError,
		}
	}
}

/// Terminal outcome classes surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
	/// Malformed or missing identifying parameter (400).
	BadRequest,
	/// Fingerprint already consumed (403).
	Forbidden,
	/// A dependency (signer, ledger, config) is unavailable (500).
	InternalError,
	/// Internal invariant violated (500, never retryable by redemption logic).
	IntegrityError,
}
impl ErrorKind {
	/// HTTP status code answered for this class.
	pub const fn status(self) -> u16 {
		match self {
			Self::BadRequest => 400,
			Self::Forbidden => 403,
			Self::InternalError | Self::IntegrityError => 500,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::BadRequest => "bad_request",
			Self::Forbidden => "forbidden",
			Self::InternalError => "internal_error",
			Self::IntegrityError => "integrity_error",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runtime configuration failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The provider has no value for the parameter.
	#[error("Parameter `{name}` was not found.")]
	Missing {
		/// Parameter name.
		name: String,
	},
	/// The parameter exists but carries no value.
	#[error("Parameter `{name}` has no value.")]
	Empty {
		/// Parameter name.
		name: String,
	},
	/// The parameter value failed validation.
	#[error("Parameter `{name}` is invalid: {reason}.")]
	Invalid {
		/// Parameter name.
		name: String,
		/// Validation failure.
		reason: String,
	},
	/// The provider itself failed (network, IO, decoding).
	#[error("Config provider failed while resolving `{name}`.")]
	Provider {
		/// Parameter name.
		name: String,
		/// Underlying provider failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a provider-specific failure inside [`ConfigError`].
	pub fn provider(
		name: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Provider { name: name.into(), source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{ledger::LedgerError, signer::SigningError};

	#[test]
	fn every_dependency_failure_is_internal() {
		let ledger: Error = LedgerError::Backend { message: "table offline".into() }.into();
		let signing: Error = SigningError::Backend { message: "signer offline".into() }.into();
		let config: Error = ConfigError::Missing { name: "/URL_ENTRIES_TABLE_NAME".into() }.into();

		assert_eq!(ledger.kind(), ErrorKind::InternalError);
		assert_eq!(signing.kind(), ErrorKind::InternalError);
		assert_eq!(config.kind(), ErrorKind::InternalError);
		assert_eq!(ledger.kind().status(), 500);
	}

	#[test]
	fn terminal_kinds_map_to_statuses() {
		assert_eq!(Error::bad_request("missing hash").kind().status(), 400);
		assert_eq!(Error::forbidden("consumed").kind().status(), 403);
		assert_eq!(Error::integrity("no path").kind(), ErrorKind::IntegrityError);
		assert_eq!(Error::integrity("no path").kind().status(), 500);
	}

	#[test]
	fn ledger_error_is_exposed_as_source() {
		let ledger_error = LedgerError::Backend { message: "database unreachable".into() };
		let error: Error = ledger_error.clone().into();

		assert!(error.to_string().contains("database unreachable"));

		let source = StdError::source(&error)
			.expect("Gateway error should expose the original ledger error as its source.");

		assert_eq!(source.to_string(), ledger_error.to_string());
	}
}
