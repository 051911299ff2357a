//! Process-scoped gateway context and the flows built on it.
//!
//! A [`Gateway`] is constructed once per process with its collaborators injected as trait
//! objects, then shared across requests. The flows live in submodules as `impl Gateway`
//! blocks:
//!
//! - [`issue`]: mint a signed access descriptor carrying a usage fingerprint.
//! - [`admit`]: redeem a descriptor at most once against the usage ledger.
//! - [`sanitize`]: audit and strip credential headers before the origin fetch.

pub mod admit;
pub mod issue;
pub mod sanitize;

mod metrics;

pub use issue::*;
pub use metrics::*;

// self
use crate::{
	_prelude::*,
	audit::{AuditSink, NoopAuditSink},
	config::{ConfigProvider, SettingsCell},
	error::ConfigError,
	fingerprint::{DEFAULT_FINGERPRINT_PARAM, FingerprintMode},
	ledger::UsageLedger,
	signer::{DEFAULT_VALIDITY, ResourceKey, ResourceSigner, SignatureVerifier},
};

/// Key issued by the write endpoint when the caller names none.
pub const DEFAULT_WRITE_KEY: &str = "assets/something";
/// Longest the sanitizer waits on the audit sink before dropping the record.
pub const DEFAULT_AUDIT_TIMEOUT: Duration = Duration::milliseconds(500);
/// Headers removed before the origin fetch unless overridden.
pub const DEFAULT_STRIPPED_HEADERS: &[&str] = &["authorization"];

/// Coordinates issuance, redemption, and sanitization for one deployment.
///
/// Issuer and gatekeeper share this context, so the fingerprint parameter name, derivation
/// mode, and canonicalization always agree.
#[derive(Clone)]
pub struct Gateway {
	/// Storage signer producing time-limited URLs.
	pub signer: Arc<dyn ResourceSigner>,
	/// Ledger recording consumed fingerprints.
	pub ledger: Arc<dyn UsageLedger>,
	/// Lazily resolved runtime settings.
	pub settings: Arc<SettingsCell>,
	/// Collector for pre-modification header snapshots.
	pub audit: Arc<dyn AuditSink>,
	/// Cap on each audit append; slower appends are dropped.
	pub audit_timeout: Duration,
	/// Optional signature check run before the ledger is touched.
	pub verifier: Option<Arc<dyn SignatureVerifier>>,
	/// Public URL of the gatekeeper; modified descriptors point here.
	pub gateway_url: Url,
	/// Validity window requested from the signer.
	pub validity: Duration,
	/// How the gatekeeper derives fingerprints.
	pub fingerprint_mode: FingerprintMode,
	/// Query parameter carrying the fingerprint.
	pub fingerprint_param: String,
	/// Key issued by the write endpoint when the caller names none.
	pub default_write_key: ResourceKey,
	/// Header names (case-insensitive) removed before the origin fetch.
	pub stripped_headers: Vec<String>,
	/// Shared admission counters.
	pub metrics: Arc<AdmissionMetrics>,
}
impl Gateway {
	/// Creates a gateway answering at `gateway_url` with the provided collaborators.
	pub fn new(
		gateway_url: Url,
		signer: Arc<dyn ResourceSigner>,
		ledger: Arc<dyn UsageLedger>,
		config: Arc<dyn ConfigProvider>,
	) -> Result<Self, ConfigError> {
		if gateway_url.cannot_be_a_base() || !matches!(gateway_url.scheme(), "http" | "https") {
			return Err(ConfigError::Invalid {
				name: "gateway_url".into(),
				reason: format!("`{gateway_url}` is not an http(s) base URL"),
			});
		}

		let default_write_key = ResourceKey::new(DEFAULT_WRITE_KEY).map_err(|e| {
			ConfigError::Invalid { name: "default_write_key".into(), reason: e.to_string() }
		})?;

		Ok(Self {
			signer,
			ledger,
			settings: Arc::new(SettingsCell::new(config)),
			audit: Arc::new(NoopAuditSink),
			audit_timeout: DEFAULT_AUDIT_TIMEOUT,
			verifier: None,
			gateway_url,
			validity: DEFAULT_VALIDITY,
			fingerprint_mode: FingerprintMode::default(),
			fingerprint_param: DEFAULT_FINGERPRINT_PARAM.into(),
			default_write_key,
			stripped_headers: DEFAULT_STRIPPED_HEADERS
				.iter()
				.map(|name| (*name).to_owned())
				.collect(),
			metrics: Default::default(),
		})
	}

	/// Sets the validity window requested from the signer.
	pub fn with_validity(mut self, validity: Duration) -> Self {
		self.validity = validity;

		self
	}

	/// Selects how the gatekeeper derives fingerprints.
	pub fn with_fingerprint_mode(mut self, mode: FingerprintMode) -> Self {
		self.fingerprint_mode = mode;

		self
	}

	/// Renames the query parameter carrying the fingerprint.
	pub fn with_fingerprint_param(mut self, name: impl Into<String>) -> Self {
		self.fingerprint_param = name.into();

		self
	}

	/// Replaces the key issued when the write endpoint receives none.
	pub fn with_default_write_key(mut self, key: ResourceKey) -> Self {
		self.default_write_key = key;

		self
	}

	/// Replaces the set of headers removed before the origin fetch.
	pub fn with_stripped_headers<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.stripped_headers = names.into_iter().map(Into::into).collect();

		self
	}

	/// Requires every redeemed descriptor to pass `verifier`.
	pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
		self.verifier = Some(verifier);

		self
	}

	/// Sends pre-modification snapshots to `sink`.
	pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
		self.audit = sink;

		self
	}

	/// Caps how long the sanitizer waits on the audit sink.
	pub fn with_audit_timeout(mut self, timeout: Duration) -> Self {
		self.audit_timeout = timeout;

		self
	}

	/// Reads the ledger table from `parameter` instead of the default name.
	///
	/// Replaces the settings cache, so call it before the gateway serves requests.
	pub fn with_ledger_parameter(mut self, parameter: impl Into<String>) -> Self {
		self.settings =
			Arc::new(SettingsCell::new(self.settings.provider()).with_parameter(parameter));

		self
	}
}
impl Debug for Gateway {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("gateway_url", &self.gateway_url.as_str())
			.field("validity", &self.validity)
			.field("fingerprint_mode", &self.fingerprint_mode)
			.field("fingerprint_param", &self.fingerprint_param)
			.field("default_write_key", &self.default_write_key)
			.field("stripped_headers", &self.stripped_headers)
			.field("audit_timeout", &self.audit_timeout)
			.field("verifier_set", &self.verifier.is_some())
			.field("settings", &self.settings)
			.finish()
	}
}
