//! Runtime configuration: provider contract, resolved settings, and the single-flight cache.
//!
//! The gateway needs one value at runtime, the ledger table identity, published under a
//! parameter name (default [`LEDGER_TABLE_PARAMETER`]). It is fetched lazily on the first
//! redemption and cached for the lifetime of the process. Concurrent cold-start callers share
//! one fetch; a failed fetch leaves the cache empty so a later request tries again.

pub mod env;
#[cfg(feature = "reqwest")] pub mod http;
pub mod memory;

pub use env::EnvConfigProvider;
#[cfg(feature = "reqwest")] pub use http::HttpConfigProvider;
pub use memory::MemoryConfigProvider;

// crates.io
use async_lock::OnceCell;
// self
use crate::{_prelude::*, error::ConfigError, ledger::LedgerTable};

/// Parameter holding the ledger table identity.
pub const LEDGER_TABLE_PARAMETER: &str = "/URL_ENTRIES_TABLE_NAME";

/// Boxed future returned by [`ConfigProvider::get`].
pub type ConfigFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ConfigError>> + 'a + Send>>;

/// Key-value configuration source.
pub trait ConfigProvider
where
	Self: Send + Sync,
{
	/// Looks up `name`; `Ok(None)` means the provider has no such parameter.
	fn get<'a>(&'a self, name: &'a str) -> ConfigFuture<'a, Option<String>>;
}

/// Settings resolved from the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySettings {
	/// Ledger table every redemption writes into.
	pub ledger_table: LedgerTable,
}

/// Process-lifetime settings cache with single-flight initialization.
pub struct SettingsCell {
	provider: Arc<dyn ConfigProvider>,
	parameter: String,
	cell: OnceCell<Arc<GatewaySettings>>,
}
impl SettingsCell {
	/// Creates an empty cache reading [`LEDGER_TABLE_PARAMETER`] from `provider`.
	pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
		Self { provider, parameter: LEDGER_TABLE_PARAMETER.into(), cell: OnceCell::new() }
	}

	/// Overrides the parameter name holding the ledger table.
	pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
		self.parameter = parameter.into();

		self
	}

	/// Provider the cache reads from.
	pub fn provider(&self) -> Arc<dyn ConfigProvider> {
		self.provider.clone()
	}

	/// Parameter name holding the ledger table.
	pub fn parameter(&self) -> &str {
		&self.parameter
	}

	/// Settings if they have already been resolved.
	pub fn cached(&self) -> Option<Arc<GatewaySettings>> {
		self.cell.get().cloned()
	}

	/// Returns the cached settings, fetching them first when the cache is empty.
	pub async fn resolve(&self) -> Result<Arc<GatewaySettings>, ConfigError> {
		self.cell.get_or_try_init(|| self.fetch()).await.cloned()
	}

	async fn fetch(&self) -> Result<Arc<GatewaySettings>, ConfigError> {
		let name = self.parameter.as_str();
		let raw = self
			.provider
			.get(name)
			.await?
			.ok_or_else(|| ConfigError::Missing { name: name.to_owned() })?;
		let value = raw.trim();

		if value.is_empty() {
			return Err(ConfigError::Empty { name: name.to_owned() });
		}

		let ledger_table = LedgerTable::new(value)
			.map_err(|e| ConfigError::Invalid { name: name.to_owned(), reason: e.to_string() })?;

		Ok(Arc::new(GatewaySettings { ledger_table }))
	}
}
impl Debug for SettingsCell {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SettingsCell")
			.field("parameter", &self.parameter)
			.field("resolved", &self.cell.get())
			.finish()
	}
}
