//! In-memory [`ConfigProvider`] for tests and demos.

// self
use crate::{
	_prelude::*,
	config::{ConfigFuture, ConfigProvider},
};

/// Mutable parameter map shared between clones.
#[derive(Clone, Debug, Default)]
pub struct MemoryConfigProvider(Arc<RwLock<HashMap<String, String>>>);
impl MemoryConfigProvider {
	/// Adds or replaces a parameter while building the provider.
	pub fn with_value(self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.set(name, value);

		self
	}

	/// Adds or replaces a parameter.
	pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
		self.0.write().insert(name.into(), value.into());
	}

	/// Removes a parameter, returning its previous value.
	pub fn remove(&self, name: &str) -> Option<String> {
		self.0.write().remove(name)
	}
}
impl ConfigProvider for MemoryConfigProvider {
	fn get<'a>(&'a self, name: &'a str) -> ConfigFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.0.read().get(name).cloned()) })
	}
}
