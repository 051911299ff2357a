//! Environment-variable [`ConfigProvider`].

// std
use std::env::{self, VarError};
// self
use crate::{
	_prelude::*,
	config::{ConfigFuture, ConfigProvider},
	error::ConfigError,
};

/// Reads parameters from process environment variables.
///
/// Parameter names map onto variable names by dropping leading `/`, replacing `/`, `-`, and `.`
/// with `_`, upper-casing, and prepending the optional prefix:
/// `/URL_ENTRIES_TABLE_NAME` becomes `URL_ENTRIES_TABLE_NAME` (or `APP_URL_ENTRIES_TABLE_NAME`
/// with prefix `APP_`).
#[derive(Clone, Debug, Default)]
pub struct EnvConfigProvider {
	prefix: Option<String>,
}
impl EnvConfigProvider {
	/// Prepends `prefix` to every derived variable name.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());

		self
	}

	/// Environment variable consulted for `name`.
	pub fn variable_name(&self, name: &str) -> String {
		let mapped = name
			.trim_start_matches('/')
			.chars()
			.map(|c| match c {
				'/' | '-' | '.' => '_',
				c => c.to_ascii_uppercase(),
			})
			.collect::<String>();

		match &self.prefix {
			Some(prefix) => format!("{prefix}{mapped}"),
			None => mapped,
		}
	}
}
impl ConfigProvider for EnvConfigProvider {
	fn get<'a>(&'a self, name: &'a str) -> ConfigFuture<'a, Option<String>> {
		Box::pin(async move {
			let variable = self.variable_name(name);

			match env::var(&variable) {
				Ok(value) => Ok(Some(value)),
				Err(VarError::NotPresent) => Ok(None),
				Err(VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
					name: name.to_owned(),
					reason: format!("environment variable `{variable}` is not valid unicode"),
				}),
			}
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parameter_names_map_to_variables() {
		let plain = EnvConfigProvider::default();
		let prefixed = EnvConfigProvider::default().with_prefix("EDGE_");

		assert_eq!(plain.variable_name("/URL_ENTRIES_TABLE_NAME"), "URL_ENTRIES_TABLE_NAME");
		assert_eq!(plain.variable_name("/edge/ledger-table.name"), "EDGE_LEDGER_TABLE_NAME");
		assert_eq!(prefixed.variable_name("/URL_ENTRIES_TABLE_NAME"), "EDGE_URL_ENTRIES_TABLE_NAME");
	}

	#[tokio::test]
	async fn reads_present_and_absent_variables() {
		let provider = EnvConfigProvider::default();

		assert!(provider.get("/path").await.expect("PATH lookup should succeed.").is_some());
		assert_eq!(
			provider
				.get("/single-use-url/definitely-unset-parameter")
				.await
				.expect("Absent lookup should succeed."),
			None
		);
	}
}
