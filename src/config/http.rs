//! Remote [`ConfigProvider`] backed by a parameter-store HTTP endpoint.

// crates.io
use reqwest::header::ACCEPT;
// self
use crate::{
	_prelude::*,
	config::{ConfigFuture, ConfigProvider},
	error::ConfigError,
	http::{self, ReqwestHttpClient, ResponseMetadata, UnexpectedResponse},
};

/// Fetches parameters with `GET {base}?name={name}`.
///
/// A `200` response carries `{"name": "...", "value": "..."}`; `404` means the parameter does
/// not exist. Anything else is a provider failure.
#[derive(Clone, Debug)]
pub struct HttpConfigProvider {
	base: Url,
	client: ReqwestHttpClient,
}
impl HttpConfigProvider {
	/// Creates a provider querying `base`.
	pub fn new(base: Url) -> Result<Self, ConfigError> {
		http::require_base(&base).map_err(|reason| ConfigError::Invalid {
			name: "parameter endpoint".into(),
			reason,
		})?;

		Ok(Self { base, client: ReqwestHttpClient::default() })
	}

	/// Replaces the HTTP client used for every request.
	pub fn with_client(mut self, client: ReqwestHttpClient) -> Self {
		self.client = client;

		self
	}
}
impl ConfigProvider for HttpConfigProvider {
	fn get<'a>(&'a self, name: &'a str) -> ConfigFuture<'a, Option<String>> {
		Box::pin(async move {
			let mut url = self.base.clone();

			url.query_pairs_mut().append_pair("name", name);

			let response = self
				.client
				.get(url)
				.header(ACCEPT, "application/json")
				.send()
				.await
				.map_err(|e| ConfigError::provider(name, e))?;

			match response.status().as_u16() {
				200 => {},
				404 => return Ok(None),
				_ => {
					let meta = ResponseMetadata::from_response(&response);

					return Err(ConfigError::provider(name, UnexpectedResponse(meta)));
				},
			}

			let bytes = response.bytes().await.map_err(|e| ConfigError::provider(name, e))?;
			let mut de = serde_json::Deserializer::from_slice(&bytes);
			let parameter: ParameterBody = serde_path_to_error::deserialize(&mut de)
				.map_err(|e| ConfigError::provider(name, e))?;

			if parameter.name != name {
				return Err(ConfigError::Invalid {
					name: name.to_owned(),
					reason: format!("provider answered for parameter `{}`", parameter.name),
				});
			}

			Ok(Some(parameter.value))
		})
	}
}

#[derive(Debug, Deserialize)]
struct ParameterBody {
	name: String,
	#[serde(default)]
	value: String,
}
