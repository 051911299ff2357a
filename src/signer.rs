//! Resource-signing contracts and the built-in HMAC query signer.
//!
//! The gateway delegates descriptor signatures to the storage system: it asks a
//! [`ResourceSigner`] for a time-limited URL and never interprets the signature itself.
//! [`HmacUrlSigner`] is a concrete signer for stores that verify HMAC-SHA256 query
//! signatures; it also implements [`SignatureVerifier`] so the gatekeeper can refuse
//! tampered or expired descriptors before touching the ledger.

// std
use std::ops::Deref;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
// self
use crate::_prelude::*;

type HmacSha256 = Hmac<Sha256>;

/// Validity window applied to issued descriptors unless overridden.
pub const DEFAULT_VALIDITY: Duration = Duration::minutes(5);

const KEY_MAX_LEN: usize = 1024;
const NONCE_LEN: usize = 12;
const PARAM_OPERATION: &str = "X-Operation";
const PARAM_EXPIRES: &str = "X-Expires";
const PARAM_NONCE: &str = "X-Nonce";
const PARAM_SIGNATURE: &str = "X-Signature";

/// Error returned when resource key validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ResourceKeyError {
	/// The key was empty.
	#[error("Resource key cannot be empty.")]
	Empty,
	/// The key contains whitespace characters.
	#[error("Resource key contains whitespace.")]
	ContainsWhitespace,
	/// The key starts with `/`.
	#[error("Resource key must not start with `/`.")]
	LeadingSlash,
	/// The key contains an empty, `.` or `..` segment.
	#[error("Resource key contains an invalid path segment.")]
	InvalidSegment,
	/// The key exceeded the allowed byte count.
	#[error("Resource key exceeds {max} bytes.")]
	TooLong {
		/// Maximum permitted byte count.
		max: usize,
	},
}

/// Object key of a protected resource in the backing store, e.g. `assets/something`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(String);
impl ResourceKey {
	/// Creates a key after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, ResourceKeyError> {
		let view = value.as_ref();

		validate_key(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Iterator over `/`-separated key segments.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split('/')
	}
}
impl Deref for ResourceKey {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for ResourceKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<ResourceKey> for String {
	fn from(value: ResourceKey) -> Self {
		value.0
	}
}
impl TryFrom<String> for ResourceKey {
	type Error = ResourceKeyError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_key(&value)?;

		Ok(Self(value))
	}
}
impl Debug for ResourceKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ResourceKey({})", self.0)
	}
}
impl Display for ResourceKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for ResourceKey {
	type Err = ResourceKeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// Access a descriptor grants on its resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
	/// Download (`GET`/`HEAD`).
	Read,
	/// Upload (`PUT`/`POST`).
	Write,
}
impl Operation {
	/// HTTP method the signed URL is issued for.
	pub const fn as_method(self) -> &'static str {
		match self {
			Self::Read => "GET",
			Self::Write => "PUT",
		}
	}

	/// Maps an inbound request method onto the operation it exercises.
	pub fn from_method(method: &str) -> Option<Self> {
		match method.to_ascii_uppercase().as_str() {
			"GET" | "HEAD" => Some(Self::Read),
			"PUT" | "POST" => Some(Self::Write),
			_ => None,
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_method())
	}
}

/// Time-limited URL produced by the storage signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedUrl {
	/// Fully signed URL pointing at the resource store.
	pub url: Url,
	/// Instant after which the store rejects the URL.
	pub expires_at: OffsetDateTime,
}

/// Failures raised while producing a signed URL.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SigningError {
	/// The signing backend failed or is misconfigured.
	#[error("Signing backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The requested validity window is not positive.
	#[error("Validity window must be positive, got {seconds} seconds.")]
	InvalidValidity {
		/// Requested window in whole seconds.
		seconds: i64,
	},
}

/// Boxed future returned by [`ResourceSigner::sign`].
pub type SignFuture<'a> = Pin<Box<dyn Future<Output = Result<SignedUrl, SigningError>> + 'a + Send>>;

/// Storage-side signer able to mint time-limited URLs for a key.
pub trait ResourceSigner
where
	Self: Send + Sync,
{
	/// Produces a URL granting `operation` on `key` for `validity`.
	fn sign<'a>(
		&'a self,
		key: &'a ResourceKey,
		validity: Duration,
		operation: Operation,
	) -> SignFuture<'a>;
}

/// Reasons a presented URL fails signature verification.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SignatureError {
	/// A required signature parameter is absent.
	#[error("Signature parameter `{param}` is missing.")]
	Missing {
		/// Parameter name.
		param: &'static str,
	},
	/// A signature parameter appears more than once.
	#[error("Signature parameter `{param}` is repeated.")]
	Duplicate {
		/// Parameter name.
		param: &'static str,
	},
	/// The query carries a parameter the signature does not cover.
	#[error("Query parameter `{param}` is not covered by the signature.")]
	Unexpected {
		/// Parameter name.
		param: String,
	},
	/// A signature parameter could not be decoded.
	#[error("Signature parameter `{param}` is malformed.")]
	Malformed {
		/// Parameter name.
		param: &'static str,
	},
	/// The request method does not match the signed operation.
	#[error("Request method does not match the signed operation.")]
	OperationMismatch,
	/// The URL is past its expiry.
	#[error("Signed URL expired at unix time {expired_at}.")]
	Expired {
		/// Expiry as unix seconds.
		expired_at: i64,
	},
	/// The signature does not match the URL contents.
	#[error("Signature does not match.")]
	BadSignature,
}

/// Verifies that a presented path and query were produced by a trusted signer.
pub trait SignatureVerifier
where
	Self: Send + Sync,
{
	/// Checks the signature of `path?query` for `operation` at instant `now`.
	fn verify(
		&self,
		operation: Operation,
		path: &str,
		query: &str,
		now: OffsetDateTime,
	) -> Result<(), SignatureError>;
}

/// HMAC-SHA256 query signer.
///
/// URLs take the form
/// `{base}/{key}?X-Operation={GET|PUT}&X-Expires={unix}&X-Nonce={nonce}&X-Signature={hex}`,
/// where the signature covers the operation, the encoded path, the expiry, and a random nonce.
/// The nonce keeps descriptors for the same key and second distinct.
#[derive(Clone)]
pub struct HmacUrlSigner {
	base: Url,
	secret: Arc<[u8]>,
}
impl HmacUrlSigner {
	/// Creates a signer for the store rooted at `base`.
	pub fn new(base: Url, secret: impl AsRef<[u8]>) -> Result<Self, SigningError> {
		if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
			return Err(SigningError::Backend {
				message: format!("Store base URL `{base}` is not an http(s) base"),
			});
		}
		if secret.as_ref().is_empty() {
			return Err(SigningError::Backend { message: "Signing secret is empty".into() });
		}

		Ok(Self { base, secret: Arc::from(secret.as_ref()) })
	}

	/// Store base URL.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Signs `key` synchronously with an explicit issue instant.
	pub fn sign_at(
		&self,
		key: &ResourceKey,
		validity: Duration,
		operation: Operation,
		now: OffsetDateTime,
	) -> Result<SignedUrl, SigningError> {
		if !validity.is_positive() {
			return Err(SigningError::InvalidValidity { seconds: validity.whole_seconds() });
		}

		let expires_at = now + validity;
		let expires = expires_at.unix_timestamp().to_string();
		let nonce = random_nonce();
		let mut url = self.base.clone();

		url.set_query(None);
		url.set_fragment(None);
		url.path_segments_mut()
			.map_err(|_| SigningError::Backend {
				message: format!("Store base URL `{}` cannot carry a path", self.base),
			})?
			.pop_if_empty()
			.extend(key.segments());

		let signature = self.signature(operation.as_method(), url.path(), &expires, &nonce)?;

		url.query_pairs_mut()
			.append_pair(PARAM_OPERATION, operation.as_method())
			.append_pair(PARAM_EXPIRES, &expires)
			.append_pair(PARAM_NONCE, &nonce)
			.append_pair(PARAM_SIGNATURE, &hex::encode(signature));

		Ok(SignedUrl { url, expires_at })
	}

	fn mac(&self) -> Result<HmacSha256, SigningError> {
		<HmacSha256 as Mac>::new_from_slice(&self.secret)
			.map_err(|e| SigningError::Backend { message: format!("Invalid signing secret: {e}") })
	}

	fn signature(
		&self,
		method: &str,
		path: &str,
		expires: &str,
		nonce: &str,
	) -> Result<Vec<u8>, SigningError> {
		let mut mac = self.mac()?;

		mac.update(string_to_sign(method, path, expires, nonce).as_bytes());

		Ok(mac.finalize().into_bytes().to_vec())
	}
}
impl ResourceSigner for HmacUrlSigner {
	fn sign<'a>(
		&'a self,
		key: &'a ResourceKey,
		validity: Duration,
		operation: Operation,
	) -> SignFuture<'a> {
		Box::pin(async move { self.sign_at(key, validity, operation, OffsetDateTime::now_utc()) })
	}
}
impl SignatureVerifier for HmacUrlSigner {
	fn verify(
		&self,
		operation: Operation,
		path: &str,
		query: &str,
		now: OffsetDateTime,
	) -> Result<(), SignatureError> {
		let params = SignatureParams::parse(query)?;

		if params.operation != operation.as_method() {
			return Err(SignatureError::OperationMismatch);
		}

		let expired_at = params
			.expires
			.parse::<i64>()
			.map_err(|_| SignatureError::Malformed { param: PARAM_EXPIRES })?;

		if now.unix_timestamp() >= expired_at {
			return Err(SignatureError::Expired { expired_at });
		}

		let presented = hex::decode(&params.signature)
			.map_err(|_| SignatureError::Malformed { param: PARAM_SIGNATURE })?;
		let mut mac = self.mac().map_err(|_| SignatureError::BadSignature)?;

		mac.update(
			string_to_sign(&params.operation, path, &params.expires, &params.nonce).as_bytes(),
		);
		mac.verify_slice(&presented).map_err(|_| SignatureError::BadSignature)
	}
}
impl Debug for HmacUrlSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HmacUrlSigner")
			.field("base", &self.base.as_str())
			.field("secret", &"<redacted>")
			.finish()
	}
}

struct SignatureParams {
	operation: String,
	expires: String,
	nonce: String,
	signature: String,
}
impl SignatureParams {
	fn parse(query: &str) -> Result<Self, SignatureError> {
		let mut slots: [(&'static str, Option<String>); 4] = [
			(PARAM_OPERATION, None),
			(PARAM_EXPIRES, None),
			(PARAM_NONCE, None),
			(PARAM_SIGNATURE, None),
		];

		for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
			let Some((param, slot)) = slots.iter_mut().find(|(param, _)| *param == name) else {
				return Err(SignatureError::Unexpected { param: name.into_owned() });
			};

			if slot.is_some() {
				return Err(SignatureError::Duplicate { param: *param });
			}

			*slot = Some(value.into_owned());
		}

		let [operation, expires, nonce, signature] =
			slots.map(|(param, slot)| slot.ok_or(SignatureError::Missing { param }));

		Ok(Self { operation: operation?, expires: expires?, nonce: nonce?, signature: signature? })
	}
}

fn string_to_sign(method: &str, path: &str, expires: &str, nonce: &str) -> String {
	format!("{method}\n{path}\n{expires}\n{nonce}")
}

fn random_nonce() -> String {
	let mut bytes = [0_u8; NONCE_LEN];

	rand::rng().fill(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}

fn validate_key(view: &str) -> Result<(), ResourceKeyError> {
	if view.is_empty() {
		return Err(ResourceKeyError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(ResourceKeyError::ContainsWhitespace);
	}
	if view.starts_with('/') {
		return Err(ResourceKeyError::LeadingSlash);
	}
	if view.split('/').any(|segment| matches!(segment, "" | "." | "..")) {
		return Err(ResourceKeyError::InvalidSegment);
	}
	if view.len() > KEY_MAX_LEN {
		return Err(ResourceKeyError::TooLong { max: KEY_MAX_LEN });
	}

	Ok(())
}
