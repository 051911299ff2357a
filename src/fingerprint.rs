//! Usage fingerprints: SHA-256 digests of a request's canonical identity.
//!
//! The canonical identity of a request is its path, followed by `?` and the raw query string
//! when a query is present. Bytes are hashed exactly as received: no percent-decoding, no
//! parameter reordering, no case folding. Two requests therefore share a fingerprint only when
//! their path and query are byte-for-byte identical.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Digest length in bytes.
pub const FINGERPRINT_LEN: usize = 32;
/// Query parameter the issuer appends and the gatekeeper reads by default.
pub const DEFAULT_FINGERPRINT_PARAM: &str = "hash";

/// Errors emitted when parsing a textual fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum FingerprintError {
	/// The value does not have exactly 64 characters.
	#[error("Fingerprint must be {expected} hex characters, got {actual}.")]
	InvalidLength {
		/// Required character count.
		expected: usize,
		/// Observed character count.
		actual: usize,
	},
	/// The value contains non-hex characters.
	#[error("Fingerprint contains non-hex characters.")]
	InvalidHex,
}

/// How the gatekeeper derives the fingerprint of an inbound request.
///
/// A deployment picks one mode; the issuer always emits URLs that satisfy both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintMode {
	/// Hash the presented path and query (minus the fingerprint parameter).
	Recompute,
	/// Read the fingerprint parameter and require it to match the recomputed digest.
	#[default]
	Explicit,
}

/// 256-bit digest identifying one resource-access request.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);
impl Fingerprint {
	/// Hashes arbitrary identity bytes.
	pub fn digest(identity: impl AsRef<[u8]>) -> Self {
		let mut hasher = Sha256::new();

		hasher.update(identity.as_ref());

		Self(hasher.finalize().into())
	}

	/// Fingerprint of a request given its path and raw query string.
	pub fn of_request(path: &str, query: Option<&str>) -> Self {
		Self::digest(canonical_identity(path, query))
	}

	/// Wraps raw digest bytes.
	pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
		Self(bytes)
	}

	/// Raw digest bytes.
	pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
		&self.0
	}

	/// Lowercase hex rendering used on the wire and in ledger keys.
	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}
}
impl Debug for Fingerprint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Fingerprint({})", self.to_hex())
	}
}
impl Display for Fingerprint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.to_hex())
	}
}
impl FromStr for Fingerprint {
	type Err = FingerprintError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.len() != FINGERPRINT_LEN * 2 {
			return Err(FingerprintError::InvalidLength {
				expected: FINGERPRINT_LEN * 2,
				actual: s.len(),
			});
		}

		let mut bytes = [0_u8; FINGERPRINT_LEN];

		hex::decode_to_slice(s, &mut bytes).map_err(|_| FingerprintError::InvalidHex)?;

		Ok(Self(bytes))
	}
}
impl Serialize for Fingerprint {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_hex())
	}
}
impl<'de> Deserialize<'de> for Fingerprint {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		raw.parse().map_err(DeError::custom)
	}
}

/// Builds the canonical identity string: `path` or `path?query`.
pub fn canonical_identity(path: &str, query: Option<&str>) -> String {
	match query.filter(|q| !q.is_empty()) {
		Some(query) => format!("{path}?{query}"),
		None => path.to_owned(),
	}
}

/// Raw query string split around one named parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySplit {
	/// The query with every occurrence of the parameter removed, other pairs untouched.
	pub remainder: String,
	/// Raw (undecoded) values of the removed parameter, in order of appearance.
	pub values: Vec<String>,
}

/// Removes every `name=value` pair named `name` from a raw query string.
///
/// Matching is on the raw parameter name; values are returned undecoded. The remaining pairs
/// keep their order and bytes, so the remainder reproduces the original query when the
/// parameter was appended last.
pub fn split_query_param(query: &str, name: &str) -> QuerySplit {
	let mut kept = Vec::new();
	let mut values = Vec::new();

	for pair in query.split('&') {
		match pair.split_once('=') {
			Some((key, value)) if key == name => values.push(value.to_owned()),
			None if pair == name => values.push(String::new()),
			_ => kept.push(pair),
		}
	}

	QuerySplit { remainder: kept.join("&"), values }
}

/// Appends `name=value` to a raw query string.
pub fn append_query_param(query: Option<&str>, name: &str, value: &str) -> String {
	match query.filter(|q| !q.is_empty()) {
		Some(query) => format!("{query}&{name}={value}"),
		None => format!("{name}={value}"),
	}
}
