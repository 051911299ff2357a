//! Usage-ledger contracts and built-in ledger backends.
//!
//! The ledger records which fingerprints have been consumed. Its one required primitive is
//! [`UsageLedger::put_if_absent`], a conditional create that must be a single indivisible
//! operation against a strongly consistent store. Entries are presence-only: created once by
//! the first successful redemption, never updated and never deleted.

pub mod check_then_put;
pub mod file;
#[cfg(feature = "reqwest")] pub mod http;
pub mod memory;

pub use check_then_put::{BlindLedger, CheckThenPut};
pub use file::FileLedger;
#[cfg(feature = "reqwest")] pub use http::HttpLedger;
pub use memory::MemoryLedger;

// self
use crate::{_prelude::*, fingerprint::Fingerprint};

const TABLE_MIN_LEN: usize = 3;
const TABLE_MAX_LEN: usize = 255;

/// Boxed future returned by [`UsageLedger`] operations.
pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + 'a + Send>>;

/// Strongly consistent key-existence store recording consumed fingerprints.
pub trait UsageLedger
where
	Self: Send + Sync,
{
	/// Creates the entry for `key` unless it already exists, atomically.
	///
	/// For any key, among any number of concurrent callers, at most one observes
	/// [`PutOutcome::Created`].
	fn put_if_absent<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, PutOutcome>;

	/// Reports whether `key` has been consumed.
	fn exists<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, bool>;
}

/// Result of a conditional put.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutOutcome {
	/// The entry did not exist and has now been recorded.
	Created,
	/// The entry was already present; nothing was written.
	AlreadyExists,
}

/// Error type produced by [`UsageLedger`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum LedgerError {
	/// Encoding or decoding failures surfaced by the backend.
	#[error("Ledger serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// The backing store could not be reached or answered unexpectedly.
	#[error("Ledger backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Error returned when a ledger table name fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LedgerTableError {
	/// The name is shorter or longer than allowed.
	#[error("Ledger table name must be {min}-{max} characters, got {actual}.")]
	InvalidLength {
		/// Minimum character count.
		min: usize,
		/// Maximum character count.
		max: usize,
		/// Observed character count.
		actual: usize,
	},
	/// The name contains a character outside `[A-Za-z0-9_.-]`.
	#[error("Ledger table name contains invalid character `{character}`.")]
	InvalidCharacter {
		/// Offending character.
		character: char,
	},
}

/// Identity of the ledger table resolved from runtime configuration.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerTable(String);
impl LedgerTable {
	/// Creates a table name after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, LedgerTableError> {
		let view = value.as_ref();

		validate_table(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Borrowed table name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for LedgerTable {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<LedgerTable> for String {
	fn from(value: LedgerTable) -> Self {
		value.0
	}
}
impl TryFrom<String> for LedgerTable {
	type Error = LedgerTableError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_table(&value)?;

		Ok(Self(value))
	}
}
impl Debug for LedgerTable {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "LedgerTable({})", self.0)
	}
}
impl Display for LedgerTable {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for LedgerTable {
	type Err = LedgerTableError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// Unique key identifying one ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
	/// Table the entry lives in.
	pub table: LedgerTable,
	/// Consumed fingerprint.
	pub fingerprint: Fingerprint,
}
impl LedgerKey {
	/// Builds a key for `fingerprint` inside `table`.
	pub fn new(table: LedgerTable, fingerprint: Fingerprint) -> Self {
		Self { table, fingerprint }
	}
}
impl Display for LedgerKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.table, self.fingerprint)
	}
}

fn validate_table(view: &str) -> Result<(), LedgerTableError> {
	let actual = view.chars().count();

	if !(TABLE_MIN_LEN..=TABLE_MAX_LEN).contains(&actual) {
		return Err(LedgerTableError::InvalidLength {
			min: TABLE_MIN_LEN,
			max: TABLE_MAX_LEN,
			actual,
		});
	}
	if let Some(character) =
		view.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
	{
		return Err(LedgerTableError::InvalidCharacter { character });
	}

	Ok(())
}
