//! Thread-safe in-memory [`UsageLedger`] for local development and tests.

// self
use crate::{
	_prelude::*,
	ledger::{LedgerFuture, LedgerKey, PutOutcome, UsageLedger},
};

type EntrySet = Arc<RwLock<HashSet<LedgerKey>>>;

/// Process-local ledger; the conditional put is a single insert under the write lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger(EntrySet);
impl MemoryLedger {
	/// Number of consumed entries across all tables.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing has been consumed yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn put_now(set: &EntrySet, key: &LedgerKey) -> PutOutcome {
		if set.write().insert(key.to_owned()) {
			PutOutcome::Created
		} else {
			PutOutcome::AlreadyExists
		}
	}
}
impl UsageLedger for MemoryLedger {
	fn put_if_absent<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, PutOutcome> {
		Box::pin(async move { Ok(Self::put_now(&self.0, key)) })
	}

	fn exists<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, bool> {
		Box::pin(async move { Ok(self.0.read().contains(key)) })
	}
}
