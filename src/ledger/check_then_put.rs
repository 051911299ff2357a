//! Weaker-mode adapter for stores without a conditional write.

// self
use crate::{
	_prelude::*,
	ledger::{LedgerFuture, LedgerKey, PutOutcome, UsageLedger},
	obs,
};

/// Store that only offers an existence check and an unconditional write.
pub trait BlindLedger
where
	Self: Send + Sync,
{
	/// Reports whether `key` is present.
	fn exists<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, bool>;

	/// Writes `key`, overwriting any existing entry.
	fn put<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, ()>;
}

/// [`UsageLedger`] built from an `exists` followed by a blind `put`.
///
/// Two concurrent redemptions of one fingerprint can both observe "absent" between the check
/// and the write, and both are then admitted. Only use this where the backing store has no
/// conditional create.
#[derive(Debug)]
pub struct CheckThenPut<L>
where
	L: BlindLedger,
{
	inner: L,
}
impl<L> CheckThenPut<L>
where
	L: BlindLedger,
{
	/// Wraps `inner`, logging that at-most-once admission is not guaranteed.
	pub fn new(inner: L) -> Self {
		obs::warn_event(
			"ledger",
			"check-then-put ledger in use; concurrent redemptions may both be admitted",
		);

		Self { inner }
	}

	/// Borrowed inner store.
	pub fn inner(&self) -> &L {
		&self.inner
	}
}
impl<L> UsageLedger for CheckThenPut<L>
where
	L: BlindLedger,
{
	fn put_if_absent<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, PutOutcome> {
		Box::pin(async move {
			if self.inner.exists(key).await? {
				return Ok(PutOutcome::AlreadyExists);
			}

			self.inner.put(key).await?;

			Ok(PutOutcome::Created)
		})
	}

	fn exists<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, bool> {
		self.inner.exists(key)
	}
}
