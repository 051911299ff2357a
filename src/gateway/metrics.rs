// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, error::ErrorKind};

/// Thread-safe counters for redemption attempts.
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
	attempts: AtomicU64,
	allowed: AtomicU64,
	forbidden: AtomicU64,
	rejected: AtomicU64,
	failed: AtomicU64,
}
impl AdmissionMetrics {
	/// Returns the total number of redemption attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of admitted requests.
	pub fn allowed(&self) -> u64 {
		self.allowed.load(Ordering::Relaxed)
	}

	/// Returns the number of requests denied because the descriptor was spent or invalid.
	pub fn forbidden(&self) -> u64 {
		self.forbidden.load(Ordering::Relaxed)
	}

	/// Returns the number of malformed requests.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	/// Returns the number of requests denied because a dependency failed.
	pub fn failed(&self) -> u64 {
		self.failed.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_result<T>(&self, result: &Result<T>) {
		let counter = match result.as_ref().map_err(Error::kind) {
			Ok(_) => &self.allowed,
			Err(ErrorKind::Forbidden) => &self.forbidden,
			Err(ErrorKind::BadRequest) => &self.rejected,
			Err(ErrorKind::InternalError | ErrorKind::IntegrityError) => &self.failed,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn results_land_in_their_bucket() {
		let metrics = AdmissionMetrics::default();

		metrics.record_attempt();
		metrics.record_result(&Ok(()));
		metrics.record_result::<()>(&Err(Error::forbidden("spent")));
		metrics.record_result::<()>(&Err(Error::bad_request("no hash")));
		metrics.record_result::<()>(&Err(Error::integrity("no path")));

		assert_eq!(metrics.attempts(), 1);
		assert_eq!(metrics.allowed(), 1);
		assert_eq!(metrics.forbidden(), 1);
		assert_eq!(metrics.rejected(), 1);
		assert_eq!(metrics.failed(), 1);
	}
}
