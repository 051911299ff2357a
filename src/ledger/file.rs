//! Append-only file-backed [`UsageLedger`] for single-node deployments.

// std
use std::{
	fs::{self, File, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	ledger::{LedgerError, LedgerFuture, LedgerKey, PutOutcome, UsageLedger},
	obs,
};

/// Persists consumed keys as JSON lines, one entry per line.
///
/// Each new entry is written and synced to disk before [`PutOutcome::Created`] is reported, and
/// the log is replayed when the ledger is opened. The conditional put is atomic within one
/// process only; several processes appending to the same file are not coordinated.
#[derive(Debug)]
pub struct FileLedger {
	path: PathBuf,
	inner: Mutex<FileLedgerState>,
}
#[derive(Debug)]
struct FileLedgerState {
	entries: HashSet<LedgerKey>,
	file: File,
}
impl FileLedger {
	/// Opens (or creates) a ledger log at the provided path, replaying existing entries.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let entries = if path.exists() { Self::replay(&path)? } else { HashSet::new() };
		let file = OpenOptions::new().create(true).append(true).open(&path).map_err(|e| {
			LedgerError::Backend { message: format!("Failed to open {}: {e}", path.display()) }
		})?;

		Ok(Self { path, inner: Mutex::new(FileLedgerState { entries, file }) })
	}

	/// Location of the ledger log.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn replay(path: &Path) -> Result<HashSet<LedgerKey>, LedgerError> {
		let bytes = fs::read(path).map_err(|e| LedgerError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		// Everything after the last newline is a write that never completed.
		let complete = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);

		if complete < bytes.len() {
			Self::truncate_torn_tail(path, complete as u64, bytes.len() - complete)?;
		}

		let text = std::str::from_utf8(&bytes[..complete]).map_err(|e| {
			LedgerError::Serialization {
				message: format!("Ledger log {} is not valid UTF-8: {e}", path.display()),
			}
		})?;
		let mut entries = HashSet::new();

		for (index, line) in text.lines().enumerate() {
			if line.trim().is_empty() {
				continue;
			}

			let mut de = serde_json::Deserializer::from_str(line);
			let key: LedgerKey = serde_path_to_error::deserialize(&mut de).map_err(|e| {
				LedgerError::Serialization {
					message: format!(
						"Corrupt entry at {}:{} (`{}`): {}",
						path.display(),
						index + 1,
						e.path(),
						e.inner()
					),
				}
			})?;

			entries.insert(key);
		}

		Ok(entries)
	}

	fn truncate_torn_tail(path: &Path, len: u64, dropped: usize) -> Result<(), LedgerError> {
		let file = OpenOptions::new().write(true).open(path).map_err(|e| LedgerError::Backend {
			message: format!("Failed to open {} for repair: {e}", path.display()),
		})?;

		file.set_len(len).map_err(|e| LedgerError::Backend {
			message: format!("Failed to truncate {}: {e}", path.display()),
		})?;
		file.sync_data().map_err(|e| LedgerError::Backend {
			message: format!("Failed to sync {}: {e}", path.display()),
		})?;
		obs::warn_event(
			"ledger",
			&format!("discarded {dropped} trailing bytes of an unfinished entry in {}", path.display()),
		);

		Ok(())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), LedgerError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| LedgerError::Backend {
				message: format!("Failed to create ledger directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn append_locked(
		&self,
		state: &mut FileLedgerState,
		key: &LedgerKey,
	) -> Result<(), LedgerError> {
		let mut line = serde_json::to_vec(key).map_err(|e| LedgerError::Serialization {
			message: format!("Failed to serialize ledger entry: {e}"),
		})?;

		line.push(b'\n');

		let len = state.file.metadata().map(|m| m.len()).map_err(|e| LedgerError::Backend {
			message: format!("Failed to stat {}: {e}", self.path.display()),
		})?;
		let written = state.file.write_all(&line).map_err(|e| LedgerError::Backend {
			message: format!("Failed to write {}: {e}", self.path.display()),
		});
		let written = written.and_then(|()| {
			state.file.sync_data().map_err(|e| LedgerError::Backend {
				message: format!("Failed to sync {}: {e}", self.path.display()),
			})
		});

		if written.is_err() {
			// Drop any partial line so the next entry starts on a clean boundary.
			let _ = state.file.set_len(len);
		}

		written
	}
}
impl UsageLedger for FileLedger {
	fn put_if_absent<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, PutOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.lock();

			if guard.entries.contains(key) {
				return Ok(PutOutcome::AlreadyExists);
			}

			self.append_locked(&mut guard, key)?;
			guard.entries.insert(key.to_owned());

			Ok(PutOutcome::Created)
		})
	}

	fn exists<'a>(&'a self, key: &'a LedgerKey) -> LedgerFuture<'a, bool> {
		Box::pin(async move { Ok(self.inner.lock().entries.contains(key)) })
	}
}
