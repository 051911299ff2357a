//! JSON-lines [`AuditSink`] appending to a local file.

// std
use std::{
	fs::{self, File, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	audit::{AuditError, AuditFuture, AuditRecord, AuditSink},
};

/// Appends one JSON document per record.
#[derive(Debug)]
pub struct FileAuditSink {
	path: PathBuf,
	file: Mutex<File>,
}
impl FileAuditSink {
	/// Opens (or creates) the log at `path` in append mode.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
		let path = path.into();

		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| AuditError::Backend {
				message: format!("Failed to create audit directory {}: {e}", parent.display()),
			})?;
		}

		let file = OpenOptions::new().create(true).append(true).open(&path).map_err(|e| {
			AuditError::Backend { message: format!("Failed to open {}: {e}", path.display()) }
		})?;

		Ok(Self { path, file: Mutex::new(file) })
	}

	/// Location of the audit log.
	pub fn path(&self) -> &Path {
		&self.path
	}
}
impl AuditSink for FileAuditSink {
	fn append<'a>(&'a self, record: &'a AuditRecord) -> AuditFuture<'a> {
		Box::pin(async move {
			let mut line = record.to_json()?;

			line.push('\n');
			self.file.lock().write_all(line.as_bytes()).map_err(|e| AuditError::Backend {
				message: format!("Failed to write {}: {e}", self.path.display()),
			})
		})
	}
}
