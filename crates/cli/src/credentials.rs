//! Saved access token.
//!
//! `login` and `register` store the bearer token as a `token` file next to
//! `config.toml`, readable only by the owner on Unix.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TOKEN_FILE: &str = "token";

pub fn token_path(dir: &Path) -> PathBuf {
	dir.join(TOKEN_FILE)
}

/// Writes `token`, creating `dir` if needed.
///
/// On Unix the file is owner-only before any token bytes reach it, including
/// when an older, wider-permissioned file is being replaced.
pub fn save(dir: &Path, token: &str) -> io::Result<PathBuf> {
	std::fs::create_dir_all(dir)?;
	let path = token_path(dir);
	let mut options = OpenOptions::new();
	options.write(true).create(true).truncate(true);
	#[cfg(unix)]
	{
		use std::os::unix::fs::OpenOptionsExt;
		options.mode(0o600);
	}
	let mut file = options.open(&path)?;
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
	}
	file.write_all(token.as_bytes())?;
	Ok(path)
}

/// Reads the saved token. A missing or blank file means no token.
pub fn load(dir: &Path) -> io::Result<Option<String>> {
	match std::fs::read_to_string(token_path(dir)) {
		Ok(raw) => {
			let token = raw.trim();
			Ok((!token.is_empty()).then(|| token.to_string()))
		}
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e),
	}
}

/// Deletes the saved token. Returns false if there was none.
pub fn clear(dir: &Path) -> io::Result<bool> {
	match std::fs::remove_file(token_path(dir)) {
		Ok(()) => Ok(true),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
		Err(e) => Err(e),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_save_then_load() {
		let dir = tempfile::tempdir().unwrap();
		let nested = dir.path().join("stockroom");

		let path = save(&nested, "abc.def.ghi").unwrap();

		assert_eq!(path, nested.join("token"));
		assert_eq!(load(&nested).unwrap().as_deref(), Some("abc.def.ghi"));
	}

	#[test]
	fn test_missing_or_blank_file_is_no_token() {
		let dir = tempfile::tempdir().unwrap();
		assert_eq!(load(dir.path()).unwrap(), None);

		std::fs::write(token_path(dir.path()), "  \n").unwrap();
		assert_eq!(load(dir.path()).unwrap(), None);
	}

	#[test]
	fn test_clear_is_idempotent() {
		let dir = tempfile::tempdir().unwrap();
		save(dir.path(), "t").unwrap();

		assert!(clear(dir.path()).unwrap());
		assert!(!clear(dir.path()).unwrap());
		assert_eq!(load(dir.path()).unwrap(), None);
	}

	#[cfg(unix)]
	#[test]
	fn test_token_file_is_private() {
		use std::os::unix::fs::PermissionsExt;

		let dir = tempfile::tempdir().unwrap();
		let path = save(dir.path(), "t").unwrap();
		let mode = std::fs::metadata(path).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o600);
	}

	#[cfg(unix)]
	#[test]
	fn test_overwriting_readable_file_makes_it_private() {
		use std::os::unix::fs::PermissionsExt;

		let dir = tempfile::tempdir().unwrap();
		let path = token_path(dir.path());
		std::fs::write(&path, "old-token").unwrap();
		std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

		save(dir.path(), "new").unwrap();

		let mode = std::fs::metadata(&path).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o600);
		assert_eq!(load(dir.path()).unwrap().as_deref(), Some("new"));
	}
}
