//! Test discovery.
//!
//! Turns a list of user-supplied paths into the ordered list of test
//! files to run. Named paths are taken at face value (even hidden ones,
//! if the user went to the trouble of spelling them out); directories are
//! searched recursively for `.t` files, skipping anything hidden below
//! the named root. Order is the caller's, with duplicates dropped on
//! first sight.
use std::path::{Path, PathBuf};

use itertools::Itertools;

/// Collect test files from files and directories.
pub fn find_tests(paths: &[PathBuf]) -> Result<Vec<PathBuf>,String> {
	let mut found = Vec::new();
	for path in paths {
		if path.is_dir() {
			collect_dir(path, &mut found)?;
		} else {
			if !path.exists() {
				return Err(format!("no such file: '{}'", path.display()));
			}
			// Explicitly named files skip the hidden filter but still have
			// to look like tests.
			if path.is_file() && has_test_extension(path) {
				found.push(path.clone());
			}
		}
	}
	Ok(found.into_iter().unique().collect())
}

/// Recurse into a directory. `glob` hands results back sorted, which is
/// the order tests inside one directory run in. Hidden-ness is judged on
/// the components below `dir`; where the directory itself lives is the
/// caller's business.
fn collect_dir(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(),String> {
	let pattern = dir.join("**").join("*.t");
	let entries = glob::glob(&pattern.to_string_lossy())
		.map_err(|e| format!("bad search pattern '{}': {e}", pattern.display()))?;
	for entry in entries {
		let path = entry.map_err(|e| format!("failed to read '{}': {e}", e.path().display()))?;
		let hidden = path.strip_prefix(dir).map(is_hidden).unwrap_or(true);
		if path.is_file() && !hidden {
			found.push(path);
		}
	}
	Ok(())
}

fn has_test_extension(path: &Path) -> bool {
	path.extension().is_some_and(|ext| ext == "t")
}

/// Any component starting with a dot hides a path, `.` and `..` aside.
fn is_hidden(path: &Path) -> bool {
	path.components().any(|part| {
		let part = part.as_os_str().to_string_lossy();
		part.starts_with('.') && part != "." && part != ".."
	})
}
