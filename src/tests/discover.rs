use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use crate::discover::find_tests;

#[test]
fn recursion_filters_and_sorts() {
	let dir = tempfile::tempdir().unwrap();
	let root = dir.path();
	fs::create_dir_all(root.join("sub").join(".hidden")).unwrap();
	fs::write(root.join("b.t"), "  $ true\n").unwrap();
	fs::write(root.join("a.t"), "  $ true\n").unwrap();
	fs::write(root.join(".secret.t"), "  $ true\n").unwrap();
	fs::write(root.join("notes.txt"), "not a test").unwrap();
	fs::write(root.join("sub").join("c.t"), "  $ true\n").unwrap();
	fs::write(root.join("sub").join(".hidden").join("d.t"), "  $ true\n").unwrap();

	let found = find_tests(&[root.to_path_buf()]).unwrap();
	assert_eq!(
		found,
		vec![root.join("a.t"), root.join("b.t"), root.join("sub").join("c.t")]
	);
}

#[test]
fn explicitly_named_hidden_files_are_accepted() {
	let dir = tempfile::tempdir().unwrap();
	let hidden = dir.path().join(".secret.t");
	fs::write(&hidden, "  $ true\n").unwrap();
	assert_eq!(find_tests(std::slice::from_ref(&hidden)).unwrap(), vec![hidden]);
}

#[test]
fn duplicates_collapse_to_first_occurrence() {
	let dir = tempfile::tempdir().unwrap();
	let root = dir.path();
	fs::write(root.join("a.t"), "  $ true\n").unwrap();
	fs::write(root.join("b.t"), "  $ true\n").unwrap();

	let input = vec![root.join("b.t"), root.to_path_buf(), root.join("b.t")];
	let found = find_tests(&input).unwrap();
	assert_eq!(found, vec![root.join("b.t"), root.join("a.t")]);
}

#[test]
fn missing_files_are_an_error() {
	let err = find_tests(&[PathBuf::from("/no/such/place/missing.t")]).unwrap_err();
	assert!(err.contains("no such file"), "unexpected error: {err}");
}

#[test]
fn named_non_test_files_are_ignored() {
	let dir = tempfile::tempdir().unwrap();
	let notes = dir.path().join("notes.txt");
	fs::write(&notes, "not a test").unwrap();
	assert_eq!(find_tests(&[notes]).unwrap(), Vec::<PathBuf>::new());
}
