// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::Deserialize;
use std::os::unix::fs::MetadataExt;

#[derive(Debug, PartialEq, serde::Serialize, Deserialize)]
struct Rec {
    n: u32,
}

#[test]
fn atomic_write_creates_parents_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a/b/rec.json");

    write_json_atomic(&path, &Rec { n: 7 }).unwrap();

    let back: Option<Rec> = read_json_opt(&path).unwrap();
    assert_eq!(back, Some(Rec { n: 7 }));
}

#[test]
fn atomic_write_sets_mode_0600_and_leaves_no_tmp() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rec.json");

    write_json_atomic(&path, &Rec { n: 1 }).unwrap();

    let mode = fs::metadata(&path).unwrap().mode() & 0o777;
    assert_eq!(mode, 0o600);
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn atomic_write_replaces_prior_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rec.json");

    write_json_atomic(&path, &Rec { n: 1 }).unwrap();
    write_json_atomic(&path, &Rec { n: 2 }).unwrap();

    let back: Option<Rec> = read_json_opt(&path).unwrap();
    assert_eq!(back, Some(Rec { n: 2 }));
}

#[test]
fn missing_jsonl_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let records: Vec<Rec> = read_jsonl(&dir.path().join("absent.jsonl")).unwrap();
    assert!(records.is_empty());
}

#[test]
fn append_and_read_preserve_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");

    for n in 0..5 {
        append_jsonl(&path, &Rec { n }).unwrap();
    }

    let records: Vec<Rec> = read_jsonl(&path).unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[4], Rec { n: 4 });
}

#[test]
fn unterminated_tail_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");

    append_jsonl(&path, &Rec { n: 1 }).unwrap();
    // Simulate a crash-interrupted append: committed line + partial bytes
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"partial\":").unwrap();
    drop(file);

    let records: Vec<Rec> = read_jsonl(&path).unwrap();
    assert_eq!(records, vec![Rec { n: 1 }]);
}

#[test]
fn file_of_only_a_fragment_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    fs::write(&path, b"{\"n\":").unwrap();

    let records: Vec<Rec> = read_jsonl(&path).unwrap();
    assert!(records.is_empty());
}

#[test]
fn interior_garbage_line_fails_the_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    fs::write(&path, b"{\"n\":1}\nnot json\n{\"n\":2}\n").unwrap();

    let err = read_jsonl::<Rec>(&path).unwrap_err();
    assert!(matches!(err, FsError::InvalidLine { line: 2, .. }));
}

#[test]
fn appended_file_has_mode_0600() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    append_jsonl(&path, &Rec { n: 1 }).unwrap();

    let mode = fs::metadata(&path).unwrap().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn private_dir_helper_sets_0700() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("team");
    fs::create_dir(&sub).unwrap();
    set_private_dir(&sub).unwrap();

    let mode = fs::metadata(&sub).unwrap().mode() & 0o777;
    assert_eq!(mode, 0o700);
}
