// Persisted dictionary files: round trips and damaged files.

use std::collections::BTreeMap;
use std::fs;

use proptest::prelude::*;
use termmap_core::{
    load_dictionary, read_dictionary, save_dictionary, write_dictionary, DictError, SortedArray,
    TermMapping, VertexMapping,
};

fn term_array() -> SortedArray<String, u32> {
    let keys = ["apple", "banana", "cherry"].map(String::from);
    let mut arr = SortedArray::allocate(keys).unwrap();
    for (k, v) in [("apple", 1), ("apple", 1), ("banana", 7), ("cherry", 2), ("cherry", 3)] {
        assert!(arr.record_occurrence(k, v));
    }
    arr
}

#[test]
fn saved_file_loads_as_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("binary").join("fruit-f.wic");
    save_dictionary(&term_array(), &path).unwrap();

    let m = TermMapping::load(&path).unwrap();
    assert_eq!(m.array(), &term_array());
    assert_eq!(m.count("apple", &1), 2);
    assert!(m.lookup("durian").is_none());
    // no leftover partial file
    let names: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("fruit-f.wic")]);
}

#[test]
fn mapping_save_overwrites_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v.iwc");
    fs::write(&path, b"stale bytes").unwrap();

    let mut arr = SortedArray::allocate([5u32]).unwrap();
    arr.record_occurrence(&5, "five".to_string());
    VertexMapping::from_array(arr.clone()).save(&path).unwrap();
    assert_eq!(VertexMapping::load(&path).unwrap().into_array(), arr);
}

#[test]
fn inflated_record_count_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.wic");
    save_dictionary(&term_array(), &path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[..4].copy_from_slice(&5u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let err = load_dictionary::<String, u32, _>(&path).unwrap_err();
    assert!(err.is_format_error(), "{:?}", err);
    assert!(matches!(
        err,
        DictError::RecordCountMismatch { declared: 5, found: 3 }
    ));
}

#[test]
fn deflated_record_count_leaves_trailing_data() {
    let mut bytes = Vec::new();
    write_dictionary(&mut bytes, &term_array()).unwrap();
    bytes[..4].copy_from_slice(&2u32.to_le_bytes());

    let err = read_dictionary::<String, u32, _>(&bytes[..]).unwrap_err();
    assert!(matches!(err, DictError::TrailingData { declared: 2 }));
}

#[test]
fn cut_file_is_a_read_error() {
    let mut bytes = Vec::new();
    write_dictionary(&mut bytes, &term_array()).unwrap();
    for cut in [2, 9, bytes.len() - 3] {
        let err = read_dictionary::<String, u32, _>(&bytes[..cut]).unwrap_err();
        assert!(err.is_read_error(), "cut at {}: {:?}", cut, err);
        assert!(!err.is_format_error());
    }
}

#[test]
fn zero_records_is_refused() {
    let bytes = 0u32.to_le_bytes();
    let err = read_dictionary::<u32, String, _>(&bytes[..]).unwrap_err();
    assert!(matches!(err, DictError::NoRecords));
    assert!(err.is_format_error());
}

#[test]
fn corrupt_length_prefix_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.wic");
    save_dictionary(&term_array(), &path).unwrap();

    // first key's u64 length sits right after the record count
    let mut bytes = fs::read(&path).unwrap();
    bytes[4..12].copy_from_slice(&(1u64 << 62).to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let err = TermMapping::load(&path).unwrap_err();
    assert!(err.is_read_error(), "{:?}", err);
    assert!(matches!(err, DictError::Truncated("record key")));
}

#[test]
fn missing_file_is_io() {
    let dir = tempfile::tempdir().unwrap();
    let err = TermMapping::load(dir.path().join("absent.wic")).unwrap_err();
    assert!(matches!(err, DictError::Io { .. }));
}

fn arrays() -> impl Strategy<Value = SortedArray<u32, String>> {
    prop::collection::btree_map(
        any::<u32>(),
        prop::collection::vec(("[a-z ]{0,6}", 1u32..4), 0..5),
        1..30,
    )
    .prop_map(|groups: BTreeMap<u32, Vec<(String, u32)>>| {
        let mut arr = SortedArray::allocate(groups.keys().copied()).unwrap();
        for (key, seen) in &groups {
            for (term, times) in seen {
                for _ in 0..*times {
                    arr.record_occurrence(key, term.clone());
                }
            }
        }
        arr
    })
}

proptest! {
    #[test]
    fn files_reload_identically(arr in arrays()) {
        let mut bytes = Vec::new();
        write_dictionary(&mut bytes, &arr).unwrap();
        let back: SortedArray<u32, String> = read_dictionary(&bytes[..]).unwrap();
        prop_assert_eq!(back, arr);
    }
}
