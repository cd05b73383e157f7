//! Binary dictionary format.
//!
//! All integers are little-endian and fixed width:
//!
//! ```text
//! record_count: u32
//! record_count x {
//!     key                      (u32 vertex, or u64 byte length + UTF-8 term)
//!     association_count: u32
//!     association_count x { counterpart, count: u32 }
//! }
//! ```
//!
//! Loading is all-or-nothing. EOF inside the header or a record is a read
//! error, and so is a length prefix claiming more bytes than the file holds.
//! A zero `record_count`, EOF on a record boundary before `record_count`
//! records, or bytes left over after them, is a format error.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{DictError, Result};
use crate::record::{Association, Record};
use crate::sorted_array::{DictKey, SortedArray};

/// Cap on up-front allocation driven by a length prefix read from disk.
const PREALLOC_LIMIT: usize = 1 << 16;

/// Most bytes a single decoded item (one key, or one association) may span.
/// Length prefixes claiming more fail before anything is allocated.
pub(crate) const MAX_ITEM_BYTES: u64 = 1 << 26;

/// Encoding shared by dictionaries and pair streams.
pub(crate) fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

fn encode<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T, what: &'static str) -> Result<()> {
    options()
        .serialize_into(w, value)
        .map_err(|e| DictError::encode(e, what))
}

fn decode<R: Read, T: DeserializeOwned>(r: &mut R, limit: u64, what: &'static str) -> Result<T> {
    options()
        .with_limit(limit)
        .deserialize_from(r)
        .map_err(|e| DictError::decode(e, what))
}

fn len_prefix(len: usize, what: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| DictError::TooLarge { what, len })
}

/// Serialize `array` to `writer` and flush it.
pub fn write_dictionary<K, C, W>(mut writer: W, array: &SortedArray<K, C>) -> Result<()>
where
    K: DictKey,
    C: DictKey,
    W: Write,
{
    encode(&mut writer, &len_prefix(array.len(), "record")?, "record count")?;
    for record in array {
        encode(&mut writer, record.key(), "record key")?;
        encode(
            &mut writer,
            &len_prefix(record.len(), "association")?,
            "association count",
        )?;
        for e in record.entries() {
            encode(&mut writer, &(&e.counterpart, e.count), "association")?;
        }
    }
    writer
        .flush()
        .map_err(|e| DictError::io("flushing dictionary", e))
}

/// Deserialize a complete dictionary from `reader`.
pub fn read_dictionary<K, C, R>(reader: R) -> Result<SortedArray<K, C>>
where
    K: DictKey,
    C: DictKey,
    R: BufRead,
{
    read_bounded(reader, MAX_ITEM_BYTES)
}

/// `limit` caps the bytes any one item may claim; a claim past it reads as
/// truncation.
fn read_bounded<K, C, R>(mut reader: R, limit: u64) -> Result<SortedArray<K, C>>
where
    K: DictKey,
    C: DictKey,
    R: BufRead,
{
    let declared: u32 = decode(&mut reader, limit, "record count")?;
    if declared == 0 {
        return Err(DictError::NoRecords);
    }
    let mut records = Vec::with_capacity((declared as usize).min(PREALLOC_LIMIT));
    for found in 0..declared {
        if at_eof(&mut reader)? {
            return Err(DictError::RecordCountMismatch { declared, found });
        }
        records.push(read_record(&mut reader, limit)?);
    }
    if !at_eof(&mut reader)? {
        return Err(DictError::TrailingData { declared });
    }
    SortedArray::from_sorted(records)
}

fn at_eof<R: BufRead>(reader: &mut R) -> Result<bool> {
    let buf = reader
        .fill_buf()
        .map_err(|e| DictError::io("reading dictionary", e))?;
    Ok(buf.is_empty())
}

fn read_record<K, C, R>(reader: &mut R, limit: u64) -> Result<Record<K, C>>
where
    K: DictKey,
    C: DictKey,
    R: Read,
{
    let key: K = decode(reader, limit, "record key")?;
    let n: u32 = decode(reader, limit, "association count")?;
    let mut entries = Vec::with_capacity((n as usize).min(PREALLOC_LIMIT));
    for _ in 0..n {
        let (counterpart, count): (C, u32) = decode(reader, limit, "association")?;
        entries.push(Association::new(counterpart, count));
    }
    Ok(Record::from_parts(key, entries))
}

pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Write `array` to `path`.
///
/// The bytes go to `<path>.partial` first and are renamed over `path` only
/// once everything has been written and synced.
pub fn save_dictionary<K, C, P>(array: &SortedArray<K, C>, path: P) -> Result<()>
where
    K: DictKey,
    C: DictKey,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    stage_dictionary(array, path)?;
    commit_staged(path)?;
    debug!(path = %path.display(), records = array.len(), "dictionary written");
    Ok(())
}

/// Write and sync `<path>.partial`, leaving `path` itself untouched.
pub(crate) fn stage_dictionary<K: DictKey, C: DictKey>(
    array: &SortedArray<K, C>,
    path: &Path,
) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| DictError::io(format!("creating {}", dir.display()), e))?;
    }
    let tmp = partial_path(path);
    if let Err(e) = write_synced(array, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Move a staged `<path>.partial` over `path`.
pub(crate) fn commit_staged(path: &Path) -> Result<()> {
    fs::rename(partial_path(path), path)
        .map_err(|e| DictError::io(format!("renaming to {}", path.display()), e))
}

/// Remove a staged file if there is one.
pub(crate) fn discard_staged(path: &Path) {
    let _ = fs::remove_file(partial_path(path));
}

fn write_synced<K: DictKey, C: DictKey>(array: &SortedArray<K, C>, tmp: &Path) -> Result<()> {
    let f = File::create(tmp)
        .map_err(|e| DictError::io(format!("creating {}", tmp.display()), e))?;
    let mut w = BufWriter::new(f);
    write_dictionary(&mut w, array)?;
    let f = w
        .into_inner()
        .map_err(|e| DictError::io(format!("writing {}", tmp.display()), e.into_error()))?;
    f.sync_all()
        .map_err(|e| DictError::io(format!("syncing {}", tmp.display()), e))
}

/// Read a whole dictionary file into memory.
pub fn load_dictionary<K, C, P>(path: P) -> Result<SortedArray<K, C>>
where
    K: DictKey,
    C: DictKey,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let f = File::open(path)
        .map_err(|e| DictError::io(format!("opening {}", path.display()), e))?;
    let len = f
        .metadata()
        .map_err(|e| DictError::io(format!("reading metadata of {}", path.display()), e))?
        .len();
    let array = read_bounded(BufReader::new(f), len.min(MAX_ITEM_BYTES))?;
    debug!(path = %path.display(), records = array.len(), "dictionary loaded");
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn vertex_array() -> SortedArray<u32, String> {
        let mut arr = SortedArray::allocate([3u32, 1]).unwrap();
        arr.record_occurrence(&1, "cat".to_string());
        arr.record_occurrence(&1, "cat".to_string());
        arr.record_occurrence(&3, "dog".to_string());
        arr
    }

    fn to_bytes(arr: &SortedArray<u32, String>) -> Vec<u8> {
        let mut buf = Vec::new();
        write_dictionary(&mut buf, arr).unwrap();
        buf
    }

    #[test]
    fn layout_is_count_prefixed_little_endian() {
        let mut arr: SortedArray<u32, String> = SortedArray::allocate([3u32]).unwrap();
        arr.record_occurrence(&3, "cat".to_string());
        let bytes = to_bytes(&arr);
        let mut expected = vec![1, 0, 0, 0, 3, 0, 0, 0, 1, 0, 0, 0];
        expected.extend_from_slice(&3u64.to_le_bytes());
        expected.extend_from_slice(b"cat");
        expected.extend_from_slice(&[1, 0, 0, 0]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn bytes_roundtrip() {
        let arr = vertex_array();
        let back: SortedArray<u32, String> = read_dictionary(Cursor::new(to_bytes(&arr))).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn declared_count_above_actual_is_format_error() {
        let mut bytes = to_bytes(&vertex_array());
        bytes[..4].copy_from_slice(&3u32.to_le_bytes());
        let err = read_dictionary::<u32, String, _>(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            DictError::RecordCountMismatch {
                declared: 3,
                found: 2
            }
        ));
        assert!(err.is_format_error());
    }

    #[test]
    fn declared_count_below_actual_is_format_error() {
        let mut bytes = to_bytes(&vertex_array());
        bytes[..4].copy_from_slice(&1u32.to_le_bytes());
        let err = read_dictionary::<u32, String, _>(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DictError::TrailingData { declared: 1 }));
    }

    #[test]
    fn cut_inside_record_is_read_error() {
        let mut bytes = to_bytes(&vertex_array());
        bytes.pop();
        let err = read_dictionary::<u32, String, _>(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DictError::Truncated("association")));
        assert!(err.is_read_error());

        let err = read_dictionary::<u32, String, _>(Cursor::new(vec![2, 0])).unwrap_err();
        assert!(matches!(err, DictError::Truncated("record count")));
    }

    #[test]
    fn unsorted_keys_are_rejected() {
        let mut bytes = Vec::new();
        encode(&mut bytes, &2u32, "t").unwrap();
        for key in [5u32, 4] {
            encode(&mut bytes, &key, "t").unwrap();
            encode(&mut bytes, &0u32, "t").unwrap();
        }
        let err = read_dictionary::<u32, String, _>(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DictError::Unsorted { index: 1 }));
    }

    #[test]
    fn invalid_utf8_term_is_format_error() {
        let mut bytes = Vec::new();
        encode(&mut bytes, &1u32, "t").unwrap();
        encode(&mut bytes, &2u64, "t").unwrap();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        encode(&mut bytes, &0u32, "t").unwrap();
        let err = read_dictionary::<String, u32, _>(Cursor::new(bytes)).unwrap_err();
        assert!(err.is_format_error(), "{:?}", err);
    }

    #[test]
    fn oversized_term_length_is_read_error() {
        let mut bytes = Vec::new();
        encode(&mut bytes, &1u32, "t").unwrap();
        encode(&mut bytes, &(1u64 << 62), "t").unwrap();
        bytes.extend_from_slice(b"cat");
        let err = read_dictionary::<String, u32, _>(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DictError::Truncated("record key")));
        assert!(err.is_read_error());
    }

    #[test]
    fn term_length_past_end_of_file_is_read_error() {
        // small enough for the item cap, larger than the whole file
        let mut bytes = Vec::new();
        encode(&mut bytes, &1u32, "t").unwrap();
        encode(&mut bytes, &3u32, "t").unwrap();
        encode(&mut bytes, &1u32, "t").unwrap();
        encode(&mut bytes, &100_000u64, "t").unwrap();
        bytes.extend_from_slice(b"cat");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("damaged.iwc");
        std::fs::write(&path, &bytes).unwrap();

        let err = load_dictionary::<u32, String, _>(&path).unwrap_err();
        assert!(matches!(err, DictError::Truncated("association")));
    }

    #[test]
    fn zero_declared_records_is_format_error() {
        let err = read_dictionary::<u32, String, _>(Cursor::new(vec![0, 0, 0, 0])).unwrap_err();
        assert!(matches!(err, DictError::NoRecords));
        assert!(err.is_format_error());
    }

    #[test]
    fn staged_file_stays_aside_until_committed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.iwc");
        std::fs::write(&path, b"previous").unwrap();
        stage_dictionary(&vertex_array(), &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");
        assert!(partial_path(&path).exists());

        commit_staged(&path).unwrap();
        assert!(!partial_path(&path).exists());
        let back: SortedArray<u32, String> = load_dictionary(&path).unwrap();
        assert_eq!(back, vertex_array());

        stage_dictionary(&vertex_array(), &path).unwrap();
        discard_staged(&path);
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn save_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("x.iwc");
        let arr = vertex_array();
        save_dictionary(&arr, &path).unwrap();
        assert!(!partial_path(&path).exists());
        let back: SortedArray<u32, String> = load_dictionary(&path).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dictionary::<u32, String, _>(dir.path().join("nope.iwc")).unwrap_err();
        assert!(err.is_read_error());
    }
}
