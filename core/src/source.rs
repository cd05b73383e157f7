//! Sources of raw (term, vertex) occurrence pairs.
//!
//! The build pipeline reads its source from the beginning twice per index,
//! so every [`PairSource`] states whether it can be replayed. A pass ends
//! when the iterator returns `None`; for [`PairFile`] that only happens at
//! the explicit end marker, and a file that stops short of it is reported as
//! truncated instead of being taken for a shorter stream.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bincode::Options;

use crate::codec::{options, MAX_ITEM_BYTES};
use crate::error::{DictError, Result};
use crate::Vertex;

const FRAME_END: u8 = 0;
const FRAME_PAIR: u8 = 1;

/// One occurrence as produced by the corpus reader, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawPair {
    pub term: String,
    pub vertex: Vertex,
}

impl RawPair {
    pub fn new<T: Into<String>>(term: T, vertex: Vertex) -> Self {
        Self {
            term: term.into(),
            vertex,
        }
    }
}

pub type PairIter<'a> = Box<dyn Iterator<Item = Result<RawPair>> + 'a>;

pub trait PairSource: Sync {
    /// Whether `pairs` may be called more than once, each time starting over.
    fn is_replayable(&self) -> bool {
        true
    }

    /// Human-readable name for logs and errors.
    fn describe(&self) -> String;

    /// Start a new sequential pass from the first pair.
    fn pairs(&self) -> Result<PairIter<'_>>;
}

/// Pairs held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPairs {
    pairs: Vec<RawPair>,
}

impl MemoryPairs {
    pub fn new(pairs: Vec<RawPair>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<T: Into<String>> FromIterator<(T, Vertex)> for MemoryPairs {
    fn from_iter<I: IntoIterator<Item = (T, Vertex)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(t, v)| RawPair::new(t, v)).collect())
    }
}

impl PairSource for MemoryPairs {
    fn describe(&self) -> String {
        format!("{} in-memory pairs", self.pairs.len())
    }

    fn pairs(&self) -> Result<PairIter<'_>> {
        Ok(Box::new(self.pairs.iter().cloned().map(Ok)))
    }
}

/// Binary pair stream: a sequence of pair frames closed by an end frame.
#[derive(Debug, Clone)]
pub struct PairFile {
    path: PathBuf,
}

impl PairFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PairSource for PairFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn pairs(&self) -> Result<PairIter<'_>> {
        let f = File::open(&self.path)
            .map_err(|e| DictError::io(format!("opening {}", self.path.display()), e))?;
        let len = f
            .metadata()
            .map_err(|e| DictError::io(format!("reading metadata of {}", self.path.display()), e))?
            .len();
        Ok(Box::new(FrameReader::new(BufReader::new(f), len.min(MAX_ITEM_BYTES))))
    }
}

struct FrameReader<R> {
    reader: R,
    /// Bytes one frame may claim; a longer term reads as truncation.
    limit: u64,
    read: u64,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    fn new(reader: R, limit: u64) -> Self {
        Self {
            reader,
            limit,
            read: 0,
            done: false,
        }
    }

    fn stream_error(&self, err: bincode::Error, what: &'static str) -> DictError {
        match DictError::decode(err, what) {
            DictError::Truncated(_) => DictError::SourceTruncated {
                pairs_read: self.read,
            },
            DictError::Encoding(msg) => DictError::SourceFormat(msg),
            other => other,
        }
    }

    fn next_pair(&mut self) -> Result<Option<RawPair>> {
        let tag: u8 = options()
            .with_limit(self.limit)
            .deserialize_from(&mut self.reader)
            .map_err(|e| self.stream_error(e, "frame tag"))?;
        match tag {
            FRAME_END => Ok(None),
            FRAME_PAIR => {
                let (term, vertex): (String, Vertex) = options()
                    .with_limit(self.limit)
                    .deserialize_from(&mut self.reader)
                    .map_err(|e| self.stream_error(e, "pair"))?;
                self.read += 1;
                Ok(Some(RawPair { term, vertex }))
            }
            other => Err(DictError::SourceFormat(format!(
                "unknown frame tag {} after {} pairs",
                other, self.read
            ))),
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<RawPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_pair() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Writes the stream [`PairFile`] reads. Call `finish` to append the end
/// marker; a writer dropped without it leaves a stream that reads as
/// truncated.
pub struct PairFileWriter<W: Write> {
    writer: W,
    written: u64,
}

impl PairFileWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| DictError::io(format!("creating {}", dir.display()), e))?;
        }
        let f = File::create(path)
            .map_err(|e| DictError::io(format!("creating {}", path.display()), e))?;
        Ok(Self::new(BufWriter::new(f)))
    }
}

impl<W: Write> PairFileWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn push(&mut self, term: &str, vertex: Vertex) -> Result<()> {
        options()
            .serialize_into(&mut self.writer, &FRAME_PAIR)
            .map_err(|e| DictError::encode(e, "frame tag"))?;
        options()
            .serialize_into(&mut self.writer, &(term, vertex))
            .map_err(|e| DictError::encode(e, "pair"))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append the end marker and flush.
    pub fn finish(mut self) -> Result<W> {
        options()
            .serialize_into(&mut self.writer, &FRAME_END)
            .map_err(|e| DictError::encode(e, "end marker"))?;
        self.writer
            .flush()
            .map_err(|e| DictError::io("flushing pair stream", e))?;
        Ok(self.writer)
    }
}

/// `term<TAB>vertex` lines. The term may itself contain spaces. Blank lines
/// are skipped, and so are lines starting with `#` that have no tab; a
/// tabbed line is always a pair, so `#hashtag<TAB>5` keeps its term.
#[derive(Debug, Clone)]
pub struct TsvPairs {
    path: PathBuf,
}

impl TsvPairs {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl PairSource for TsvPairs {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn pairs(&self) -> Result<PairIter<'_>> {
        let f = File::open(&self.path)
            .map_err(|e| DictError::io(format!("opening {}", self.path.display()), e))?;
        Ok(Box::new(TsvReader {
            lines: BufReader::new(f).lines(),
            line_no: 0,
            done: false,
        }))
    }
}

struct TsvReader<B> {
    lines: Lines<B>,
    line_no: usize,
    done: bool,
}

impl<B: BufRead> Iterator for TsvReader<B> {
    type Item = Result<RawPair>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let line = match self.lines.next()? {
                Ok(l) => l,
                Err(e) => {
                    self.done = true;
                    return Some(Err(DictError::io(format!("line {}", self.line_no + 1), e)));
                }
            };
            self.line_no += 1;
            match parse_tsv_line(&line) {
                Ok(Some(pair)) => return Some(Ok(pair)),
                Ok(None) => continue,
                Err(msg) => {
                    self.done = true;
                    return Some(Err(DictError::SourceFormat(format!(
                        "line {}: {}",
                        self.line_no, msg
                    ))));
                }
            }
        }
        None
    }
}

fn parse_tsv_line(line: &str) -> std::result::Result<Option<RawPair>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || (line.starts_with('#') && !line.contains('\t')) {
        return Ok(None);
    }
    let (term, vertex) = line
        .rsplit_once('\t')
        .ok_or_else(|| "expected term<TAB>vertex".to_string())?;
    let vertex = vertex
        .trim()
        .parse::<Vertex>()
        .map_err(|e| format!("bad vertex `{}`: {}", vertex, e))?;
    Ok(Some(RawPair::new(term, vertex)))
}

/// Wraps an iterator that can only be consumed once, such as stdin.
///
/// Reports itself as not replayable so the pipeline refuses it up front.
pub struct OneShotPairs<I> {
    label: String,
    inner: Mutex<Option<I>>,
}

impl<I> OneShotPairs<I> {
    pub fn new<L: Into<String>>(label: L, iter: I) -> Self {
        Self {
            label: label.into(),
            inner: Mutex::new(Some(iter)),
        }
    }
}

impl<I> PairSource for OneShotPairs<I>
where
    I: Iterator<Item = Result<RawPair>> + Send,
{
    fn is_replayable(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        self.label.clone()
    }

    fn pairs(&self) -> Result<PairIter<'_>> {
        let taken = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match taken {
            Some(iter) => Ok(Box::new(iter)),
            None => Err(DictError::NotReplayable(self.label.clone())),
        }
    }
}
