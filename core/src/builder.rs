//! Dictionary build pipeline.
//!
//! One generic build, [`IndexBuild`], runs per index side:
//!
//! 1. discover: one full pass over the source collecting the distinct keys
//! 2. allocate: one empty record per key, sorted
//! 3. accumulate: a second full pass recording every counterpart on the
//!    record found by binary search
//!
//! and [`MappingBuilder`] runs it for both sides ([`TermKeyed`] and
//! [`VertexKeyed`]) over the same source, then persists the results.
//!
//! Peak memory is bounded by the distinct keys and their association lists;
//! the pair stream itself is never held in memory.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use ahash::AHashSet;
use tracing::{info, warn};

use crate::codec::{commit_staged, discard_staged, stage_dictionary};
use crate::config::MappingConfig;
use crate::error::{DictError, Result};
use crate::mapping::{TermMapping, VertexMapping};
use crate::normalize::{CaseFold, Identity, Normalizer};
use crate::sorted_array::{DictKey, SortedArray};
use crate::source::{PairSource, RawPair};
use crate::{Term, Vertex};

/// Which half of a raw pair keys the index, and which half is recorded.
pub trait IndexSide {
    type Key: DictKey;
    type Counterpart: DictKey;

    const NAME: &'static str;

    /// Key for `pair`; only normalizes when the key is the term.
    fn key(pair: &RawPair, normalizer: &dyn Normalizer) -> Self::Key;

    /// Key and counterpart for `pair`, term normalized on either side.
    fn split(pair: RawPair, normalizer: &dyn Normalizer) -> (Self::Key, Self::Counterpart);
}

/// Term -> vertices (`.wic`).
#[derive(Debug, Clone, Copy)]
pub enum TermKeyed {}

/// Vertex -> terms (`.iwc`).
#[derive(Debug, Clone, Copy)]
pub enum VertexKeyed {}

impl IndexSide for TermKeyed {
    type Key = Term;
    type Counterpart = Vertex;

    const NAME: &'static str = "term";

    fn key(pair: &RawPair, normalizer: &dyn Normalizer) -> Term {
        normalizer.normalize(&pair.term)
    }

    fn split(pair: RawPair, normalizer: &dyn Normalizer) -> (Term, Vertex) {
        (normalizer.normalize(&pair.term), pair.vertex)
    }
}

impl IndexSide for VertexKeyed {
    type Key = Vertex;
    type Counterpart = Term;

    const NAME: &'static str = "vertex";

    fn key(pair: &RawPair, _normalizer: &dyn Normalizer) -> Vertex {
        pair.vertex
    }

    fn split(pair: RawPair, normalizer: &dyn Normalizer) -> (Vertex, Term) {
        (pair.vertex, normalizer.normalize(&pair.term))
    }
}

/// Counters collected while building one index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub side: &'static str,
    /// Pairs read while discovering keys.
    pub pairs_discovered: u64,
    pub distinct_keys: usize,
    /// Pairs read while accumulating.
    pub pairs_accumulated: u64,
    pub recorded: u64,
    /// Occurrences whose key was not found among the discovered keys.
    pub dropped: u64,
}

impl BuildReport {
    fn new(side: &'static str) -> Self {
        Self {
            side,
            ..Self::default()
        }
    }

    /// Both passes saw the same stream and every occurrence landed.
    pub fn is_consistent(&self) -> bool {
        self.dropped == 0 && self.pairs_discovered == self.pairs_accumulated
    }
}

/// A finished, not yet persisted index.
#[derive(Debug, Clone)]
pub struct BuiltIndex<S: IndexSide> {
    pub array: SortedArray<S::Key, S::Counterpart>,
    pub report: BuildReport,
}

/// Three-phase build of one index side over a replayable source.
pub struct IndexBuild<'a, S> {
    source: &'a dyn PairSource,
    normalizer: &'a dyn Normalizer,
    _side: PhantomData<fn() -> S>,
}

impl<'a, S: IndexSide> IndexBuild<'a, S> {
    /// Fails with `NotReplayable` before any pass if the source can only be
    /// read once.
    pub fn new(source: &'a dyn PairSource, normalizer: &'a dyn Normalizer) -> Result<Self> {
        if !source.is_replayable() {
            return Err(DictError::NotReplayable(source.describe()));
        }
        Ok(Self {
            source,
            normalizer,
            _side: PhantomData,
        })
    }

    pub fn discover_keys(&self, report: &mut BuildReport) -> Result<AHashSet<S::Key>> {
        let mut keys = AHashSet::new();
        for pair in self.source.pairs()? {
            let pair = pair?;
            keys.insert(S::key(&pair, self.normalizer));
            report.pairs_discovered += 1;
        }
        report.distinct_keys = keys.len();
        Ok(keys)
    }

    /// Sorted records for `keys`; consumes the key set.
    pub fn allocate(
        &self,
        keys: AHashSet<S::Key>,
    ) -> Result<SortedArray<S::Key, S::Counterpart>> {
        SortedArray::allocate(keys)
    }

    /// Replay the source and record every occurrence.
    ///
    /// A key the discovery pass never saw means the source or the
    /// normalizer changed between passes. The occurrence is dropped with a
    /// warning and counted in `report.dropped`; the pass keeps going.
    pub fn accumulate(
        &self,
        array: &mut SortedArray<S::Key, S::Counterpart>,
        report: &mut BuildReport,
    ) -> Result<()> {
        for pair in self.source.pairs()? {
            let (key, counterpart) = S::split(pair?, self.normalizer);
            report.pairs_accumulated += 1;
            if array.record_occurrence(&key, counterpart) {
                report.recorded += 1;
            } else {
                report.dropped += 1;
                warn!(
                    side = S::NAME,
                    key = ?key,
                    "key not among discovered keys, occurrence dropped"
                );
            }
        }
        Ok(())
    }

    pub fn run(&self) -> Result<BuiltIndex<S>> {
        let started = Instant::now();
        let mut report = BuildReport::new(S::NAME);

        info!(side = S::NAME, source = %self.source.describe(), "discovering keys");
        let keys = self.discover_keys(&mut report)?;
        info!(
            side = S::NAME,
            pairs = report.pairs_discovered,
            keys = report.distinct_keys,
            "allocating records"
        );
        let mut array = self.allocate(keys)?;

        info!(side = S::NAME, "accumulating occurrences");
        self.accumulate(&mut array, &mut report)?;

        if report.dropped > 0 {
            warn!(
                side = S::NAME,
                dropped = report.dropped,
                "occurrences dropped: source or normalizer not stable between passes"
            );
        }
        info!(
            side = S::NAME,
            records = array.len(),
            recorded = report.recorded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );
        Ok(BuiltIndex { array, report })
    }
}

/// Both indexes built from one source.
#[derive(Debug, Clone)]
pub struct DualIndex {
    pub term: BuiltIndex<TermKeyed>,
    pub vertex: BuiltIndex<VertexKeyed>,
}

impl DualIndex {
    pub fn into_mappings(self) -> (TermMapping, VertexMapping) {
        (
            TermMapping::from_array(self.term.array),
            VertexMapping::from_array(self.vertex.array),
        )
    }
}

/// Outcome of [`MappingBuilder::build_to`].
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub term: BuildReport,
    pub vertex: BuildReport,
    pub term_path: PathBuf,
    pub vertex_path: PathBuf,
}

impl BuildSummary {
    /// Dropped occurrences across both indexes.
    pub fn dropped(&self) -> u64 {
        self.term.dropped + self.vertex.dropped
    }
}

/// Builds the term-keyed and vertex-keyed dictionaries from one source.
pub struct MappingBuilder {
    normalizer: Box<dyn Normalizer>,
    parallel: bool,
}

impl Default for MappingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingBuilder {
    /// Identity normalization, sides built one after the other.
    pub fn new() -> Self {
        Self {
            normalizer: Box::new(Identity),
            parallel: false,
        }
    }

    /// `normalize` selects [`CaseFold`], `parallel` builds both sides at once.
    pub fn from_config(config: &MappingConfig) -> Self {
        let normalizer: Box<dyn Normalizer> = if config.normalize {
            Box::new(CaseFold)
        } else {
            Box::new(Identity)
        };
        Self {
            normalizer,
            parallel: config.parallel,
        }
    }

    pub fn with_normalizer<N: Normalizer + 'static>(mut self, normalizer: N) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn side<S: IndexSide>(&self, source: &dyn PairSource) -> Result<BuiltIndex<S>> {
        IndexBuild::<S>::new(source, self.normalizer.as_ref())?.run()
    }

    /// Build one side and leave it staged next to `path`.
    fn side_staged<S: IndexSide>(
        &self,
        source: &dyn PairSource,
        path: &Path,
    ) -> Result<BuildReport> {
        let built = self.side::<S>(source)?;
        stage_dictionary(&built.array, path)?;
        Ok(built.report)
    }

    /// Run `term` and `vertex`, on two threads when parallel.
    fn both<T, V>(
        &self,
        term: impl FnOnce() -> Result<T> + Send,
        vertex: impl FnOnce() -> Result<V> + Send,
    ) -> Result<(T, V)>
    where
        T: Send,
        V: Send,
    {
        if !self.parallel {
            let t = term()?;
            return Ok((t, vertex()?));
        }
        thread::scope(|s| {
            let handle = s.spawn(term);
            let v = vertex();
            let t = handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            Ok((t?, v?))
        })
    }

    /// Build both indexes in memory.
    pub fn build(&self, source: &dyn PairSource) -> Result<DualIndex> {
        if !source.is_replayable() {
            return Err(DictError::NotReplayable(source.describe()));
        }
        let (term, vertex) = self.both(
            || self.side::<TermKeyed>(source),
            || self.side::<VertexKeyed>(source),
        )?;
        Ok(DualIndex { term, vertex })
    }

    /// Build both indexes and write them to `term_path` / `vertex_path`.
    ///
    /// Each side is staged as `<path>.partial`; the two files replace the
    /// previous pair only after both sides are built, so a failed build
    /// never leaves a new dictionary next to a stale counterpart. When run
    /// sequentially the term index is staged and released before the vertex
    /// index is built.
    pub fn build_to<P, Q>(
        &self,
        source: &dyn PairSource,
        term_path: P,
        vertex_path: Q,
    ) -> Result<BuildSummary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        if !source.is_replayable() {
            return Err(DictError::NotReplayable(source.describe()));
        }
        let term_path = term_path.as_ref();
        let vertex_path = vertex_path.as_ref();
        let staged = self.both(
            || self.side_staged::<TermKeyed>(source, term_path),
            || self.side_staged::<VertexKeyed>(source, vertex_path),
        );
        let (term, vertex) = match staged {
            Ok(reports) => reports,
            Err(e) => {
                discard_staged(term_path);
                discard_staged(vertex_path);
                return Err(e);
            }
        };
        for path in [term_path, vertex_path] {
            if let Err(e) = commit_staged(path) {
                discard_staged(term_path);
                discard_staged(vertex_path);
                return Err(e);
            }
            info!(path = %path.display(), "dictionary persisted");
        }
        let summary = BuildSummary {
            term,
            vertex,
            term_path: term_path.to_path_buf(),
            vertex_path: vertex_path.to_path_buf(),
        };
        if summary.dropped() > 0 {
            warn!(dropped = summary.dropped(), "build finished with dropped occurrences");
        }
        Ok(summary)
    }

    /// Build into the dictionary paths `config` derives.
    pub fn build_configured(
        &self,
        source: &dyn PairSource,
        config: &MappingConfig,
    ) -> Result<BuildSummary> {
        config.validate()?;
        self.build_to(
            source,
            config.term_dictionary_path(),
            config.vertex_dictionary_path(),
        )
    }
}
