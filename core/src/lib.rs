//! termmap-core
//!
//! Builds and queries a pair of disk-resident dictionaries, term -> vertices
//! and vertex -> terms, from a stream of (term, vertex) occurrence pairs.
//!
//! Each dictionary is a sorted array of records built in two passes over a
//! replayable source: the first pass discovers the distinct keys, the second
//! counts every counterpart seen with each key. The sorted array is written
//! in a count-prefixed binary format and loaded back whole for O(log n)
//! lookups.
//!
//! Public API:
//! - `SortedArray` / `Record` / `Association` - the sorted keyed collection
//! - `PairSource` and its implementations - where occurrences come from
//! - `Normalizer` - how raw terms become keys
//! - `MappingBuilder` / `IndexBuild` - the build pipeline
//! - `TermMapping` / `VertexMapping` - lookups over loaded dictionaries
//! - `MappingConfig` - directories, corpus naming and build flags
//!
//! ```rust
//! use termmap_core::{CaseFold, MappingBuilder, MemoryPairs};
//!
//! let pairs: MemoryPairs = vec![("Cat", 1), ("cat", 1), ("Dog", 2), ("cat", 3)]
//!     .into_iter()
//!     .collect();
//! let built = MappingBuilder::new().with_normalizer(CaseFold).build(&pairs).unwrap();
//! let (terms, vertices) = built.into_mappings();
//! assert_eq!(terms.count("cat", &1), 2);
//! assert_eq!(vertices.count(&3, &"cat".to_string()), 1);
//! assert!(terms.lookup("eel").is_none());
//! ```

/// A normalized term.
pub type Term = String;

/// Surrogate id of a corpus concept.
pub type Vertex = u32;

pub mod error;
pub use error::{DictError, Result};

pub mod record;
pub use record::{Association, Record};

pub mod sorted_array;
pub use sorted_array::{DictKey, SortedArray};

pub mod normalize;
pub use normalize::{CaseFold, FnNormalizer, Identity, Normalizer};

pub mod source;
pub use source::{
    MemoryPairs, OneShotPairs, PairFile, PairFileWriter, PairIter, PairSource, RawPair, TsvPairs,
};

pub mod codec;
pub use codec::{load_dictionary, read_dictionary, save_dictionary, write_dictionary};

pub mod builder;
pub use builder::{
    BuildReport, BuildSummary, BuiltIndex, DualIndex, IndexBuild, IndexSide, MappingBuilder,
    TermKeyed, VertexKeyed,
};

pub mod mapping;
pub use mapping::{Mapping, TermMapping, TermVertexCount, VertexMapping};

pub mod config;
pub use config::MappingConfig;
