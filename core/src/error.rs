//! Error type shared by the build pipeline, the dictionary codec and the
//! lookup side.

use std::io;

use thiserror::Error;

pub type Result<T, E = DictError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DictError {
    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The pair stream ended without its end marker.
    #[error("pair stream truncated after {pairs_read} pairs")]
    SourceTruncated { pairs_read: u64 },

    #[error("malformed pair stream: {0}")]
    SourceFormat(String),

    /// The pipeline needs to read the source twice per index.
    #[error("pair source `{0}` cannot be replayed from the beginning")]
    NotReplayable(String),

    #[error("no keys discovered; refusing to build an empty dictionary")]
    EmptyDictionary,

    /// EOF inside the header or inside a record.
    #[error("dictionary truncated while reading {0}")]
    Truncated(&'static str),

    /// A persisted dictionary whose header declares zero records.
    #[error("dictionary declares no records")]
    NoRecords,

    #[error("dictionary declares {declared} records but only {found} are present")]
    RecordCountMismatch { declared: u32, found: u32 },

    #[error("dictionary has data past its {declared} declared records")]
    TrailingData { declared: u32 },

    #[error("dictionary keys are not strictly increasing at record {index}")]
    Unsorted { index: usize },

    #[error("{what} count {len} does not fit the u32 length prefix")]
    TooLarge { what: &'static str, len: usize },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DictError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        DictError::Io {
            context: context.into(),
            source,
        }
    }

    /// True when a persisted dictionary disagrees with its own layout.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DictError::NoRecords
                | DictError::RecordCountMismatch { .. }
                | DictError::TrailingData { .. }
                | DictError::Unsorted { .. }
                | DictError::Encoding(_)
        )
    }

    /// True when bytes could not be read at all (I/O failure or EOF mid-item).
    pub fn is_read_error(&self) -> bool {
        matches!(self, DictError::Io { .. } | DictError::Truncated(_))
    }

    /// Map a bincode failure while decoding `what`.
    pub(crate) fn decode(err: bincode::Error, what: &'static str) -> Self {
        match *err {
            bincode::ErrorKind::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                DictError::Truncated(what)
            }
            // a length prefix reaching past the readable bytes
            bincode::ErrorKind::SizeLimit => DictError::Truncated(what),
            bincode::ErrorKind::Io(e) => DictError::io(format!("reading {what}"), e),
            other => DictError::Encoding(format!("{what}: {other}")),
        }
    }

    pub(crate) fn encode(err: bincode::Error, what: &'static str) -> Self {
        match *err {
            bincode::ErrorKind::Io(e) => DictError::io(format!("writing {what}"), e),
            other => DictError::Encoding(format!("{what}: {other}")),
        }
    }
}
