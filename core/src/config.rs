//! Build configuration: where the corpus slice lives and how to build it.
//!
//! Loaded from TOML:
//!
//! ```rust
//! use termmap_core::MappingConfig;
//!
//! let config = MappingConfig::from_toml_str(r#"
//!     base_dir = "/data"
//!     type = "enwiki"
//!     date = "20080103"
//!     graph = "titles"
//!     stem = true
//! "#).unwrap();
//! assert!(config.normalize);
//! assert!(config
//!     .term_dictionary_path()
//!     .ends_with("binary/enwiki/20080103/enwiki-20080103-titles-t.wic"));
//! ```
//!
//! or from the older one-directive-per-line format
//! (`<basedir>/data</basedir>`) through [`MappingConfig::from_directives`].
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DictError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Root for every other directory.
    pub base_dir: PathBuf,
    /// Raw corpus files, relative to `base_dir`.
    pub source_dir: PathBuf,
    /// Built dictionaries, relative to `base_dir`.
    pub binary_dir: PathBuf,
    /// Intermediate pair streams, relative to `base_dir`.
    pub temp_dir: PathBuf,

    /// Corpus kind, e.g. "enwiki" or "enwiktionary".
    #[serde(rename = "type")]
    pub corpus_type: String,
    /// Dump date of the corpus.
    pub date: String,
    /// Which graph the vertices come from.
    pub graph: String,

    /// Normalize terms before indexing.
    #[serde(alias = "stem")]
    pub normalize: bool,
    /// Build both dictionaries concurrently.
    pub parallel: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::new(),
            source_dir: PathBuf::from("source"),
            binary_dir: PathBuf::from("binary"),
            temp_dir: PathBuf::from("tmp"),
            corpus_type: String::new(),
            date: String::new(),
            graph: String::new(),
            normalize: false,
            parallel: false,
        }
    }
}

/// Tags recognized by `from_directives`.
const DIRECTIVES: &[&str] = &[
    "basedir",
    "sourcedir",
    "binarydir",
    "tempdir",
    "type",
    "date",
    "graph",
    "stem",
    "normalize",
    "parallel",
];

impl MappingConfig {
    /// Load from a file, TOML or directive lines (sniffed from the content).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DictError::io(format!("reading {}", path.display()), e))?;
        if content.trim_start().starts_with('<') {
            Self::from_directives(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DictError::io(format!("reading {}", path.display()), e))?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?)
            .map_err(|e| DictError::io(format!("writing {}", path.display()), e))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DictError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DictError::Config(e.to_string()))
    }

    /// Parse `<tag>value</tag>` lines. Lines without a known tag are ignored;
    /// a known tag without its closing tag is an error. Booleans are true
    /// only for the literal `true`.
    pub fn from_directives(content: &str) -> Result<Self> {
        let mut config = Self::default();
        for (n, line) in content.lines().enumerate() {
            let Some(tag) = DIRECTIVES
                .iter()
                .find(|t| line.contains(&format!("<{}>", t)))
            else {
                continue;
            };
            let open = format!("<{}>", tag);
            let close = format!("</{}>", tag);
            let start = line.find(&open).map(|i| i + open.len()).unwrap_or(0);
            let end = line[start..]
                .find(&close)
                .map(|i| start + i)
                .ok_or_else(|| DictError::Config(format!("line {}: missing {}", n + 1, close)))?;
            let value = line[start..end].trim();
            match *tag {
                "basedir" => config.base_dir = PathBuf::from(value),
                "sourcedir" => config.source_dir = PathBuf::from(value),
                "binarydir" => config.binary_dir = PathBuf::from(value),
                "tempdir" => config.temp_dir = PathBuf::from(value),
                "type" => config.corpus_type = value.to_string(),
                "date" => config.date = value.to_string(),
                "graph" => config.graph = value.to_string(),
                "stem" | "normalize" => config.normalize = value == "true",
                "parallel" => config.parallel = value == "true",
                _ => {}
            }
        }
        Ok(config)
    }

    /// Check that the directives needed to derive file names are present.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("basedir", self.base_dir.as_os_str().is_empty()),
            ("type", self.corpus_type.is_empty()),
            ("date", self.date.is_empty()),
            ("graph", self.graph.is_empty()),
        ];
        let missing: Vec<&str> = missing
            .iter()
            .filter(|(_, empty)| *empty)
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DictError::Config(format!("missing {}", missing.join(", "))))
        }
    }

    /// `<type>-<date>-<graph>`
    pub fn corpus_name(&self) -> String {
        format!("{}-{}-{}", self.corpus_type, self.date, self.graph)
    }

    pub fn source_path(&self) -> PathBuf {
        self.base_dir.join(&self.source_dir)
    }

    /// Pair stream the corpus reader leaves in the temporary directory.
    pub fn pair_stream_path(&self) -> PathBuf {
        self.base_dir
            .join(&self.temp_dir)
            .join(format!("{}.titlewordmap", self.corpus_name()))
    }

    /// `<base>/<binary>/<type>/<date>`
    pub fn dictionary_dir(&self) -> PathBuf {
        self.base_dir
            .join(&self.binary_dir)
            .join(&self.corpus_type)
            .join(&self.date)
    }

    fn dictionary_path(&self, extension: &str) -> PathBuf {
        let flag = if self.normalize { 't' } else { 'f' };
        self.dictionary_dir()
            .join(format!("{}-{}.{}", self.corpus_name(), flag, extension))
    }

    pub fn term_dictionary_path(&self) -> PathBuf {
        self.dictionary_path("wic")
    }

    pub fn vertex_dictionary_path(&self) -> PathBuf {
        self.dictionary_path("iwc")
    }
}
