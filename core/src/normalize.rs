//! Term normalization applied before a raw term becomes a dictionary key.
//!
//! The build pipeline calls the normalizer once per raw term on every pass,
//! so an implementation must be deterministic: the same input has to yield
//! the same key during key discovery and during accumulation.

use unicode_normalization::UnicodeNormalization;

pub trait Normalizer: Sync {
    fn normalize(&self, raw: &str) -> String;
}

/// Leaves terms untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Normalizer for Identity {
    fn normalize(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// NFC-composes, trims and lowercases.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseFold;

impl Normalizer for CaseFold {
    fn normalize(&self, raw: &str) -> String {
        raw.nfc().collect::<String>().trim().to_lowercase()
    }
}

/// Adapts a plain function, e.g. an external stemmer.
pub struct FnNormalizer<F>(pub F);

impl<F> Normalizer for FnNormalizer<F>
where
    F: Fn(&str) -> String + Sync,
{
    fn normalize(&self, raw: &str) -> String {
        (self.0)(raw)
    }
}
