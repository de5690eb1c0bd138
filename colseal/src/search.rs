//! Equality-search boundary.
//!
//! The engine hands the external query assembler exactly three things: a
//! validated column identifier, one `(key_id, tag)` pair per active key
//! version, and the caller's starting parameter offset. Dialect-specific SQL
//! text and placeholder syntax stay outside this crate.

use crate::blind_index::BlindIndexTag;
use crate::cipher::CipherVault;
use crate::error::Error;
use std::fmt;

/// Maximum accepted identifier length.
const MAX_IDENT_LEN: usize = 64;

/// A column identifier validated for safe interpolation into query text.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*`, at most 64 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIdent(String);

impl ColumnIdent {
    /// Validates `name` as a column identifier.
    ///
    /// # Panics
    ///
    /// Panics on an invalid identifier. Column names are hard-coded at call
    /// sites, never untrusted input, so a violation is a programming error a
    /// test run catches immediately.
    #[must_use]
    pub fn new(name: &str) -> Self {
        assert!(
            is_valid_ident(name),
            "invalid column identifier: {name:?} (want [A-Za-z_][A-Za-z0-9_]*, max {MAX_IDENT_LEN} bytes)"
        );
        Self(name.to_string())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_ident(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_IDENT_LEN {
        return false;
    }
    let mut chars = name.chars();
    let first = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    first && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Everything an external query assembler needs for one equality predicate.
#[derive(Debug, Clone)]
pub struct EqualityPredicate {
    column: ColumnIdent,
    tags: Vec<(String, BlindIndexTag)>,
    param_offset: usize,
}

impl EqualityPredicate {
    /// Returns the validated index-column identifier.
    #[must_use]
    pub fn column(&self) -> &ColumnIdent {
        &self.column
    }

    /// Returns `(key_id, tag)` pairs in sorted key-id order.
    #[must_use]
    pub fn tags(&self) -> &[(String, BlindIndexTag)] {
        &self.tags
    }

    /// Returns the caller-supplied starting parameter offset.
    #[must_use]
    pub const fn param_offset(&self) -> usize {
        self.param_offset
    }
}

impl CipherVault {
    /// Builds an equality predicate for `value` against `column`.
    ///
    /// Produces one tag per active key version so rows sealed under older
    /// keys remain findable during rotation. Apply any normalizer to `value`
    /// before calling, the same one used at write time.
    ///
    /// # Errors
    ///
    /// Returns `Error::UsedAfterTeardown` on a closed vault.
    pub fn equality_predicate(
        &self,
        column: &ColumnIdent,
        value: &[u8],
        param_offset: usize,
    ) -> Result<EqualityPredicate, Error> {
        let tags = self.blind_index_all(value)?;

        Ok(EqualityPredicate { column: column.clone(), tags, param_offset })
    }
}
