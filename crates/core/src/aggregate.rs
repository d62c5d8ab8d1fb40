//! Aggregate root trait and optimistic concurrency expectations.

use crate::error::{AuthError, AuthResult};

/// Aggregate root marker + minimal interface.
///
/// Aggregates are loaded from a store, mutated in memory for the duration of
/// one request, and written back with the version they were loaded at.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Store version observed when the aggregate was loaded (0 = never persisted).
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (administrative overwrites, migrations, etc.).
    Any,
    /// The aggregate must not exist yet.
    New,
    /// Require the stored aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation for writing back an aggregate loaded at `version`.
    pub fn of(version: u64) -> Self {
        if version == 0 {
            ExpectedVersion::New
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    /// `actual` is `None` when nothing is stored yet.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Any, _) => true,
            (ExpectedVersion::New, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> AuthResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(AuthError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}
