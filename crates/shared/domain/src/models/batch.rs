use super::comment::Comment;
use super::load::{Discriminant, LoadKey, LoadTarget};
use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Ordered keys handed to one bulk fetch.
///
/// The coalescer only ever builds uniform requests (one discriminant, unique
/// targets); storage re-checks the discriminant with [`BatchRequest::discriminant`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequest {
    keys: Vec<LoadKey>,
}

impl BatchRequest {
    #[must_use]
    pub const fn new(keys: Vec<LoadKey>) -> Self {
        Self { keys }
    }

    /// The shared discriminant, `None` for an empty request.
    ///
    /// # Errors
    /// [`QueryError::MixedBatch`] when keys disagree.
    pub fn discriminant(&self) -> Result<Option<Discriminant>, QueryError> {
        uniform_discriminant(&self.keys)
    }
}

impl Deref for BatchRequest {
    type Target = [LoadKey];

    fn deref(&self) -> &Self::Target {
        &self.keys
    }
}

impl From<Vec<LoadKey>> for BatchRequest {
    fn from(keys: Vec<LoadKey>) -> Self {
        Self::new(keys)
    }
}

/// Shared discriminant of `keys`, `None` when empty.
///
/// # Errors
/// [`QueryError::MixedBatch`] when keys disagree.
pub fn uniform_discriminant(keys: &[LoadKey]) -> Result<Option<Discriminant>, QueryError> {
    let mut iter = keys.iter().map(LoadKey::discriminant);
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    if iter.any(|d| d != first) {
        return Err(QueryError::MixedBatch { context: None });
    }
    Ok(Some(first))
}

/// All items of one key, newest first, at most `first + 1` long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentGroup {
    pub target: LoadTarget,
    pub items: Vec<Comment>,
}

/// Row layout produced by a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchRows {
    /// Groups already tagged with their target.
    Grouped(Vec<CommentGroup>),
    /// One ordered stream where every group is contiguous.
    Flat(Vec<Comment>),
}

impl BatchRows {
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::Grouped(groups) => groups.iter().map(|g| g.items.len()).sum(),
            Self::Flat(rows) => rows.len(),
        }
    }
}

/// A key that storage could not serve while the rest of the batch succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFailure {
    pub target: LoadTarget,
    pub reason: String,
}

/// Result of one bulk fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentBatch {
    pub rows: BatchRows,
    pub failures: Vec<KeyFailure>,
}

impl CommentBatch {
    #[must_use]
    pub const fn grouped(groups: Vec<CommentGroup>) -> Self {
        Self { rows: BatchRows::Grouped(groups), failures: Vec::new() }
    }

    #[must_use]
    pub const fn flat(rows: Vec<Comment>) -> Self {
        Self { rows: BatchRows::Flat(rows), failures: Vec::new() }
    }

    #[must_use]
    pub fn with_failure(mut self, target: LoadTarget, reason: impl Into<String>) -> Self {
        self.failures.push(KeyFailure { target, reason: reason.into() });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminant_of_uniform_and_mixed_requests() {
        assert_eq!(BatchRequest::default().discriminant(), Ok(None));

        let uniform = BatchRequest::new(vec![LoadKey::parent(1, 2), LoadKey::parent(2, 2)]);
        assert_eq!(uniform.discriminant(), Ok(Some(Discriminant::Parent)));

        let mixed = BatchRequest::new(vec![LoadKey::article(1, 2), LoadKey::parent(2, 2)]);
        assert!(matches!(mixed.discriminant(), Err(QueryError::MixedBatch { .. })));
    }
}
