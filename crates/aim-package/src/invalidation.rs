//! Reload generations for cached `package.json` data.
//!
//! Every [`Package`](crate::Package) caches its manifest. When a manifest
//! changes on disk, the watcher bumps the shared [`InvalidationSource`]; each
//! package notices the new generation on its next access and re-reads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Owner of the shared reload generation.
///
/// Cloning is cheap and every clone bumps the same counter.
///
/// # Examples
///
/// ```
/// use aim_package::InvalidationSource;
///
/// let source = InvalidationSource::new();
/// let token = source.token();
/// let seen = token.generation();
///
/// source.bump();
/// assert_ne!(token.generation(), seen);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InvalidationSource {
    generation: Arc<AtomicU64>,
}

impl InvalidationSource {
    /// Creates a source at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a token observing this source.
    #[must_use]
    pub fn token(&self) -> InvalidationToken {
        InvalidationToken {
            generation: Arc::clone(&self.generation),
        }
    }

    /// Invalidates every cache holding a token, returning the new generation.
    pub fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Read-only view of an [`InvalidationSource`].
#[derive(Debug, Clone)]
pub struct InvalidationToken {
    generation: Arc<AtomicU64>,
}

impl InvalidationToken {
    /// The current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_is_shared_across_clones() {
        let source = InvalidationSource::new();
        let clone = source.clone();
        let token = source.token();

        assert_eq!(token.generation(), 0);
        clone.bump();
        assert_eq!(token.generation(), 1);
        assert_eq!(source.bump(), 2);
        assert_eq!(token.generation(), 2);
    }

    #[test]
    fn test_independent_sources() {
        let a = InvalidationSource::new();
        let b = InvalidationSource::new();
        let token = b.token();
        a.bump();
        assert_eq!(token.generation(), 0);
    }
}
