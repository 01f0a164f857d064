//! Choosing one active instance when several versions are installed.
//!
//! An app and its addons can each depend on a different release of the
//! import pipeline. They must agree on a single instance per project, and
//! the newest release wins. [`elect`] is the pure decision;
//! [`LeaderRegistry`] collects candidates and instantiates the winner once.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use semver::Version;
use tracing::debug;

use crate::error::PackageError;

/// Picks the candidate with the highest version.
///
/// Ties go to the earliest candidate. Returns `None` for an empty slice.
///
/// # Examples
///
/// ```
/// use aim_package::elect;
/// use semver::Version;
///
/// let versions = [
///     Version::new(2, 1, 0),
///     Version::new(2, 3, 0),
///     Version::new(2, 3, 0),
/// ];
/// assert_eq!(elect(&versions), Some(1));
/// ```
#[must_use]
pub fn elect(candidates: &[Version]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, version) in candidates.iter().enumerate() {
        match best {
            Some(current) if candidates[current] >= *version => {}
            _ => best = Some(index),
        }
    }
    best
}

type Factory<T> = Box<dyn FnOnce() -> T + Send>;

struct Candidate<T> {
    version: Version,
    factory: Factory<T>,
}

enum Slot<T> {
    Collecting(Vec<Candidate<T>>),
    Chosen { version: Version, leader: Arc<T> },
}

/// Per-project registry of competing instances.
///
/// # Examples
///
/// ```
/// use aim_package::LeaderRegistry;
/// use semver::Version;
///
/// let registry: LeaderRegistry<&'static str> = LeaderRegistry::new();
/// registry.register("/app", Version::new(2, 0, 0), || "old")?;
/// registry.register("/app", Version::new(2, 4, 1), || "new")?;
///
/// assert_eq!(*registry.leader("/app")?, "new");
/// // Late registrations are rejected once a leader exists.
/// assert!(registry.register("/app", Version::new(3, 0, 0), || "late").is_err());
/// # Ok::<(), aim_package::PackageError>(())
/// ```
pub struct LeaderRegistry<T> {
    slots: Mutex<IndexMap<String, Slot<T>>>,
}

impl<T> Default for LeaderRegistry<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(IndexMap::new()),
        }
    }
}

impl<T> LeaderRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a candidate for `project`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::LeaderAlreadyChosen`] if [`leader`](Self::leader)
    /// already ran for this project.
    pub fn register(
        &self,
        project: impl Into<String>,
        version: Version,
        factory: impl FnOnce() -> T + Send + 'static,
    ) -> Result<(), PackageError> {
        let project = project.into();
        let mut slots = self.slots.lock();
        let slot = slots
            .entry(project.clone())
            .or_insert_with(|| Slot::Collecting(Vec::new()));

        match slot {
            Slot::Collecting(candidates) => {
                debug!(project = %project, version = %version, "registered leader candidate");
                candidates.push(Candidate {
                    version,
                    factory: Box::new(factory),
                });
                Ok(())
            }
            Slot::Chosen { .. } => Err(PackageError::LeaderAlreadyChosen { project, version }),
        }
    }

    /// Returns the project's leader, instantiating it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::NoCandidates`] if nothing registered for
    /// `project`.
    pub fn leader(&self, project: &str) -> Result<Arc<T>, PackageError> {
        let mut slots = self.slots.lock();
        let slot = slots
            .get_mut(project)
            .ok_or_else(|| PackageError::NoCandidates(project.to_owned()))?;

        let candidates = match slot {
            Slot::Chosen { leader, .. } => return Ok(Arc::clone(leader)),
            Slot::Collecting(candidates) => std::mem::take(candidates),
        };

        let versions: Vec<Version> = candidates.iter().map(|c| c.version.clone()).collect();
        let winner = elect(&versions).ok_or_else(|| PackageError::NoCandidates(project.to_owned()))?;
        let Some(chosen) = candidates.into_iter().nth(winner) else {
            return Err(PackageError::NoCandidates(project.to_owned()));
        };

        debug!(project, version = %chosen.version, "elected leader");
        let leader = Arc::new((chosen.factory)());
        *slot = Slot::Chosen {
            version: chosen.version,
            leader: Arc::clone(&leader),
        };
        Ok(leader)
    }

    /// The winning version, if a leader has been chosen.
    pub fn leader_version(&self, project: &str) -> Option<Version> {
        match self.slots.lock().get(project)? {
            Slot::Chosen { version, .. } => Some(version.clone()),
            Slot::Collecting(_) => None,
        }
    }
}

impl<T> std::fmt::Debug for LeaderRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("LeaderRegistry")
            .field("projects", &slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_elect_empty() {
        assert_eq!(elect(&[]), None);
    }

    #[test]
    fn test_elect_highest_wins() {
        let versions = [
            Version::new(1, 0, 0),
            Version::parse("2.0.0-beta.1").unwrap(),
            Version::new(1, 9, 0),
        ];
        assert_eq!(elect(&versions), Some(1));
    }

    #[test]
    fn test_elect_tie_goes_to_earliest() {
        let versions = [Version::new(1, 0, 0), Version::new(1, 0, 0)];
        assert_eq!(elect(&versions), Some(0));
    }

    #[test]
    fn test_leader_instantiated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = LeaderRegistry::new();
        let counter = Arc::clone(&calls);
        registry
            .register("p", Version::new(1, 0, 0), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                42
            })
            .unwrap();

        assert_eq!(*registry.leader("p").unwrap(), 42);
        assert_eq!(*registry.leader("p").unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.leader_version("p"), Some(Version::new(1, 0, 0)));
    }

    #[test]
    fn test_projects_are_independent() {
        let registry = LeaderRegistry::new();
        registry.register("a", Version::new(1, 0, 0), || "a1").unwrap();
        registry.register("b", Version::new(3, 0, 0), || "b3").unwrap();
        assert_eq!(*registry.leader("a").unwrap(), "a1");
        assert_eq!(*registry.leader("b").unwrap(), "b3");
    }

    #[test]
    fn test_leader_without_candidates() {
        let registry: LeaderRegistry<()> = LeaderRegistry::new();
        assert!(matches!(
            registry.leader("nobody"),
            Err(PackageError::NoCandidates(_))
        ));
    }
}
