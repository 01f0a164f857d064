//! Fast hash map aliases and content hashing.
//!
//! The Fx hash function comes from `rustc`. It is not DoS resistant, which is
//! fine here: every key is a path or specifier from the local project.

use std::hash::Hasher;

use rustc_hash::FxHasher;

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Hashes raw file contents for change detection.
///
/// Two snapshots of the same file compare equal exactly when their content
/// hashes do; the analyzer uses this to skip re-parsing files that were only
/// touched.
///
/// # Examples
///
/// ```
/// use aim_core::hash_bytes;
///
/// assert_eq!(hash_bytes(b"import 'a';"), hash_bytes(b"import 'a';"));
/// assert_ne!(hash_bytes(b"import 'a';"), hash_bytes(b"import 'b';"));
/// ```
#[inline]
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    // Mix in the length so that a prefix never collides with its extension.
    hasher.write_usize(bytes.len());
    hasher.finish()
}

/// Hashes a string, e.g. a project-relative path.
#[inline]
#[must_use]
pub fn hash_str(value: &str) -> u64 {
    hash_bytes(value.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes_is_stable() {
        assert_eq!(hash_bytes(b"abc"), hash_bytes(b"abc"));
    }

    #[test]
    fn test_hash_bytes_distinguishes_content() {
        assert_ne!(hash_bytes(b"abc"), hash_bytes(b"abd"));
        assert_ne!(hash_bytes(b""), hash_bytes(b"\0"));
    }

    #[test]
    fn test_hash_str_matches_bytes() {
        assert_eq!(hash_str("app/app.js"), hash_bytes(b"app/app.js"));
    }

    #[test]
    fn test_fx_map_alias() {
        let mut map: FxHashMap<&str, u32> = FxHashMap::default();
        map.insert("lodash", 1);
        assert_eq!(map.get("lodash"), Some(&1));
    }
}
