//! Classification of the source tree a file came from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of build tree a source file belongs to.
///
/// Bundle assignment keys off this: test trees feed the `tests` bundle and
/// everything else feeds `app`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TreeType {
    /// Application code.
    App,
    /// Addon runtime code.
    Addon,
    /// Addon stylesheets.
    AddonStyles,
    /// Addon templates.
    AddonTemplates,
    /// Helpers an addon ships for its consumers' tests.
    AddonTestSupport,
    /// Static public assets.
    Public,
    /// Application stylesheets.
    Styles,
    /// Application templates.
    Templates,
    /// Test code.
    Test,
    /// Vendored third-party code.
    Vendor,
}

impl TreeType {
    /// All tree types, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::App,
        Self::Addon,
        Self::AddonStyles,
        Self::AddonTemplates,
        Self::AddonTestSupport,
        Self::Public,
        Self::Styles,
        Self::Templates,
        Self::Test,
        Self::Vendor,
    ];

    /// The kebab-case name used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Addon => "addon",
            Self::AddonStyles => "addon-styles",
            Self::AddonTemplates => "addon-templates",
            Self::AddonTestSupport => "addon-test-support",
            Self::Public => "public",
            Self::Styles => "styles",
            Self::Templates => "templates",
            Self::Test => "test",
            Self::Vendor => "vendor",
        }
    }

    /// Whether files in this tree only run under test.
    #[inline]
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test | Self::AddonTestSupport)
    }
}

impl fmt::Display for TreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known tree type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tree type '{0}'")]
pub struct UnknownTreeType(pub String);

impl FromStr for TreeType {
    type Err = UnknownTreeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tree| tree.as_str() == s)
            .ok_or_else(|| UnknownTreeType(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_round_trips_all() {
        for tree in TreeType::ALL {
            assert_eq!(tree.as_str().parse::<TreeType>(), Ok(tree));
        }
    }

    #[test]
    fn test_from_str_unknown() {
        assert_eq!(
            "bogus".parse::<TreeType>(),
            Err(UnknownTreeType("bogus".to_owned()))
        );
    }

    #[test]
    fn test_is_test() {
        assert!(TreeType::Test.is_test());
        assert!(TreeType::AddonTestSupport.is_test());
        assert!(!TreeType::Addon.is_test());
        assert!(!TreeType::App.is_test());
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&TreeType::AddonTestSupport).unwrap();
        assert_eq!(json, "\"addon-test-support\"");
    }
}
