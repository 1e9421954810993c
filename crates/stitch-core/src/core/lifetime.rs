use serde::{Deserialize, Serialize};
use std::fmt;

/// Sharing scope of an instance, from least to most shared
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Lifetime {
    /// New instance at every injection site
    #[default]
    Transient,
    /// One instance per emitted code block (root body, deferred thunk body)
    #[serde(alias = "perblock")]
    PerBlock,
    /// One instance per root-resolution call, shared across that call's subgraph
    #[serde(alias = "perresolve")]
    PerResolve,
    /// One instance per logical scope instance
    Scoped,
    /// One instance for the lifetime of the composition
    Singleton,
}

impl Lifetime {
    /// Sharing rank; a higher rank outlives a lower one
    pub fn rank(self) -> u8 {
        match self {
            Lifetime::Transient => 0,
            Lifetime::PerBlock => 1,
            Lifetime::PerResolve => 2,
            Lifetime::Scoped => 3,
            Lifetime::Singleton => 4,
        }
    }

    /// Singleton and Scoped instances live in persistent fields
    pub fn is_persistent(self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Transient => "Transient",
            Lifetime::PerBlock => "PerBlock",
            Lifetime::PerResolve => "PerResolve",
            Lifetime::Scoped => "Scoped",
            Lifetime::Singleton => "Singleton",
        };
        write!(f, "{}", name)
    }
}
