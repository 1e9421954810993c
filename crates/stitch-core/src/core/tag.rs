use serde::{Serialize, Serializer};
use std::fmt;

/// Secondary key distinguishing bindings of the same contract.
///
/// Tags are opaque: only equality matters. [`Tag::Any`] on a binding makes
/// it answer requests carrying any tag (or none).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Any,
    Text(String),
    Int(i64),
    /// Enum member, e.g. `Colors.Red`
    Enum(String),
}

impl Tag {
    pub fn text(value: impl Into<String>) -> Self {
        Tag::Text(value.into())
    }

    /// Whether a binding declared with `bound` answers a request for `requested`
    pub fn matches(bound: Option<&Tag>, requested: Option<&Tag>) -> bool {
        match (bound, requested) {
            (Some(Tag::Any), _) => true,
            (bound, requested) => bound == requested,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Any => write!(f, "*"),
            Tag::Text(value) => write!(f, "\"{}\"", value),
            Tag::Int(value) => write!(f, "{}", value),
            Tag::Enum(value) => write!(f, "{}", value),
        }
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
