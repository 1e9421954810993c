use crate::core::tag::Tag;
use crate::core::types::{Substitution, TypeRef};
use serde::Serialize;
use std::fmt;

/// A requested contract: type plus optional tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Injection {
    pub contract: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
}

impl Injection {
    pub fn new(contract: TypeRef, tag: Option<Tag>) -> Self {
        Self { contract, tag }
    }

    pub fn untagged(contract: TypeRef) -> Self {
        Self { contract, tag: None }
    }

    pub fn substitute(&self, substitution: &Substitution) -> Self {
        Self {
            contract: self.contract.substitute(substitution),
            tag: self.tag.clone(),
        }
    }
}

impl fmt::Display for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}({})", self.contract, tag),
            None => write!(f, "{}", self.contract),
        }
    }
}
