use crate::metadata::MemberKind;
use serde::Serialize;
use std::fmt;
use stitch_core::{Injection, TypeRef};

/// Where in the requesting producer an injection is consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "site")]
pub enum SiteKind {
    Root { name: String },
    ConstructorParameter { name: String, position: usize },
    Property { name: String },
    Field { name: String },
    MethodParameter { method: String, name: String, position: usize },
    FactoryInjection { name: String },
    CollectionElement { index: usize },
    TupleElement { index: usize },
    DeferredValue,
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteKind::Root { name } => write!(f, "root '{}'", name),
            SiteKind::ConstructorParameter { name, .. } => write!(f, "parameter '{}'", name),
            SiteKind::Property { name } => write!(f, "property '{}'", name),
            SiteKind::Field { name } => write!(f, "field '{}'", name),
            SiteKind::MethodParameter { method, name, .. } => {
                write!(f, "parameter '{}' of method '{}'", name, method)
            }
            SiteKind::FactoryInjection { name } => write!(f, "factory injection '{}'", name),
            SiteKind::CollectionElement { index } => write!(f, "collection element #{}", index),
            SiteKind::TupleElement { index } => write!(f, "tuple item #{}", index),
            SiteKind::DeferredValue => write!(f, "deferred value"),
        }
    }
}

/// One value a producer needs
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionSite {
    pub kind: SiteKind,
    pub injection: Injection,
}

/// A property/field assignment or method call performed after construction
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInjection {
    pub name: String,
    pub kind: MemberKind,
    pub ordinal: i32,
    /// One site for properties and fields, one per parameter for methods
    pub sites: Vec<InjectionSite>,
}

/// Everything needed to construct one closed implementation type
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionPlan {
    pub ty: TypeRef,
    /// Index of the selected constructor among the declared ones
    pub constructor: usize,
    pub parameters: Vec<InjectionSite>,
    /// Sorted by `(ordinal, declaration order)`, base types first
    pub members: Vec<MemberInjection>,
}

impl InjectionPlan {
    /// All sites in injection order: constructor parameters, then members
    pub fn sites(&self) -> impl Iterator<Item = &InjectionSite> {
        self.parameters
            .iter()
            .chain(self.members.iter().flat_map(|m| m.sites.iter()))
    }
}
