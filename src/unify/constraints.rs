use super::unifier::assignable;
use crate::di::MetadataProvider;
use crate::metadata::TypeKind;
use std::collections::BTreeMap;
use std::fmt;
use stitch_core::{Substitution, TypeRef};

/// Markers available without declaration
pub const DEFAULT_MARKERS: [&str; 5] = ["TT", "TT1", "TT2", "TT3", "TT4"];

const VALUE_PRIMITIVES: [&str; 15] = [
    "bool", "byte", "sbyte", "char", "short", "ushort", "int", "uint", "long", "ulong", "float",
    "double", "decimal", "nint", "nuint",
];

/// Generic constraint attached to a marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The type is, derives from, or implements the given type.
    /// May mention other markers, which are substituted first.
    Implements(TypeRef),
    ValueType,
    ReferenceType,
    /// Has a public parameterless constructor
    DefaultConstructor,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Implements(ty) => write!(f, "implements {}", ty),
            Constraint::ValueType => write!(f, "value type"),
            Constraint::ReferenceType => write!(f, "reference type"),
            Constraint::DefaultConstructor => write!(f, "default constructor"),
        }
    }
}

/// Declared markers and their constraints
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSet {
    markers: BTreeMap<String, Vec<Constraint>>,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerSet {
    /// Marker set holding the unconstrained default markers
    pub fn new() -> Self {
        let markers = DEFAULT_MARKERS
            .iter()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();
        Self { markers }
    }

    /// Declare (or redeclare) a marker
    pub fn declare(&mut self, name: impl Into<String>, constraints: Vec<Constraint>) {
        self.markers.insert(name.into(), constraints);
    }

    pub fn is_marker(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    pub fn constraints(&self, name: &str) -> &[Constraint] {
        self.markers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check every bound marker against its constraints
    ///
    /// Returns a description of the first violated constraint.
    pub fn check(
        &self,
        substitution: &Substitution,
        metadata: &dyn MetadataProvider,
    ) -> Result<(), String> {
        for (marker, ty) in substitution {
            for constraint in self.constraints(marker) {
                if !satisfies(ty, constraint, substitution, metadata) {
                    return Err(format!(
                        "{} = {} does not satisfy constraint '{}'",
                        marker, ty, constraint
                    ));
                }
            }
        }
        Ok(())
    }
}

fn satisfies(
    ty: &TypeRef,
    constraint: &Constraint,
    substitution: &Substitution,
    metadata: &dyn MetadataProvider,
) -> bool {
    match constraint {
        Constraint::Implements(target) => {
            assignable(ty, &target.substitute(substitution), metadata)
        }
        Constraint::ValueType => is_value_type(ty, metadata),
        Constraint::ReferenceType => !is_value_type(ty, metadata),
        Constraint::DefaultConstructor => has_default_constructor(ty, metadata),
    }
}

/// Structs, value primitives and tuples are value types
pub fn is_value_type(ty: &TypeRef, metadata: &dyn MetadataProvider) -> bool {
    match ty {
        TypeRef::Tuple(_) => true,
        TypeRef::Named { name, .. } => {
            if VALUE_PRIMITIVES.contains(&name.as_str()) {
                return true;
            }
            metadata
                .type_info(name)
                .map(|info| info.kind == TypeKind::Struct)
                .unwrap_or(false)
        }
        TypeRef::Array(_) | TypeRef::Marker(_) => false,
    }
}

fn has_default_constructor(ty: &TypeRef, metadata: &dyn MetadataProvider) -> bool {
    if is_value_type(ty, metadata) {
        return true;
    }
    let Some(info) = ty.name().and_then(|name| metadata.type_info(name)) else {
        return false;
    };
    info.is_concrete()
        && info
            .effective_constructors()
            .iter()
            .any(|ctor| ctor.public && ctor.parameters.is_empty())
}
