use serde::{Deserialize, Serialize};
use stitch_core::{Substitution, Tag, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Struct,
    Interface,
    Abstract,
    /// Built-in scalar (int, string, ...); never auto-bound
    Primitive,
}

/// Description of one type definition
///
/// Member and parameter types refer to the definition's generic parameters
/// as [`TypeRef::Marker`]s named after the parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub name: String,
    pub generic_params: Vec<String>,
    pub kind: TypeKind,
    pub base: Option<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub constructors: Vec<ConstructorInfo>,
    pub members: Vec<MemberInfo>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            generic_params: Vec::new(),
            kind,
            base: None,
            implements: Vec::new(),
            constructors: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Classes and structs can be constructed directly
    pub fn is_concrete(&self) -> bool {
        matches!(self.kind, TypeKind::Class | TypeKind::Struct)
    }

    /// Map generic parameters to the arguments of a closed reference to this type
    ///
    /// Missing arguments leave the parameter unbound.
    pub fn substitution_for(&self, closed: &TypeRef) -> Substitution {
        self.generic_params
            .iter()
            .cloned()
            .zip(closed.args().iter().cloned())
            .collect()
    }

    /// Constructors, with an implicit public parameterless one for concrete
    /// types that declare none
    pub fn effective_constructors(&self) -> Vec<ConstructorInfo> {
        if self.constructors.is_empty() && self.is_concrete() {
            vec![ConstructorInfo::default_public()]
        } else {
            self.constructors.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorInfo {
    pub parameters: Vec<ParameterInfo>,
    pub public: bool,
    /// Explicitly selected for injection
    pub marked: bool,
}

impl ConstructorInfo {
    pub fn default_public() -> Self {
        Self {
            parameters: Vec::new(),
            public: true,
            marked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Property,
    Field,
    Method,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    /// Property/field type; `None` for methods
    pub ty: Option<TypeRef>,
    /// Method parameters; empty for properties and fields
    pub parameters: Vec<ParameterInfo>,
    /// Declared injection ordinal. Members without one are not injected
    /// unless an override supplies it.
    pub ordinal: Option<i32>,
}

/// Attribute-driven overrides for a single injection site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectionMetadata {
    pub tag: Option<Tag>,
    pub ordinal: Option<i32>,
    pub explicit_type: Option<TypeRef>,
}

/// Address of an injection site, as understood by the metadata provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteRef<'a> {
    ConstructorParameter {
        owner: &'a str,
        constructor: usize,
        parameter: &'a str,
    },
    Member {
        owner: &'a str,
        member: &'a str,
    },
    MethodParameter {
        owner: &'a str,
        method: &'a str,
        parameter: &'a str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_constructor() {
        let class = TypeInfo::new("Dependency", TypeKind::Class);
        assert_eq!(class.effective_constructors().len(), 1);
        assert!(class.effective_constructors()[0].public);

        let interface = TypeInfo::new("IDependency", TypeKind::Interface);
        assert!(interface.effective_constructors().is_empty());
    }

    #[test]
    fn test_substitution_for_closed_reference() {
        let mut info = TypeInfo::new("Box", TypeKind::Class);
        info.generic_params = vec!["T".to_string()];

        let closed = TypeRef::generic("Box", vec![TypeRef::named("int")]);
        let substitution = info.substitution_for(&closed);
        assert_eq!(substitution.get("T"), Some(&TypeRef::named("int")));
    }
}
