use serde::Serialize;
use stitch_core::TypeRef;

/// Container shape synthesized for sequence-of-T requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKind {
    Array,
    Enumerable,
    ReadOnlyCollection,
    ReadOnlyList,
    Collection,
    List,
    ConcreteList,
    Set,
    HashSet,
    ImmutableArray,
}

impl CollectionKind {
    fn from_generic_name(name: &str) -> Option<Self> {
        let short = name.rsplit('.').next().unwrap_or(name);
        let kind = match short {
            "IEnumerable" => CollectionKind::Enumerable,
            "IReadOnlyCollection" => CollectionKind::ReadOnlyCollection,
            "IReadOnlyList" => CollectionKind::ReadOnlyList,
            "ICollection" => CollectionKind::Collection,
            "IList" => CollectionKind::List,
            "List" => CollectionKind::ConcreteList,
            "ISet" => CollectionKind::Set,
            "HashSet" => CollectionKind::HashSet,
            "ImmutableArray" => CollectionKind::ImmutableArray,
            _ => return None,
        };
        Some(kind)
    }
}

/// Deferred-access wrapper kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeferredKind {
    /// Factory: every call produces a value
    Func,
    /// Lazily evaluated single value, cached after first evaluation
    Lazy,
}

/// How a requested contract can be synthesized when no explicit binding exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractShape {
    Sequence {
        kind: CollectionKind,
        element: TypeRef,
    },
    Deferred {
        kind: DeferredKind,
        /// Parameters of a parameterized factory (`Func<A, B, T>`)
        args: Vec<TypeRef>,
        value: TypeRef,
    },
    Tuple(Vec<TypeRef>),
    Plain,
}

impl ContractShape {
    pub fn of(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::Array(element) => ContractShape::Sequence {
                kind: CollectionKind::Array,
                element: element.as_ref().clone(),
            },
            TypeRef::Tuple(items) => ContractShape::Tuple(items.clone()),
            TypeRef::Named { name, args } => Self::of_named(name, args),
            TypeRef::Marker(_) => ContractShape::Plain,
        }
    }

    fn of_named(name: &str, args: &[TypeRef]) -> Self {
        let short = name.rsplit('.').next().unwrap_or(name);
        match (short, args) {
            ("Lazy", [value]) => ContractShape::Deferred {
                kind: DeferredKind::Lazy,
                args: Vec::new(),
                value: value.clone(),
            },
            ("Func", [params @ .., value]) => ContractShape::Deferred {
                kind: DeferredKind::Func,
                args: params.to_vec(),
                value: value.clone(),
            },
            ("ValueTuple", items) if items.len() >= 2 => ContractShape::Tuple(items.to_vec()),
            (_, [element]) => match CollectionKind::from_generic_name(name) {
                Some(kind) => ContractShape::Sequence {
                    kind,
                    element: element.clone(),
                },
                None => ContractShape::Plain,
            },
            _ => ContractShape::Plain,
        }
    }
}
