use crate::di::MetadataProvider;
use std::collections::HashSet;
use stitch_core::{Substitution, TypeRef};

/// Unify `pattern` (which may contain markers) against `concrete`,
/// extending `substitution`.
///
/// Returns false when the shapes differ or a marker would be bound to two
/// different types. On failure `substitution` may hold partial bindings;
/// use [`unify_fresh`] when that matters.
pub fn unify(pattern: &TypeRef, concrete: &TypeRef, substitution: &mut Substitution) -> bool {
    match (pattern, concrete) {
        (TypeRef::Marker(name), _) => match substitution.get(name) {
            Some(bound) => bound == concrete,
            None => {
                substitution.insert(name.clone(), concrete.clone());
                true
            }
        },
        (
            TypeRef::Named { name, args },
            TypeRef::Named {
                name: concrete_name,
                args: concrete_args,
            },
        ) => {
            name == concrete_name
                && args.len() == concrete_args.len()
                && args
                    .iter()
                    .zip(concrete_args)
                    .all(|(p, c)| unify(p, c, substitution))
        }
        (TypeRef::Array(element), TypeRef::Array(concrete_element)) => {
            unify(element, concrete_element, substitution)
        }
        (TypeRef::Tuple(items), TypeRef::Tuple(concrete_items)) => {
            items.len() == concrete_items.len()
                && items
                    .iter()
                    .zip(concrete_items)
                    .all(|(p, c)| unify(p, c, substitution))
        }
        _ => false,
    }
}

/// Unify with an empty substitution, returning it on success
pub fn unify_fresh(pattern: &TypeRef, concrete: &TypeRef) -> Option<Substitution> {
    let mut substitution = Substitution::new();
    unify(pattern, concrete, &mut substitution).then_some(substitution)
}

/// Whether a value of type `ty` can be used where `target` is expected,
/// following base types and implemented interfaces
pub fn assignable(ty: &TypeRef, target: &TypeRef, metadata: &dyn MetadataProvider) -> bool {
    let mut visited = HashSet::new();
    assignable_inner(ty, target, metadata, &mut visited)
}

fn assignable_inner(
    ty: &TypeRef,
    target: &TypeRef,
    metadata: &dyn MetadataProvider,
    visited: &mut HashSet<TypeRef>,
) -> bool {
    if ty == target {
        return true;
    }
    if !visited.insert(ty.clone()) {
        return false;
    }

    let Some(name) = ty.name() else {
        return false;
    };
    let Some(info) = metadata.type_info(name) else {
        return false;
    };

    let substitution = info.substitution_for(ty);
    info.base
        .iter()
        .chain(info.implements.iter())
        .map(|parent| parent.substitute(&substitution))
        .any(|parent| assignable_inner(&parent, target, metadata, visited))
}
