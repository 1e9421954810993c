use super::site::{InjectionPlan, InjectionSite, MemberInjection, SiteKind};
use crate::di::MetadataProvider;
use crate::metadata::{ConstructorInfo, MemberKind, SiteRef, TypeInfo};
use std::collections::HashSet;
use stitch_core::{Injection, Substitution, TypeRef};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    #[error("No suitable constructor for '{ty}': {reason}")]
    NoSuitableConstructor { ty: TypeRef, reason: String },
}

/// Reads constructors and members from the metadata model
pub struct SiteExtractor<'a> {
    metadata: &'a dyn MetadataProvider,
}

impl<'a> SiteExtractor<'a> {
    pub fn new(metadata: &'a dyn MetadataProvider) -> Self {
        Self { metadata }
    }

    /// Build the injection plan for a closed implementation type
    ///
    /// `resolvable` is only consulted to rank several public constructors;
    /// it should be a cheap, shallow check. A type unknown to the metadata
    /// model is treated as having a single parameterless constructor.
    pub fn extract(
        &self,
        ty: &TypeRef,
        resolvable: &dyn Fn(&Injection) -> bool,
    ) -> Result<InjectionPlan, ExtractError> {
        let Some(name) = ty.name() else {
            return Err(no_constructor(ty, "not a constructible type"));
        };

        let Some(info) = self.metadata.type_info(name) else {
            debug!("{} is not in the metadata model, using implicit constructor", ty);
            return Ok(InjectionPlan {
                ty: ty.clone(),
                constructor: 0,
                parameters: Vec::new(),
                members: Vec::new(),
            });
        };

        if !info.is_concrete() {
            return Err(no_constructor(ty, "the type cannot be instantiated"));
        }

        let substitution = info.substitution_for(ty);
        let constructors = info.effective_constructors();
        let constructor = self.select_constructor(ty, info, &constructors, &substitution, resolvable)?;
        let parameters = self.constructor_sites(info, constructor, &constructors[constructor], &substitution);
        let members = self.member_injections(ty, info);

        Ok(InjectionPlan {
            ty: ty.clone(),
            constructor,
            parameters,
            members,
        })
    }

    fn select_constructor(
        &self,
        ty: &TypeRef,
        info: &TypeInfo,
        constructors: &[ConstructorInfo],
        substitution: &Substitution,
        resolvable: &dyn Fn(&Injection) -> bool,
    ) -> Result<usize, ExtractError> {
        if let Some(marked) = constructors.iter().position(|c| c.marked) {
            return Ok(marked);
        }

        let public: Vec<usize> = (0..constructors.len())
            .filter(|&i| constructors[i].public)
            .collect();

        match public.as_slice() {
            [] => Err(no_constructor(ty, "no public constructor")),
            [single] => Ok(*single),
            _ => {
                // Most resolvable parameters wins, first declared on ties
                let mut best: Option<(usize, bool, usize)> = None;
                for &index in &public {
                    let sites = self.constructor_sites(info, index, &constructors[index], substitution);
                    let resolved = sites.iter().filter(|s| resolvable(&s.injection)).count();
                    let complete = resolved == sites.len();
                    let better = match best {
                        None => true,
                        Some((_, best_complete, best_resolved)) => {
                            (complete, resolved) > (best_complete, best_resolved)
                        }
                    };
                    if better {
                        best = Some((index, complete, resolved));
                    }
                }

                match best {
                    Some((index, true, _)) => Ok(index),
                    _ => Err(no_constructor(
                        ty,
                        "none of the public constructors has only resolvable parameters",
                    )),
                }
            }
        }
    }

    fn constructor_sites(
        &self,
        info: &TypeInfo,
        index: usize,
        constructor: &ConstructorInfo,
        substitution: &Substitution,
    ) -> Vec<InjectionSite> {
        constructor
            .parameters
            .iter()
            .enumerate()
            .map(|(position, parameter)| {
                let overrides = self.metadata.injection_metadata(&SiteRef::ConstructorParameter {
                    owner: &info.name,
                    constructor: index,
                    parameter: &parameter.name,
                });
                let contract = overrides
                    .explicit_type
                    .unwrap_or_else(|| parameter.ty.clone())
                    .substitute(substitution);
                InjectionSite {
                    kind: SiteKind::ConstructorParameter {
                        name: parameter.name.clone(),
                        position,
                    },
                    injection: Injection::new(contract, overrides.tag),
                }
            })
            .collect()
    }

    /// The type and its bases, base-most first, each with the substitution
    /// closing its generic parameters
    fn hierarchy(&self, ty: &TypeRef, info: &'a TypeInfo) -> Vec<(&'a TypeInfo, Substitution)> {
        let mut chain = vec![(info, info.substitution_for(ty))];
        let mut seen = HashSet::from([info.name.clone()]);

        loop {
            let Some((current, substitution)) = chain.last() else {
                break;
            };
            let Some(base) = current.base.as_ref().map(|b| b.substitute(substitution)) else {
                break;
            };
            let Some(base_info) = base.name().and_then(|n| self.metadata.type_info(n)) else {
                break;
            };
            if !seen.insert(base_info.name.clone()) {
                break;
            }
            chain.push((base_info, base_info.substitution_for(&base)));
        }

        chain.reverse();
        chain
    }

    fn member_injections(&self, ty: &TypeRef, info: &'a TypeInfo) -> Vec<MemberInjection> {
        let mut members = Vec::new();

        for (owner, substitution) in self.hierarchy(ty, info) {
            for member in &owner.members {
                let overrides = self.metadata.injection_metadata(&SiteRef::Member {
                    owner: &owner.name,
                    member: &member.name,
                });
                let Some(ordinal) = overrides.ordinal.or(member.ordinal) else {
                    continue;
                };

                let sites = match member.kind {
                    MemberKind::Property | MemberKind::Field => {
                        let Some(member_ty) = overrides.explicit_type.or_else(|| member.ty.clone())
                        else {
                            continue;
                        };
                        let name = member.name.clone();
                        let kind = if member.kind == MemberKind::Property {
                            SiteKind::Property { name }
                        } else {
                            SiteKind::Field { name }
                        };
                        vec![InjectionSite {
                            kind,
                            injection: Injection::new(member_ty.substitute(&substitution), overrides.tag),
                        }]
                    }
                    MemberKind::Method => member
                        .parameters
                        .iter()
                        .enumerate()
                        .map(|(position, parameter)| {
                            let site = self.metadata.injection_metadata(&SiteRef::MethodParameter {
                                owner: &owner.name,
                                method: &member.name,
                                parameter: &parameter.name,
                            });
                            let contract = site
                                .explicit_type
                                .unwrap_or_else(|| parameter.ty.clone())
                                .substitute(&substitution);
                            InjectionSite {
                                kind: SiteKind::MethodParameter {
                                    method: member.name.clone(),
                                    name: parameter.name.clone(),
                                    position,
                                },
                                injection: Injection::new(contract, site.tag),
                            }
                        })
                        .collect(),
                };

                members.push(MemberInjection {
                    name: member.name.clone(),
                    kind: member.kind,
                    ordinal,
                    sites,
                });
            }
        }

        // Stable: equal ordinals keep declaration order
        members.sort_by_key(|m| m.ordinal);
        members
    }
}

fn no_constructor(ty: &TypeRef, reason: &str) -> ExtractError {
    ExtractError::NoSuitableConstructor {
        ty: ty.clone(),
        reason: reason.to_string(),
    }
}
