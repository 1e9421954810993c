use super::document::{
    BindingDecl, ConstraintDecl, MemberDecl, ParameterDecl, RootDecl, Setup, TagDecl, TypeDecl,
};
use crate::core::{StitchError, StitchResult};
use crate::graph::RootRequest;
use crate::metadata::{
    ConstructorInfo, InMemoryMetadata, InjectionMetadata, MemberInfo, MemberKind, ParameterInfo,
    SiteRef, TypeInfo,
};
use crate::registry::{Binding, BindingRegistry, Factory, FactoryInjection, Producer};
use crate::unify::{Constraint, MarkerSet};
use std::collections::HashSet;
use stitch_core::{DiagnosticSink, Injection, Tag, TypeRef};
use tracing::{debug, info};

/// A setup document turned into the inputs of a generator pass
#[derive(Debug)]
pub struct CompiledSetup {
    pub composition: String,
    pub registry: BindingRegistry,
    pub roots: Vec<RootRequest>,
    pub metadata: InMemoryMetadata,
}

impl Setup {
    /// Parse every type expression, build the metadata model and register
    /// the bindings in declaration order
    ///
    /// Shadowed bindings are reported to `sink`. Malformed declarations are
    /// errors.
    pub fn compile(&self, sink: &mut dyn DiagnosticSink) -> StitchResult<CompiledSetup> {
        info!(
            "Compiling setup '{}': {} type(s), {} binding(s), {} root(s)",
            self.composition,
            self.types.len(),
            self.bindings.len(),
            self.roots.len()
        );

        let markers = self.marker_set()?;
        let is_marker = |name: &str| markers.is_marker(name);

        let mut metadata = InMemoryMetadata::new();
        let mut seen = HashSet::new();
        for decl in &self.types {
            if !seen.insert(decl.name.as_str()) {
                return Err(StitchError::Setup(format!("Type '{}' is declared more than once", decl.name)));
            }
            add_type(&mut metadata, decl)?;
        }

        let mut registry = BindingRegistry::with_markers(markers.clone());
        for (index, decl) in self.bindings.iter().enumerate() {
            let binding = compile_binding(index, decl, &is_marker)?;
            let id = registry.register(binding, sink);
            debug!("Registered binding #{}", id);
        }

        let roots = self
            .roots
            .iter()
            .map(|decl| compile_root(decl, &is_marker))
            .collect::<StitchResult<Vec<_>>>()?;

        Ok(CompiledSetup {
            composition: self.composition.clone(),
            registry,
            roots,
            metadata,
        })
    }

    fn marker_set(&self) -> StitchResult<MarkerSet> {
        let mut markers = MarkerSet::new();
        // Declare names first so constraints may mention other markers
        for decl in &self.markers {
            markers.declare(decl.name.clone(), Vec::new());
        }

        let names = markers.clone();
        for decl in &self.markers {
            let constraints = decl
                .constraints
                .iter()
                .map(|constraint| match constraint {
                    ConstraintDecl::Keyword(keyword) => match keyword.as_str() {
                        "value_type" => Ok(Constraint::ValueType),
                        "reference_type" => Ok(Constraint::ReferenceType),
                        "default_constructor" => Ok(Constraint::DefaultConstructor),
                        other => Err(StitchError::Setup(format!(
                            "Unknown constraint '{}' on marker '{}'",
                            other, decl.name
                        ))),
                    },
                    ConstraintDecl::Implements { implements } => {
                        parse_type(implements, &|name| names.is_marker(name), &decl.name)
                            .map(Constraint::Implements)
                    }
                })
                .collect::<StitchResult<Vec<_>>>()?;
            markers.declare(decl.name.clone(), constraints);
        }
        Ok(markers)
    }
}

fn parse_type(text: &str, is_marker: &dyn Fn(&str) -> bool, context: &str) -> StitchResult<TypeRef> {
    TypeRef::parse_with(text, is_marker)
        .map_err(|e| StitchError::Setup(format!("Invalid type '{}' in {}: {}", text, context, e)))
}

fn tag(decl: &Option<TagDecl>) -> Option<Tag> {
    decl.as_ref().map(Tag::from)
}

/// Site metadata for a declared tag or `inject_as`, if there is any
fn overrides(tag_decl: &Option<TagDecl>, inject_as: Option<TypeRef>) -> Option<InjectionMetadata> {
    let metadata = InjectionMetadata {
        tag: tag(tag_decl),
        ordinal: None,
        explicit_type: inject_as,
    };
    (metadata != InjectionMetadata::default()).then_some(metadata)
}

/// Add one type definition and its per-site overrides
fn add_type(metadata: &mut InMemoryMetadata, decl: &TypeDecl) -> StitchResult<()> {
    let params = &decl.generic_params;
    let is_param = |name: &str| params.iter().any(|p| p == name);
    let context = format!("type '{}'", decl.name);
    let ty = |text: &str| parse_type(text, &is_param, &context);

    let mut info = TypeInfo::new(decl.name.clone(), decl.kind);
    info.generic_params = params.clone();
    info.base = decl.base.as_deref().map(&ty).transpose()?;
    info.implements = decl.implements.iter().map(|t| ty(t)).collect::<StitchResult<_>>()?;

    let mut site_overrides: Vec<(SiteRef<'_>, InjectionMetadata)> = Vec::new();

    for (index, ctor) in decl.constructors.iter().enumerate() {
        info.constructors.push(ConstructorInfo {
            parameters: parameters(&ctor.parameters, &ty)?,
            public: ctor.public,
            marked: ctor.marked,
        });
        for param in &ctor.parameters {
            let inject_as = param.inject_as.as_deref().map(&ty).transpose()?;
            if let Some(found) = overrides(&param.tag, inject_as) {
                site_overrides.push((
                    SiteRef::ConstructorParameter {
                        owner: &decl.name,
                        constructor: index,
                        parameter: &param.name,
                    },
                    found,
                ));
            }
        }
    }

    for member in &decl.members {
        info.members.push(member_info(member, &ty)?);
        let inject_as = member.inject_as.as_deref().map(&ty).transpose()?;
        if let Some(found) = overrides(&member.tag, inject_as) {
            site_overrides.push((
                SiteRef::Member {
                    owner: &decl.name,
                    member: &member.name,
                },
                found,
            ));
        }
        for param in &member.parameters {
            let inject_as = param.inject_as.as_deref().map(&ty).transpose()?;
            if let Some(found) = overrides(&param.tag, inject_as) {
                site_overrides.push((
                    SiteRef::MethodParameter {
                        owner: &decl.name,
                        method: &member.name,
                        parameter: &param.name,
                    },
                    found,
                ));
            }
        }
    }

    for (site, found) in site_overrides {
        metadata.set_override(site, found);
    }
    metadata.insert_type(info);
    Ok(())
}

fn parameters(
    decls: &[ParameterDecl],
    ty: &dyn Fn(&str) -> StitchResult<TypeRef>,
) -> StitchResult<Vec<ParameterInfo>> {
    decls
        .iter()
        .map(|p| {
            Ok(ParameterInfo {
                name: p.name.clone(),
                ty: ty(&p.ty)?,
            })
        })
        .collect()
}

fn member_info(decl: &MemberDecl, ty: &dyn Fn(&str) -> StitchResult<TypeRef>) -> StitchResult<MemberInfo> {
    let member_ty = match (decl.kind, &decl.ty) {
        (MemberKind::Method, None) => None,
        (MemberKind::Method, Some(_)) => {
            return Err(StitchError::Setup(format!(
                "Method '{}' declares a type; list its parameters instead",
                decl.name
            )))
        }
        (_, Some(text)) => Some(ty(text)?),
        (_, None) => {
            return Err(StitchError::Setup(format!("Member '{}' has no type", decl.name)));
        }
    };

    Ok(MemberInfo {
        name: decl.name.clone(),
        kind: decl.kind,
        ty: member_ty,
        parameters: parameters(&decl.parameters, ty)?,
        ordinal: decl.ordinal,
    })
}

fn compile_binding(index: usize, decl: &BindingDecl, is_marker: &dyn Fn(&str) -> bool) -> StitchResult<Binding> {
    let context = format!("binding #{}", index);
    let ty = |text: &str| parse_type(text, is_marker, &context);

    let contracts = decl
        .contract
        .iter()
        .chain(decl.contracts.iter())
        .map(|c| ty(c))
        .collect::<StitchResult<Vec<_>>>()?;
    if contracts.is_empty() {
        return Err(StitchError::Setup(format!("{} declares no contract", context)));
    }

    let mut producers = Vec::new();
    if let Some(implementation) = &decl.implementation {
        producers.push(Producer::implementation(ty(implementation)?));
    }
    if let Some(factory) = &decl.factory {
        let injections = factory
            .injections
            .iter()
            .map(|i| {
                Ok(FactoryInjection {
                    name: i.name.clone(),
                    injection: Injection::new(ty(&i.contract)?, tag(&i.tag)),
                })
            })
            .collect::<StitchResult<Vec<_>>>()?;
        producers.push(Producer::Factory(Factory {
            expression: factory.expression.clone(),
            injections,
        }));
    }
    if let Some(name) = &decl.arg {
        producers.push(Producer::Arg { name: name.clone() });
    }
    if let Some(root) = &decl.root {
        producers.push(Producer::RootDelegate { root: root.clone() });
    }

    if producers.len() != 1 {
        return Err(StitchError::Setup(format!(
            "{} must declare exactly one of implementation, factory, arg, root",
            context
        )));
    }
    let producer = producers.remove(0);

    Ok(Binding::new(contracts, decl.lifetime, producer)
        .with_tag(tag(&decl.tag))
        .with_location(decl.location.clone()))
}

fn compile_root(decl: &RootDecl, is_marker: &dyn Fn(&str) -> bool) -> StitchResult<RootRequest> {
    let contract = parse_type(&decl.contract, is_marker, &format!("root '{}'", decl.name))?;
    let mut request = RootRequest::new(decl.name.clone(), Injection::new(contract, tag(&decl.tag)));
    request.access = decl.access;
    request.location = decl.location.clone();
    Ok(request)
}
