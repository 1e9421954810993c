use super::model::{InjectionMetadata, SiteRef, TypeInfo};
use crate::di::MetadataProvider;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SiteKey {
    ConstructorParameter {
        owner: String,
        constructor: usize,
        parameter: String,
    },
    Member {
        owner: String,
        member: String,
    },
    MethodParameter {
        owner: String,
        method: String,
        parameter: String,
    },
}

impl From<&SiteRef<'_>> for SiteKey {
    fn from(site: &SiteRef<'_>) -> Self {
        match *site {
            SiteRef::ConstructorParameter {
                owner,
                constructor,
                parameter,
            } => SiteKey::ConstructorParameter {
                owner: owner.to_string(),
                constructor,
                parameter: parameter.to_string(),
            },
            SiteRef::Member { owner, member } => SiteKey::Member {
                owner: owner.to_string(),
                member: member.to_string(),
            },
            SiteRef::MethodParameter {
                owner,
                method,
                parameter,
            } => SiteKey::MethodParameter {
                owner: owner.to_string(),
                method: method.to_string(),
                parameter: parameter.to_string(),
            },
        }
    }
}

/// Metadata provider backed by plain maps
///
/// Built from a setup document, or directly in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadata {
    types: BTreeMap<String, TypeInfo>,
    overrides: HashMap<SiteKey, InjectionMetadata>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a type definition
    pub fn insert_type(&mut self, info: TypeInfo) -> &mut Self {
        self.types.insert(info.name.clone(), info);
        self
    }

    /// Attach attribute overrides to an injection site
    pub fn set_override(&mut self, site: SiteRef<'_>, metadata: InjectionMetadata) -> &mut Self {
        self.overrides.insert(SiteKey::from(&site), metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl MetadataProvider for InMemoryMetadata {
    fn type_info(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    fn injection_metadata(&self, site: &SiteRef<'_>) -> InjectionMetadata {
        self.overrides
            .get(&SiteKey::from(site))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TypeKind;
    use stitch_core::Tag;

    #[test]
    fn test_lookup_and_overrides() {
        let mut metadata = InMemoryMetadata::new();
        metadata.insert_type(TypeInfo::new("Service", TypeKind::Class));
        assert!(metadata.type_info("Service").is_some());
        assert!(metadata.type_info("Missing").is_none());

        let site = SiteRef::ConstructorParameter {
            owner: "Service",
            constructor: 0,
            parameter: "dep",
        };
        assert_eq!(metadata.injection_metadata(&site), InjectionMetadata::default());

        metadata.set_override(
            site,
            InjectionMetadata {
                tag: Some(Tag::text("abc")),
                ..Default::default()
            },
        );
        assert_eq!(
            metadata.injection_metadata(&site).tag,
            Some(Tag::text("abc"))
        );

        // Same parameter name on another constructor is a different site
        let other = SiteRef::ConstructorParameter {
            owner: "Service",
            constructor: 1,
            parameter: "dep",
        };
        assert_eq!(metadata.injection_metadata(&other).tag, None);
    }
}
