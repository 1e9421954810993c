//! Serde model of a setup document
//!
//! ```yaml
//! composition: App
//! markers:
//!   - name: TTService
//!     constraints: [reference_type, { implements: IService }]
//! types:
//!   - name: Service
//!     implements: [IService]
//!     constructors:
//!       - parameters: [{ name: repo, type: IRepo }]
//! bindings:
//!   - contract: IService
//!     lifetime: singleton
//!     implementation: Service
//! roots:
//!   - name: Service
//!     contract: IService
//! ```

use crate::core::{StitchError, StitchResult};
use crate::graph::RootAccess;
use crate::metadata::{MemberKind, TypeKind};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use stitch_core::{Lifetime, SourceLocation, Tag};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Setup {
    /// Name of the generated composition
    pub composition: String,
    #[serde(default)]
    pub markers: Vec<MarkerDecl>,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub bindings: Vec<BindingDecl>,
    #[serde(default)]
    pub roots: Vec<RootDecl>,
}

impl Setup {
    pub fn load(path: &Path) -> StitchResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StitchError::Setup(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> StitchResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| StitchError::Setup(format!("Failed to parse setup document: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerDecl {
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<ConstraintDecl>,
}

/// `value_type`, `reference_type`, `default_constructor` or `{ implements: T }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConstraintDecl {
    Keyword(String),
    Implements { implements: String },
}

/// Integer, string (`"*"` is the wildcard) or `{ enum: Colors.Red }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagDecl {
    Int(i64),
    Text(String),
    Enum {
        #[serde(rename = "enum")]
        member: String,
    },
}

impl From<&TagDecl> for Tag {
    fn from(decl: &TagDecl) -> Self {
        match decl {
            TagDecl::Int(value) => Tag::Int(*value),
            TagDecl::Text(value) if value == "*" => Tag::Any,
            TagDecl::Text(value) => Tag::Text(value.clone()),
            TagDecl::Enum { member } => Tag::Enum(member.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub generic_params: Vec<String>,
    pub base: Option<String>,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub constructors: Vec<ConstructorDecl>,
    #[serde(default)]
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstructorDecl {
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default = "default_true")]
    pub public: bool,
    /// Explicitly selected for injection
    #[serde(default)]
    pub marked: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub tag: Option<TagDecl>,
    /// Contract to request instead of the declared type
    pub inject_as: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberDecl {
    pub name: String,
    pub kind: MemberKind,
    /// Property or field type
    #[serde(rename = "type")]
    pub ty: Option<String>,
    /// Method parameters
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    /// Members without an ordinal are not injected
    pub ordinal: Option<i32>,
    pub tag: Option<TagDecl>,
    pub inject_as: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingDecl {
    /// Shorthand for a single contract
    pub contract: Option<String>,
    #[serde(default)]
    pub contracts: Vec<String>,
    pub tag: Option<TagDecl>,
    #[serde(default)]
    pub lifetime: Lifetime,
    pub implementation: Option<String>,
    pub factory: Option<FactoryDecl>,
    pub arg: Option<String>,
    pub root: Option<String>,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryDecl {
    pub expression: String,
    #[serde(default)]
    pub injections: Vec<FactoryInjectionDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryInjectionDecl {
    pub name: String,
    pub contract: String,
    pub tag: Option<TagDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootDecl {
    pub name: String,
    pub contract: String,
    pub tag: Option<TagDecl>,
    #[serde(default)]
    pub access: RootAccess,
    pub location: Option<SourceLocation>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document() {
        let setup = Setup::from_yaml("composition: App\n").unwrap();
        assert_eq!(setup.composition, "App");
        assert!(setup.bindings.is_empty());
        assert!(setup.roots.is_empty());
    }

    #[test]
    fn test_tags() {
        let tags: Vec<TagDecl> = serde_yaml::from_str("[1, abc, '*', {enum: Colors.Red}]").unwrap();
        let tags: Vec<Tag> = tags.iter().map(Tag::from).collect();
        assert_eq!(
            tags,
            vec![
                Tag::Int(1),
                Tag::text("abc"),
                Tag::Any,
                Tag::Enum("Colors.Red".to_string())
            ]
        );
    }

    #[test]
    fn test_binding_defaults() {
        let setup = Setup::from_yaml(
            r#"
composition: App
bindings:
  - contract: IService
    implementation: Service
    location: { file: app.cs, line: 12 }
"#,
        )
        .unwrap();

        let binding = &setup.bindings[0];
        assert_eq!(binding.lifetime, Lifetime::Transient);
        assert_eq!(binding.location.as_ref().unwrap().line, 12);
        assert_eq!(binding.location.as_ref().unwrap().column, 0);
    }

    #[test]
    fn test_constraints() {
        let marker: MarkerDecl =
            serde_yaml::from_str("name: TTS\nconstraints: [value_type, {implements: IService}]").unwrap();
        assert_eq!(marker.constraints[0], ConstraintDecl::Keyword("value_type".to_string()));
        assert_eq!(
            marker.constraints[1],
            ConstraintDecl::Implements {
                implements: "IService".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = Setup::from_yaml("composition: App\nbindigs: []\n").unwrap_err();
        assert!(matches!(err, StitchError::Setup(_)));
    }
}
