use crate::core::error::{StitchError, StitchResult};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Marker name → concrete type, produced by unification.
pub type Substitution = BTreeMap<String, TypeRef>;

/// Type descriptor used for contracts, implementations and injection sites.
///
/// Textual form:
/// - `Name` / `Name<A, B>`: named type, optionally generic
/// - `T[]`: array of `T`
/// - `(A, B)`: tuple
///
/// Open-generic placeholders are [`TypeRef::Marker`]. The parser never
/// produces markers on its own; callers decide which names are markers
/// through [`TypeRef::parse_with`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeRef {
    Named { name: String, args: Vec<TypeRef> },
    Array(Box<TypeRef>),
    Tuple(Vec<TypeRef>),
    Marker(String),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args,
        }
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn marker(name: impl Into<String>) -> Self {
        TypeRef::Marker(name.into())
    }

    /// Parse a type with no markers
    pub fn parse(s: &str) -> StitchResult<Self> {
        Self::parse_with(s, &|_| false)
    }

    /// Parse a type, turning every argument-less name accepted by `is_marker`
    /// into a [`TypeRef::Marker`].
    pub fn parse_with(s: &str, is_marker: &dyn Fn(&str) -> bool) -> StitchResult<Self> {
        let mut parser = Parser {
            input: s,
            chars: s.char_indices().collect(),
            pos: 0,
            is_marker,
        };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos < parser.chars.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }

    /// Name of a named type (`None` for arrays, tuples and markers)
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeRef::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Generic arguments of a named type
    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Named { args, .. } => args,
            _ => &[],
        }
    }

    /// True if any marker appears anywhere in the type
    pub fn is_open(&self) -> bool {
        match self {
            TypeRef::Marker(_) => true,
            TypeRef::Named { args, .. } => args.iter().any(TypeRef::is_open),
            TypeRef::Array(element) => element.is_open(),
            TypeRef::Tuple(items) => items.iter().any(TypeRef::is_open),
        }
    }

    /// Names of all markers, in order of first appearance
    pub fn markers(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_markers(&mut out);
        out
    }

    fn collect_markers(&self, out: &mut Vec<String>) {
        match self {
            TypeRef::Marker(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            TypeRef::Named { args, .. } => args.iter().for_each(|a| a.collect_markers(out)),
            TypeRef::Array(element) => element.collect_markers(out),
            TypeRef::Tuple(items) => items.iter().for_each(|i| i.collect_markers(out)),
        }
    }

    /// Replace bound markers. Unbound markers are left in place.
    pub fn substitute(&self, substitution: &Substitution) -> TypeRef {
        if substitution.is_empty() {
            return self.clone();
        }
        match self {
            TypeRef::Marker(name) => substitution
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeRef::Named { name, args } => TypeRef::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(substitution)).collect(),
            },
            TypeRef::Array(element) => TypeRef::Array(Box::new(element.substitute(substitution))),
            TypeRef::Tuple(items) => {
                TypeRef::Tuple(items.iter().map(|i| i.substitute(substitution)).collect())
            }
        }
    }

    /// Number of concrete (non-marker) nodes in the type tree.
    /// Higher means a more specific open-generic pattern.
    pub fn specificity(&self) -> usize {
        match self {
            TypeRef::Marker(_) => 0,
            TypeRef::Named { args, .. } => 1 + args.iter().map(TypeRef::specificity).sum::<usize>(),
            TypeRef::Array(element) => 1 + element.specificity(),
            TypeRef::Tuple(items) => 1 + items.iter().map(TypeRef::specificity).sum::<usize>(),
        }
    }

    /// Last path segment of the type name, used for naming variables
    ///
    /// `App.Services.IDependency` → `IDependency`, `Box<int>` → `Box`,
    /// `int[]` → `intArray`, `(A, B)` → `Tuple`.
    pub fn short_name(&self) -> String {
        match self {
            TypeRef::Named { name, .. } => name.rsplit('.').next().unwrap_or(name).to_string(),
            TypeRef::Array(element) => format!("{}Array", element.short_name()),
            TypeRef::Tuple(_) => "Tuple".to_string(),
            TypeRef::Marker(name) => name.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    write_list(f, args)?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeRef::Array(element) => write!(f, "{}[]", element),
            TypeRef::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            TypeRef::Marker(name) => write!(f, "{}", name),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeRef]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

// Snapshots and emitted fragments carry types in their textual form.
impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    is_marker: &'a dyn Fn(&str) -> bool,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, what: &str) -> StitchError {
        let offset = self
            .chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len());
        StitchError::TypeSyntax(format!(
            "{} at offset {} in '{}'",
            what, offset, self.input
        ))
    }

    fn expect(&mut self, expected: char) -> StitchResult<()> {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn parse_type(&mut self) -> StitchResult<TypeRef> {
        self.skip_ws();
        let mut ty = match self.peek() {
            Some('(') => {
                self.pos += 1;
                let items = self.parse_list(')')?;
                if items.len() < 2 {
                    return Err(self.error("tuple needs at least two elements"));
                }
                TypeRef::Tuple(items)
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_named()?,
            _ => return Err(self.error("expected a type")),
        };

        // Array suffixes: T[], T[][]
        loop {
            self.skip_ws();
            if self.peek() != Some('[') {
                break;
            }
            self.pos += 1;
            self.expect(']')?;
            ty = TypeRef::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_named(&mut self) -> StitchResult<TypeRef> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '.') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().map(|(_, c)| *c).collect();
        if name.ends_with('.') {
            return Err(self.error("type name cannot end with '.'"));
        }

        self.skip_ws();
        if self.peek() == Some('<') {
            self.pos += 1;
            let args = self.parse_list('>')?;
            return Ok(TypeRef::Named { name, args });
        }

        if (self.is_marker)(&name) {
            Ok(TypeRef::Marker(name))
        } else {
            Ok(TypeRef::Named {
                name,
                args: Vec::new(),
            })
        }
    }

    fn parse_list(&mut self, close: char) -> StitchResult<Vec<TypeRef>> {
        let mut items = vec![self.parse_type()?];
        loop {
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    items.push(self.parse_type()?);
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error(&format!("expected ',' or '{}'", close))),
            }
        }
    }
}
