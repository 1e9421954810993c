//! Language-neutral statements produced for a composition

use crate::graph::RootAccess;
use crate::metadata::MemberKind;
use crate::unify::{CollectionKind, DeferredKind};
use serde::Serialize;
use stitch_core::{Lifetime, TypeRef};

/// Assignable storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "var", content = "name")]
pub enum Var {
    Local(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "expr")]
pub enum Expr {
    /// Block-local variable or thunk parameter
    Local { name: String },
    Field { name: String },
    /// Composition argument
    Arg { name: String },
    Deferred(Thunk),
}

impl Expr {
    pub fn local(name: impl Into<String>) -> Self {
        Expr::Local { name: name.into() }
    }

    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field { name: name.into() }
    }
}

impl From<&Var> for Expr {
    fn from(var: &Var) -> Self {
        match var {
            Var::Local(name) => Expr::local(name.clone()),
            Var::Field(name) => Expr::field(name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "call")]
pub enum CallKind {
    Constructor,
    /// User expression with its injection names, in argument order
    Factory { expression: String, names: Vec<String> },
    Collection { kind: CollectionKind, element: TypeRef },
    Tuple,
    /// Delegates to another composition root
    Root { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    #[serde(flatten)]
    pub kind: CallKind,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// Inline body of a deferred-access wrapper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thunk {
    pub kind: DeferredKind,
    /// Lazy value created inside a persistent initializer
    pub thread_safe: bool,
    pub params: Vec<Param>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "op")]
pub enum Statement {
    DeclareField {
        name: String,
        #[serde(rename = "type")]
        ty: TypeRef,
        lifetime: Lifetime,
    },
    DeclareLocal {
        name: String,
        #[serde(rename = "type")]
        ty: TypeRef,
    },
    AssignFromCall {
        target: Var,
        call: Call,
    },
    /// Store a non-call value, such as a thunk captured by a cycle
    Assign {
        target: Var,
        value: Expr,
    },
    AssignMember {
        target: Var,
        member: String,
        kind: MemberKind,
        values: Vec<Expr>,
    },
    /// Run `body` once, when `target` is still unset. With `lock`, the check
    /// is repeated under the composition lock.
    EnsureInitialized {
        target: Var,
        lock: bool,
        body: Vec<Statement>,
    },
    Return {
        value: Expr,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootCode {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub access: RootAccess,
    pub body: Vec<Statement>,
}

/// Everything generated for one composition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionCode {
    pub composition: String,
    pub fields: Vec<Statement>,
    pub args: Vec<ArgDecl>,
    pub roots: Vec<RootCode>,
    /// blake3 of the canonical JSON of fields, args and roots
    pub fingerprint: String,
}

impl CompositionCode {
    pub fn root(&self, name: &str) -> Option<&RootCode> {
        self.roots.iter().find(|r| r.name == name)
    }
}

/// Visit every statement, thunk bodies and initializer bodies included
pub fn walk<'a>(statements: &'a [Statement], visit: &mut dyn FnMut(&'a Statement)) {
    for statement in statements {
        visit(statement);
        match statement {
            Statement::EnsureInitialized { body, .. } => walk(body, visit),
            Statement::AssignFromCall { call, .. } => {
                for arg in &call.args {
                    walk_expr(arg, visit);
                }
            }
            Statement::Assign { value, .. } | Statement::Return { value } => walk_expr(value, visit),
            Statement::AssignMember { values, .. } => {
                for value in values {
                    walk_expr(value, visit);
                }
            }
            Statement::DeclareField { .. } | Statement::DeclareLocal { .. } => {}
        }
    }
}

fn walk_expr<'a>(expr: &'a Expr, visit: &mut dyn FnMut(&'a Statement)) {
    if let Expr::Deferred(thunk) = expr {
        walk(&thunk.body, visit);
    }
}
