//! Type-checking oracle contract.
//!
//! The extractor and encoder only talk to the analysed program through
//! [`TypeOracle`]. Queries never mutate the oracle; a fresh oracle is built for
//! every build.

use std::path::Path;
use std::rc::Rc;

use crate::error::OracleError;
use crate::program::{Expr, Keyword, LiteralExpr, Node, NodeId};

/// Result of an oracle query.
pub type OracleResult<T> = Result<T, OracleError>;

/// Namespace a name is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Types, interfaces and type-only imports
    Type,
    /// Functions, variables and value imports
    Value,
}

/// Type-parameter bindings in effect while resolving a declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env(Rc<Vec<(String, OracleType)>>);

impl Env {
    /// Environment binding the given names.
    pub fn new(bindings: Vec<(String, OracleType)>) -> Self {
        Self(Rc::new(bindings))
    }

    /// Type bound to `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&OracleType> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, ty)| ty)
    }
}

/// Object-like type: a declaration with members plus its generic bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    /// `Interface` or `TypeLiteral` node
    pub decl: NodeId,
    /// Bindings for the declaration's type parameters
    pub env: Env,
}

/// Type as the oracle resolves it.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleType {
    /// Keyword types
    Keyword(Keyword),
    /// Literal types
    Literal(LiteralExpr),
    /// Flattened union, in declaration order
    Union(Vec<OracleType>),
    /// Intersection parts, in declaration order
    Intersection(Vec<OracleType>),
    /// `T[]`, `Array<T>`, `ReadonlyArray<T>`
    Array(Box<OracleType>),
    /// Object-like declaration
    Object(ObjectType),
    /// Declaration that lives in a module outside the program
    External {
        /// Import binding or re-export naming the external module
        origin: NodeId,
        /// Name exported by that module
        name: String,
        /// Resolved type arguments
        args: Vec<OracleType>,
    },
    /// Name with no declaration in the program (global utility types)
    Unresolved {
        /// Name as written
        name: String,
        /// Resolved type arguments
        args: Vec<OracleType>,
    },
    /// Function type
    Function,
    /// Syntax the oracle does not model
    Opaque(&'static str),
}

/// Object member as reported by [`TypeOracle::members_of`].
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Member name
    pub name: String,
    /// Member declaration node
    pub decl: NodeId,
    /// Bindings the member's type resolves under
    pub env: Env,
}

/// Resolved call signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Function node declaring the signature
    pub decl: NodeId,
    /// Parameter nodes
    pub params: Vec<NodeId>,
}

/// Queries the extraction pipeline needs from a type checker.
pub trait TypeOracle {
    /// Node lookup in the declaration table.
    fn node(&self, id: NodeId) -> OracleResult<&Node>;

    /// Declaration holding the file's default export: an `ExportDefault`
    /// node, or the variable/function re-exported as `default`.
    fn default_export_of(&self, file: &Path) -> Option<NodeId>;

    /// Declared type of a parameter, property signature, variable or alias,
    /// resolved under the given bindings.
    fn type_at(&self, node: NodeId, env: &Env) -> OracleResult<OracleType>;

    /// Declaration a name refers to from within `scope`.
    fn symbol_of(&self, scope: NodeId, name: &str, namespace: Namespace) -> Option<NodeId>;

    /// Members of an object-like type in declaration order.
    fn members_of(&self, object: &ObjectType) -> OracleResult<Vec<Member>>;

    /// Signature a call resolves to, when its callee is declared in the program.
    fn resolve_call_signature(&self, scope: NodeId, call: &Expr) -> Option<Signature>;

    /// Module specifier of the import (or re-export) enclosing a declaration,
    /// found by walking parents upward.
    fn import_origin_of(&self, decl: NodeId) -> Option<String>;
}
