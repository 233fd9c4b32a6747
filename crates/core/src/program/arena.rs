//! Parent-indexed declaration table.
//!
//! Source files are lowered into a flat `Vec<Node>`; every node records its
//! parent so enclosing declarations (and import statements) are found by an
//! upward index walk instead of holding on to a live syntax tree.

use std::fmt;
use std::path::PathBuf;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One lowered declaration or statement.
#[derive(Debug, Clone)]
pub struct Node {
    /// Enclosing node; `None` only for source files
    pub parent: Option<NodeId>,
    /// What the node declares
    pub kind: NodeKind,
}

/// Declaration kinds kept from the syntax tree.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Module root; `statements` are its direct children
    SourceFile {
        /// Canonical file path
        path: PathBuf,
        /// Top-level declarations in source order
        statements: Vec<NodeId>,
    },
    /// `import ... from "specifier"`; bindings are its children
    Import {
        /// Module specifier as written
        specifier: String,
    },
    /// One local name introduced by an import
    ImportBinding {
        /// Local name
        local: String,
        /// What the binding refers to in the source module
        imported: Imported,
    },
    /// `export { local as exported } [from "specifier"]`
    ReExport {
        /// Source module for `export ... from`, `None` for local export lists
        specifier: Option<String>,
        /// Name in the source module (or local scope)
        local: String,
        /// Exported name
        exported: String,
    },
    /// `export * from "specifier"`
    ExportAll {
        /// Module specifier as written
        specifier: String,
    },
    /// `type Name<T = D> = ...`
    TypeAlias {
        /// Alias name
        name: String,
        /// Type parameters in declaration order
        type_params: Vec<TypeParam>,
        /// Aliased type
        ty: TypeExpr,
        /// Carries `export`
        exported: bool,
    },
    /// `interface Name<T> extends Base { ... }`
    Interface {
        /// Interface name
        name: String,
        /// Type parameters in declaration order
        type_params: Vec<TypeParam>,
        /// Heritage clauses
        extends: Vec<TypeExpr>,
        /// Member nodes in declaration order
        members: Vec<NodeId>,
        /// Carries `export`
        exported: bool,
    },
    /// `{ ... }` in type position
    TypeLiteral {
        /// Member nodes in declaration order
        members: Vec<NodeId>,
    },
    /// `name?: Type`
    PropertySignature {
        /// Property name
        name: String,
        /// Declared with `?`
        optional: bool,
        /// Declared type, if any
        ty: Option<TypeExpr>,
    },
    /// `name(): Type`
    MethodSignature {
        /// Method name
        name: String,
    },
    /// Index, call, construct or computed members
    OtherMember,
    /// Function declaration, function expression or arrow function
    Function {
        /// Declared name, if any
        name: Option<String>,
        /// Parameter nodes in order
        params: Vec<NodeId>,
        /// Carries `export` (declarations only)
        exported: bool,
    },
    /// Function parameter
    Parameter {
        /// Binding name; destructured parameters have none
        name: Option<String>,
        /// Declared type, if any
        ty: Option<TypeExpr>,
    },
    /// `const name: Type = init`
    Variable {
        /// Binding name
        name: String,
        /// Declared type, if any
        ty: Option<TypeExpr>,
        /// Initializer, if any
        init: Option<Expr>,
        /// Carries `export`
        exported: bool,
    },
    /// `export default <expr>`
    ExportDefault {
        /// Exported expression
        expr: Expr,
    },
}

impl NodeKind {
    /// Name a declaration introduces in the type namespace.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::TypeAlias { name, .. } | Self::Interface { name, .. } => Some(name),
            Self::ImportBinding { local, .. } => Some(local),
            _ => None,
        }
    }

    /// Name a declaration introduces in the value namespace.
    pub fn value_name(&self) -> Option<&str> {
        match self {
            Self::Function { name, .. } => name.as_deref(),
            Self::Variable { name, .. } | Self::ImportBinding { local: name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether the declaration carries `export`.
    pub fn is_exported(&self) -> bool {
        match self {
            Self::TypeAlias { exported, .. }
            | Self::Interface { exported, .. }
            | Self::Function { exported, .. }
            | Self::Variable { exported, .. } => *exported,
            _ => false,
        }
    }
}

/// What an import binding refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Imported {
    /// `import { name } from` / `import { name as local } from`
    Named(String),
    /// `import local from`
    Default,
    /// `import * as local from`
    Namespace,
}

/// Declared type parameter.
#[derive(Debug, Clone)]
pub struct TypeParam {
    /// Parameter name
    pub name: String,
    /// Default type, if declared
    pub default: Option<TypeExpr>,
}

/// Syntactic type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Keyword types: string, number, any, ...
    Keyword(Keyword),
    /// Literal types: "a", 1, true
    Literal(LiteralExpr),
    /// `Name<Args>` or `ns.Name<Args>`
    Reference {
        /// Dotted name as written
        name: String,
        /// Type arguments
        args: Vec<TypeExpr>,
    },
    /// `T[]`
    Array(Box<TypeExpr>),
    /// `A | B`
    Union(Vec<TypeExpr>),
    /// `A & B`
    Intersection(Vec<TypeExpr>),
    /// `{ ... }`, pointing at a `TypeLiteral` node
    Object(NodeId),
    /// `(...) => T`
    Function,
    /// Anything else (tuples, conditionals, mapped types, ...)
    Unsupported(&'static str),
}

/// Keyword types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// string
    String,
    /// number
    Number,
    /// boolean
    Boolean,
    /// undefined
    Undefined,
    /// null
    Null,
    /// any
    Any,
    /// unknown
    Unknown,
    /// never
    Never,
    /// void
    Void,
    /// object, symbol, bigint, ...
    Other,
}

/// Literal in type position.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralExpr {
    /// String literal
    String(String),
    /// Numeric literal, sign applied
    Number(f64),
    /// Boolean literal
    Bool(bool),
}

/// Expression forms the extractor inspects.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier reference
    Ident(String),
    /// `callee(args...)`
    Call {
        /// Callee expression
        callee: Box<Expr>,
        /// Arguments in order
        args: Vec<Expr>,
    },
    /// Object literal
    Object(Vec<ObjectProp>),
    /// Function or arrow expression, pointing at a `Function` node
    Function(NodeId),
    /// Anything else
    Other,
}

/// Property of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProp {
    /// Static key; `None` for computed keys and spreads
    pub key: Option<String>,
    /// Property value (shorthand properties become an identifier)
    pub value: Expr,
}
