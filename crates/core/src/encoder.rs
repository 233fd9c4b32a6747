//! Structural type encoder.
//!
//! Turns oracle types into [`ResolvedType`] trees. Every recursion site goes
//! through [`degrade`], so a failure below a node only turns that node into
//! `Unknown` and its siblings keep encoding.

use tracing::trace;

use crate::error::{Degradation, EncodeError};
use crate::oracle::{Env, ObjectType, OracleType, TypeOracle};
use crate::program::{Keyword, LiteralExpr, NodeId, NodeKind};
use crate::types::{Field, LiteralValue, PrimitiveKind, ResolvedType};

/// Nesting bound for encoded types.
pub const MAX_DEPTH: usize = 32;

/// Degradation policy: an encoding failure becomes `Unknown`.
pub fn degrade(result: Result<ResolvedType, EncodeError>) -> ResolvedType {
    result.unwrap_or_else(|err| {
        trace!(reason = %Degradation::UnresolvedType, "Encoded as unknown: {err}");
        ResolvedType::Unknown
    })
}

/// Encoder bound to one oracle for the duration of a build.
#[derive(Debug)]
pub struct Encoder<'o, O: ?Sized> {
    oracle: &'o O,
    visiting: Vec<ObjectType>,
}

impl<'o, O: TypeOracle + ?Sized> Encoder<'o, O> {
    /// Create an encoder over `oracle`.
    pub fn new(oracle: &'o O) -> Self {
        Self {
            oracle,
            visiting: Vec::new(),
        }
    }

    /// Encode an oracle type. Never fails; unrepresentable parts are `Unknown`.
    pub fn encode(&mut self, ty: &OracleType) -> ResolvedType {
        degrade(self.encode_at(ty, 0))
    }

    /// Encode the declared type of a node under `env`.
    pub fn encode_node(&mut self, node: NodeId, env: &Env) -> ResolvedType {
        self.node_at(node, env, 0)
    }

    fn node_at(&mut self, node: NodeId, env: &Env, depth: usize) -> ResolvedType {
        let oracle = self.oracle;
        degrade(
            oracle
                .type_at(node, env)
                .map_err(EncodeError::from)
                .and_then(|ty| self.encode_at(&ty, depth)),
        )
    }

    fn encode_at(&mut self, ty: &OracleType, depth: usize) -> Result<ResolvedType, EncodeError> {
        if depth > MAX_DEPTH {
            return Err(EncodeError::TooDeep(MAX_DEPTH));
        }
        Ok(match ty {
            OracleType::Keyword(keyword) => ResolvedType::Primitive(match keyword {
                Keyword::String => PrimitiveKind::String,
                Keyword::Number => PrimitiveKind::Number,
                Keyword::Boolean => PrimitiveKind::Boolean,
                Keyword::Undefined => PrimitiveKind::Undefined,
                Keyword::Null
                | Keyword::Any
                | Keyword::Unknown
                | Keyword::Never
                | Keyword::Void
                | Keyword::Other => return Err(EncodeError::Unrepresentable("keyword type")),
            }),
            OracleType::Literal(literal) => ResolvedType::Literal(match literal {
                LiteralExpr::String(s) => LiteralValue::String(s.clone()),
                LiteralExpr::Number(n) => LiteralValue::Number(*n),
                LiteralExpr::Bool(b) => LiteralValue::Bool(*b),
            }),
            OracleType::Union(members) => ResolvedType::Union(
                members
                    .iter()
                    .map(|member| degrade(self.encode_at(member, depth + 1)))
                    .collect(),
            ),
            OracleType::Array(element) => {
                ResolvedType::Array(Box::new(degrade(self.encode_at(element, depth + 1))))
            }
            OracleType::Object(object) => self.encode_object(object, depth)?,
            OracleType::External { .. } => {
                return Err(EncodeError::Unrepresentable("external type"));
            }
            OracleType::Unresolved { .. } => {
                return Err(EncodeError::Unrepresentable("undeclared type"));
            }
            OracleType::Intersection(_) => {
                return Err(EncodeError::Unrepresentable("intersection"));
            }
            OracleType::Function => return Err(EncodeError::Unrepresentable("function type")),
            OracleType::Opaque(what) => return Err(EncodeError::Unrepresentable(*what)),
        })
    }

    fn encode_object(
        &mut self,
        object: &ObjectType,
        depth: usize,
    ) -> Result<ResolvedType, EncodeError> {
        // Same declaration under the same bindings is a cycle; a new
        // instantiation of a generic is not
        if self.visiting.contains(object) {
            return Err(EncodeError::Recursive(object.decl));
        }
        let oracle = self.oracle;
        let members = oracle.members_of(object)?;

        self.visiting.push(object.clone());
        let mut fields = Vec::with_capacity(members.len());
        for member in members {
            // Only plain field signatures are kept
            let Ok(node) = oracle.node(member.decl) else {
                continue;
            };
            let NodeKind::PropertySignature { optional, .. } = &node.kind else {
                continue;
            };
            fields.push(Field {
                ty: self.node_at(member.decl, &member.env, depth + 1),
                name: member.name,
                optional: *optional,
            });
        }
        self.visiting.pop();

        Ok(ResolvedType::Object(fields))
    }
}
