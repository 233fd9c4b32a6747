//! Lowering from the oxc syntax tree into the declaration arena.

use std::path::PathBuf;

use oxc_ast::ast::{
    Declaration, ExportDefaultDeclarationKind, Expression, FormalParameters, Function,
    ImportDeclarationSpecifier, ObjectPropertyKind, Statement, TSInterfaceHeritage, TSLiteral,
    TSSignature, TSType, TSTypeName, TSTypeOperatorOperator, TSTypeParameterDeclaration,
    UnaryOperator,
};

use super::arena::{
    Expr, Imported, Keyword, LiteralExpr, Node, NodeId, NodeKind, ObjectProp, TypeExpr, TypeParam,
};

/// Appends lowered nodes to an arena.
pub(crate) struct Lowerer<'n> {
    nodes: &'n mut Vec<Node>,
}

impl<'n> Lowerer<'n> {
    pub(crate) fn new(nodes: &'n mut Vec<Node>) -> Self {
        Self { nodes }
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { parent, kind });
        id
    }

    /// Allocate a node before its children so they can point at it.
    fn reserve(&mut self, parent: NodeId) -> NodeId {
        self.push(Some(parent), NodeKind::OtherMember)
    }

    fn set(&mut self, id: NodeId, kind: NodeKind) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.kind = kind;
        }
    }

    /// Lower one parsed module. An empty body yields an empty module.
    pub(crate) fn lower_file(&mut self, path: PathBuf, body: &[Statement<'_>]) -> NodeId {
        let file = self.push(
            None,
            NodeKind::SourceFile {
                path: path.clone(),
                statements: Vec::new(),
            },
        );
        let mut statements = Vec::new();
        for stmt in body {
            self.lower_statement(file, stmt, &mut statements);
        }
        self.set(file, NodeKind::SourceFile { path, statements });
        file
    }

    fn lower_statement(&mut self, file: NodeId, stmt: &Statement<'_>, out: &mut Vec<NodeId>) {
        match stmt {
            Statement::ImportDeclaration(import) => {
                let decl = self.push(
                    Some(file),
                    NodeKind::Import {
                        specifier: import.source.value.to_string(),
                    },
                );
                for spec in import.specifiers.iter().flatten() {
                    let (local, imported) = match spec {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => (
                            s.local.name.to_string(),
                            Imported::Named(s.imported.name().to_string()),
                        ),
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            (s.local.name.to_string(), Imported::Default)
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            (s.local.name.to_string(), Imported::Namespace)
                        }
                    };
                    out.push(self.push(Some(decl), NodeKind::ImportBinding { local, imported }));
                }
            }
            Statement::ExportNamedDeclaration(export) => {
                if let Some(decl) = &export.declaration {
                    self.lower_declaration(file, decl, true, out);
                }
                let specifier = export.source.as_ref().map(|s| s.value.to_string());
                for spec in &export.specifiers {
                    out.push(self.push(
                        Some(file),
                        NodeKind::ReExport {
                            specifier: specifier.clone(),
                            local: spec.local.name().to_string(),
                            exported: spec.exported.name().to_string(),
                        },
                    ));
                }
            }
            Statement::ExportAllDeclaration(export) => {
                // `export * as ns from` introduces a namespace, not a star re-export
                if export.exported.is_none() {
                    out.push(self.push(
                        Some(file),
                        NodeKind::ExportAll {
                            specifier: export.source.value.to_string(),
                        },
                    ));
                }
            }
            Statement::ExportDefaultDeclaration(export) => {
                let id = self.reserve(file);
                let expr = match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        Expr::Function(self.lower_function(id, func, false))
                    }
                    other => other
                        .as_expression()
                        .map_or(Expr::Other, |e| self.lower_expr(id, e)),
                };
                self.set(id, NodeKind::ExportDefault { expr });
                out.push(id);
            }
            Statement::VariableDeclaration(_)
            | Statement::FunctionDeclaration(_)
            | Statement::TSTypeAliasDeclaration(_)
            | Statement::TSInterfaceDeclaration(_) => {
                if let Some(decl) = stmt.as_declaration() {
                    self.lower_declaration(file, decl, false, out);
                }
            }
            _ => {}
        }
    }

    fn lower_declaration(
        &mut self,
        file: NodeId,
        decl: &Declaration<'_>,
        exported: bool,
        out: &mut Vec<NodeId>,
    ) {
        match decl {
            Declaration::VariableDeclaration(var) => {
                for declarator in &var.declarations {
                    let Some(name) = declarator.id.get_identifier_name() else {
                        continue;
                    };
                    let id = self.reserve(file);
                    let ty = declarator
                        .type_annotation
                        .as_ref()
                        .map(|ann| self.lower_type(id, &ann.type_annotation));
                    let init = declarator.init.as_ref().map(|e| self.lower_expr(id, e));
                    self.set(
                        id,
                        NodeKind::Variable {
                            name: name.to_string(),
                            ty,
                            init,
                            exported,
                        },
                    );
                    out.push(id);
                }
            }
            Declaration::FunctionDeclaration(func) => {
                out.push(self.lower_function(file, func, exported));
            }
            Declaration::TSTypeAliasDeclaration(alias) => {
                let id = self.reserve(file);
                let type_params = self.lower_type_params(id, alias.type_parameters.as_deref());
                let ty = self.lower_type(id, &alias.type_annotation);
                self.set(
                    id,
                    NodeKind::TypeAlias {
                        name: alias.id.name.to_string(),
                        type_params,
                        ty,
                        exported,
                    },
                );
                out.push(id);
            }
            Declaration::TSInterfaceDeclaration(iface) => {
                let id = self.reserve(file);
                let type_params = self.lower_type_params(id, iface.type_parameters.as_deref());
                let extends = iface
                    .extends
                    .iter()
                    .filter_map(|heritage| self.lower_heritage(id, heritage))
                    .collect();
                let members = self.lower_members(id, &iface.body.body);
                self.set(
                    id,
                    NodeKind::Interface {
                        name: iface.id.name.to_string(),
                        type_params,
                        extends,
                        members,
                        exported,
                    },
                );
                out.push(id);
            }
            _ => {}
        }
    }

    fn lower_function(&mut self, parent: NodeId, func: &Function<'_>, exported: bool) -> NodeId {
        let id = self.reserve(parent);
        let params = self.lower_params(id, &func.params);
        self.set(
            id,
            NodeKind::Function {
                name: func.id.as_ref().map(|ident| ident.name.to_string()),
                params,
                exported,
            },
        );
        id
    }

    fn lower_params(&mut self, func: NodeId, params: &FormalParameters<'_>) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(params.items.len());
        for param in &params.items {
            let id = self.reserve(func);
            let ty = param
                .type_annotation
                .as_ref()
                .map(|ann| self.lower_type(id, &ann.type_annotation));
            self.set(
                id,
                NodeKind::Parameter {
                    name: param.pattern.get_identifier_name().map(|n| n.to_string()),
                    ty,
                },
            );
            ids.push(id);
        }
        ids
    }

    fn lower_type_params(
        &mut self,
        owner: NodeId,
        params: Option<&TSTypeParameterDeclaration<'_>>,
    ) -> Vec<TypeParam> {
        let Some(params) = params else {
            return Vec::new();
        };
        params
            .params
            .iter()
            .map(|param| TypeParam {
                name: param.name.name.to_string(),
                default: param.default.as_ref().map(|ty| self.lower_type(owner, ty)),
            })
            .collect()
    }

    fn lower_heritage(
        &mut self,
        owner: NodeId,
        heritage: &TSInterfaceHeritage<'_>,
    ) -> Option<TypeExpr> {
        let name = expression_path(&heritage.expression)?;
        let args = heritage
            .type_arguments
            .as_ref()
            .map(|args| args.params.iter().map(|ty| self.lower_type(owner, ty)).collect())
            .unwrap_or_default();
        Some(TypeExpr::Reference { name, args })
    }

    fn lower_members(&mut self, owner: NodeId, signatures: &[TSSignature<'_>]) -> Vec<NodeId> {
        let mut members = Vec::with_capacity(signatures.len());
        for signature in signatures {
            let id = self.reserve(owner);
            let kind = match signature {
                TSSignature::TSPropertySignature(prop) if !prop.computed => {
                    match prop.key.static_name() {
                        Some(name) => NodeKind::PropertySignature {
                            name: name.into_owned(),
                            optional: prop.optional,
                            ty: prop
                                .type_annotation
                                .as_ref()
                                .map(|ann| self.lower_type(id, &ann.type_annotation)),
                        },
                        None => NodeKind::OtherMember,
                    }
                }
                TSSignature::TSMethodSignature(method) => NodeKind::MethodSignature {
                    name: method
                        .key
                        .static_name()
                        .map(|name| name.into_owned())
                        .unwrap_or_default(),
                },
                _ => NodeKind::OtherMember,
            };
            self.set(id, kind);
            members.push(id);
        }
        members
    }

    fn lower_type(&mut self, owner: NodeId, ty: &TSType<'_>) -> TypeExpr {
        match ty {
            TSType::TSStringKeyword(_) => TypeExpr::Keyword(Keyword::String),
            TSType::TSNumberKeyword(_) => TypeExpr::Keyword(Keyword::Number),
            TSType::TSBooleanKeyword(_) => TypeExpr::Keyword(Keyword::Boolean),
            TSType::TSUndefinedKeyword(_) => TypeExpr::Keyword(Keyword::Undefined),
            TSType::TSNullKeyword(_) => TypeExpr::Keyword(Keyword::Null),
            TSType::TSAnyKeyword(_) => TypeExpr::Keyword(Keyword::Any),
            TSType::TSUnknownKeyword(_) => TypeExpr::Keyword(Keyword::Unknown),
            TSType::TSNeverKeyword(_) => TypeExpr::Keyword(Keyword::Never),
            TSType::TSVoidKeyword(_) => TypeExpr::Keyword(Keyword::Void),
            TSType::TSBigIntKeyword(_)
            | TSType::TSObjectKeyword(_)
            | TSType::TSSymbolKeyword(_)
            | TSType::TSIntrinsicKeyword(_) => TypeExpr::Keyword(Keyword::Other),
            TSType::TSLiteralType(lit) => lower_literal(&lit.literal)
                .map_or(TypeExpr::Unsupported("literal"), TypeExpr::Literal),
            TSType::TSArrayType(array) => {
                TypeExpr::Array(Box::new(self.lower_type(owner, &array.element_type)))
            }
            TSType::TSUnionType(union) => TypeExpr::Union(
                union.types.iter().map(|t| self.lower_type(owner, t)).collect(),
            ),
            TSType::TSIntersectionType(inter) => TypeExpr::Intersection(
                inter.types.iter().map(|t| self.lower_type(owner, t)).collect(),
            ),
            TSType::TSParenthesizedType(paren) => self.lower_type(owner, &paren.type_annotation),
            TSType::TSTypeOperatorType(op)
                if matches!(op.operator, TSTypeOperatorOperator::Readonly) =>
            {
                self.lower_type(owner, &op.type_annotation)
            }
            TSType::TSTypeLiteral(literal) => {
                let id = self.reserve(owner);
                let members = self.lower_members(id, &literal.members);
                self.set(id, NodeKind::TypeLiteral { members });
                TypeExpr::Object(id)
            }
            TSType::TSTypeReference(reference) => {
                let Some(name) = type_name_path(&reference.type_name) else {
                    return TypeExpr::Unsupported("this");
                };
                let args = reference
                    .type_arguments
                    .as_ref()
                    .map(|args| args.params.iter().map(|t| self.lower_type(owner, t)).collect())
                    .unwrap_or_default();
                TypeExpr::Reference { name, args }
            }
            TSType::TSFunctionType(_) | TSType::TSConstructorType(_) => TypeExpr::Function,
            TSType::TSTupleType(_) => TypeExpr::Unsupported("tuple"),
            TSType::TSConditionalType(_) => TypeExpr::Unsupported("conditional"),
            TSType::TSMappedType(_) => TypeExpr::Unsupported("mapped"),
            TSType::TSIndexedAccessType(_) => TypeExpr::Unsupported("indexed access"),
            TSType::TSTypeQuery(_) => TypeExpr::Unsupported("typeof"),
            _ => TypeExpr::Unsupported("type"),
        }
    }

    fn lower_expr(&mut self, parent: NodeId, expr: &Expression<'_>) -> Expr {
        match expr.get_inner_expression() {
            Expression::Identifier(ident) => Expr::Ident(ident.name.to_string()),
            Expression::CallExpression(call) => {
                let callee = Box::new(self.lower_expr(parent, &call.callee));
                let args = call
                    .arguments
                    .iter()
                    .map(|arg| arg.as_expression().map_or(Expr::Other, |e| self.lower_expr(parent, e)))
                    .collect();
                Expr::Call { callee, args }
            }
            Expression::ObjectExpression(object) => Expr::Object(
                object
                    .properties
                    .iter()
                    .map(|prop| match prop {
                        ObjectPropertyKind::ObjectProperty(prop) => ObjectProp {
                            key: if prop.computed {
                                None
                            } else {
                                prop.key.static_name().map(|k| k.into_owned())
                            },
                            value: self.lower_expr(parent, &prop.value),
                        },
                        ObjectPropertyKind::SpreadProperty(_) => ObjectProp {
                            key: None,
                            value: Expr::Other,
                        },
                    })
                    .collect(),
            ),
            Expression::FunctionExpression(func) => {
                Expr::Function(self.lower_function(parent, func, false))
            }
            Expression::ArrowFunctionExpression(arrow) => {
                let id = self.reserve(parent);
                let params = self.lower_params(id, &arrow.params);
                self.set(
                    id,
                    NodeKind::Function {
                        name: None,
                        params,
                        exported: false,
                    },
                );
                Expr::Function(id)
            }
            _ => Expr::Other,
        }
    }
}

fn lower_literal(literal: &TSLiteral<'_>) -> Option<LiteralExpr> {
    match literal {
        TSLiteral::StringLiteral(s) => Some(LiteralExpr::String(s.value.to_string())),
        TSLiteral::NumericLiteral(n) => Some(LiteralExpr::Number(n.value)),
        TSLiteral::BooleanLiteral(b) => Some(LiteralExpr::Bool(b.value)),
        TSLiteral::UnaryExpression(unary)
            if matches!(unary.operator, UnaryOperator::UnaryNegation) =>
        {
            match &unary.argument {
                Expression::NumericLiteral(n) => Some(LiteralExpr::Number(-n.value)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn type_name_path(name: &TSTypeName<'_>) -> Option<String> {
    match name {
        TSTypeName::IdentifierReference(ident) => Some(ident.name.to_string()),
        TSTypeName::QualifiedName(qualified) => {
            let left = type_name_path(&qualified.left)?;
            Some(format!("{left}.{}", qualified.right.name))
        }
        TSTypeName::ThisExpression(_) => None,
    }
}

fn expression_path(expr: &Expression<'_>) -> Option<String> {
    match expr {
        Expression::Identifier(ident) => Some(ident.name.to_string()),
        Expression::StaticMemberExpression(member) => {
            let object = expression_path(&member.object)?;
            Some(format!("{object}.{}", member.property.name))
        }
        _ => None,
    }
}
