//! Structural type-checking oracle over a set of TypeScript files.
//!
//! Files are parsed with oxc and lowered into a parent-indexed arena (see
//! [`arena`]). Name resolution follows relative imports, re-exports and
//! `export *` across the loaded files; declarations imported from packages stay
//! external and are identified by their import binding.

mod arena;
mod lower;
mod modules;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use tracing::{debug, trace, warn};

pub use arena::{
    Expr, Imported, Keyword, LiteralExpr, Node, NodeId, NodeKind, ObjectProp, TypeExpr, TypeParam,
};
pub use modules::{ModuleResolver, normalize_path};

use crate::error::OracleError;
use crate::oracle::{
    Env, Member, Namespace, ObjectType, OracleResult, OracleType, Signature, TypeOracle,
};

const MAX_ALIAS_DEPTH: usize = 64;
const MAX_EXPORT_HOPS: usize = 32;
const MAX_HERITAGE_DEPTH: usize = 16;

/// Parsed program: every root file plus the modules they reach.
#[derive(Debug)]
pub struct Program {
    nodes: Vec<Node>,
    files: HashMap<PathBuf, NodeId>,
    roots: Vec<PathBuf>,
    resolver: ModuleResolver,
}

impl Program {
    /// Read, parse and lower the root files and everything they import
    /// relatively. Unreadable files become empty modules.
    pub fn load(roots: &[PathBuf], resolver: ModuleResolver) -> Self {
        Self::build(roots, resolver, |path| match fs::read_to_string(path) {
            Ok(source) => Some(source),
            Err(err) => {
                warn!(file = %path.display(), "Failed to read source file: {err}");
                None
            }
        })
    }

    /// Build a program from in-memory sources. The first-listed files are the
    /// roots, in order; imports resolve only among the given paths.
    pub fn from_sources(sources: Vec<(PathBuf, String)>) -> Self {
        let roots: Vec<PathBuf> = sources.iter().map(|(p, _)| normalize_path(p)).collect();
        let map: HashMap<PathBuf, String> = sources
            .into_iter()
            .map(|(p, s)| (normalize_path(&p), s))
            .collect();
        Self::build_with(&roots, ModuleResolver::default(), |p| map.contains_key(p), |p| {
            map.get(p).cloned()
        })
    }

    fn build(
        roots: &[PathBuf],
        resolver: ModuleResolver,
        read: impl Fn(&Path) -> Option<String>,
    ) -> Self {
        let roots: Vec<PathBuf> = roots.iter().map(|p| normalize_path(p)).collect();
        Self::build_with(&roots, resolver, |p| p.is_file(), read)
    }

    fn build_with(
        roots: &[PathBuf],
        resolver: ModuleResolver,
        exists: impl Fn(&Path) -> bool,
        read: impl Fn(&Path) -> Option<String>,
    ) -> Self {
        let mut program = Self {
            nodes: Vec::new(),
            files: HashMap::new(),
            roots: roots.to_vec(),
            resolver,
        };

        let mut pending: Vec<PathBuf> = roots.iter().rev().cloned().collect();
        while let Some(path) = pending.pop() {
            if program.files.contains_key(&path) {
                continue;
            }
            let file = program.parse_file(&path, read(&path));
            program.files.insert(path.clone(), file);

            for specifier in program.module_specifiers(file) {
                if let Some(target) = program.resolver.resolve(&path, &specifier, &exists) {
                    if !program.files.contains_key(&target) {
                        pending.push(target);
                    }
                }
            }
        }

        debug!(
            roots = program.roots.len(),
            files = program.files.len(),
            nodes = program.nodes.len(),
            "Program loaded."
        );
        program
    }

    fn parse_file(&mut self, path: &Path, source: Option<String>) -> NodeId {
        let source = source.unwrap_or_default();
        let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::ts());
        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, &source, source_type).parse();

        if parsed.panicked {
            warn!(file = %path.display(), "Failed to parse source file, treating it as empty.");
            return lower::Lowerer::new(&mut self.nodes).lower_file(path.to_path_buf(), &[]);
        }
        if !parsed.errors.is_empty() {
            debug!(
                file = %path.display(),
                errors = parsed.errors.len(),
                "Source file parsed with recoverable errors."
            );
        }
        lower::Lowerer::new(&mut self.nodes).lower_file(path.to_path_buf(), &parsed.program.body)
    }

    fn module_specifiers(&self, file: NodeId) -> Vec<String> {
        let mut specifiers = Vec::new();
        for stmt in self.statements(file) {
            let specifier = match self.kind(*stmt) {
                Some(NodeKind::ImportBinding { .. }) => self
                    .parent(*stmt)
                    .and_then(|import| match self.kind(import) {
                        Some(NodeKind::Import { specifier }) => Some(specifier),
                        _ => None,
                    }),
                Some(
                    NodeKind::ReExport {
                        specifier: Some(specifier),
                        ..
                    }
                    | NodeKind::ExportAll { specifier },
                ) => Some(specifier),
                _ => None,
            };
            if let Some(specifier) = specifier {
                if !specifiers.contains(specifier) {
                    specifiers.push(specifier.clone());
                }
            }
        }
        specifiers
    }

    /// Root files in enumeration order.
    pub fn root_files(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Source-file node for a loaded path.
    pub fn file_node(&self, path: &Path) -> Option<NodeId> {
        self.files.get(&normalize_path(path)).copied()
    }

    // =========================================================================
    // Arena navigation
    // =========================================================================

    fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.index()).map(|node| &node.kind)
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|node| node.parent)
    }

    fn file_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if matches!(self.kind(node), Some(NodeKind::SourceFile { .. })) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    fn statements(&self, file: NodeId) -> &[NodeId] {
        match self.kind(file) {
            Some(NodeKind::SourceFile { statements, .. }) => statements,
            _ => &[],
        }
    }

    fn module_for(&self, file: NodeId, specifier: &str) -> Option<NodeId> {
        let Some(NodeKind::SourceFile { path, .. }) = self.kind(file) else {
            return None;
        };
        let target = self
            .resolver
            .resolve(path, specifier, |p| self.files.contains_key(p))?;
        self.files.get(&target).copied()
    }

    // =========================================================================
    // Name resolution
    // =========================================================================

    fn declares(kind: &NodeKind, name: &str, namespace: Namespace) -> bool {
        let declared = match namespace {
            Namespace::Type => kind.type_name(),
            Namespace::Value => kind.value_name(),
        };
        declared == Some(name)
    }

    fn lookup_local(&self, file: NodeId, name: &str, namespace: Namespace) -> Option<NodeId> {
        self.statements(file).iter().copied().find(|stmt| {
            self.kind(*stmt)
                .is_some_and(|kind| Self::declares(kind, name, namespace))
        })
    }

    fn symbol_in_file(
        &self,
        file: NodeId,
        name: &str,
        namespace: Namespace,
        hops: usize,
    ) -> Option<NodeId> {
        let local = self.lookup_local(file, name, namespace)?;
        match self.kind(local) {
            Some(NodeKind::ImportBinding { .. }) => Some(self.follow_binding(local, namespace, hops)),
            _ => Some(local),
        }
    }

    /// Follow an import binding into the loaded module it names. Bindings that
    /// point outside the program are returned unchanged.
    fn follow_binding(&self, binding: NodeId, namespace: Namespace, hops: usize) -> NodeId {
        let Some(NodeKind::ImportBinding { imported, .. }) = self.kind(binding) else {
            return binding;
        };
        let target = self
            .parent(binding)
            .zip(self.file_of(binding))
            .and_then(|(import, file)| match self.kind(import) {
                Some(NodeKind::Import { specifier }) => self.module_for(file, specifier),
                _ => None,
            });
        let Some(target) = target else {
            return binding;
        };
        let resolved = match imported {
            Imported::Named(name) => self.resolve_export(target, name, namespace, hops + 1),
            Imported::Default => self.resolve_export(target, "default", namespace, hops + 1),
            Imported::Namespace => None,
        };
        resolved.unwrap_or(binding)
    }

    fn resolve_export(
        &self,
        file: NodeId,
        name: &str,
        namespace: Namespace,
        hops: usize,
    ) -> Option<NodeId> {
        if hops > MAX_EXPORT_HOPS {
            trace!(name, "Export chain too long.");
            return None;
        }
        for stmt in self.statements(file).iter().copied() {
            let Some(kind) = self.kind(stmt) else {
                continue;
            };
            match kind {
                NodeKind::ReExport {
                    specifier,
                    local,
                    exported,
                } if exported == name => {
                    return match specifier {
                        Some(specifier) => match self.module_for(file, specifier) {
                            Some(target) => self.resolve_export(target, local, namespace, hops + 1),
                            None => Some(stmt),
                        },
                        None => self.symbol_in_file(file, local, namespace, hops + 1),
                    };
                }
                NodeKind::ExportDefault { .. } if name == "default" => return Some(stmt),
                _ if kind.is_exported() && Self::declares(kind, name, namespace) => {
                    return Some(stmt);
                }
                _ => {}
            }
        }
        if name == "default" {
            return None;
        }
        self.statements(file).iter().find_map(|stmt| match self.kind(*stmt) {
            Some(NodeKind::ExportAll { specifier }) => self
                .module_for(file, specifier)
                .and_then(|target| self.resolve_export(target, name, namespace, hops + 1)),
            _ => None,
        })
    }

    // =========================================================================
    // Type resolution
    // =========================================================================

    fn resolve_type(
        &self,
        scope: NodeId,
        expr: &TypeExpr,
        env: &Env,
        depth: usize,
    ) -> OracleResult<OracleType> {
        Ok(match expr {
            TypeExpr::Keyword(keyword) => OracleType::Keyword(*keyword),
            TypeExpr::Literal(literal) => OracleType::Literal(literal.clone()),
            TypeExpr::Array(element) => {
                OracleType::Array(Box::new(self.resolve_type(scope, element, env, depth)?))
            }
            TypeExpr::Union(members) => {
                let mut flat = Vec::with_capacity(members.len());
                for member in members {
                    match self.resolve_type(scope, member, env, depth)? {
                        OracleType::Union(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                OracleType::Union(flat)
            }
            TypeExpr::Intersection(parts) => OracleType::Intersection(
                parts
                    .iter()
                    .map(|part| self.resolve_type(scope, part, env, depth))
                    .collect::<OracleResult<_>>()?,
            ),
            TypeExpr::Object(decl) => OracleType::Object(ObjectType {
                decl: *decl,
                env: env.clone(),
            }),
            TypeExpr::Function => OracleType::Function,
            TypeExpr::Unsupported(what) => OracleType::Opaque(*what),
            TypeExpr::Reference { name, args } => {
                if args.is_empty() {
                    if let Some(bound) = env.lookup(name) {
                        return Ok(bound.clone());
                    }
                }
                let args = args
                    .iter()
                    .map(|arg| self.resolve_type(scope, arg, env, depth))
                    .collect::<OracleResult<Vec<_>>>()?;
                match self.symbol_of(scope, name, Namespace::Type) {
                    Some(decl) => self.instantiate(decl, name, args, depth)?,
                    None => match (name.as_str(), args.as_slice()) {
                        ("Array" | "ReadonlyArray", [element]) => {
                            OracleType::Array(Box::new(element.clone()))
                        }
                        _ => OracleType::Unresolved {
                            name: name.clone(),
                            args,
                        },
                    },
                }
            }
        })
    }

    fn instantiate(
        &self,
        decl: NodeId,
        written: &str,
        args: Vec<OracleType>,
        depth: usize,
    ) -> OracleResult<OracleType> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(OracleError::DepthExceeded(written.to_string()));
        }
        let kind = self.kind(decl).ok_or(OracleError::UnknownNode(decl))?;
        Ok(match kind {
            NodeKind::TypeAlias {
                type_params, ty, ..
            } => {
                let env = self.bind(decl, type_params, &args, depth)?;
                self.resolve_type(decl, ty, &env, depth + 1)?
            }
            NodeKind::Interface { type_params, .. } => OracleType::Object(ObjectType {
                decl,
                env: self.bind(decl, type_params, &args, depth)?,
            }),
            NodeKind::ImportBinding { imported, .. } => OracleType::External {
                origin: decl,
                name: match imported {
                    Imported::Named(name) => name.clone(),
                    Imported::Default => "default".to_string(),
                    Imported::Namespace => written
                        .split_once('.')
                        .map_or(written, |(_, rest)| rest)
                        .to_string(),
                },
                args,
            },
            NodeKind::ReExport { local, .. } => OracleType::External {
                origin: decl,
                name: local.clone(),
                args,
            },
            _ => OracleType::Opaque("value in type position"),
        })
    }

    fn bind(
        &self,
        decl: NodeId,
        params: &[TypeParam],
        args: &[OracleType],
        depth: usize,
    ) -> OracleResult<Env> {
        let mut bindings: Vec<(String, OracleType)> = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let ty = match (args.get(index), &param.default) {
                (Some(arg), _) => arg.clone(),
                (None, Some(default)) => {
                    let partial = Env::new(bindings.clone());
                    self.resolve_type(decl, default, &partial, depth + 1)?
                }
                (None, None) => OracleType::Keyword(Keyword::Unknown),
            };
            bindings.push((param.name.clone(), ty));
        }
        Ok(Env::new(bindings))
    }

    fn collect_members(
        &self,
        object: &ObjectType,
        depth: usize,
        out: &mut Vec<Member>,
    ) -> OracleResult<()> {
        let kind = self
            .kind(object.decl)
            .ok_or(OracleError::UnknownNode(object.decl))?;
        let (members, extends) = match kind {
            NodeKind::TypeLiteral { members } => (members, &[][..]),
            NodeKind::Interface {
                members, extends, ..
            } => (members, extends.as_slice()),
            _ => return Err(OracleError::NotAnObject(object.decl)),
        };

        let shadowed: HashSet<String> = out.iter().map(|m| m.name.clone()).collect();
        for member in members {
            let name = match self.kind(*member) {
                Some(
                    NodeKind::PropertySignature { name, .. } | NodeKind::MethodSignature { name },
                ) => name.clone(),
                _ => String::new(),
            };
            if !name.is_empty() && shadowed.contains(&name) {
                continue;
            }
            out.push(Member {
                name,
                decl: *member,
                env: object.env.clone(),
            });
        }

        if depth >= MAX_HERITAGE_DEPTH {
            return Ok(());
        }
        for base in extends {
            if let OracleType::Object(base) = self.resolve_type(object.decl, base, &object.env, 0)? {
                self.collect_members(&base, depth + 1, out)?;
            }
        }
        Ok(())
    }
}

impl TypeOracle for Program {
    fn node(&self, id: NodeId) -> OracleResult<&Node> {
        self.nodes.get(id.index()).ok_or(OracleError::UnknownNode(id))
    }

    fn default_export_of(&self, file: &Path) -> Option<NodeId> {
        let file = self.file_node(file)?;
        self.resolve_export(file, "default", Namespace::Value, 0)
    }

    fn type_at(&self, node: NodeId, env: &Env) -> OracleResult<OracleType> {
        match self.kind(node).ok_or(OracleError::UnknownNode(node))? {
            NodeKind::Parameter { ty: Some(ty), .. }
            | NodeKind::PropertySignature { ty: Some(ty), .. }
            | NodeKind::Variable { ty: Some(ty), .. }
            | NodeKind::TypeAlias { ty, .. } => self.resolve_type(node, ty, env, 0),
            NodeKind::Interface { .. } | NodeKind::TypeLiteral { .. } => {
                Ok(OracleType::Object(ObjectType {
                    decl: node,
                    env: env.clone(),
                }))
            }
            _ => Err(OracleError::Untyped(node)),
        }
    }

    fn symbol_of(&self, scope: NodeId, name: &str, namespace: Namespace) -> Option<NodeId> {
        let file = self.file_of(scope)?;
        let Some((head, rest)) = name.split_once('.') else {
            return self.symbol_in_file(file, name, namespace, 0);
        };

        // `ns.Name`: only namespace imports are modelled
        let binding = self
            .statements(file)
            .iter()
            .copied()
            .find(|stmt| match self.kind(*stmt) {
                Some(NodeKind::ImportBinding {
                    local,
                    imported: Imported::Namespace,
                }) => local == head,
                _ => false,
            })?;
        let target = self.parent(binding).and_then(|import| match self.kind(import) {
            Some(NodeKind::Import { specifier }) => self.module_for(file, specifier),
            _ => None,
        });
        match target {
            Some(target) if !rest.contains('.') => self.resolve_export(target, rest, namespace, 1),
            Some(_) => None,
            None => Some(binding),
        }
    }

    fn members_of(&self, object: &ObjectType) -> OracleResult<Vec<Member>> {
        let mut members = Vec::new();
        self.collect_members(object, 0, &mut members)?;
        Ok(members)
    }

    fn resolve_call_signature(&self, scope: NodeId, call: &Expr) -> Option<Signature> {
        let Expr::Call { callee, .. } = call else {
            return None;
        };
        let Expr::Ident(name) = callee.as_ref() else {
            return None;
        };
        let decl = self.symbol_of(scope, name, Namespace::Value)?;
        let function = match self.kind(decl)? {
            NodeKind::Function { .. } => decl,
            NodeKind::Variable {
                init: Some(Expr::Function(function)),
                ..
            } => *function,
            _ => return None,
        };
        match self.kind(function)? {
            NodeKind::Function { params, .. } => Some(Signature {
                decl: function,
                params: params.clone(),
            }),
            _ => None,
        }
    }

    fn import_origin_of(&self, decl: NodeId) -> Option<String> {
        let mut current = Some(decl);
        while let Some(node) = current {
            match self.kind(node)? {
                NodeKind::Import { specifier }
                | NodeKind::ReExport {
                    specifier: Some(specifier),
                    ..
                } => return Some(specifier.clone()),
                NodeKind::SourceFile { .. } => return None,
                _ => current = self.parent(node),
            }
        }
        None
    }
}
