//! Handler signature extraction.
//!
//! A route file default-exports a call whose first argument is a method
//! table, e.g. `export default withMethods({ GET: handler })`. Each recognized
//! method maps to a two-parameter handler; its request and response parameter
//! types are verified against the framework module before being encoded.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, trace};

use crate::config::FrameworkTypes;
use crate::encoder::Encoder;
use crate::error::Degradation;
use crate::oracle::{Env, Namespace, ObjectType, OracleType, TypeOracle};
use crate::program::{Expr, NodeId, NodeKind, ObjectProp};
use crate::types::{Field, HandlerSignature, HttpMethod, ResolvedType};

/// Bound on call layers and identifier hops followed while unwrapping.
pub const MAX_UNWRAP_STEPS: usize = 32;

/// Request helpers exported by the helper module and the positions of their
/// `body` and `query` type arguments.
const REQUEST_HELPERS: [(&str, Option<usize>, Option<usize>); 3] = [
    ("NextApiRequestWithBody", Some(0), None),
    ("NextApiRequestWithQuery", None, Some(0)),
    ("NextApiRequestWithBodyAndQuery", Some(0), Some(1)),
];

/// Extracts [`HandlerSignature`]s from route files through an oracle.
#[derive(Debug)]
pub struct Extractor<'o, O: ?Sized> {
    oracle: &'o O,
    framework: &'o FrameworkTypes,
}

impl<'o, O: TypeOracle + ?Sized> Extractor<'o, O> {
    /// Create an extractor over `oracle`, verifying against `framework`.
    pub fn new(oracle: &'o O, framework: &'o FrameworkTypes) -> Self {
        Self { oracle, framework }
    }

    /// Handler signatures of every recognized method in `file`, in method-table
    /// order. Files without a usable default export yield nothing.
    pub fn extract(&self, file: &Path) -> Vec<HandlerSignature> {
        let Some((scope, table)) = self.method_table(file) else {
            trace!(file = %file.display(), reason = %Degradation::NoDefaultExport, "No method table.");
            return Vec::new();
        };

        let mut signatures = Vec::new();
        for prop in &table {
            let Some(method) = prop.key.as_deref().and_then(|k| k.parse::<HttpMethod>().ok())
            else {
                continue;
            };
            let Some((request, response)) = self.resolve_handler(scope, &prop.value) else {
                trace!(file = %file.display(), %method, "Handler could not be resolved.");
                continue;
            };
            signatures.push(HandlerSignature {
                method,
                request: self.request_shape(request),
                response: self.response_shape(response),
            });
        }

        debug!(file = %file.display(), handlers = signatures.len(), "Extracted handlers.");
        signatures
    }

    // =========================================================================
    // Default export and method table
    // =========================================================================

    fn method_table(&self, file: &Path) -> Option<(NodeId, Vec<ObjectProp>)> {
        let export = self.oracle.default_export_of(file)?;
        let (scope, expr) = self.exported_expr(export)?;

        if let Some(signature) = self.oracle.resolve_call_signature(scope, &expr) {
            if signature.params.is_empty() {
                trace!(file = %file.display(), "Default export calls a function without parameters.");
                return None;
            }
        }

        let mut current = expr;
        for _ in 0..MAX_UNWRAP_STEPS {
            let Expr::Call { args, .. } = current else {
                return None;
            };
            match args.into_iter().next()? {
                Expr::Object(props) => return Some((scope, props)),
                Expr::Ident(name) => return self.object_binding(scope, &name),
                call @ Expr::Call { .. } => current = call,
                _ => return None,
            }
        }
        None
    }

    /// Exported expression, with identifiers followed to their initializers.
    fn exported_expr(&self, export: NodeId) -> Option<(NodeId, Expr)> {
        let (mut scope, mut expr) = match &self.oracle.node(export).ok()?.kind {
            NodeKind::ExportDefault { expr } => (export, expr.clone()),
            NodeKind::Variable {
                init: Some(init), ..
            } => (export, init.clone()),
            _ => return None,
        };
        for _ in 0..MAX_UNWRAP_STEPS {
            let Expr::Ident(name) = &expr else {
                return Some((scope, expr));
            };
            let decl = self.oracle.symbol_of(scope, name, Namespace::Value)?;
            match &self.oracle.node(decl).ok()?.kind {
                NodeKind::Variable {
                    init: Some(init), ..
                } => {
                    scope = decl;
                    expr = init.clone();
                }
                _ => return None,
            }
        }
        None
    }

    fn object_binding(&self, scope: NodeId, name: &str) -> Option<(NodeId, Vec<ObjectProp>)> {
        let decl = self.oracle.symbol_of(scope, name, Namespace::Value)?;
        match &self.oracle.node(decl).ok()?.kind {
            NodeKind::Variable {
                init: Some(Expr::Object(props)),
                ..
            } => Some((decl, props.clone())),
            _ => None,
        }
    }

    // =========================================================================
    // Handler resolution
    // =========================================================================

    /// Request and response parameters of the handler behind a method-table
    /// value, unwrapping middleware calls argument by argument.
    fn resolve_handler(&self, scope: NodeId, value: &Expr) -> Option<(NodeId, NodeId)> {
        let mut pending = vec![(scope, value.clone())];
        let mut visited = HashSet::new();
        let mut steps = 0;

        while let Some((scope, expr)) = pending.pop() {
            steps += 1;
            if steps > MAX_UNWRAP_STEPS {
                trace!("Handler unwrapping exceeded {MAX_UNWRAP_STEPS} steps.");
                return None;
            }
            match expr {
                Expr::Function(function) => {
                    if let Some(params) = self.handler_params(function) {
                        return Some(params);
                    }
                }
                Expr::Ident(name) => {
                    let Some(decl) = self.oracle.symbol_of(scope, &name, Namespace::Value) else {
                        continue;
                    };
                    if !visited.insert(decl) {
                        continue;
                    }
                    let Ok(node) = self.oracle.node(decl) else {
                        continue;
                    };
                    match &node.kind {
                        NodeKind::Function { .. } => {
                            if let Some(params) = self.handler_params(decl) {
                                return Some(params);
                            }
                        }
                        NodeKind::Variable {
                            init: Some(init), ..
                        } => pending.push((decl, init.clone())),
                        _ => {}
                    }
                }
                Expr::Call { args, .. } => {
                    pending.extend(args.into_iter().rev().map(|arg| (scope, arg)));
                }
                Expr::Object(_) | Expr::Other => {}
            }
        }
        None
    }

    fn handler_params(&self, function: NodeId) -> Option<(NodeId, NodeId)> {
        match &self.oracle.node(function).ok()?.kind {
            NodeKind::Function { params, .. } => match params.as_slice() {
                [request, response] => Some((*request, *response)),
                _ => None,
            },
            _ => None,
        }
    }

    // =========================================================================
    // Parameter types
    // =========================================================================

    fn is_origin(&self, origin: NodeId, module: &str) -> bool {
        self.oracle.import_origin_of(origin).as_deref() == Some(module)
    }

    fn is_request(&self, ty: &OracleType) -> bool {
        matches!(ty, OracleType::External { origin, name, .. }
            if *name == self.framework.request && self.is_origin(*origin, &self.framework.module))
    }

    fn request_shape(&self, param: NodeId) -> ResolvedType {
        let ty = match self.oracle.type_at(param, &Env::default()) {
            Ok(ty) => ty,
            Err(err) => {
                trace!(reason = %Degradation::UnresolvedType, "Request parameter: {err}");
                return ResolvedType::Unknown;
            }
        };
        let mut encoder = Encoder::new(self.oracle);

        if self.is_request(&ty) {
            return request_object(ResolvedType::Unknown, ResolvedType::Unknown);
        }

        if let OracleType::External { origin, name, args } = &ty {
            if self.is_origin(*origin, &self.framework.helper_module) {
                if let Some((_, body, query)) = REQUEST_HELPERS.iter().find(|(helper, ..)| *helper == name.as_str()) {
                    let mut argument = |index: Option<usize>| {
                        index
                            .and_then(|i| args.get(i))
                            .map_or(ResolvedType::Unknown, |arg| encoder.encode(arg))
                    };
                    let body = argument(*body);
                    let query = argument(*query);
                    return request_object(body, query);
                }
            }
        }

        if let OracleType::Intersection(parts) = &ty {
            let wraps_request = parts.iter().any(|part| match part {
                OracleType::Unresolved { args, .. } => args.first().is_some_and(|a| self.is_request(a)),
                other => self.is_request(other),
            });
            if wraps_request {
                let objects: Vec<&ObjectType> = parts
                    .iter()
                    .filter_map(|part| match part {
                        OracleType::Object(object) => Some(object),
                        _ => None,
                    })
                    .collect();
                let body = self.member_shape(&mut encoder, &objects, "body");
                let query = self.member_shape(&mut encoder, &objects, "query");
                return request_object(body, query);
            }
        }

        trace!(reason = %Degradation::OriginMismatch, "Request parameter is not a framework request.");
        ResolvedType::Unknown
    }

    fn member_shape(
        &self,
        encoder: &mut Encoder<'o, O>,
        objects: &[&ObjectType],
        name: &str,
    ) -> ResolvedType {
        objects
            .iter()
            .filter_map(|object| self.oracle.members_of(object).ok())
            .flatten()
            .find(|member| member.name == name)
            .map_or(ResolvedType::Unknown, |member| {
                encoder.encode_node(member.decl, &member.env)
            })
    }

    fn response_shape(&self, param: NodeId) -> ResolvedType {
        match self.oracle.type_at(param, &Env::default()) {
            Ok(OracleType::External { origin, name, args })
                if name == self.framework.response
                    && self.is_origin(origin, &self.framework.module) =>
            {
                args.first().map_or(ResolvedType::Unknown, |arg| {
                    Encoder::new(self.oracle).encode(arg)
                })
            }
            Ok(_) => {
                trace!(reason = %Degradation::OriginMismatch, "Response parameter is not a framework response.");
                ResolvedType::Unknown
            }
            Err(err) => {
                trace!(reason = %Degradation::UnresolvedType, "Response parameter: {err}");
                ResolvedType::Unknown
            }
        }
    }
}

fn request_object(body: ResolvedType, query: ResolvedType) -> ResolvedType {
    ResolvedType::Object(vec![Field::new("body", body), Field::new("query", query)])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::program::Program;
    use crate::types::{LiteralValue, PrimitiveKind};
    use std::path::PathBuf;

    const ROUTE: &str = "/app/pages/api/widgets.ts";

    fn extract(files: &[(&str, &str)]) -> Vec<HandlerSignature> {
        let program = Program::from_sources(
            files
                .iter()
                .map(|(p, s)| (PathBuf::from(p), (*s).to_string()))
                .collect(),
        );
        let framework = FrameworkTypes::default();
        Extractor::new(&program, &framework).extract(Path::new(ROUTE))
    }

    fn route(source: &str) -> Vec<HandlerSignature> {
        extract(&[(ROUTE, source)])
    }

    fn string() -> ResolvedType {
        ResolvedType::Primitive(PrimitiveKind::String)
    }

    const NEXT_IMPORT: &str =
        "import type { NextApiRequest, NextApiResponse } from 'next';\nimport { withMethods } from 'nextpida-method-handler';\n";

    #[test]
    fn test_non_call_default_export_is_empty() {
        assert!(route("export default function handler(req: any, res: any) {}").is_empty());
        assert!(route("const get = (req: any, res: any) => {};\nexport default { GET: get };").is_empty());
        assert!(route("export const x = 1;").is_empty());
    }

    #[test]
    fn test_bare_request_and_typed_response() {
        let source = format!(
            "{NEXT_IMPORT}const get = (req: NextApiRequest, res: NextApiResponse<{{ name: string }}>) => {{}};\nexport default withMethods({{ GET: get }});"
        );
        let signatures = route(&source);
        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].method, HttpMethod::Get);
        assert_eq!(
            signatures[0].request,
            request_object(ResolvedType::Unknown, ResolvedType::Unknown)
        );
        assert_eq!(
            signatures[0].response,
            ResolvedType::Object(vec![Field::new("name", string())])
        );
    }

    #[test]
    fn test_bare_response_is_unknown() {
        let source = format!(
            "{NEXT_IMPORT}function del(req: NextApiRequest, res: NextApiResponse) {{}}\nexport default withMethods({{ DELETE: del }});"
        );
        let signatures = route(&source);
        assert_eq!(signatures[0].method, HttpMethod::Delete);
        assert_eq!(signatures[0].response, ResolvedType::Unknown);
    }

    #[test]
    fn test_helper_request_types() {
        let source = format!(
            "{NEXT_IMPORT}import type {{ NextApiRequestWithBodyAndQuery }} from 'nextpida-handler-types';\n\
             type Body = {{ title: string }};\n\
             const post = (req: NextApiRequestWithBodyAndQuery<Body, {{ page: number }}>, res: NextApiResponse<'ok'>) => {{}};\n\
             export default withMethods({{ POST: post }});"
        );
        let signatures = route(&source);
        assert_eq!(
            signatures[0].request,
            request_object(
                ResolvedType::Object(vec![Field::new("title", string())]),
                ResolvedType::Object(vec![Field::new(
                    "page",
                    ResolvedType::Primitive(PrimitiveKind::Number)
                )]),
            )
        );
        assert_eq!(
            signatures[0].response,
            ResolvedType::Literal(LiteralValue::String("ok".into()))
        );
    }

    #[test]
    fn test_intersection_request_override() {
        let source = format!(
            "{NEXT_IMPORT}type Req = Omit<NextApiRequest, 'body'> & {{ body: {{ id: number }}; query: any }};\n\
             const put = (req: Req, res: NextApiResponse) => {{}};\n\
             export default withMethods({{ PUT: put }});"
        );
        let signatures = route(&source);
        assert_eq!(
            signatures[0].request,
            request_object(
                ResolvedType::Object(vec![Field::new(
                    "id",
                    ResolvedType::Primitive(PrimitiveKind::Number)
                )]),
                ResolvedType::Unknown,
            )
        );
    }

    #[test]
    fn test_same_named_request_from_other_module_is_unknown() {
        let signatures = extract(&[
            (
                ROUTE,
                "import type { NextApiResponse } from 'next';\n\
                 import type { NextApiRequest } from '../../lib/fake';\n\
                 import { withMethods } from 'nextpida-method-handler';\n\
                 const get = (req: NextApiRequest, res: NextApiResponse<string>) => {};\n\
                 export default withMethods({ GET: get });",
            ),
            ("/app/lib/fake.ts", "export interface NextApiRequest { body: string }"),
        ]);
        assert_eq!(signatures[0].request, ResolvedType::Unknown);
        assert_eq!(signatures[0].response, string());

        let signatures = route(
            "import type { NextApiRequest } from 'other-framework';\n\
             import { withMethods } from 'nextpida-method-handler';\n\
             const get = (req: NextApiRequest, res: unknown) => {};\n\
             export default withMethods({ GET: get });",
        );
        assert_eq!(signatures[0].request, ResolvedType::Unknown);
    }

    #[test]
    fn test_middleware_wrapping() {
        let source = format!(
            "{NEXT_IMPORT}import {{ withAuth, withLogging, withCors }} from '../../lib/middleware';\n\
             async function get(req: NextApiRequest, res: NextApiResponse<number>) {{}}\n\
             const table = {{ GET: withAuth(withLogging(get)), POST: withAuth('admin', (req: NextApiRequest, res: NextApiResponse<boolean>) => {{}}) }};\n\
             export default withCors(withMethods(table));"
        );
        let signatures = route(&source);
        assert_eq!(signatures.len(), 2);
        assert_eq!(
            signatures[0].response,
            ResolvedType::Primitive(PrimitiveKind::Number)
        );
        assert_eq!(signatures[1].method, HttpMethod::Post);
        assert_eq!(
            signatures[1].response,
            ResolvedType::Primitive(PrimitiveKind::Boolean)
        );
    }

    #[test]
    fn test_exported_identifier_is_followed() {
        let source = format!(
            "{NEXT_IMPORT}const get = (req: NextApiRequest, res: NextApiResponse) => {{}};\n\
             const handler = withMethods({{ GET: get }});\n\
             export default handler;"
        );
        assert_eq!(route(&source).len(), 1);
    }

    #[test]
    fn test_unrecognized_keys_and_unresolved_handlers_are_skipped() {
        let source = format!(
            "{NEXT_IMPORT}const get = (req: NextApiRequest) => {{}};\n\
             const a = b;\nconst b = a;\n\
             const post = (req: NextApiRequest, res: NextApiResponse) => {{}};\n\
             export default withMethods({{ GET: get, PATCH: a, get: post, [key]: post, POST: post }});"
        );
        let signatures = route(&source);
        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].method, HttpMethod::Post);
    }

    #[test]
    fn test_zero_parameter_callee_is_rejected() {
        let source = format!(
            "{NEXT_IMPORT}function build() {{ return () => {{}}; }}\n\
             const get = (req: NextApiRequest, res: NextApiResponse) => {{}};\n\
             export default build({{ GET: get }});"
        );
        assert!(route(&source).is_empty());
    }
}
