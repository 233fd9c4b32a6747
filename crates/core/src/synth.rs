//! Declaration synthesis: one request and one response record per handler.

use crate::naming::declaration_name;
use crate::types::{
    DeclarationRecord, HandlerSignature, ResolvedType, RouteDescriptor, RouteParam, Verb,
};

/// Request and response declarations for one handler on one route.
pub fn synthesize(route: &RouteDescriptor, signature: &HandlerSignature) -> [DeclarationRecord; 2] {
    let record = |verb: Verb, body: ResolvedType| DeclarationRecord {
        name: declaration_name(&route.path, signature.method, verb),
        body,
        route_key: route.path.clone(),
        method: signature.method,
        verb,
    };
    [
        record(
            Verb::Request,
            with_route_params(signature.request.clone(), &route.params),
        ),
        record(Verb::Response, signature.response.clone()),
    ]
}

/// Fold route parameters into the request's `query` field. An unknown query
/// is replaced by the parameters; an object query gets them appended.
fn with_route_params(request: ResolvedType, params: &[RouteParam]) -> ResolvedType {
    let ResolvedType::Object(mut fields) = request else {
        return request;
    };
    if let Some(query) = fields.iter_mut().find(|field| field.name == "query") {
        let route_fields = params.iter().map(RouteParam::to_field);
        match &mut query.ty {
            ty if ty.is_unknown() => *ty = ResolvedType::Object(route_fields.collect()),
            ResolvedType::Object(existing) => existing.extend(route_fields),
            _ => {}
        }
    }
    ResolvedType::Object(fields)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{Field, HttpMethod, PrimitiveKind};

    fn route(params: Vec<RouteParam>) -> RouteDescriptor {
        RouteDescriptor {
            path: "api/widgets/[id]".into(),
            params,
        }
    }

    fn id_param() -> RouteParam {
        RouteParam {
            name: "id".into(),
            is_array: false,
            is_optional: false,
        }
    }

    fn request(query: ResolvedType) -> ResolvedType {
        ResolvedType::Object(vec![
            Field::new("body", ResolvedType::Unknown),
            Field::new("query", query),
        ])
    }

    fn signature(method: HttpMethod, request: ResolvedType) -> HandlerSignature {
        HandlerSignature {
            method,
            request,
            response: ResolvedType::Primitive(PrimitiveKind::String),
        }
    }

    #[test]
    fn test_unknown_query_is_replaced() {
        let [req, res] = synthesize(
            &route(vec![id_param()]),
            &signature(HttpMethod::Get, request(ResolvedType::Unknown)),
        );
        assert_eq!(req.name, "GetApiWidgetsIdRequest");
        assert_eq!(req.verb, Verb::Request);
        assert_eq!(
            req.body.field("query").unwrap().ty,
            ResolvedType::Object(vec![Field::new("id", ResolvedType::string_or_number())])
        );
        assert_eq!(res.name, "GetApiWidgetsIdResponse");
        assert_eq!(res.body, ResolvedType::Primitive(PrimitiveKind::String));
    }

    #[test]
    fn test_object_query_is_extended_without_dedup() {
        let declared = ResolvedType::Object(vec![
            Field::new("id", ResolvedType::Primitive(PrimitiveKind::Number)),
            Field::new("page", ResolvedType::Primitive(PrimitiveKind::Number)),
        ]);
        let [req, _] = synthesize(
            &route(vec![id_param()]),
            &signature(HttpMethod::Put, request(declared)),
        );
        let ResolvedType::Object(fields) = &req.body.field("query").unwrap().ty else {
            unreachable!();
        };
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "page", "id"]);
    }

    #[test]
    fn test_unverified_request_stays_unknown() {
        let [req, _] = synthesize(
            &route(vec![id_param()]),
            &signature(HttpMethod::Get, ResolvedType::Unknown),
        );
        assert!(req.body.is_unknown());
    }

    #[test]
    fn test_names_differ_only_by_method() {
        let r = route(vec![id_param()]);
        let [get, _] = synthesize(&r, &signature(HttpMethod::Get, ResolvedType::Unknown));
        let [post, _] = synthesize(&r, &signature(HttpMethod::Post, ResolvedType::Unknown));
        assert_eq!(get.name.strip_prefix("Get"), post.name.strip_prefix("Post"));
        assert_eq!(get.route_key, post.route_key);
    }
}
