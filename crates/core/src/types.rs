//! Data model shared by the extraction pipeline.
//!
//! - ResolvedType: canonical declaration tree produced by the encoder
//! - RouteParam / RouteDescriptor: positional parameters implied by a file path
//! - HandlerSignature: request and response shapes of one HTTP method
//! - DeclarationRecord: a named declaration ready for rendering

use std::fmt;
use std::str::FromStr;

// =============================================================================
// Resolved types
// =============================================================================

/// Canonical representation of a handler's request or response shape.
///
/// `Unknown` is the universal fallback for anything that cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    /// string, number, boolean, undefined
    Primitive(PrimitiveKind),
    /// Literal type: "foo", 42, true
    Literal(LiteralValue),
    /// Union in the order the oracle enumerates its members
    Union(Vec<ResolvedType>),
    /// Array over an element type: T[]
    Array(Box<ResolvedType>),
    /// Object shape in member order; duplicate names are kept
    Object(Vec<Field>),
    /// Anything unrepresentable. Never recursed into.
    Unknown,
}

impl ResolvedType {
    /// `string | number`, the type of a single route parameter.
    pub fn string_or_number() -> Self {
        Self::Union(vec![
            Self::Primitive(PrimitiveKind::String),
            Self::Primitive(PrimitiveKind::Number),
        ])
    }

    /// Look up the first field with the given name on an object shape.
    pub fn field(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Object(fields) => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Check if this is the `Unknown` fallback.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Primitive kinds the encoder recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// string
    String,
    /// number
    Number,
    /// boolean
    Boolean,
    /// undefined
    Undefined,
}

/// Literal values, preserving the exact value reported by the oracle.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// String literal
    String(String),
    /// Numeric literal
    Number(f64),
    /// `true` or `false`
    Bool(bool),
}

/// Object member.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Property name as declared
    pub name: String,
    /// Encoded property type
    pub ty: ResolvedType,
    /// Declared with `?`
    pub optional: bool,
}

impl Field {
    /// Required field.
    pub fn new(name: impl Into<String>, ty: ResolvedType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }
}

// =============================================================================
// HTTP methods
// =============================================================================

/// The nine HTTP verbs recognized as method-table keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// CONNECT
    Connect,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
    /// PATCH
    Patch,
}

impl HttpMethod {
    /// All recognized verbs.
    pub const ALL: [Self; 9] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Connect,
        Self::Options,
        Self::Trace,
        Self::Patch,
    ];

    /// Method-table key, upper-case.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unrecognized HTTP method: {s}"))
    }
}

// =============================================================================
// Routes and handlers
// =============================================================================

/// Positional parameter implied by a bracketed path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParam {
    /// Parameter name without bracket markup
    pub name: String,
    /// Catch-all segment (`[...name]` or `[[...name]]`)
    pub is_array: bool,
    /// Optional catch-all segment (`[[...name]]`)
    pub is_optional: bool,
}

impl RouteParam {
    /// Query field describing this parameter.
    pub fn to_field(&self) -> Field {
        let ty = if self.is_array {
            ResolvedType::Array(Box::new(ResolvedType::string_or_number()))
        } else {
            ResolvedType::string_or_number()
        };
        Field {
            name: self.name.clone(),
            ty,
            optional: self.is_optional,
        }
    }
}

/// Route key plus its positional parameters in path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Namespaced route key, e.g. `api/widgets/[id]`
    pub path: String,
    /// Parameters in segment order
    pub params: Vec<RouteParam>,
}

/// Request and response shapes of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSignature {
    /// Method-table key
    pub method: HttpMethod,
    /// `{ body, query }` for recognized requests, `Unknown` otherwise
    pub request: ResolvedType,
    /// Encoded response payload type
    pub response: ResolvedType,
}

/// Which side of the exchange a declaration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Request declaration
    Request,
    /// Response declaration
    Response,
}

impl Verb {
    /// Suffix appended to declaration names.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Request => "Request",
            Self::Response => "Response",
        }
    }
}

/// Named declaration for one (method, route, verb) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationRecord {
    /// Deterministic name, e.g. `GetApiWidgetsIdRequest`
    pub name: String,
    /// Declared shape
    pub body: ResolvedType,
    /// Route key used by the index wrapper
    pub route_key: String,
    /// Method the declaration belongs to
    pub method: HttpMethod,
    /// Request or response
    pub verb: Verb,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse() {
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("get".parse::<HttpMethod>().is_err());
        assert!("default".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_route_param_fields() {
        let optional = RouteParam {
            name: "slugs".into(),
            is_array: true,
            is_optional: true,
        };
        let field = optional.to_field();
        assert!(field.optional);
        assert_eq!(
            field.ty,
            ResolvedType::Array(Box::new(ResolvedType::string_or_number()))
        );
    }
}
