//! TypeScript rendering via the Emit trait.
//!
//! Each declaration renders as a type alias followed by its route-index
//! wrapper. Wrappers share one name per (method, verb) so that TypeScript
//! interface merging aggregates every route into a single lookup type.

use crate::naming::{escape_ts_string, index_name, quote_if_needed};
use crate::types::{DeclarationRecord, LiteralValue, PrimitiveKind, ResolvedType};

const INDENT: &str = "  ";

/// Trait for emitting TypeScript source from the data model.
pub trait Emit {
    /// Convert the node to its TypeScript string representation.
    fn emit(&self) -> String;
}

// =============================================================================
// Primitive Types
// =============================================================================

impl Emit for PrimitiveKind {
    fn emit(&self) -> String {
        match self {
            PrimitiveKind::String => "string".to_string(),
            PrimitiveKind::Number => "number".to_string(),
            PrimitiveKind::Boolean => "boolean".to_string(),
            PrimitiveKind::Undefined => "undefined".to_string(),
        }
    }
}

impl Emit for LiteralValue {
    fn emit(&self) -> String {
        match self {
            LiteralValue::String(s) => format!("\"{}\"", escape_ts_string(s)),
            LiteralValue::Number(n) => format_number(*n),
            LiteralValue::Bool(b) => b.to_string(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// =============================================================================
// Types
// =============================================================================

impl Emit for ResolvedType {
    fn emit(&self) -> String {
        self.emit_at(0)
    }
}

impl ResolvedType {
    /// Render at a nesting depth; object members indent one level deeper.
    pub fn emit_at(&self, depth: usize) -> String {
        match self {
            ResolvedType::Primitive(p) => p.emit(),
            ResolvedType::Literal(lit) => lit.emit(),
            ResolvedType::Unknown => "unknown".to_string(),
            ResolvedType::Union(members) if members.is_empty() => "never".to_string(),
            ResolvedType::Union(members) => members
                .iter()
                .map(|m| m.emit_at(depth))
                .collect::<Vec<_>>()
                .join(" | "),
            ResolvedType::Array(inner) => {
                let inner_str = inner.emit_at(depth);
                // Wrap unions in parentheses
                if matches!(**inner, ResolvedType::Union(ref m) if m.len() > 1) {
                    format!("({inner_str})[]")
                } else {
                    format!("{inner_str}[]")
                }
            }
            ResolvedType::Object(fields) if fields.is_empty() => "{}".to_string(),
            ResolvedType::Object(fields) => {
                let pad = INDENT.repeat(depth + 1);
                let mut output = String::from("{\n");
                for field in fields {
                    let opt = if field.optional { "?" } else { "" };
                    output.push_str(&format!(
                        "{pad}{}{opt}: {};\n",
                        quote_if_needed(&field.name),
                        field.ty.emit_at(depth + 1)
                    ));
                }
                output.push_str(&INDENT.repeat(depth));
                output.push('}');
                output
            }
        }
    }
}

// =============================================================================
// Declarations
// =============================================================================

impl Emit for DeclarationRecord {
    /// Type alias, a blank line, then the exported route-index interface.
    fn emit(&self) -> String {
        let alias = format!("type {} = {};", self.name, self.body.emit());
        let wrapper = format!(
            "export interface {} {{\n{INDENT}\"{}\": {};\n}}",
            index_name(self.method, self.verb),
            escape_ts_string(&self.route_key),
            self.name
        );
        format!("{alias}\n\n{wrapper}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{Field, HttpMethod, Verb};

    #[test]
    fn test_emit_primitive() {
        assert_eq!(PrimitiveKind::String.emit(), "string");
        assert_eq!(PrimitiveKind::Number.emit(), "number");
        assert_eq!(PrimitiveKind::Boolean.emit(), "boolean");
        assert_eq!(PrimitiveKind::Undefined.emit(), "undefined");
    }

    #[test]
    fn test_emit_literal() {
        assert_eq!(LiteralValue::String("ok".into()).emit(), "\"ok\"");
        assert_eq!(LiteralValue::Number(42.0).emit(), "42");
        assert_eq!(LiteralValue::Number(-1.5).emit(), "-1.5");
        assert_eq!(LiteralValue::Bool(false).emit(), "false");
    }

    #[test]
    fn test_emit_union_array() {
        let ty = ResolvedType::Array(Box::new(ResolvedType::string_or_number()));
        assert_eq!(ty.emit(), "(string | number)[]");

        let plain = ResolvedType::Array(Box::new(ResolvedType::Primitive(PrimitiveKind::String)));
        assert_eq!(plain.emit(), "string[]");
    }

    #[test]
    fn test_emit_empty_shapes() {
        assert_eq!(ResolvedType::Union(vec![]).emit(), "never");
        assert_eq!(ResolvedType::Object(vec![]).emit(), "{}");
    }

    #[test]
    fn test_emit_nested_object() {
        let ty = ResolvedType::Object(vec![
            Field::new("body", ResolvedType::Unknown),
            Field::new(
                "query",
                ResolvedType::Object(vec![Field {
                    name: "slugs".into(),
                    ty: ResolvedType::Array(Box::new(ResolvedType::string_or_number())),
                    optional: true,
                }]),
            ),
            Field::new("content-type", ResolvedType::Primitive(PrimitiveKind::String)),
        ]);
        assert_eq!(
            ty.emit(),
            "{\n  body: unknown;\n  query: {\n    slugs?: (string | number)[];\n  };\n  \"content-type\": string;\n}"
        );
    }

    #[test]
    fn test_emit_declaration_record() {
        let record = DeclarationRecord {
            name: "GetApiWidgetsIdResponse".into(),
            body: ResolvedType::Primitive(PrimitiveKind::String),
            route_key: "api/widgets/[id]".into(),
            method: HttpMethod::Get,
            verb: Verb::Response,
        };
        assert_eq!(
            record.emit(),
            "type GetApiWidgetsIdResponse = string;\n\nexport interface GetResponse {\n  \"api/widgets/[id]\": GetApiWidgetsIdResponse;\n}"
        );
    }
}
