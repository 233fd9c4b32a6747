//! Route segment parsing for file-system routes.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{RouteDescriptor, RouteParam};

/// Namespace prefixed to every route key.
pub const ROUTE_NAMESPACE: &str = "api";

static DYNAMIC: LazyLock<Regex> = LazyLock::new(|| segment_regex(r"^\[(\w+)\]$"));
static CATCH_ALL: LazyLock<Regex> = LazyLock::new(|| segment_regex(r"^\[\.\.\.(\w+)\]$"));
static OPTIONAL_CATCH_ALL: LazyLock<Regex> =
    LazyLock::new(|| segment_regex(r"^\[\[\.\.\.(\w+)\]\]$"));

#[allow(clippy::expect_used)]
fn segment_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("route segment pattern should be valid")
}

/// Route key and parameters for a file under `root_dir`.
///
/// `pages/api/widgets/[id].ts` under `pages/api` gives `api/widgets/[id]` with
/// one required `id` parameter; an `index` leaf maps to its directory.
pub fn parse(root_dir: &Path, file: &Path) -> RouteDescriptor {
    let relative = file.strip_prefix(root_dir).unwrap_or(file);

    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if let Some(leaf) = segments.pop() {
        let stem = Path::new(&leaf)
            .file_stem()
            .map_or_else(|| leaf.clone(), |stem| stem.to_string_lossy().into_owned());
        if stem != "index" {
            segments.push(stem);
        }
    }

    let params = segments.iter().filter_map(|s| segment_param(s)).collect();
    RouteDescriptor {
        path: format!("{ROUTE_NAMESPACE}/{}", segments.join("/")),
        params,
    }
}

/// Parameter implied by one path segment, if it is bracketed.
pub fn segment_param(segment: &str) -> Option<RouteParam> {
    let param = |re: &Regex, is_array: bool, is_optional: bool| {
        re.captures(segment).map(|caps| RouteParam {
            name: caps[1].to_string(),
            is_array,
            is_optional,
        })
    };
    param(&DYNAMIC, false, false)
        .or_else(|| param(&CATCH_ALL, true, false))
        .or_else(|| param(&OPTIONAL_CATCH_ALL, true, true))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn route(file: &str) -> RouteDescriptor {
        parse(Path::new("/app/pages/api"), Path::new(file))
    }

    #[test]
    fn test_plain_and_index_routes() {
        assert_eq!(route("/app/pages/api/widgets.ts").path, "api/widgets");
        assert_eq!(route("/app/pages/api/widgets/index.ts").path, "api/widgets");
        assert_eq!(route("/app/pages/api/index.ts").path, "api/");
        assert!(route("/app/pages/api/widgets.ts").params.is_empty());
    }

    #[test]
    fn test_dynamic_segment() {
        let r = route("/app/pages/api/widgets/[id].ts");
        assert_eq!(r.path, "api/widgets/[id]");
        assert_eq!(
            r.params,
            vec![RouteParam {
                name: "id".into(),
                is_array: false,
                is_optional: false,
            }]
        );
    }

    #[test]
    fn test_catch_all_segments() {
        let r = route("/app/pages/api/docs/[...slugs].tsx");
        assert_eq!(r.path, "api/docs/[...slugs]");
        assert!(r.params[0].is_array && !r.params[0].is_optional);

        let r = route("/app/pages/api/docs/[[...slugs]].ts");
        assert_eq!(r.path, "api/docs/[[...slugs]]");
        assert!(r.params[0].is_array && r.params[0].is_optional);
    }

    #[test]
    fn test_params_in_segment_order() {
        let r = route("/app/pages/api/[org]/projects/[project]/index.ts");
        let names: Vec<&str> = r.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["org", "project"]);
    }

    #[test]
    fn test_non_matching_brackets_pass_through() {
        assert_eq!(segment_param("[a-b]"), None);
        assert_eq!(segment_param("[...]"), None);
        assert_eq!(segment_param("prefix[id]"), None);
    }
}
