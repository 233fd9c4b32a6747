//! Module specifier resolution.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

const EXTENSIONS: [&str; 3] = [".ts", ".tsx", ".d.ts"];
const INDEX_FILES: [&str; 3] = ["index.ts", "index.tsx", "index.d.ts"];

/// Maps import specifiers to source files inside the project.
///
/// Relative specifiers are resolved against the importing file. Non-relative
/// specifiers go through tsconfig `paths` and `baseUrl`; anything left over is
/// a package and stays external.
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    base_url: Option<PathBuf>,
    paths: Vec<(String, Vec<String>)>,
}

impl ModuleResolver {
    /// Resolver honouring `compilerOptions.baseUrl` and `compilerOptions.paths`.
    pub fn new(base_url: Option<PathBuf>, paths: Vec<(String, Vec<String>)>) -> Self {
        Self { base_url, paths }
    }

    /// Resolve `specifier` imported from `from`. `exists` decides which
    /// candidate files are available.
    pub fn resolve(
        &self,
        from: &Path,
        specifier: &str,
        exists: impl Fn(&Path) -> bool,
    ) -> Option<PathBuf> {
        if is_relative(specifier) {
            let dir = from.parent().unwrap_or_else(|| Path::new(""));
            return probe(&normalize_path(&dir.join(specifier)), &exists);
        }

        let base = self.base_url.as_deref()?;
        for (pattern, targets) in &self.paths {
            let Some(captured) = match_pattern(pattern, specifier) else {
                continue;
            };
            for target in targets {
                let candidate = normalize_path(&base.join(target.replacen('*', captured, 1)));
                if let Some(found) = probe(&candidate, &exists) {
                    return Some(found);
                }
            }
        }
        probe(&normalize_path(&base.join(specifier)), &exists)
    }
}

/// Whether a specifier is relative to the importing file.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

fn match_pattern<'s>(pattern: &str, specifier: &'s str) -> Option<&'s str> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => specifier
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix)),
        None => (pattern == specifier).then_some(""),
    }
}

fn probe(base: &Path, exists: &impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let has_source_ext = base
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "ts" || ext == "tsx");
    if has_source_ext && exists(base) {
        return Some(base.to_path_buf());
    }

    // ESM-style `./foo.js` refers to `./foo.ts`
    let stem = match base.extension().and_then(|ext| ext.to_str()) {
        Some("js" | "jsx") => base.with_extension(""),
        _ => base.to_path_buf(),
    };

    for ext in EXTENSIONS {
        let mut candidate = OsString::from(stem.as_os_str());
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if exists(&candidate) {
            return Some(candidate);
        }
    }
    INDEX_FILES
        .iter()
        .map(|index| base.join(index))
        .find(|candidate| exists(candidate))
}

/// Lexically normalize a path: drop `.` components and fold `..`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn files(paths: &[&str]) -> HashSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/app/pages/api/../../lib/./types.ts")),
            PathBuf::from("/app/lib/types.ts")
        );
    }

    #[test]
    fn test_resolve_relative_candidates() {
        let available = files(&["/app/lib/types.ts", "/app/lib/models/index.tsx"]);
        let resolver = ModuleResolver::default();
        let from = Path::new("/app/pages/api/widgets.ts");
        let exists = |p: &Path| available.contains(p);

        assert_eq!(
            resolver.resolve(from, "../../lib/types", exists),
            Some(PathBuf::from("/app/lib/types.ts"))
        );
        assert_eq!(
            resolver.resolve(from, "../../lib/types.js", exists),
            Some(PathBuf::from("/app/lib/types.ts"))
        );
        assert_eq!(
            resolver.resolve(from, "../../lib/models", exists),
            Some(PathBuf::from("/app/lib/models/index.tsx"))
        );
        assert_eq!(resolver.resolve(from, "next", exists), None);
    }

    #[test]
    fn test_resolve_paths_mapping() {
        let available = files(&["/app/src/lib/types.ts"]);
        let resolver = ModuleResolver::new(
            Some(PathBuf::from("/app")),
            vec![("@/*".to_string(), vec!["src/*".to_string()])],
        );
        let from = Path::new("/app/pages/api/widgets.ts");
        assert_eq!(
            resolver.resolve(from, "@/lib/types", |p: &Path| available.contains(p)),
            Some(PathBuf::from("/app/src/lib/types.ts"))
        );
        assert_eq!(
            resolver.resolve(from, "next", |p: &Path| available.contains(p)),
            None
        );
    }
}
