//! Project configuration.
//!
//! Values are layered: explicit options (CLI flags) win over the optional
//! `routetypes.toml` at the project root, which wins over defaults. The
//! tsconfig is discovered by walking up from the root and is parsed as JSONC,
//! following relative `extends` chains.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::ConfigError;
use crate::program::{ModuleResolver, normalize_path};

const SETTINGS_FILENAME: &str = "routetypes.toml";
const DEFAULT_TSCONFIG: &str = "tsconfig.json";
const DEFAULT_OUTPUT_DIR: &str = "lib";
const DEFAULT_INCLUDE: &str = "**/*";
const DEFAULT_EXCLUDE: [&str; 3] = ["node_modules", "bower_components", "jspm_packages"];
const SKIPPED_DIR: &str = "node_modules";

/// Module and type names a handler's parameters are verified against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkTypes {
    /// Framework module exporting the request and response types
    pub module: String,
    /// Request type name
    pub request: String,
    /// Response type name
    pub response: String,
    /// Module exporting the typed request helpers
    pub helper_module: String,
}

impl Default for FrameworkTypes {
    fn default() -> Self {
        Self {
            module: "next".to_string(),
            request: "NextApiRequest".to_string(),
            response: "NextApiResponse".to_string(),
            helper_module: "nextpida-handler-types".to_string(),
        }
    }
}

/// Explicit configuration values, typically from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Project root; defaults to the current directory
    pub root_dir: Option<PathBuf>,
    /// Output directory; relative paths are resolved against the root
    pub output: Option<PathBuf>,
    /// Path excluded from route enumeration, relative to the root
    pub ignore_path: Option<PathBuf>,
    /// tsconfig file name or path
    pub tsconfig: Option<PathBuf>,
}

/// Optional `routetypes.toml` at the project root.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Settings {
    output: Option<PathBuf>,
    ignore_path: Option<PathBuf>,
    tsconfig: Option<PathBuf>,
    helper_module: Option<String>,
}

impl Settings {
    fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(SETTINGS_FILENAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Toml { path, source })
    }
}

/// Fully resolved configuration for one project.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Canonical project root
    pub root_dir: PathBuf,
    /// Root of the route files (`<root>/pages/api`)
    pub input: PathBuf,
    /// Directory the artifact is written to
    pub output: PathBuf,
    /// Absolute path excluded from enumeration and watching
    pub ignore_path: Option<PathBuf>,
    /// Discovered tsconfig
    pub tsconfig_path: PathBuf,
    /// Expected framework identities
    pub framework: FrameworkTypes,
}

impl Configuration {
    /// Resolve configuration from explicit options, the settings file and
    /// defaults. Fails when the root or the tsconfig cannot be found.
    pub fn load(options: ConfigOptions) -> Result<Self, ConfigError> {
        let requested = match options.root_dir {
            Some(root) => root,
            None => std::env::current_dir().map_err(|source| ConfigError::Root {
                path: PathBuf::from("."),
                source,
            })?,
        };
        let root_dir = fs::canonicalize(&requested).map_err(|source| ConfigError::Root {
            path: requested,
            source,
        })?;

        let settings = Settings::load(&root_dir)?;

        let output = options
            .output
            .or(settings.output)
            .map_or_else(|| root_dir.join(DEFAULT_OUTPUT_DIR), |p| root_dir.join(p));
        let ignore_path = options
            .ignore_path
            .or(settings.ignore_path)
            .map(|p| normalize_path(&root_dir.join(p)));
        let tsconfig = options
            .tsconfig
            .or(settings.tsconfig)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TSCONFIG));
        let tsconfig_path = find_tsconfig(&root_dir, &tsconfig)?;

        let mut framework = FrameworkTypes::default();
        if let Some(helper_module) = settings.helper_module {
            framework.helper_module = helper_module;
        }

        let config = Self {
            input: root_dir.join("pages").join("api"),
            output: normalize_path(&output),
            root_dir,
            ignore_path,
            tsconfig_path,
            framework,
        };
        debug!(
            root = %config.root_dir.display(),
            input = %config.input.display(),
            output = %config.output.display(),
            tsconfig = %config.tsconfig_path.display(),
            "Configuration resolved."
        );
        Ok(config)
    }

    /// Whether `path` lies under the ignore path.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_path
            .as_deref()
            .is_some_and(|ignored| path.starts_with(ignored))
    }

    /// Whether `path` is a route file: under the input directory, not ignored
    /// and not a declaration file.
    pub fn is_route_file(&self, path: &Path) -> bool {
        path.starts_with(&self.input) && !self.is_ignored(path) && !is_declaration_file(path)
    }
}

/// Locate the tsconfig: `name` relative to the root if it exists there,
/// otherwise the nearest ancestor directory containing a file of that name.
pub fn find_tsconfig(root: &Path, name: &Path) -> Result<PathBuf, ConfigError> {
    let direct = normalize_path(&root.join(name));
    if direct.is_file() {
        return Ok(direct);
    }
    if name.components().count() == 1 {
        if let Some(found) = root
            .ancestors()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
        {
            return Ok(found);
        }
    }
    Err(ConfigError::TsconfigNotFound {
        name: name.display().to_string(),
        start: root.to_path_buf(),
    })
}

// =============================================================================
// tsconfig
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawTsConfig {
    extends: Option<Extends>,
    compiler_options: RawCompilerOptions,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Extends {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawCompilerOptions {
    base_url: Option<String>,
    paths: Option<serde_json::Map<String, serde_json::Value>>,
    out_dir: Option<String>,
}

/// One config file's settings with relative paths already made absolute.
#[derive(Debug, Clone, Default)]
struct Layer {
    base_url: Option<PathBuf>,
    paths: Option<(PathBuf, Vec<(String, Vec<String>)>)>,
    out_dir: Option<PathBuf>,
    files: Option<Vec<PathBuf>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

impl Layer {
    fn from_raw(raw: RawTsConfig, dir: &Path) -> Self {
        let absolute = |p: &str| normalize_path(&dir.join(p));
        let patterns = |list: Vec<String>| -> Vec<String> {
            list.iter()
                .map(|p| absolute(p).to_string_lossy().into_owned())
                .collect()
        };
        let options = raw.compiler_options;
        Self {
            base_url: options.base_url.as_deref().map(absolute),
            paths: options.paths.map(|paths| {
                let entries = paths
                    .into_iter()
                    .map(|(pattern, targets)| {
                        let targets = targets
                            .as_array()
                            .map(|list| {
                                list.iter()
                                    .filter_map(|t| t.as_str().map(str::to_string))
                                    .collect()
                            })
                            .unwrap_or_default();
                        (pattern, targets)
                    })
                    .collect();
                (dir.to_path_buf(), entries)
            }),
            out_dir: options.out_dir.as_deref().map(absolute),
            files: raw
                .files
                .map(|files| files.iter().map(|f| absolute(f)).collect()),
            include: raw.include.map(patterns),
            exclude: raw.exclude.map(patterns),
        }
    }

    /// `self` with unset values taken from `base`.
    fn over(self, base: Self) -> Self {
        Self {
            base_url: self.base_url.or(base.base_url),
            paths: self.paths.or(base.paths),
            out_dir: self.out_dir.or(base.out_dir),
            files: self.files.or(base.files),
            include: self.include.or(base.include),
            exclude: self.exclude.or(base.exclude),
        }
    }
}

/// Parsed tsconfig with its `extends` chain applied.
#[derive(Debug, Clone)]
pub struct TsConfig {
    /// Config file path
    pub path: PathBuf,
    /// Absolute `compilerOptions.baseUrl`
    pub base_url: Option<PathBuf>,
    /// `compilerOptions.paths`, longest prefix first
    pub paths: Vec<(String, Vec<String>)>,
    /// Directory `paths` targets are relative to
    pub paths_base: Option<PathBuf>,
    /// Absolute `compilerOptions.outDir`
    pub out_dir: Option<PathBuf>,
    /// Explicit `files`
    pub files: Vec<PathBuf>,
    /// Absolute `include` patterns
    pub include: Vec<String>,
    /// Absolute `exclude` patterns
    pub exclude: Vec<String>,
}

impl TsConfig {
    /// Read and parse a tsconfig, following relative `extends`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path = normalize_path(path);
        let dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let layer = load_layer(&path, &mut Vec::new())?;

        let (paths_base, mut paths) = match layer.paths {
            Some((base, entries)) => (Some(layer.base_url.clone().unwrap_or(base)), entries),
            None => (None, Vec::new()),
        };
        paths.sort_by_key(|(pattern, _)| {
            std::cmp::Reverse(pattern.split('*').next().map_or(0, str::len))
        });

        let mut exclude = layer.exclude.unwrap_or_else(|| {
            DEFAULT_EXCLUDE
                .iter()
                .map(|d| dir.join(d).to_string_lossy().into_owned())
                .collect()
        });
        if let Some(out_dir) = &layer.out_dir {
            exclude.push(out_dir.to_string_lossy().into_owned());
        }

        Ok(Self {
            include: layer.include.unwrap_or_else(|| {
                vec![dir.join(DEFAULT_INCLUDE).to_string_lossy().into_owned()]
            }),
            exclude,
            files: layer.files.unwrap_or_default(),
            base_url: layer.base_url,
            paths,
            paths_base,
            out_dir: layer.out_dir,
            path,
        })
    }

    /// Module resolver honouring `baseUrl` and `paths`.
    pub fn resolver(&self) -> ModuleResolver {
        ModuleResolver::new(
            self.paths_base.clone().or_else(|| self.base_url.clone()),
            self.paths.clone(),
        )
    }

    /// Root file set: explicit `files`, then every `.ts`/`.tsx` file under the
    /// config directory matching `include` and not `exclude`, in sorted order.
    pub fn root_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let include = compile_patterns(&self.include)?;
        let exclude = compile_patterns(&self.exclude)?;
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        let matches_any = |patterns: &[Pattern], path: &Path| {
            patterns.iter().any(|p| p.matches_path_with(path, options))
        };

        let mut seen = HashSet::new();
        let mut files: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|f| f.is_file() && seen.insert((*f).clone()))
            .cloned()
            .collect();

        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == SKIPPED_DIR));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry: {err}");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !is_source_file(path) {
                continue;
            }
            if matches_any(&include, path) && !matches_any(&exclude, path) && seen.insert(path.to_path_buf()) {
                files.push(path.to_path_buf());
            }
        }

        debug!(tsconfig = %self.path.display(), files = files.len(), "Root files enumerated.");
        Ok(files)
    }
}

fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".d.ts"))
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "ts" || ext == "tsx")
}

/// A pattern naming a directory (no wildcard, no extension) matches everything below it.
fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            let last = pattern.rsplit('/').next().unwrap_or(pattern);
            let expanded = if last.contains('*') || last.contains('.') {
                pattern.clone()
            } else {
                format!("{}/**/*", pattern.trim_end_matches('/'))
            };
            Pattern::new(&expanded).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

fn load_layer(path: &Path, chain: &mut Vec<PathBuf>) -> Result<Layer, ConfigError> {
    if chain.iter().any(|p| p == path) {
        return Err(ConfigError::CircularExtends {
            path: path.to_path_buf(),
        });
    }
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut raw: RawTsConfig =
        serde_json::from_str(&strip_jsonc(&source)).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let bases = match raw.extends.take() {
        Some(Extends::One(base)) => vec![base],
        Some(Extends::Many(bases)) => bases,
        None => Vec::new(),
    };

    chain.push(path.to_path_buf());
    let mut inherited = Layer::default();
    for base in bases {
        if !(base.starts_with('.') || Path::new(&base).is_absolute()) {
            debug!(extends = %base, "Ignoring package tsconfig base.");
            continue;
        }
        let mut base_path = normalize_path(&dir.join(&base));
        if !base_path.is_file() && !base.ends_with(".json") {
            let mut with_ext = base_path.into_os_string();
            with_ext.push(".json");
            base_path = PathBuf::from(with_ext);
        }
        inherited = load_layer(&base_path, chain)?.over(inherited);
    }
    chain.pop();

    Ok(Layer::from_raw(raw, dir).over(inherited))
}

/// Strip `//` and `/* */` comments and trailing commas from JSONC text.
pub fn strip_jsonc(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            ']' | '}' => {
                let kept = out.trim_end().len();
                if out[..kept].ends_with(',') {
                    out.truncate(kept - 1);
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn project() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = fs::canonicalize(temp.path()).unwrap();
        (temp, root)
    }

    #[test]
    fn test_strip_jsonc() {
        let source = r#"{
            // line comment
            "a": "http://x/*y*/", /* block */
            "b": [1, 2,],
        }"#;
        let value: serde_json::Value = serde_json::from_str(&strip_jsonc(source)).unwrap();
        assert_eq!(value["a"], "http://x/*y*/");
        assert_eq!(value["b"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_load_defaults() {
        let (_temp, root) = project();
        write(&root, "tsconfig.json", "{}");

        let config = Configuration::load(ConfigOptions {
            root_dir: Some(root.clone()),
            ..ConfigOptions::default()
        })
        .unwrap();
        assert_eq!(config.input, root.join("pages/api"));
        assert_eq!(config.output, root.join("lib"));
        assert_eq!(config.tsconfig_path, root.join("tsconfig.json"));
        assert_eq!(config.ignore_path, None);
        assert_eq!(config.framework, FrameworkTypes::default());
    }

    #[test]
    fn test_settings_file_and_option_precedence() {
        let (_temp, root) = project();
        write(&root, "tsconfig.base.json", "{}");
        write(
            &root,
            SETTINGS_FILENAME,
            "output = \"generated\"\nignore_path = \"pages/api/internal\"\ntsconfig = \"tsconfig.base.json\"\nhelper_module = \"@acme/handler-types\"\n",
        );

        let config = Configuration::load(ConfigOptions {
            root_dir: Some(root.clone()),
            output: Some(PathBuf::from("out")),
            ..ConfigOptions::default()
        })
        .unwrap();
        assert_eq!(config.output, root.join("out"));
        assert_eq!(config.ignore_path, Some(root.join("pages/api/internal")));
        assert_eq!(config.tsconfig_path, root.join("tsconfig.base.json"));
        assert_eq!(config.framework.helper_module, "@acme/handler-types");
        assert!(config.is_ignored(&root.join("pages/api/internal/a.ts")));
        assert!(!config.is_route_file(&root.join("pages/api/internal/a.ts")));
        assert!(config.is_route_file(&root.join("pages/api/a.ts")));
    }

    #[test]
    fn test_declaration_files_are_not_routes() {
        let (_temp, root) = project();
        write(&root, "tsconfig.json", "{}");

        let config = Configuration::load(ConfigOptions {
            root_dir: Some(root.clone()),
            ..ConfigOptions::default()
        })
        .unwrap();
        assert!(!config.is_route_file(&root.join("pages/api/types.d.ts")));
        assert!(config.is_route_file(&root.join("pages/api/types.ts")));
        assert!(config.is_route_file(&root.join("pages/api/[id].tsx")));
    }

    #[test]
    fn test_malformed_settings_is_an_error() {
        let (_temp, root) = project();
        write(&root, "tsconfig.json", "{}");
        write(&root, SETTINGS_FILENAME, "outputs = 1\n");
        let err = Configuration::load(ConfigOptions {
            root_dir: Some(root),
            ..ConfigOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_tsconfig_found_in_ancestor() {
        let (_temp, root) = project();
        write(&root, "tsconfig.json", "{}");
        let app = root.join("apps/web");
        fs::create_dir_all(&app).unwrap();
        assert_eq!(
            find_tsconfig(&app, Path::new(DEFAULT_TSCONFIG)).unwrap(),
            root.join("tsconfig.json")
        );
        assert!(matches!(
            find_tsconfig(&app, Path::new("missing.json")),
            Err(ConfigError::TsconfigNotFound { .. })
        ));
    }

    #[test]
    fn test_extends_chain_merges() {
        let (_temp, root) = project();
        write(
            &root,
            "config/base.json",
            r#"{ "compilerOptions": { "baseUrl": "..", "paths": { "@/*": ["src/*"] } }, "include": ["../src"] }"#,
        );
        let path = write(
            &root,
            "tsconfig.json",
            r#"{ "extends": "./config/base", "compilerOptions": { "outDir": "dist" }, }"#,
        );
        let tsconfig = TsConfig::load(&path).unwrap();
        assert_eq!(tsconfig.base_url, Some(root.clone()));
        assert_eq!(tsconfig.paths_base, Some(root.clone()));
        assert_eq!(tsconfig.include, vec![root.join("src").to_string_lossy().into_owned()]);
        assert_eq!(tsconfig.out_dir, Some(root.join("dist")));
    }

    #[test]
    fn test_circular_extends() {
        let (_temp, root) = project();
        write(&root, "a.json", r#"{ "extends": "./b.json" }"#);
        let path = write(&root, "b.json", r#"{ "extends": "./a.json" }"#);
        assert!(matches!(
            TsConfig::load(&path),
            Err(ConfigError::CircularExtends { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let (_temp, root) = project();
        let path = write(&root, "tsconfig.json", "{ compilerOptions: }");
        assert!(matches!(TsConfig::load(&path), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_root_files_respect_include_and_exclude() {
        let (_temp, root) = project();
        let path = write(
            &root,
            "tsconfig.json",
            r#"{ "compilerOptions": { "outDir": "dist" }, "exclude": ["pages/api/skip.ts"] }"#,
        );
        write(&root, "pages/api/b.ts", "");
        write(&root, "pages/api/a/[id].tsx", "");
        write(&root, "pages/api/skip.ts", "");
        write(&root, "pages/api/readme.md", "");
        write(&root, "dist/out.ts", "");
        write(&root, "node_modules/pkg/index.ts", "");

        let files = TsConfig::load(&path).unwrap().root_files().unwrap();
        assert_eq!(
            files,
            vec![root.join("pages/api/a/[id].tsx"), root.join("pages/api/b.ts")]
        );
    }
}
