//! Build orchestration: one full pass from configuration to artifact text.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{Configuration, TsConfig};
use crate::emit::Emit;
use crate::error::BuildError;
use crate::extractor::Extractor;
use crate::oracle::TypeOracle;
use crate::program::Program;
use crate::route;
use crate::synth::synthesize;

/// Build the artifact text for a project.
///
/// A fresh program is loaded on every call, so a build never sees state from
/// an earlier one. Only configuration problems fail a build.
pub fn build(config: &Configuration) -> Result<String, BuildError> {
    let tsconfig = TsConfig::load(&config.tsconfig_path)?;
    let roots = tsconfig.root_files()?;
    let program = Program::load(&roots, tsconfig.resolver());

    let routes: Vec<PathBuf> = program
        .root_files()
        .iter()
        .filter(|file| config.is_route_file(file))
        .cloned()
        .collect();
    info!(routes = routes.len(), "Building route types.");

    Ok(render(&program, config, &routes))
}

/// Render every route file's declarations, in file order, separated by blank
/// lines. Per handler: request alias and wrapper, then response alias and
/// wrapper.
pub fn render<O: TypeOracle + ?Sized>(
    oracle: &O,
    config: &Configuration,
    files: &[PathBuf],
) -> String {
    let extractor = Extractor::new(oracle, &config.framework);
    let mut definitions = Vec::new();

    for file in files {
        let route = route::parse(&config.input, file);
        let signatures = extractor.extract(file);
        debug!(
            file = %display_relative(&config.root_dir, file),
            route = %route.path,
            handlers = signatures.len(),
            "Route processed."
        );
        for signature in &signatures {
            definitions.extend(synthesize(&route, signature).iter().map(Emit::emit));
        }
    }

    definitions.join("\n\n")
}

fn display_relative(root: &Path, file: &Path) -> String {
    file.strip_prefix(root).unwrap_or(file).display().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::FrameworkTypes;

    fn config() -> Configuration {
        Configuration {
            root_dir: PathBuf::from("/app"),
            input: PathBuf::from("/app/pages/api"),
            output: PathBuf::from("/app/lib"),
            ignore_path: None,
            tsconfig_path: PathBuf::from("/app/tsconfig.json"),
            framework: FrameworkTypes::default(),
        }
    }

    const HANDLER: &str = "import type { NextApiRequest, NextApiResponse } from 'next';\n\
        import { withMethods } from 'nextpida-method-handler';\n\
        const get = (req: NextApiRequest, res: NextApiResponse<'a' | 'b'>) => {};\n\
        const post = (req: NextApiRequest, res: NextApiResponse) => {};\n\
        export default withMethods({ GET: get, POST: post });";

    #[test]
    fn test_render_order_and_layout() {
        let file = PathBuf::from("/app/pages/api/widgets/[id].ts");
        let program = Program::from_sources(vec![(file.clone(), HANDLER.to_string())]);
        let text = render(&program, &config(), &[file]);

        let expected = [
            "type GetApiWidgetsIdRequest = {\n  body: unknown;\n  query: {\n    id: string | number;\n  };\n};",
            "export interface GetRequest {\n  \"api/widgets/[id]\": GetApiWidgetsIdRequest;\n}",
            "type GetApiWidgetsIdResponse = \"a\" | \"b\";",
            "export interface GetResponse {\n  \"api/widgets/[id]\": GetApiWidgetsIdResponse;\n}",
            "type PostApiWidgetsIdRequest = {\n  body: unknown;\n  query: {\n    id: string | number;\n  };\n};",
            "export interface PostRequest {\n  \"api/widgets/[id]\": PostApiWidgetsIdRequest;\n}",
            "type PostApiWidgetsIdResponse = unknown;",
            "export interface PostResponse {\n  \"api/widgets/[id]\": PostApiWidgetsIdResponse;\n}",
        ]
        .join("\n\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_skips_files_without_handlers() {
        let route = PathBuf::from("/app/pages/api/health.ts");
        let program = Program::from_sources(vec![(
            route.clone(),
            "export default function health() {}".to_string(),
        )]);
        assert_eq!(render(&program, &config(), &[route]), "");
    }
}
