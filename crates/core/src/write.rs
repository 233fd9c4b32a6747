//! Artifact persistence.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BuildError;

/// File name of the generated artifact inside the output directory.
pub const ARTIFACT_FILENAME: &str = "$apis.ts";

/// What [`write_artifact`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Content changed and was written to the path
    Written(PathBuf),
    /// Existing content already matched; nothing was written
    Unchanged(PathBuf),
}

impl WriteOutcome {
    /// Artifact path.
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(path) | Self::Unchanged(path) => path,
        }
    }
}

/// Write `content` to `<output_dir>/$apis.ts` unless the existing file already
/// holds the same trimmed text. The output directory is created if missing.
pub fn write_artifact(output_dir: &Path, content: &str) -> Result<WriteOutcome, BuildError> {
    let path = output_dir.join(ARTIFACT_FILENAME);
    let content = content.trim();

    if let Ok(existing) = fs::read_to_string(&path) {
        if existing.trim() == content {
            debug!(path = %path.display(), "Artifact unchanged, skipping write.");
            return Ok(WriteOutcome::Unchanged(path));
        }
    }

    fs::create_dir_all(output_dir).map_err(|source| BuildError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, content).map_err(|source| BuildError::Write {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "Artifact written.");
    Ok(WriteOutcome::Written(path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_directory_and_trims() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("lib/generated");

        let outcome = write_artifact(&output, "\ntype A = string;\n\n").unwrap();
        assert_eq!(outcome, WriteOutcome::Written(output.join(ARTIFACT_FILENAME)));
        assert_eq!(
            fs::read_to_string(outcome.path()).unwrap(),
            "type A = string;"
        );
    }

    #[test]
    fn test_unchanged_content_is_not_rewritten() {
        let temp = TempDir::new().unwrap();
        write_artifact(temp.path(), "type A = string;").unwrap();

        let outcome = write_artifact(temp.path(), "type A = string;\n").unwrap();
        assert!(matches!(outcome, WriteOutcome::Unchanged(_)));

        let outcome = write_artifact(temp.path(), "type A = number;").unwrap();
        assert!(matches!(outcome, WriteOutcome::Written(_)));
        assert_eq!(
            fs::read_to_string(outcome.path()).unwrap(),
            "type A = number;"
        );
    }
}
