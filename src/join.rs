use std::{
    collections::HashSet,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use glob::glob;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{BuildError, Result};

/// Concatenates files into one output, optionally headed by the license file.
#[derive(Debug, Clone)]
pub struct FileJoiner {
    license_file: PathBuf,
}

impl FileJoiner {
    pub fn new(license_file: impl Into<PathBuf>) -> Self {
        Self {
            license_file: license_file.into(),
        }
    }

    /// Write `files` into `target` in the given order.
    ///
    /// Every input is checked before anything is written, and the output is
    /// assembled in a sibling temp file that only replaces `target` once all
    /// inputs were read. A failed join leaves any existing target untouched.
    /// Each file's bytes are written as-is, followed by a newline unless the
    /// file already ends with one.
    pub fn join(&self, target: &Path, files: &[PathBuf], prepend_license: bool) -> Result<()> {
        let mut inputs: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        if prepend_license {
            inputs.insert(0, &self.license_file);
        }

        let missing: Vec<PathBuf> = inputs
            .iter()
            .filter(|path| !path.is_file())
            .map(|path| path.to_path_buf())
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingFiles { paths: missing });
        }

        debug!("Joining {} files into {}", inputs.len(), target.display());

        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir).map_err(|e| BuildError::io(dir, e))?;
        let mut writer = BufWriter::new(tmp);

        for input in &inputs {
            let contents = fs::read(input).map_err(|e| BuildError::io(*input, e))?;
            writer
                .write_all(&contents)
                .map_err(|e| BuildError::io(target, e))?;
            if contents.last() != Some(&b'\n') {
                writer
                    .write_all(b"\n")
                    .map_err(|e| BuildError::io(target, e))?;
            }
        }

        let tmp = writer
            .into_inner()
            .map_err(|e| BuildError::io(target, e.into_error()))?;
        tmp.persist(target)
            .map_err(|e| BuildError::io(target, e.error))?;
        Ok(())
    }
}

/// Expand glob patterns in an ordered source list.
///
/// Patterns are replaced in place by their sorted matches; literal paths are
/// kept verbatim even when absent so the joiner can report them. A path that
/// shows up twice is only kept the first time.
pub fn expand_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    let mut seen = HashSet::new();

    for path in paths {
        let path_str = path.to_string_lossy();

        if is_glob_pattern(&path_str) {
            for expanded in expand_single_glob(&path_str)? {
                if expanded.is_file() && seen.insert(expanded.clone()) {
                    result.push(expanded);
                }
            }
        } else if seen.insert(path.clone()) {
            result.push(path.clone());
        }
    }

    Ok(result)
}

fn is_glob_pattern(path: &str) -> bool {
    path.contains('*') || path.contains('?') || path.contains('[')
}

fn expand_single_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern)
        .map_err(|e| BuildError::config(format!("invalid source pattern '{}': {}", pattern, e)))?;

    let mut matches = paths
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BuildError::io(e.path().to_path_buf(), e.into_error()))?;
    matches.sort();
    Ok(matches)
}
