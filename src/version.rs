//! Persisted version and build number state.
//!
//! The state lives in a small YAML file:
//!
//! ```yaml
//! version: 1.2.3
//! build_number: 42
//! built_at: Mon 10 Oct 2026 14:03:11
//! ```
//!
//! Every bump rewrites the whole file before returning, so what is on disk
//! always matches what is in memory.

use std::{
    fmt,
    fs,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{BuildError, Result};

/// Display format of `built_at`.
pub const BUILT_AT_FORMAT: &str = "%a %m %b %Y %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPart {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for VersionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPart::Major => write!(f, "major"),
            VersionPart::Minor => write!(f, "minor"),
            VersionPart::Patch => write!(f, "patch"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Increment one component. Lower components are left as they are:
    /// `1.2.3` bumped on major gives `2.2.3`, not `2.0.0`. A component at
    /// `u64::MAX` is an error and leaves the version unchanged.
    pub fn bump(&mut self, part: VersionPart) -> Result<()> {
        let component = match part {
            VersionPart::Major => &mut self.major,
            VersionPart::Minor => &mut self.minor,
            VersionPart::Patch => &mut self.patch,
        };
        *component = increment(*component, &format!("{} version", part))?;
        Ok(())
    }
}

fn increment(value: u64, what: &str) -> Result<u64> {
    value
        .checked_add(1)
        .ok_or_else(|| BuildError::config(format!("{} {} cannot be incremented", what, value)))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(BuildError::config(format!(
                "version '{}' must have the form major.minor.patch",
                s
            )));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| {
                BuildError::config(format!(
                    "version '{}' has a non-numeric component '{}'",
                    s, part
                ))
            })?;
        }

        Ok(Version::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl TryFrom<String> for Version {
    type Error = BuildError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionState {
    pub version: Version,
    pub build_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<String>,
}

#[derive(Debug)]
pub struct VersionStore {
    path: PathBuf,
    state: VersionState,
}

impl VersionStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path).map_err(|e| {
            BuildError::config(format!(
                "cannot read version file {}: {}",
                path.display(),
                e
            ))
        })?;

        let state: VersionState = serde_yaml::from_str(&contents).map_err(|e| {
            BuildError::config(format!("malformed version file {}: {}", path.display(), e))
        })?;

        debug!(
            "Loaded version {} build {} from {}",
            state.version,
            state.build_number,
            path.display()
        );

        Ok(Self { path, state })
    }

    pub fn state(&self) -> &VersionState {
        &self.state
    }

    pub fn current_version(&self) -> String {
        self.state.version.to_string()
    }

    pub fn current_build_number(&self) -> u64 {
        self.state.build_number
    }

    pub fn built_at(&self) -> Option<&str> {
        self.state.built_at.as_deref()
    }

    pub fn bump_version(&mut self, part: VersionPart) -> Result<String> {
        let previous = self.state.clone();
        self.state.version.bump(part)?;
        self.persist_or_rollback(previous)?;
        debug!("Bumped {} version to {}", part, self.state.version);
        Ok(self.current_version())
    }

    pub fn bump_build_number(&mut self) -> Result<u64> {
        let previous = self.state.clone();
        self.state.build_number = increment(self.state.build_number, "build number")?;
        self.state.built_at = Some(Local::now().format(BUILT_AT_FORMAT).to_string());
        self.persist_or_rollback(previous)?;
        debug!("Bumped build number to {}", self.state.build_number);
        Ok(self.state.build_number)
    }

    fn persist_or_rollback(&mut self, previous: VersionState) -> Result<()> {
        if let Err(e) = write_state(&self.path, &self.state) {
            self.state = previous;
            return Err(e);
        }
        Ok(())
    }
}

/// Write to a sibling temp file and rename it over the target, so a crash
/// never leaves a truncated version file behind.
fn write_state(path: &Path, state: &VersionState) -> Result<()> {
    let yaml = serde_yaml::to_string(state)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BuildError::io(dir, e))?;
    tmp.write_all(yaml.as_bytes())
        .map_err(|e| BuildError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| BuildError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| BuildError::io(path, e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (TempDir, VersionStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("version.yml");
        fs::write(&path, contents).unwrap();
        let store = VersionStore::load(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn loads_state() {
        let (_dir, store) = store_with("version: 1.2.3\nbuild_number: 7\nbuilt_at: yesterday\n");

        assert_eq!(store.current_version(), "1.2.3");
        assert_eq!(store.current_build_number(), 7);
        assert_eq!(store.built_at(), Some("yesterday"));
    }

    #[test]
    fn built_at_is_optional() {
        let (_dir, store) = store_with("version: '0.1.0'\nbuild_number: 0\n");

        assert_eq!(store.current_version(), "0.1.0");
        assert_eq!(store.built_at(), None);
    }

    #[test]
    fn bump_patch() {
        let (_dir, mut store) = store_with("version: 1.2.3\nbuild_number: 1\n");
        assert_eq!(store.bump_version(VersionPart::Patch).unwrap(), "1.2.4");
    }

    #[test]
    fn bump_minor_keeps_patch() {
        let (_dir, mut store) = store_with("version: 1.2.3\nbuild_number: 1\n");
        assert_eq!(store.bump_version(VersionPart::Minor).unwrap(), "1.3.3");
    }

    // Bumps never reset lower components: 1.2.3 -> 2.2.3.
    #[test]
    fn bump_major_does_not_reset_lower_components() {
        let (_dir, mut store) = store_with("version: 1.2.3\nbuild_number: 1\n");
        assert_eq!(store.bump_version(VersionPart::Major).unwrap(), "2.2.3");
    }

    #[test]
    fn bump_is_persisted_immediately() {
        let (dir, mut store) = store_with("version: 1.2.3\nbuild_number: 5\n");
        store.bump_version(VersionPart::Patch).unwrap();

        let reloaded = VersionStore::load(dir.path().join("version.yml")).unwrap();
        assert_eq!(reloaded.state(), store.state());
        assert_eq!(reloaded.current_version(), "1.2.4");
        assert_eq!(reloaded.current_build_number(), 5);
    }

    #[test]
    fn bump_build_number_twice() {
        let (dir, mut store) = store_with("version: 1.0.0\nbuild_number: 10\n");

        assert_eq!(store.bump_build_number().unwrap(), 11);
        assert!(store.built_at().is_some());
        let first = VersionStore::load(dir.path().join("version.yml")).unwrap();
        assert_eq!(first.state(), store.state());

        assert_eq!(store.bump_build_number().unwrap(), 12);
        let second = VersionStore::load(dir.path().join("version.yml")).unwrap();
        assert_eq!(second.state(), store.state());
        assert_eq!(second.current_build_number(), 12);
        assert_eq!(second.current_version(), "1.0.0");
    }

    #[test]
    fn overflowing_bumps_are_rejected() {
        let (dir, mut store) =
            store_with("version: 1.18446744073709551615.3\nbuild_number: 18446744073709551615\n");
        let path = dir.path().join("version.yml");
        let before = fs::read_to_string(&path).unwrap();

        let err = store.bump_build_number().unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
        assert_eq!(store.current_build_number(), u64::MAX);
        assert_eq!(store.built_at(), None);

        let err = store.bump_version(VersionPart::Minor).unwrap_err();
        assert!(err.to_string().contains("minor version"));
        assert_eq!(store.current_version(), "1.18446744073709551615.3");

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = VersionStore::load(dir.path().join("version.yml")).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn malformed_files_are_config_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("version.yml");

        for contents in [
            "version: 1.2\nbuild_number: 1\n",
            "version: 1.2.x\nbuild_number: 1\n",
            "version: 1.2.3\n",
            "build_number: 1\n",
            "version: 1.2.3\nbuild_number: -1\n",
            "version: 1.2.3\nbuild_number: 1\nextra: true\n",
            "not yaml: [",
        ] {
            fs::write(&path, contents).unwrap();
            let err = VersionStore::load(&path).unwrap_err();
            assert!(matches!(err, BuildError::Config(_)), "accepted {:?}", contents);
        }
    }

    #[test]
    fn failed_write_rolls_back_memory() {
        let (dir, mut store) = store_with("version: 1.2.3\nbuild_number: 5\n");
        store.path = dir.path().join("missing-dir").join("version.yml");

        assert!(store.bump_build_number().is_err());
        assert_eq!(store.current_build_number(), 5);
        assert!(store.bump_version(VersionPart::Minor).is_err());
        assert_eq!(store.current_version(), "1.2.3");
    }
}
