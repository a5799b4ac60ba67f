use std::{collections::BTreeSet, fs, path::Path};

use chrono::Local;

use crate::{
    config::{BRACED_VAR, ProjectConfig},
    error::{BuildError, Result},
    version::VersionStore,
};

/// Display format of the `date` placeholder.
pub const DATE_FORMAT: &str = "%d %b %Y %H:%M:%S";

/// The closed set of values a license template may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseContext {
    pub project_name: String,
    pub project_description: String,
    pub project_version: String,
    pub build_number: u64,
    pub date: String,
}

impl LicenseContext {
    pub const KEYS: [&'static str; 5] = [
        "project_name",
        "project_description",
        "project_version",
        "build_number",
        "date",
    ];

    pub fn new(config: &ProjectConfig, versions: &VersionStore) -> Self {
        Self {
            project_name: config.name.clone(),
            project_description: config.description.clone(),
            project_version: versions.current_version(),
            build_number: versions.current_build_number(),
            date: Local::now().format(DATE_FORMAT).to_string(),
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "project_name" => Some(self.project_name.clone()),
            "project_description" => Some(self.project_description.clone()),
            "project_version" => Some(self.project_version.clone()),
            "build_number" => Some(self.build_number.to_string()),
            "date" => Some(self.date.clone()),
            _ => None,
        }
    }
}

/// Check that a template only uses `${key}` placeholders from the context.
pub fn validate(template: &str) -> Result<()> {
    let unknown: BTreeSet<String> = BRACED_VAR
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .filter(|key| !LicenseContext::KEYS.iter().any(|known| known == key))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(BuildError::Template {
            keys: unknown.into_iter().collect(),
        })
    }
}

pub fn render(template: &str, context: &LicenseContext) -> Result<String> {
    validate(template)?;

    let rendered = BRACED_VAR.replace_all(template, |caps: &regex::Captures| {
        context.lookup(&caps[1]).unwrap_or_default()
    });

    Ok(rendered.into_owned())
}

/// Render `template` and overwrite `license_file` with the result.
pub fn write(license_file: &Path, template: &str, context: &LicenseContext) -> Result<()> {
    let mut rendered = render(template, context)?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    fs::write(license_file, rendered).map_err(|e| BuildError::io(license_file, e))
}

pub fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| BuildError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn context() -> LicenseContext {
        LicenseContext {
            project_name: "lib".to_string(),
            project_description: "A tiny library".to_string(),
            project_version: "1.4.0".to_string(),
            build_number: 37,
            date: "19 Oct 2026 10:00:00".to_string(),
        }
    }

    #[test]
    fn renders_every_placeholder() {
        let template = "/*! ${project_name} - ${project_description}\n * v${project_version} build ${build_number} (${date}) */";

        assert_eq!(
            render(template, &context()).unwrap(),
            "/*! lib - A tiny library\n * v1.4.0 build 37 (19 Oct 2026 10:00:00) */"
        );
    }

    #[test]
    fn leaves_plain_text_alone() {
        let template = "Copyright $ 2026, costs ${ 5 }";
        assert_eq!(render(template, &context()).unwrap(), template);
    }

    #[test]
    fn unknown_placeholders_are_errors() {
        let err = render("${project_name} ${author} ${year} ${author}", &context()).unwrap_err();

        match err {
            BuildError::Template { keys } => assert_eq!(keys, vec!["author", "year"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn write_overwrites_and_terminates_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("license.txt");
        fs::write(&path, "old license text that is much longer").unwrap();

        write(&path, "(c) ${project_name}", &context()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "(c) lib\n");
    }
}
