use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::Deserialize;

use crate::{
    error::{BuildError, Result},
    output::OutputMode,
};

pub const DEFAULT_CONFIG_FILE: &str = "jsbuild.toml";

const DEFAULT_LINT_COMMAND: &str = "node build/tools/jshint-check.js ${input}";
const DEFAULT_MINIFY_COMMAND: &str = "node build/tools/uglify.js --unsafe -o ${output} ${input}";
const DEFAULT_PACK_COMMAND: &str =
    "java -jar build/tools/rhino.jar build/tools/packer.js ${input} ${output}";

const TEMP_MIN_FILE: &str = "tmp.min.js";

pub(crate) static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("braced variable pattern is valid")
});

static ANY_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)\b")
        .expect("variable pattern is valid")
});

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    project: ProjectSection,
    #[serde(default)]
    tools: ToolsSection,
    #[serde(default)]
    variables: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectSection {
    name: String,
    #[serde(default)]
    description: String,
    file_name: String,
    js_files: Vec<String>,
    #[serde(default = "default_src_dir")]
    src_dir: PathBuf,
    #[serde(default = "default_dist_dir")]
    dist_dir: PathBuf,
    #[serde(default = "default_license_file")]
    license_file: PathBuf,
    #[serde(default = "default_version_file")]
    version_file: PathBuf,
    #[serde(default = "default_template_dir")]
    template_dir: PathBuf,
    #[serde(default)]
    sass: bool,
    #[serde(default = "default_sass_dir")]
    sass_dir: PathBuf,
    #[serde(default)]
    output: OutputMode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolsSection {
    lint: Option<String>,
    minify: Option<String>,
    pack: Option<String>,
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_license_file() -> PathBuf {
    PathBuf::from("license.txt")
}

fn default_version_file() -> PathBuf {
    PathBuf::from("version.yml")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_sass_dir() -> PathBuf {
    PathBuf::from("src/sass")
}

/// Shell command templates for the external tools.
///
/// `${input}` and `${output}` are filled in per invocation; any other
/// `${NAME}` is looked up in the `[variables]` table or as `ENV_<NAME>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub lint: String,
    pub minify: String,
    pub pack: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            lint: DEFAULT_LINT_COMMAND.to_string(),
            minify: DEFAULT_MINIFY_COMMAND.to_string(),
            pack: DEFAULT_PACK_COMMAND.to_string(),
        }
    }
}

/// Resolved project configuration. Every path is absolute against `root`.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub name: String,
    pub description: String,
    pub src_dir: PathBuf,
    pub dist_dir: PathBuf,
    /// Source entries joined to `src_dir`, in build order. May hold glob patterns.
    pub js_files: Vec<PathBuf>,
    pub license_file: PathBuf,
    pub license_template: PathBuf,
    pub version_file: PathBuf,
    pub sass: bool,
    pub sass_dir: PathBuf,
    pub output: OutputMode,
    pub tools: ToolCommands,
    pub variables: HashMap<String, String>,
    pub artifacts: ArtifactPaths,
}

/// Output files derived from the distribution file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub file_name: String,
    pub dist_file: PathBuf,
    pub min_file: PathBuf,
    pub pack_file: PathBuf,
    pub temp_file: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dist_dir: &Path, file_name: &str) -> Self {
        let dist_file = dist_dir.join(file_name);
        Self {
            file_name: file_name.to_string(),
            min_file: substitute_extension(&dist_file, "min.js"),
            pack_file: substitute_extension(&dist_file, "pack.js"),
            temp_file: dist_dir.join(TEMP_MIN_FILE),
            dist_file,
        }
    }

    pub fn min_file_name(&self) -> String {
        file_name_of(&self.min_file)
    }

    pub fn pack_file_name(&self) -> String {
        file_name_of(&self.pack_file)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Replace the final extension of `path` with `extension`, or append it when
/// there is none. `lib.js` becomes `lib.min.js`.
pub fn substitute_extension(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

pub fn load_project(config_path: &Path) -> Result<ProjectConfig> {
    let config = load_and_parse_config(config_path)?;
    let root = project_root(config_path)?;
    process_config(config, root)
}

fn load_and_parse_config(config_path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(config_path).map_err(|e| {
        BuildError::config(format!("cannot read {}: {}", config_path.display(), e))
    })?;
    let config = toml::from_str(&contents)?;
    Ok(config)
}

fn project_root(config_path: &Path) -> Result<PathBuf> {
    let parent = match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if parent.is_absolute() {
        return Ok(parent);
    }

    let cwd = env::current_dir()?;
    Ok(cwd.join(parent))
}

fn process_config(config: ConfigFile, root: PathBuf) -> Result<ProjectConfig> {
    let project = config.project;

    if project.name.trim().is_empty() {
        return Err(BuildError::config("project.name must not be empty"));
    }
    if project.file_name.trim().is_empty() {
        return Err(BuildError::config("project.file_name must not be empty"));
    }
    if project.js_files.is_empty() {
        return Err(BuildError::config("project.js_files must list at least one file"));
    }
    if let Some(abs) = project.js_files.iter().find(|f| Path::new(f).is_absolute()) {
        return Err(BuildError::config(format!(
            "project.js_files entry '{}' must be relative to src_dir",
            abs
        )));
    }

    let src_dir = root.join(&project.src_dir);
    let dist_dir = root.join(&project.dist_dir);
    let license_file = root.join(&project.license_file);
    let license_template = root
        .join(&project.template_dir)
        .join(template_file_name(&project.license_file));

    let js_files = project.js_files.iter().map(|f| src_dir.join(f)).collect();

    let defaults = ToolCommands::default();
    let tools = ToolCommands {
        lint: config.tools.lint.unwrap_or(defaults.lint),
        minify: config.tools.minify.unwrap_or(defaults.minify),
        pack: config.tools.pack.unwrap_or(defaults.pack),
    };

    let mut variables = config.variables;
    add_builtin_variables(&mut variables, &root);

    Ok(ProjectConfig {
        artifacts: ArtifactPaths::new(&dist_dir, &project.file_name),
        name: project.name,
        description: project.description,
        version_file: root.join(&project.version_file),
        sass_dir: root.join(&project.sass_dir),
        sass: project.sass,
        output: project.output,
        src_dir,
        dist_dir,
        js_files,
        license_file,
        license_template,
        tools,
        variables,
        root,
    })
}

/// `license.txt` is rendered from `license.tpl.txt`.
fn template_file_name(license_file: &Path) -> PathBuf {
    let stem = license_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from(format!("{}.tpl.txt", stem))
}

fn add_builtin_variables(variables: &mut HashMap<String, String>, root: &Path) {
    for (key, value) in env::vars() {
        variables.insert(format!("ENV_{}", key), value);
    }

    variables.insert("ROOT".to_string(), root.to_string_lossy().into_owned());
}

/// Expand `${NAME}` and `$NAME` references in one pass, so substituted
/// values are never expanded again. Unknown names are left untouched so
/// shell variables survive into the command line.
pub fn substitute_variables(text: &str, variables: &HashMap<String, String>) -> String {
    ANY_VAR
        .replace_all(text, |caps: &regex::Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            variables
                .get(name)
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
