//! The actions behind each step of a JavaScript library build.

use std::{fs, io::ErrorKind, path::Path};

use tracing::{debug, info};

use crate::{
    config::ProjectConfig,
    error::{BuildError, Result},
    join::{FileJoiner, expand_sources},
    license::{self, LicenseContext},
    task::{Action, Step, StepRunner},
    tool::{ExternalTool, ToolInvocation},
    version::{VersionPart, VersionStore},
};

pub struct JsProject<T: ExternalTool> {
    config: ProjectConfig,
    versions: VersionStore,
    joiner: FileJoiner,
    tool: T,
}

impl<T: ExternalTool> JsProject<T> {
    pub fn new(config: ProjectConfig, versions: VersionStore, tool: T) -> Self {
        let joiner = FileJoiner::new(&config.license_file);
        Self {
            config,
            versions,
            joiner,
            tool,
        }
    }

    /// Load the version file named by `config`.
    pub fn load(config: ProjectConfig, tool: T) -> Result<Self> {
        let versions = VersionStore::load(&config.version_file)?;
        Ok(Self::new(config, versions, tool))
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn clean(&self) -> Result<()> {
        let dist_dir = &self.config.dist_dir;
        match fs::remove_dir_all(dist_dir) {
            Ok(()) => {
                debug!("Removed {}", dist_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::io(dist_dir, e)),
        }
    }

    pub fn create_dist_dir(&self) -> Result<()> {
        let dist_dir = &self.config.dist_dir;
        fs::create_dir_all(dist_dir).map_err(|e| BuildError::io(dist_dir, e))
    }

    /// Bump the build number and write a fresh license file.
    ///
    /// The template is read and checked before the bump so a broken template
    /// does not use up a build number.
    pub fn prepare(&mut self) -> Result<()> {
        let template = license::read_template(&self.config.license_template)?;
        license::validate(&template)?;

        let build_number = self.versions.bump_build_number()?;
        info!("Build number is now {}", build_number);

        let context = LicenseContext::new(&self.config, &self.versions);
        license::write(&self.config.license_file, &template, &context)
    }

    pub fn join_sources(&self) -> Result<()> {
        let artifacts = &self.config.artifacts;
        println!("Building single js file: {}", artifacts.file_name);

        let sources = expand_sources(&self.config.js_files)?;
        self.joiner.join(&artifacts.dist_file, &sources, true)
    }

    pub async fn lint(&mut self) -> Result<()> {
        let dist_file = &self.config.artifacts.dist_file;
        println!("Running lint on {} ...", self.config.artifacts.file_name);
        self.tool.invoke(&ToolInvocation::lint(dist_file)).await
    }

    pub async fn minify(&mut self) -> Result<()> {
        let artifacts = &self.config.artifacts;
        println!("Minifying: creating {}...", artifacts.min_file_name());

        let invocation = ToolInvocation::minify(&artifacts.dist_file, &artifacts.temp_file);
        self.tool.invoke(&invocation).await?;
        self.rewrap(&artifacts.temp_file, &artifacts.min_file)
    }

    pub async fn pack(&mut self) -> Result<()> {
        let artifacts = &self.config.artifacts;
        println!("Packing: creating {}...", artifacts.pack_file_name());

        let invocation = ToolInvocation::pack(&artifacts.min_file, &artifacts.temp_file);
        self.tool.invoke(&invocation).await?;
        self.rewrap(&artifacts.temp_file, &artifacts.pack_file)
    }

    /// Put the license back on top of a tool's output, then drop the temp file.
    fn rewrap(&self, temp_file: &Path, target: &Path) -> Result<()> {
        self.joiner.join(target, &[temp_file.to_path_buf()], true)?;
        fs::remove_file(temp_file).map_err(|e| BuildError::io(temp_file, e))
    }

    pub fn show_version(&self) {
        println!(
            "Current version: {} (build {})",
            self.versions.current_version(),
            self.versions.current_build_number()
        );
    }

    pub fn bump_version(&mut self, part: VersionPart) -> Result<()> {
        let version = self.versions.bump_version(part)?;
        println!("Updated version: {}", version);
        Ok(())
    }

    pub fn bump_build_number(&mut self) -> Result<()> {
        let build_number = self.versions.bump_build_number()?;
        println!("Updated build number: {}", build_number);
        Ok(())
    }
}

impl<T: ExternalTool> StepRunner for JsProject<T> {
    async fn run_step(&mut self, step: &Step) -> Result<()> {
        match step.action {
            Action::Clean => self.clean(),
            Action::CreateDistDir => self.create_dist_dir(),
            Action::Prepare => self.prepare(),
            Action::Join => self.join_sources(),
            Action::Lint => self.lint().await,
            Action::Minify => self.minify().await,
            Action::Pack => self.pack().await,
            Action::ShowVersion => {
                self.show_version();
                Ok(())
            }
            Action::BumpVersion(part) => self.bump_version(part),
            Action::BumpBuildNumber => self.bump_build_number(),
            Action::Composite => Ok(()),
        }
    }
}
