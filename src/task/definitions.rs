use super::{Action, Step, TaskGraph};
use crate::{error::Result, version::VersionPart};

pub const DEFAULT_STEP: &str = "default";
pub const DIST_DIR_STEP: &str = "dist_dir";

/// The standard pipeline of a JavaScript library build.
pub fn js_project() -> Result<TaskGraph> {
    TaskGraph::from_steps(vec![
        Step::new(DEFAULT_STEP, Action::Composite)
            .describe("Clean, then build the joined, minified and packed files")
            .depends_on(["clean", "pack"]),
        Step::new("clean", Action::Clean)
            .describe("Remove the distribution directory")
            .alias("clobber"),
        Step::new(DIST_DIR_STEP, Action::CreateDistDir)
            .describe("Create the distribution directory"),
        Step::new("prepare", Action::Prepare)
            .describe("Prepare the project for build (destination directory and updated license file)")
            .depends_on([DIST_DIR_STEP]),
        Step::new("js", Action::Join)
            .describe("Join all javascript files into one file with version and license at the head")
            .depends_on(["prepare"])
            .alias("join"),
        Step::new("hint", Action::Lint)
            .describe("Run the lint tool on the joined javascript file")
            .depends_on(["js"])
            .alias("lint"),
        Step::new("min", Action::Minify)
            .describe("Minify the joined file and put the license notice at its head")
            .depends_on(["js"])
            .alias("minify"),
        Step::new("pack", Action::Pack)
            .describe("Pack the minified file into an even smaller one with the license notice at its head")
            .depends_on(["min"]),
        Step::new("version:current", Action::ShowVersion)
            .describe("Display the current version"),
        Step::new("version:bump:major", Action::BumpVersion(VersionPart::Major))
            .describe("Bump the major version by 1")
            .depends_on(["version:current"]),
        Step::new("version:bump:minor", Action::BumpVersion(VersionPart::Minor))
            .describe("Bump the minor version by 1")
            .depends_on(["version:current"]),
        Step::new("version:bump:patch", Action::BumpVersion(VersionPart::Patch))
            .describe("Bump the patch version by 1")
            .depends_on(["version:current"]),
        Step::new("version:bump:build_number", Action::BumpBuildNumber)
            .describe("Bump the build number by 1")
            .depends_on(["version:current"]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_runs_clean_then_pack_chain_without_hint() {
        let graph = js_project().unwrap();

        assert_eq!(
            graph.execution_order(DEFAULT_STEP).unwrap(),
            vec!["clean", "dist_dir", "prepare", "js", "min", "pack", "default"]
        );
    }

    #[test]
    fn hint_needs_the_joined_file() {
        let graph = js_project().unwrap();

        assert_eq!(
            graph.execution_order("hint").unwrap(),
            vec!["dist_dir", "prepare", "js", "hint"]
        );
    }

    #[test]
    fn version_steps_show_current_first() {
        let graph = js_project().unwrap();

        for bump in [
            "version:bump:major",
            "version:bump:minor",
            "version:bump:patch",
            "version:bump:build_number",
        ] {
            assert_eq!(
                graph.execution_order(bump).unwrap(),
                vec!["version:current", bump]
            );
        }
    }

    #[test]
    fn every_public_task_name_resolves() {
        let graph = js_project().unwrap();

        for name in [
            "clean",
            "prepare",
            "js",
            "hint",
            "min",
            "pack",
            "default",
            "version:current",
            "clobber",
            "join",
            "lint",
            "minify",
        ] {
            assert!(graph.get(name).is_some(), "missing step {}", name);
        }
    }
}
