use std::{
    collections::HashMap,
    fmt, io,
    path::{Path, PathBuf},
    process::{Output, Stdio},
};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    process::Command as TokioCommand,
};
use tracing::debug;

use crate::{
    config::{ProjectConfig, ToolCommands, substitute_variables},
    error::{BuildError, Result},
    output::OutputMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Lint,
    Minify,
    Pack,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Lint => write!(f, "lint"),
            ToolKind::Minify => write!(f, "minify"),
            ToolKind::Pack => write!(f, "pack"),
        }
    }
}

/// One run of an external tool: read `input`, write `output` if the tool
/// produces a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub kind: ToolKind,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn lint(input: impl Into<PathBuf>) -> Self {
        Self {
            kind: ToolKind::Lint,
            input: input.into(),
            output: None,
        }
    }

    pub fn minify(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            kind: ToolKind::Minify,
            input: input.into(),
            output: Some(output.into()),
        }
    }

    pub fn pack(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            kind: ToolKind::Pack,
            input: input.into(),
            output: Some(output.into()),
        }
    }
}

/// Something that can run the lint, minify and pack tools.
///
/// Success is `Ok(())`; a tool that exits non-zero must surface as
/// [`BuildError::ExternalTool`] carrying its captured output.
#[allow(async_fn_in_trait)]
pub trait ExternalTool {
    async fn invoke(&mut self, invocation: &ToolInvocation) -> Result<()>;
}

/// Runs the configured shell commands from the project root.
#[derive(Debug, Clone)]
pub struct CommandTool {
    commands: ToolCommands,
    variables: HashMap<String, String>,
    working_dir: PathBuf,
    output_mode: OutputMode,
}

impl CommandTool {
    pub fn new(
        commands: ToolCommands,
        variables: HashMap<String, String>,
        working_dir: impl Into<PathBuf>,
        output_mode: OutputMode,
    ) -> Self {
        Self {
            commands,
            variables,
            working_dir: working_dir.into(),
            output_mode,
        }
    }

    pub fn from_config(config: &ProjectConfig) -> Self {
        Self::new(
            config.tools.clone(),
            config.variables.clone(),
            &config.root,
            config.output,
        )
    }

    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    /// The shell command line for `invocation`.
    pub fn command_line(&self, invocation: &ToolInvocation) -> String {
        let template = match invocation.kind {
            ToolKind::Lint => &self.commands.lint,
            ToolKind::Minify => &self.commands.minify,
            ToolKind::Pack => &self.commands.pack,
        };

        let mut variables = self.variables.clone();
        variables.insert("input".to_string(), shell_quote(&invocation.input));
        if let Some(output) = &invocation.output {
            variables.insert("output".to_string(), shell_quote(output));
        }

        substitute_variables(template, &variables)
    }
}

impl ExternalTool for CommandTool {
    async fn invoke(&mut self, invocation: &ToolInvocation) -> Result<()> {
        let command = self.command_line(invocation);
        debug!("Running {}: {}", invocation.kind, command);

        let stream = self.output_mode == OutputMode::Stream;
        let output = run_command(&command, &self.working_dir, stream)
            .await
            .map_err(|e| BuildError::io(&self.working_dir, e))?;

        let combined = combined_output(&output);

        if !output.status.success() {
            return Err(BuildError::ExternalTool {
                tool: invocation.kind,
                status: output.status.to_string(),
                output: combined,
            });
        }

        if self.output_mode == OutputMode::Group && !combined.trim().is_empty() {
            println!("{}", combined.trim_end());
        }

        Ok(())
    }
}

fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&stderr);
    }
    combined
}

/// Quote a path for `sh -c` when it holds anything beyond a safe set of
/// characters.
fn shell_quote(path: &Path) -> String {
    let text = path.to_string_lossy();
    let safe = text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+:=@,".contains(c));

    if (safe && !text.is_empty()) || cfg!(target_os = "windows") {
        text.into_owned()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

/// Run `command` through the platform shell, capturing stdout and stderr.
/// There is no timeout: a hung tool blocks the caller until it exits.
pub async fn run_command(
    command: &str,
    working_dir: &Path,
    stream_output: bool,
) -> io::Result<Output> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = TokioCommand::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = TokioCommand::new("sh");
        c.args(["-c", command]);
        c
    };

    cmd.current_dir(working_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null());

    let mut child = cmd.spawn()?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let stdout_handle = tokio::spawn(collect_pipe(stdout_pipe, tokio::io::stdout(), stream_output));
    let stderr_handle = tokio::spawn(collect_pipe(stderr_pipe, tokio::io::stderr(), stream_output));

    let status = child.wait().await?;

    let stdout = join_collector(stdout_handle).await?;
    let stderr = join_collector(stderr_handle).await?;

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

async fn collect_pipe<R, W>(
    pipe: Option<R>,
    mut echo: W,
    stream_output: bool,
) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut collected: Vec<u8> = Vec::new();
    if let Some(mut pipe) = pipe {
        let mut buf = [0u8; 8192];
        loop {
            let n = pipe.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
            if stream_output {
                echo.write_all(&buf[..n]).await?;
            }
        }
        if stream_output {
            echo.flush().await?;
        }
    }
    Ok(collected)
}

async fn join_collector(
    handle: tokio::task::JoinHandle<io::Result<Vec<u8>>>,
) -> io::Result<Vec<u8>> {
    handle.await.map_err(io::Error::other)?
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn tool(commands: ToolCommands, dir: &Path) -> CommandTool {
        let mut variables = HashMap::new();
        variables.insert("FLAGS".to_string(), "--unsafe".to_string());
        CommandTool::new(commands, variables, dir, OutputMode::Group)
    }

    #[test]
    fn builds_command_lines() {
        let commands = ToolCommands {
            lint: "jshint ${input}".to_string(),
            minify: "uglify $FLAGS -o ${output} ${input}".to_string(),
            pack: "packer ${input} ${output}".to_string(),
        };
        let tool = tool(commands, Path::new("/project"));

        assert_eq!(
            tool.command_line(&ToolInvocation::lint("/project/dist/lib.js")),
            "jshint /project/dist/lib.js"
        );
        assert_eq!(
            tool.command_line(&ToolInvocation::minify("dist/lib.js", "dist/tmp.min.js")),
            "uglify --unsafe -o dist/tmp.min.js dist/lib.js"
        );
        assert_eq!(
            tool.command_line(&ToolInvocation::pack("my dist/lib.min.js", "out")),
            "packer 'my dist/lib.min.js' out"
        );
    }

    #[test]
    fn paths_with_dollar_signs_are_not_expanded() {
        let commands = ToolCommands {
            lint: "jshint ${input} $ENV_HOME".to_string(),
            ..ToolCommands::default()
        };
        let mut tool = tool(commands, Path::new("/work"));
        tool.variables
            .insert("ENV_HOME".to_string(), "/root".to_string());

        assert_eq!(
            tool.command_line(&ToolInvocation::lint("/work/a$ENV_HOME/lib.js")),
            "jshint '/work/a$ENV_HOME/lib.js' /root"
        );
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        let dir = TempDir::new().unwrap();
        let commands = ToolCommands {
            minify: "cp ${input} ${output}".to_string(),
            ..ToolCommands::default()
        };
        std::fs::write(dir.path().join("in.js"), "x").unwrap();

        let mut tool = tool(commands, dir.path());
        tool.invoke(&ToolInvocation::minify("in.js", "out.js"))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("out.js")).unwrap(), "x");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_output() {
        let dir = TempDir::new().unwrap();
        let commands = ToolCommands {
            lint: "echo 'line 3: missing semicolon'; echo boom >&2; exit 2".to_string(),
            ..ToolCommands::default()
        };

        let err = tool(commands, dir.path())
            .invoke(&ToolInvocation::lint("lib.js"))
            .await
            .unwrap_err();

        match err {
            BuildError::ExternalTool { tool, output, .. } => {
                assert_eq!(tool, ToolKind::Lint);
                assert!(output.contains("line 3: missing semicolon"));
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
