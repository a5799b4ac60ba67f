use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jsbuild::{
    cli::Cli,
    config::load_project,
    error::Result,
    execution::Executor,
    project::JsProject,
    task::{
        TaskGraph,
        definitions::{DEFAULT_STEP, js_project},
    },
    tool::CommandTool,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();
    init_tracing(args.verbose);

    if let Err(e) = run_jsbuild(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

async fn run_jsbuild(args: Cli) -> Result<()> {
    let graph = js_project()?;

    if args.list {
        list_steps(&graph);
        return Ok(());
    }

    let config = load_project(&args.file)?;
    let output_mode = args.output.unwrap_or(config.output);
    let tool = CommandTool::from_config(&config).with_output_mode(output_mode);
    let mut project = JsProject::load(config, tool)?;

    let target = args.task.as_deref().unwrap_or(DEFAULT_STEP);
    let order = Executor::new(&graph, &mut project)
        .dry_run(args.dry_run)
        .run(target)
        .await?;

    if args.verbose && !args.dry_run {
        println!("Ran: {}", order.join(" -> "));
    }

    Ok(())
}

fn list_steps(graph: &TaskGraph) {
    for step in graph.steps() {
        let mut line = step.id.clone();
        if !step.aliases.is_empty() {
            line.push_str(&format!(" ({})", step.aliases.join(", ")));
        }
        println!("{:<40} # {}", line, step.description);
        if !step.dependencies.is_empty() {
            println!("{:<40}   depends on: {}", "", step.dependencies.join(", "));
        }
    }
}
