use std::{collections::HashMap, time::Instant};

use tracing::{debug, info};

use crate::{
    error::{BuildError, Result},
    task::{StepRunner, TaskGraph},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Running,
    Succeeded,
    Failed(String),
}

/// Walks a [`TaskGraph`] one step at a time.
///
/// A step only starts once every dependency has succeeded. The first failure
/// ends the run: later steps stay `Pending` and the error names the failed
/// step.
pub struct Executor<'a, R: StepRunner> {
    graph: &'a TaskGraph,
    runner: &'a mut R,
    states: HashMap<String, StepState>,
    dry_run: bool,
}

impl<'a, R: StepRunner> Executor<'a, R> {
    pub fn new(graph: &'a TaskGraph, runner: &'a mut R) -> Self {
        Self {
            graph,
            runner,
            states: HashMap::new(),
            dry_run: false,
        }
    }

    /// Only report what would run.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self, step_id: &str) -> Option<&StepState> {
        self.states.get(step_id)
    }

    /// Run `target` and everything it depends on. Returns the ids of the
    /// steps in the order they ran.
    pub async fn run(&mut self, target: &str) -> Result<Vec<String>> {
        let graph = self.graph;
        let order = graph.execution_order(target)?;
        debug!("Execution order: {}", order.join(" -> "));

        if self.dry_run {
            println!("Dry run mode - showing what would be executed:");
            for step_id in &order {
                match graph.get(step_id) {
                    Some(step) if !step.description.is_empty() => {
                        println!("  {}: {}", step.id, step.description)
                    }
                    _ => println!("  {}", step_id),
                }
            }
            return Ok(order);
        }

        self.states = order
            .iter()
            .map(|id| (id.clone(), StepState::Pending))
            .collect();

        for step_id in &order {
            let step = graph
                .get(step_id)
                .ok_or_else(|| BuildError::Task(format!("Step '{}' not found", step_id)))?;

            if let Some(dep) = step
                .dependencies
                .iter()
                .find(|dep| self.states.get(dep.as_str()) != Some(&StepState::Succeeded))
            {
                return Err(BuildError::Dependency(format!(
                    "Step '{}' cannot run before '{}' has succeeded",
                    step.id, dep
                )));
            }

            self.set_state(step_id, StepState::Running);
            debug!("Running step: {}", step_id);
            let started = Instant::now();

            match self.runner.run_step(step).await {
                Ok(()) => {
                    self.set_state(step_id, StepState::Succeeded);
                    info!(
                        "Step '{}' finished in {}",
                        step_id,
                        humantime::format_duration(round_to_millis(started.elapsed()))
                    );
                }
                Err(e) => {
                    self.set_state(step_id, StepState::Failed(e.to_string()));
                    return Err(BuildError::step_failed(step_id.clone(), e));
                }
            }
        }

        Ok(order)
    }

    fn set_state(&mut self, step_id: &str, state: StepState) {
        self.states.insert(step_id.to_string(), state);
    }
}

fn round_to_millis(duration: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(duration.as_millis() as u64)
}
