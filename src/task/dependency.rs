use std::collections::HashMap;

use super::Step;
use crate::error::{BuildError, Result};

/// An explicit, validated set of steps and their dependency edges.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    steps: Vec<Step>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph and validate it in one go.
    pub fn from_steps(steps: Vec<Step>) -> Result<Self> {
        let graph = Self { steps };
        graph.validate()?;
        Ok(graph)
    }

    /// Add or replace a step. Call [`TaskGraph::validate`] once all steps are in.
    pub fn add_step(&mut self, step: Step) {
        match self.steps.iter_mut().find(|s| s.id == step.id) {
            Some(existing) => *existing = step,
            None => self.steps.push(step),
        }
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Look a step up by id or alias.
    pub fn get(&self, name: &str) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.id == name)
            .or_else(|| self.steps.iter().find(|s| s.aliases.iter().any(|a| a == name)))
    }

    /// Check that every step name is unique, every dependency names a real
    /// step other than itself, and the dependency edges are acyclic.
    pub fn validate(&self) -> Result<()> {
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for step in &self.steps {
            if owners.insert(&step.id, &step.id).is_some() {
                return Err(BuildError::Dependency(format!(
                    "step '{}' is declared more than once",
                    step.id
                )));
            }
        }

        for step in &self.steps {
            for alias in &step.aliases {
                match owners.get(alias.as_str()) {
                    Some(&owner) if owner == alias => {
                        return Err(BuildError::Dependency(format!(
                            "alias '{}' of step '{}' shadows the step of that name",
                            alias, step.id
                        )));
                    }
                    Some(&owner) => {
                        return Err(BuildError::Dependency(format!(
                            "alias '{}' of step '{}' is already taken by step '{}'",
                            alias, step.id, owner
                        )));
                    }
                    None => {
                        owners.insert(alias, &step.id);
                    }
                }
            }
        }

        let mut walk = Walk::new(self);
        for step in &self.steps {
            walk.visit(step)?;
        }

        Ok(())
    }

    /// The steps needed to run `target`, each listed after all of its
    /// dependencies.
    ///
    /// Dependencies are visited depth first in the order they are declared,
    /// so `default -> [clean, pack]` runs `clean` and then the whole `pack`
    /// chain. A step reachable along several paths appears once.
    pub fn execution_order(&self, target: &str) -> Result<Vec<String>> {
        let step = self
            .get(target)
            .ok_or_else(|| BuildError::Task(format!("Step '{}' not found", target)))?;

        let mut walk = Walk::new(self);
        walk.visit(step)?;
        Ok(walk.order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Depth-first post-order walk over dependency edges. `order` collects each
/// finished step; meeting a step that is still on the stack is a cycle.
struct Walk<'a> {
    by_id: HashMap<&'a str, &'a Step>,
    marks: HashMap<&'a str, Mark>,
    stack: Vec<&'a str>,
    order: Vec<String>,
}

impl<'a> Walk<'a> {
    fn new(graph: &'a TaskGraph) -> Self {
        Self {
            by_id: graph.steps.iter().map(|s| (s.id.as_str(), s)).collect(),
            marks: HashMap::new(),
            stack: Vec::new(),
            order: Vec::new(),
        }
    }

    fn visit(&mut self, step: &'a Step) -> Result<()> {
        match self.marks.get(step.id.as_str()) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::OnStack) => {
                let start = self
                    .stack
                    .iter()
                    .position(|id| *id == step.id)
                    .unwrap_or_default();
                let mut cycle = self.stack[start..].to_vec();
                cycle.push(&step.id);
                return Err(BuildError::Dependency(format!(
                    "dependency cycle: {}",
                    cycle.join(" -> ")
                )));
            }
            None => {}
        }

        self.marks.insert(&step.id, Mark::OnStack);
        self.stack.push(&step.id);

        for dep_id in &step.dependencies {
            if dep_id == &step.id {
                return Err(BuildError::Dependency(format!(
                    "step '{}' lists itself as a dependency",
                    step.id
                )));
            }
            let dep = self.by_id.get(dep_id.as_str()).copied().ok_or_else(|| {
                BuildError::Dependency(format!(
                    "step '{}' needs unknown step '{}'",
                    step.id, dep_id
                ))
            })?;
            self.visit(dep)?;
        }

        self.stack.pop();
        self.marks.insert(&step.id, Mark::Done);
        self.order.push(step.id.clone());
        Ok(())
    }
}
