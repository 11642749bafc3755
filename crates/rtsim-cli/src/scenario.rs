//! # rtsim-cli::scenario
//!
//! The `serde`-typed scenario schema: a minimal, self-contained description
//! of a run that exercises the kernel's public surface — generator entities
//! driven by a named `RandomVar` (§6's factory contract) and task entities
//! wired to the one exemplar instruction, `SchedInstr` (§4.5). Concrete task
//! classes and scheduler policies beyond this exemplar are out of scope
//! (§1), so the schema is deliberately thin.

use rtsim_engine::prelude::*;
use rtsim_engine::randvar::CATALOG;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub seed: i64,
    pub length: Tick,
    #[serde(default = "default_n_runs")]
    pub n_runs: i64,
    #[serde(default)]
    pub generators: Vec<GeneratorSpec>,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

fn default_n_runs() -> i64 {
    1
}

/// A self-reposting event driven by a named `RandomVar`: fires at time 0,
/// then again at `get()` ticks later, and so on — the S6 inter-arrival
/// pattern from §8.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorSpec {
    pub name: String,
    pub distribution: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// A task and its fixed sequence of `SchedInstr` instructions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskSpec {
    pub name: String,
    pub instructions: Vec<InstrSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstrSpec {
    pub duration: Tick,
}

impl Scenario {
    /// Logical-consistency checks beyond what `serde` already enforces:
    /// every generator names a distribution the catalog actually has, task
    /// names are unique, and no task is empty (an empty instruction list
    /// would never advance and never call `newRun`-driven scheduling).
    pub fn validate(&self) -> Result<(), String> {
        for gen in &self.generators {
            if !CATALOG.contains(&gen.distribution.as_str()) {
                return Err(format!(
                    "generator '{}' names unknown distribution '{}' (known: {:?})",
                    gen.name, gen.distribution, CATALOG
                ));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.name.as_str()) {
                return Err(format!("duplicate task name '{}'", task.name));
            }
            if task.instructions.is_empty() {
                return Err(format!("task '{}' has no instructions", task.name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Scenario {
        Scenario {
            name: "demo".into(),
            seed: 1,
            length: Tick::new(100),
            n_runs: 1,
            generators: vec![GeneratorSpec {
                name: "arrivals".into(),
                distribution: "Delta".into(),
                params: vec!["7".into()],
            }],
            tasks: vec![],
        }
    }

    #[test]
    fn accepts_known_distribution() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_distribution() {
        let mut s = minimal();
        s.generators[0].distribution = "Bogus".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_task_names() {
        let mut s = minimal();
        s.tasks.push(TaskSpec {
            name: "t".into(),
            instructions: vec![InstrSpec { duration: Tick::new(5) }],
        });
        s.tasks.push(TaskSpec {
            name: "t".into(),
            instructions: vec![InstrSpec { duration: Tick::new(3) }],
        });
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_empty_task() {
        let mut s = minimal();
        s.tasks.push(TaskSpec {
            name: "empty".into(),
            instructions: vec![],
        });
        assert!(s.validate().is_err());
    }

    #[test]
    fn parses_from_toml() {
        let text = r#"
            name = "demo"
            seed = 1
            length = 100

            [[generators]]
            name = "arrivals"
            distribution = "Delta"
            params = ["7"]
        "#;
        let scenario: Scenario = toml::from_str(text).unwrap();
        assert_eq!(scenario.name, "demo");
        assert_eq!(scenario.generators.len(), 1);
        assert!(scenario.validate().is_ok());
    }
}
