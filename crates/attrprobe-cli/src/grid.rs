//! Grid driver: every (model, attribute, mode) run
//!
//! One blocking task per (model, attribute) loads the corpus once and runs
//! each mode over it. Up to `jobs` tasks run at a time; results are keyed by
//! grid position so the report does not depend on completion order.

use crate::config::GridConfig;
use crate::loader::load_generations;
use anyhow::anyhow;
use attrprobe_core::{Attribute, Error, Mode, Result};
use attrprobe_probe::{Probe, RunResult};
use futures::StreamExt;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A run that did not produce a result
#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
    pub model: String,
    pub attribute: Attribute,
    pub mode: Mode,
    pub error: String,
}

/// Collected results, serialized as `model -> attribute -> mode -> run`
#[derive(Debug, Clone)]
pub struct GridResults {
    models: Vec<String>,
    runs: BTreeMap<(usize, Attribute, Mode), RunResult>,
    failures: Vec<RunFailure>,
}

impl GridResults {
    /// Empty results for `models`, reported in the given order
    pub fn new(models: Vec<String>) -> Self {
        Self {
            models,
            runs: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    fn insert(&mut self, model_index: usize, result: RunResult) {
        self.runs
            .insert((model_index, result.attribute, result.mode), result);
    }

    /// Result of one run, if it succeeded
    pub fn get(&self, model: &str, attribute: Attribute, mode: Mode) -> Option<&RunResult> {
        let index = self.models.iter().position(|m| m == model)?;
        self.runs.get(&(index, attribute, mode))
    }

    /// Successful runs in grid order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RunResult)> {
        self.runs
            .iter()
            .map(move |((index, _, _), result)| (self.models[*index].as_str(), result))
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn failures(&self) -> &[RunFailure] {
        &self.failures
    }
}

impl Serialize for GridResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut nested: Vec<BTreeMap<Attribute, BTreeMap<Mode, &RunResult>>> =
            vec![BTreeMap::new(); self.models.len()];
        for ((index, attribute, mode), result) in &self.runs {
            nested[*index]
                .entry(*attribute)
                .or_default()
                .insert(*mode, result);
        }

        let mut map = serializer.serialize_map(None)?;
        for (model, attributes) in self.models.iter().zip(&nested) {
            if !attributes.is_empty() {
                map.serialize_entry(model, attributes)?;
            }
        }
        map.end()
    }
}

/// Scheduling options
#[derive(Debug, Clone, Copy)]
pub struct GridOptions {
    /// Concurrent (model, attribute) tasks
    pub jobs: usize,

    /// Abort on the first failed run instead of skipping it
    pub fail_fast: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            fail_fast: false,
        }
    }
}

struct GridContext {
    probe: Probe,
    input_dir: PathBuf,
    failure_token: String,
    fail_fast: bool,
    completed: AtomicUsize,
    total: usize,
}

struct GridUnit {
    model_index: usize,
    model: String,
    attribute: Attribute,
    modes: Vec<Mode>,
}

struct UnitOutcome {
    model_index: usize,
    model: String,
    attribute: Attribute,
    runs: Vec<(Mode, Result<RunResult>)>,
}

impl GridContext {
    fn execute(&self, unit: GridUnit) -> UnitOutcome {
        let corpus = load_generations(
            &self.input_dir,
            &unit.model,
            unit.attribute,
            &self.failure_token,
        );

        let mut runs = Vec::with_capacity(unit.modes.len());
        match corpus {
            Ok(corpus) => {
                for &mode in &unit.modes {
                    let result = self
                        .probe
                        .run_for_model(&corpus, &unit.model, unit.attribute, mode);
                    let failed = result.is_err();
                    self.record_progress(&unit, mode);
                    runs.push((mode, result));
                    if failed && self.fail_fast {
                        break;
                    }
                }
            }
            Err(e) => {
                let message = e.to_string();
                for &mode in &unit.modes {
                    self.record_progress(&unit, mode);
                    runs.push((
                        mode,
                        Err(Error::data(format!("failed to load generations: {}", message))),
                    ));
                    if self.fail_fast {
                        break;
                    }
                }
            }
        }

        UnitOutcome {
            model_index: unit.model_index,
            model: unit.model,
            attribute: unit.attribute,
            runs,
        }
    }

    fn record_progress(&self, unit: &GridUnit, mode: Mode) {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            model = %unit.model,
            attribute = %unit.attribute,
            mode = %mode,
            "run {}/{}",
            done,
            self.total
        );
    }
}

/// Run every configured combination
///
/// Failed runs are logged and recorded in [`GridResults::failures`], or abort
/// the grid when `options.fail_fast` is set.
pub async fn run_grid(
    config: &GridConfig,
    probe: Probe,
    options: GridOptions,
) -> anyhow::Result<GridResults> {
    let jobs = options.jobs.max(1);
    let context = Arc::new(GridContext {
        probe,
        input_dir: config.input_dir.clone(),
        failure_token: config.failure_token.clone(),
        fail_fast: options.fail_fast,
        completed: AtomicUsize::new(0),
        total: config.total_runs(),
    });

    let units: Vec<GridUnit> = config
        .models
        .iter()
        .enumerate()
        .flat_map(|(model_index, model)| {
            config.attributes.iter().map(move |&attribute| GridUnit {
                model_index,
                model: model.clone(),
                attribute,
                modes: config.modes.clone(),
            })
        })
        .collect();

    info!(
        runs = context.total,
        tasks = units.len(),
        jobs,
        "starting probe grid"
    );

    let mut outcomes = futures::stream::iter(units)
        .map(|unit| {
            let context = Arc::clone(&context);
            tokio::task::spawn_blocking(move || context.execute(unit))
        })
        .buffered(jobs);

    let mut results = GridResults::new(config.models.clone());
    while let Some(joined) = outcomes.next().await {
        let outcome = joined.map_err(|e| anyhow!("probe task panicked: {}", e))?;

        for (mode, result) in outcome.runs {
            match result {
                Ok(run) => results.insert(outcome.model_index, run),
                Err(e) if options.fail_fast => {
                    error!(
                        model = %outcome.model,
                        attribute = %outcome.attribute,
                        mode = %mode,
                        error = %e,
                        "run failed, aborting grid"
                    );
                    return Err(anyhow::Error::new(e).context(format!(
                        "probe {} / {} / {} failed",
                        outcome.model, outcome.attribute, mode
                    )));
                }
                Err(e) => {
                    warn!(
                        model = %outcome.model,
                        attribute = %outcome.attribute,
                        mode = %mode,
                        error = %e,
                        "run failed, skipping"
                    );
                    results.failures.push(RunFailure {
                        model: outcome.model.clone(),
                        attribute: outcome.attribute,
                        mode,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    info!(
        completed = results.len(),
        failed = results.failures.len(),
        "probe grid finished"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrprobe_probe::ProbeSettings;
    use serde_json::{json, Value};
    use std::path::Path;

    const MODEL: &str = "org/tiny-model";

    fn write_logs(dir: &Path) {
        let templates = [
            "the apple",
            "an apple and the river",
            "the river of stone over a cloud",
            "a stone",
            "the cloud and an apple of stone",
        ];
        for seed in 1..=4i64 {
            let entries: Vec<Value> = templates
                .iter()
                .enumerate()
                .map(|(t, text)| {
                    let sex = if (t as i64 + seed) % 3 == 0 { "M" } else { "F" };
                    json!({"seed": seed, "sex": sex, "response": text})
                })
                .collect();
            std::fs::write(
                dir.join(format!("tiny_model_seed_{}.json", seed)),
                Value::Array(entries).to_string(),
            )
            .unwrap();
        }
    }

    fn config(dir: &Path, models: &[&str]) -> GridConfig {
        GridConfig {
            input_dir: dir.to_path_buf(),
            models: models.iter().map(|m| m.to_string()).collect(),
            attributes: vec![Attribute::Sex],
            ..GridConfig::default()
        }
    }

    fn probe() -> Probe {
        Probe::new(ProbeSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_grid_collects_every_mode() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());

        let config = config(dir.path(), &[MODEL]);
        let results = run_grid(&config, probe(), GridOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.failures().is_empty());
        assert!(results.get(MODEL, Attribute::Sex, Mode::Content).is_some());

        let json = serde_json::to_value(&results).unwrap();
        assert!(json[MODEL]["sex"]["content"]["logistic"].is_object());
        assert!(json[MODEL]["sex"]["stopwords"]["inference"].is_array());
    }

    #[tokio::test]
    async fn test_missing_model_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());

        let config = config(dir.path(), &["org/absent", MODEL]);
        let results = run_grid(&config, probe(), GridOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results.failures().len(), 2);
        assert!(results.failures().iter().all(|f| f.model == "org/absent"));

        let json = serde_json::to_value(&results).unwrap();
        assert!(json.get("org/absent").is_none());
    }

    #[tokio::test]
    async fn test_fail_fast_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());

        let config = config(dir.path(), &["org/absent", MODEL]);
        let options = GridOptions {
            jobs: 1,
            fail_fast: true,
        };
        let err = run_grid(&config, probe(), options).await.unwrap_err();
        assert!(err.to_string().contains("org/absent"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        write_logs(dir.path());
        let config = config(dir.path(), &["org/absent", MODEL]);

        let sequential = run_grid(&config, probe(), GridOptions::default())
            .await
            .unwrap();
        let parallel = run_grid(
            &config,
            probe(),
            GridOptions {
                jobs: 4,
                fail_fast: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            serde_json::to_string(&sequential).unwrap(),
            serde_json::to_string(&parallel).unwrap()
        );
    }
}
