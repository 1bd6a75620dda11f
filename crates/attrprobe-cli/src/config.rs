//! Grid configuration

use crate::loader::DEFAULT_FAILURE_TOKEN;
use anyhow::{bail, Context};
use attrprobe_core::{Attribute, Mode};
use attrprobe_probe::ProbeSettings;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Models probed when the configuration names none
pub const DEFAULT_MODELS: [&str; 6] = [
    "meta-llama/Llama-3.1-8B-Instruct",
    "mistralai/Ministral-8B-Instruct-2410",
    "google/gemma-2-9b-it",
    "gpt-4o-2024-08-06",
    "claude-3-5-sonnet-20241022",
    "gemini-2.5-pro-preview-05-06",
];

/// Grid driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Directory holding `{tag}_seed_*.json` generation logs
    pub input_dir: PathBuf,

    /// Where the nested results are written
    pub output_path: PathBuf,

    /// Responses containing this marker are dropped
    pub failure_token: String,

    pub models: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub modes: Vec<Mode>,

    #[serde(flatten)]
    pub probe: ProbeSettings,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("outputs"),
            output_path: PathBuf::from("probe.json"),
            failure_token: DEFAULT_FAILURE_TOKEN.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            attributes: Attribute::ALL.to_vec(),
            modes: Mode::ALL.to_vec(),
            probe: ProbeSettings::default(),
        }
    }
}

impl GridConfig {
    /// Layer the YAML file (if present) and `ATTRPROBE_*` variables over the
    /// defaults, then apply CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        let mut config = Self::from_sources(Path::new(config_path))?;

        if let Some(input_dir) = &cli.input_dir {
            config.input_dir = input_dir.clone();
        }
        if let Some(output) = &cli.output {
            config.output_path = output.clone();
        }
        if let Some(model) = &cli.model {
            config.models = vec![model.clone()];
        }
        if let Some(attribute) = cli.attribute {
            config.attributes = vec![attribute];
        }
        if let Some(mode) = cli.mode {
            config.modes = vec![mode];
        }

        config.validate()?;
        Ok(config)
    }

    /// File and environment layers only
    pub fn from_sources(path: &Path) -> anyhow::Result<Self> {
        let layered = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix("ATTRPROBE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;

        layered
            .try_deserialize()
            .with_context(|| format!("Invalid configuration {}", path.display()))
    }

    /// Reject grids no run could complete
    pub fn validate(&self) -> anyhow::Result<()> {
        self.probe.validate()?;

        if self.failure_token.trim().is_empty() {
            bail!("failure_token must not be empty");
        }
        if self.models.is_empty() || self.attributes.is_empty() || self.modes.is_empty() {
            bail!("models, attributes and modes must each name at least one entry");
        }

        let distinct: BTreeSet<&str> = self.models.iter().map(String::as_str).collect();
        if distinct.len() != self.models.len() {
            bail!("duplicate model names in {:?}", self.models);
        }
        if BTreeSet::from_iter(&self.attributes).len() != self.attributes.len() {
            bail!("duplicate attributes in {:?}", self.attributes);
        }
        if BTreeSet::from_iter(&self.modes).len() != self.modes.len() {
            bail!("duplicate modes in {:?}", self.modes);
        }
        Ok(())
    }

    /// Number of (model, attribute, mode) runs
    pub fn total_runs(&self) -> usize {
        self.models.len() * self.attributes.len() * self.modes.len()
    }
}
