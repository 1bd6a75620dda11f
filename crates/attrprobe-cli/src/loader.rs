//! Generation log loader
//!
//! Each model writes one JSON file per seed, `{tag}_seed_{n}.json`, holding an
//! array of entries:
//!
//! ```json
//! [{"seed": 3, "sex": "F", "race_ethnicity": "White", "patron_type": "Faculty",
//!   "response": "..."}]
//! ```

use attrprobe_core::{Attribute, Corpus, Document, Error, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Marker written in place of a response that never came back
pub const DEFAULT_FAILURE_TOKEN: &str = "[NO_TEXT_AFTER_RETRIES]";

/// File-name tag of a model: last path segment, dashes as underscores
pub fn model_tag(model_name: &str) -> String {
    model_name
        .rsplit('/')
        .next()
        .unwrap_or(model_name)
        .replace('-', "_")
}

/// Seed files for `model_name` under `input_dir`, sorted by name
pub fn generation_files(input_dir: &Path, model_name: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}_seed_", model_tag(model_name));

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(&prefix) && name.ends_with(".json"))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Counts of entries dropped while loading
#[derive(Debug, Clone, Copy, Default)]
struct SkipCounts {
    failed: usize,
    missing: usize,
}

/// Load every usable generation of `model_name` labelled with `attribute`
///
/// Entries whose response contains `failure_token`, or whose response,
/// label or seed is missing, null or empty, are skipped.
pub fn load_generations(
    input_dir: &Path,
    model_name: &str,
    attribute: Attribute,
    failure_token: &str,
) -> Result<Corpus> {
    let files = generation_files(input_dir, model_name)?;
    if files.is_empty() {
        return Err(Error::data(format!(
            "no {}_seed_*.json files in {}",
            model_tag(model_name),
            input_dir.display()
        )));
    }

    let mut documents = Vec::new();
    let mut skipped = SkipCounts::default();
    for path in &files {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<Map<String, Value>> = serde_json::from_str(&content)
            .map_err(|e| Error::data(format!("Invalid generation log {}: {}", path.display(), e)))?;

        debug!(file = %path.display(), entries = entries.len(), "read generation log");
        for entry in &entries {
            match parse_entry(entry, attribute, failure_token) {
                Ok(document) => documents.push(document),
                Err(Skip::Failed) => skipped.failed += 1,
                Err(Skip::Missing) => skipped.missing += 1,
            }
        }
    }

    if documents.is_empty() {
        return Err(Error::data(format!(
            "no usable {} generations for {}",
            attribute, model_name
        )));
    }

    info!(
        model = model_name,
        attribute = %attribute,
        files = files.len(),
        documents = documents.len(),
        failed = skipped.failed,
        missing = skipped.missing,
        "generations loaded"
    );
    Corpus::new(documents)
}

enum Skip {
    Failed,
    Missing,
}

fn parse_entry(
    entry: &Map<String, Value>,
    attribute: Attribute,
    failure_token: &str,
) -> std::result::Result<Document, Skip> {
    let text = non_empty_str(entry.get("response")).ok_or(Skip::Missing)?;
    if text.contains(failure_token) {
        return Err(Skip::Failed);
    }
    let label = non_empty_str(entry.get(attribute.as_str())).ok_or(Skip::Missing)?;
    let seed = entry.get("seed").and_then(seed_value).ok_or(Skip::Missing)?;
    Ok(Document::new(text, label, seed))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

// Seeds are integers, occasionally written as strings
fn seed_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
