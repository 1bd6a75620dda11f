//! Student-t confidence interval for a mean

use attrprobe_core::{Error, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Default two-sided confidence level
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Sample mean with a two-sided confidence interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

impl MeanInterval {
    /// Interval bounds as a pair
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Whether `value` lies within the interval
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Mean and `confidence` interval using the t distribution with `n - 1`
/// degrees of freedom and the sample (ddof = 1) standard error.
///
/// With a single value or zero spread the interval collapses to the mean.
pub fn mean_confidence_interval(values: &[f64], confidence: f64) -> Result<MeanInterval> {
    if values.is_empty() {
        return Err(Error::data("cannot compute a confidence interval of no values"));
    }
    if !(0.0..1.0).contains(&confidence) {
        return Err(Error::config(format!(
            "confidence level must lie in [0, 1), got {}",
            confidence
        )));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return Ok(MeanInterval {
            mean,
            lower: mean,
            upper: mean,
        });
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let sem = variance.sqrt() / n.sqrt();
    if sem == 0.0 {
        return Ok(MeanInterval {
            mean,
            lower: mean,
            upper: mean,
        });
    }

    let t = StudentsT::new(0.0, 1.0, n - 1.0)
        .map_err(|e| Error::internal(format!("invalid t distribution: {}", e)))?;
    let half_width = sem * t.inverse_cdf((1.0 + confidence) / 2.0);

    Ok(MeanInterval {
        mean,
        lower: mean - half_width,
        upper: mean + half_width,
    })
}
