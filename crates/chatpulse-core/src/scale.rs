use serde::{Deserialize, Serialize};

use crate::{ActivityBatch, ChatPulseError, MetricKey, Result};

/// Output range and power exponent shared by every metric's scaling function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleConfig {
    #[serde(default = "ScaleConfig::default_min_size")]
    pub min_size: f64,
    #[serde(default = "ScaleConfig::default_max_size")]
    pub max_size: f64,
    #[serde(default = "ScaleConfig::default_exponent")]
    pub exponent: f64,
}

impl ScaleConfig {
    fn default_min_size() -> f64 {
        10.0
    }

    fn default_max_size() -> f64 {
        30.0
    }

    fn default_exponent() -> f64 {
        1.0 / 3.0
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_size + self.max_size) / 2.0
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            min_size: Self::default_min_size(),
            max_size: Self::default_max_size(),
            exponent: Self::default_exponent(),
        }
    }
}

/// Observed `[min, max]` of one metric across a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDomain {
    pub min: u64,
    pub max: u64,
}

impl MetricDomain {
    pub fn from_values<I: IntoIterator<Item = u64>>(values: I) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self { min: v, max: v }),
            Some(d) => Some(Self {
                min: d.min.min(v),
                max: d.max.max(v),
            }),
        })
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }
}

/// Power-scale mapping from a metric domain onto the node size range.
///
/// Values are transformed with `x^exponent` and interpolated linearly between
/// the transformed domain endpoints, so with exponent 1/3 the batch
/// `{1, 8, 27}` lands on `10, 20, 30`. A degenerate domain maps every input to
/// the range midpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingFunction {
    domain: MetricDomain,
    config: ScaleConfig,
}

impl ScalingFunction {
    pub fn new(domain: MetricDomain, config: ScaleConfig) -> Self {
        Self { domain, config }
    }

    pub fn domain(&self) -> MetricDomain {
        self.domain
    }

    /// Unrounded size, clamped to the configured range.
    pub fn scale(&self, value: u64) -> f64 {
        let ScaleConfig {
            min_size,
            max_size,
            exponent,
        } = self.config;
        if self.domain.is_degenerate() {
            return self.config.midpoint();
        }
        let pow = |x: u64| (x as f64).powf(exponent);
        let low = pow(self.domain.min);
        let span = pow(self.domain.max) - low;
        if !span.is_finite() || span == 0.0 {
            return self.config.midpoint();
        }
        let t = (pow(value) - low) / span;
        (min_size + t * (max_size - min_size)).clamp(min_size, max_size)
    }

    /// Node size rounded to the nearest integer.
    pub fn size(&self, value: u64) -> u32 {
        self.scale(value).round() as u32
    }
}

/// Per-cycle scaling functions, one per metric, computed once from the whole batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainStats {
    functions: [ScalingFunction; 4],
}

impl DomainStats {
    pub fn compute(batch: &ActivityBatch, config: ScaleConfig) -> Result<Self> {
        let function = |metric: MetricKey| {
            MetricDomain::from_values(batch.values(metric))
                .map(|domain| ScalingFunction::new(domain, config))
                .ok_or(ChatPulseError::EmptyBatch)
        };
        Ok(Self {
            functions: [
                function(MetricKey::Members)?,
                function(MetricKey::ActiveMembers)?,
                function(MetricKey::InactiveMembers)?,
                function(MetricKey::Messages)?,
            ],
        })
    }

    pub fn function(&self, metric: MetricKey) -> &ScalingFunction {
        &self.functions[metric.index()]
    }

    pub fn size(&self, metric: MetricKey, value: u64) -> u32 {
        self.function(metric).size(value)
    }
}
