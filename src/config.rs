use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Every cut-off used by the statistics and detection stages. Defaults match
/// production values; any subset can be overridden from a TOML file to test
/// different sample-size regimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Overall interview rate is suppressed below this many records.
    pub min_sample_overall: usize,
    /// A group's interview rate is suppressed below this many records.
    pub min_sample_group: usize,
    /// Minimum total for any threshold rule to fire.
    pub min_weak_apps: usize,
    /// Minimum total for a conversion finding to be graded strong.
    pub min_strong_apps: usize,
    pub conversion_weak_rate_max: f64,
    pub conversion_strong_rate_max: f64,
    pub distribution_weak_dominant_min: f64,
    pub distribution_strong_dominant_min: f64,
    pub target_weak_dominant_min: f64,
    pub target_strong_dominant_min: f64,
    /// Below this total, pattern detection stays silent entirely.
    pub silence_min_apps: usize,
    /// At most this many patterns are surfaced per run.
    pub max_exposed_patterns: usize,
    /// Minimum |group rate - overall rate| for a delta finding.
    pub min_abs_delta: f64,
    /// At most this many delta findings are returned.
    pub max_delta_findings: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_sample_overall: 10,
            min_sample_group: 5,
            min_weak_apps: 30,
            min_strong_apps: 50,
            conversion_weak_rate_max: 0.07,
            conversion_strong_rate_max: 0.04,
            distribution_weak_dominant_min: 0.65,
            distribution_strong_dominant_min: 0.80,
            target_weak_dominant_min: 0.75,
            target_strong_dominant_min: 0.90,
            silence_min_apps: 20,
            max_exposed_patterns: 2,
            min_abs_delta: 0.15,
            max_delta_findings: 8,
        }
    }
}

impl Thresholds {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let thresholds: Thresholds = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let ratios = [
            ("conversion_weak_rate_max", self.conversion_weak_rate_max),
            ("conversion_strong_rate_max", self.conversion_strong_rate_max),
            (
                "distribution_weak_dominant_min",
                self.distribution_weak_dominant_min,
            ),
            (
                "distribution_strong_dominant_min",
                self.distribution_strong_dominant_min,
            ),
            ("target_weak_dominant_min", self.target_weak_dominant_min),
            ("target_strong_dominant_min", self.target_strong_dominant_min),
            ("min_abs_delta", self.min_abs_delta),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be within 0.0..=1.0, got {value}");
            }
        }
        if self.min_strong_apps < self.min_weak_apps {
            bail!(
                "min_strong_apps ({}) must be >= min_weak_apps ({})",
                self.min_strong_apps,
                self.min_weak_apps
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_values() {
        let t = Thresholds::default();
        assert_eq!(t.min_sample_overall, 10);
        assert_eq!(t.min_sample_group, 5);
        assert_eq!(t.silence_min_apps, 20);
        assert_eq!(t.max_exposed_patterns, 2);
        assert_eq!(t.max_delta_findings, 8);
        assert!((t.min_abs_delta - 0.15).abs() < f64::EPSILON);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides_keep_defaults_elsewhere() {
        let t: Thresholds = toml::from_str("silence_min_apps = 5\nmax_exposed_patterns = 3\n")
            .expect("partial config parses");
        assert_eq!(t.silence_min_apps, 5);
        assert_eq!(t.max_exposed_patterns, 3);
        assert_eq!(t.min_weak_apps, 30);
    }

    #[test]
    fn validate_rejects_out_of_range_ratio() {
        let t = Thresholds {
            min_abs_delta: 1.5,
            ..Thresholds::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_sample_floors() {
        let t = Thresholds {
            min_strong_apps: 10,
            min_weak_apps: 30,
            ..Thresholds::default()
        };
        assert!(t.validate().is_err());
    }
}
