use std::cmp::Ordering;

use crate::config::Thresholds;
use crate::models::{DeltaFinding, Direction, StatsResult};

/// Compare every breakdown group's interview rate against the overall rate
/// and keep the largest deviations. Independent of the threshold-rule
/// detector; both strategies read the same stats result.
pub fn detect_deltas(stats: &StatsResult, thresholds: &Thresholds) -> Vec<DeltaFinding> {
    let overall = &stats.overall;
    if overall.total < thresholds.min_sample_overall {
        return Vec::new();
    }
    let Some(overall_rate) = overall.interview_rate else {
        return Vec::new();
    };

    let mut findings = Vec::new();
    for breakdown in &stats.breakdowns {
        for row in &breakdown.rows {
            if row.total < thresholds.min_sample_group {
                continue;
            }
            let Some(group_rate) = row.interview_rate else {
                continue;
            };

            let delta = group_rate - overall_rate;
            if delta.abs() < thresholds.min_abs_delta {
                continue;
            }

            findings.push(DeltaFinding {
                dimension: breakdown.dimension,
                key: row.key.clone(),
                metric: "interview_rate",
                group_total: row.total,
                overall_total: overall.total,
                group_rate,
                overall_rate,
                delta,
                direction: if delta >= 0.0 {
                    Direction::Higher
                } else {
                    Direction::Lower
                },
            });
        }
    }

    findings.sort_by(|a, b| {
        b.delta
            .abs()
            .partial_cmp(&a.delta.abs())
            .unwrap_or(Ordering::Equal)
    });
    findings.truncate(thresholds.max_delta_findings);
    findings
}
