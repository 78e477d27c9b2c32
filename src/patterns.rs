use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::config::Thresholds;
use crate::models::{BreakdownResult, Dimension, Pattern, PatternKind, StatsResult, Strength};

/// Apply the three threshold rules to a stats result, then rank and cap the
/// findings. Below the silence floor nothing is surfaced, however extreme
/// the individual signals.
pub fn detect_patterns(stats: &StatsResult, thresholds: &Thresholds) -> Vec<Pattern> {
    let total = stats.overall.total;
    if total < thresholds.silence_min_apps {
        debug!(total, "below silence floor, suppressing all patterns");
        return Vec::new();
    }
    let Some(rate) = stats.overall.interview_rate else {
        return Vec::new();
    };

    let mut patterns = Vec::new();
    patterns.extend(check_conversion_imbalance(total, rate, thresholds));
    patterns.extend(check_distribution_concentration(
        &stats.breakdowns,
        total,
        thresholds,
    ));
    patterns.extend(check_target_narrowness(&stats.breakdowns, total, thresholds));

    patterns.sort_by(|a, b| {
        b.strength
            .rank()
            .cmp(&a.strength.rank())
            .then_with(|| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.kind.priority().cmp(&a.kind.priority()))
    });
    patterns.truncate(thresholds.max_exposed_patterns);
    patterns
}

/// Confidence tiers from overall sample size alone.
pub fn confidence_by_sample(total: usize) -> f64 {
    if total >= 100 {
        1.0
    } else if total >= 50 {
        0.8
    } else if total >= 30 {
        0.6
    } else {
        0.4
    }
}

fn check_conversion_imbalance(total: usize, rate: f64, t: &Thresholds) -> Option<Pattern> {
    if total < t.min_weak_apps {
        return None;
    }

    let strength = if total >= t.min_strong_apps && rate <= t.conversion_strong_rate_max {
        Strength::Strong
    } else if rate <= t.conversion_weak_rate_max {
        Strength::Weak
    } else {
        return None;
    };

    let mut metrics = BTreeMap::new();
    metrics.insert("applications".to_string(), total as f64);
    metrics.insert("interview_rate".to_string(), rate);
    metrics.insert(
        "estimated_interviews".to_string(),
        (rate * total as f64).round(),
    );

    Some(Pattern {
        kind: PatternKind::ConversionImbalance,
        strength,
        metrics,
        confidence: confidence_by_sample(total),
        meta: BTreeMap::new(),
    })
}

/// Largest group's share of the overall record count. Rows are already
/// sorted by descending total, so the first row is the dominant group.
fn dominant_share(breakdown: &BreakdownResult, overall_total: usize) -> Option<(String, f64)> {
    let top = breakdown.rows.first()?;
    if top.total == 0 || overall_total == 0 {
        return None;
    }
    Some((top.key.clone(), top.total as f64 / overall_total as f64))
}

fn check_distribution_concentration(
    breakdowns: &[BreakdownResult],
    total: usize,
    t: &Thresholds,
) -> Option<Pattern> {
    if total < t.min_weak_apps {
        return None;
    }

    // Only source and location concentration count, and only when the
    // breakdown actually has at least two groups to concentrate between.
    let mut best: Option<(Dimension, String, f64)> = None;
    for breakdown in breakdowns.iter().filter(|b| {
        matches!(b.dimension, Dimension::JobSource | Dimension::Location) && b.rows.len() >= 2
    }) {
        if let Some((key, ratio)) = dominant_share(breakdown, total) {
            if best.as_ref().map_or(true, |(_, _, r)| ratio > *r) {
                best = Some((breakdown.dimension, key, ratio));
            }
        }
    }

    let (dimension, key, ratio) = best?;
    if ratio < t.distribution_weak_dominant_min {
        return None;
    }
    let strength = if ratio >= t.distribution_strong_dominant_min {
        Strength::Strong
    } else {
        Strength::Weak
    };

    let mut metrics = BTreeMap::new();
    metrics.insert("dominant_ratio".to_string(), ratio);
    let mut meta = BTreeMap::new();
    meta.insert("dominant_dimension".to_string(), dimension.as_str().to_string());
    meta.insert("dominant_category".to_string(), key);

    Some(Pattern {
        kind: PatternKind::DistributionConcentration,
        strength,
        metrics,
        confidence: confidence_by_sample(total),
        meta,
    })
}

fn check_target_narrowness(
    breakdowns: &[BreakdownResult],
    total: usize,
    t: &Thresholds,
) -> Option<Pattern> {
    if total < t.min_weak_apps {
        return None;
    }

    let breakdown = breakdowns
        .iter()
        .find(|b| b.dimension == Dimension::PositionKeyword)?;
    if breakdown.rows.len() < 2 {
        return None;
    }

    let (key, ratio) = dominant_share(breakdown, total)?;
    if ratio < t.target_weak_dominant_min {
        return None;
    }
    let strength = if ratio >= t.target_strong_dominant_min {
        Strength::Strong
    } else {
        Strength::Weak
    };

    let mut metrics = BTreeMap::new();
    metrics.insert("dominant_keyword_ratio".to_string(), ratio);
    metrics.insert(
        "unique_keyword_count".to_string(),
        breakdown.rows.len() as f64,
    );
    let mut meta = BTreeMap::new();
    meta.insert("dominant_keyword".to_string(), key);

    Some(Pattern {
        kind: PatternKind::TargetNarrowness,
        strength,
        metrics,
        confidence: confidence_by_sample(total),
        meta,
    })
}
