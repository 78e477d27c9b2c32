use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::config::Thresholds;
use crate::models::{
    ApplicationRecord, BreakdownResult, BreakdownRow, Dimension, OverallStats, StatsMeta,
    StatsResult, Status, StatusCounts,
};

const UNKNOWN_KEY: &str = "(unknown)";
const INVALID_DATE_KEY: &str = "(invalid_date)";
const OTHER_KEY: &str = "(other)";

/// Accepted applied-date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Position keywords in priority order, more specific first. Matching is
/// case-insensitive substring search, first match wins.
const POSITION_KEYWORDS: &[(&[&str], &str)] = &[
    (&["intern"], "intern"),
    (&["junior"], "junior"),
    (&["graduate", "grad"], "graduate"),
    (&["mid", "intermediate"], "mid"),
    (&["senior", "sr"], "senior"),
    (&["lead", "principal"], "lead"),
    (&["manager", "mgr"], "manager"),
];

/// Compute overall stats plus the four breakdowns in fixed dimension order.
pub fn build_stats(records: &[ApplicationRecord], thresholds: &Thresholds) -> StatsResult {
    let min_group = thresholds.min_sample_group;
    let breakdowns = vec![
        compute_breakdown(records, Dimension::JobSource, job_source_key, min_group),
        compute_breakdown(records, Dimension::Location, location_key, min_group),
        compute_breakdown(records, Dimension::Month, record_month_key, min_group),
        compute_breakdown(
            records,
            Dimension::PositionKeyword,
            record_position_keyword,
            min_group,
        ),
    ];
    debug!(total = records.len(), "computed statistics");
    StatsResult {
        overall: compute_overall(records, thresholds.min_sample_overall),
        breakdowns,
        meta: StatsMeta {
            generated_at: Utc::now(),
            status_values: Status::ALL,
        },
    }
}

pub fn compute_overall(records: &[ApplicationRecord], min_sample: usize) -> OverallStats {
    let total = records.len();
    let mut by_status = StatusCounts::default();
    for record in records {
        by_status.bump(record.status);
    }

    let interview_rate = if total >= min_sample && total > 0 {
        Some(by_status.interview as f64 / total as f64)
    } else {
        None
    };

    OverallStats {
        total,
        by_status,
        interview_rate,
    }
}

/// Group records by key, count per-status, suppress small-group rates, and
/// sort rows by descending total with ascending key as the tie-breaker.
pub fn compute_breakdown<F>(
    records: &[ApplicationRecord],
    dimension: Dimension,
    key_fn: F,
    min_sample_group: usize,
) -> BreakdownResult
where
    F: Fn(&ApplicationRecord) -> String,
{
    let mut groups: HashMap<String, (usize, StatusCounts)> = HashMap::new();
    for record in records {
        let entry = groups
            .entry(key_fn(record))
            .or_insert((0, StatusCounts::default()));
        entry.0 += 1;
        entry.1.bump(record.status);
    }

    let mut rows: Vec<BreakdownRow> = groups
        .into_iter()
        .map(|(key, (total, by_status))| BreakdownRow {
            interview_rate: if total >= min_sample_group && total > 0 {
                Some(by_status.interview as f64 / total as f64)
            } else {
                None
            },
            key,
            total,
            by_status,
        })
        .collect();

    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));

    BreakdownResult { dimension, rows }
}

fn safe_key(raw: Option<&str>, fallback: &str) -> String {
    match raw {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn job_source_key(record: &ApplicationRecord) -> String {
    safe_key(record.job_source.as_deref(), UNKNOWN_KEY)
}

fn location_key(record: &ApplicationRecord) -> String {
    safe_key(record.location.as_deref(), UNKNOWN_KEY)
}

fn record_month_key(record: &ApplicationRecord) -> String {
    month_key(&record.applied_date)
}

fn record_position_keyword(record: &ApplicationRecord) -> String {
    position_keyword(&record.position)
}

/// Derive a `YYYY-MM` key from an applied-date string, or the invalid-date
/// fallback when no accepted layout parses.
pub fn month_key(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return INVALID_DATE_KEY.to_string();
    }
    match parse_applied_date(text) {
        Some(date) => date.format("%Y-%m").to_string(),
        None => INVALID_DATE_KEY.to_string(),
    }
}

fn parse_applied_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Bucket a position title by its seniority keyword.
pub fn position_keyword(raw: &str) -> String {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return OTHER_KEY.to_string();
    }
    for (needles, label) in POSITION_KEYWORDS {
        if needles.iter().any(|needle| text.contains(needle)) {
            return label.to_string();
        }
    }
    OTHER_KEY.to_string()
}
