use std::fmt::Write;

use crate::models::{
    BreakdownResult, DeltaFinding, Direction, InsightSentence, Pattern, StatsResult, Status,
};

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Render each delta finding as one cautious sentence. Groups with fewer
/// than ten records get an extra sample-size disclaimer.
pub fn narrate(findings: &[DeltaFinding]) -> Vec<InsightSentence> {
    findings
        .iter()
        .map(|finding| {
            let direction_text = match finding.direction {
                Direction::Higher => "appears to have a higher interview rate",
                Direction::Lower => "appears to have a lower interview rate",
            };
            let sample_note = if finding.group_total < 10 {
                " However, given the limited sample size, this observation should be interpreted cautiously."
            } else {
                ""
            };
            let text = format!(
                "In this dataset, applications in the \"{}\" group ({}) {} compared to the overall average ({} vs {}).{}",
                finding.key,
                finding.dimension.as_str(),
                direction_text,
                percent(finding.group_rate),
                percent(finding.overall_rate),
                sample_note,
            );
            InsightSentence {
                dimension: finding.dimension,
                key: finding.key.clone(),
                text,
            }
        })
        .collect()
}

fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.3}")
    }
}

fn rate_label(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => percent(rate),
        None => "n/a (sample below minimum)".to_string(),
    }
}

pub fn pattern_line(pattern: &Pattern) -> String {
    let mut line = format!(
        "- {} [{}] confidence {:.1}",
        pattern.kind.as_str(),
        pattern.strength.as_str(),
        pattern.confidence
    );
    for (name, value) in &pattern.metrics {
        let _ = write!(line, "; {} {}", name, format_metric(*value));
    }
    for (name, value) in &pattern.meta {
        let _ = write!(line, "; {} {}", name, value);
    }
    line
}

fn write_breakdown(output: &mut String, breakdown: &BreakdownResult) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Breakdown by {}", breakdown.dimension.as_str());

    if breakdown.rows.is_empty() {
        let _ = writeln!(output, "No records in this dimension.");
        return;
    }
    for row in &breakdown.rows {
        let _ = writeln!(
            output,
            "- {}: {} applications (interview rate {})",
            row.key,
            row.total,
            rate_label(row.interview_rate)
        );
    }
}

/// Assemble a markdown report from one analysis run.
pub fn build_report(
    source_name: &str,
    stats: &StatsResult,
    patterns: &[Pattern],
    sentences: &[InsightSentence],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Application Funnel Report");
    let _ = writeln!(
        output,
        "Generated from {} at {}",
        source_name,
        stats.meta.generated_at.to_rfc3339()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");
    let _ = writeln!(output, "- applications: {}", stats.overall.total);
    for status in Status::ALL {
        let _ = writeln!(
            output,
            "- {}: {}",
            status.as_str(),
            stats.overall.by_status.get(status)
        );
    }
    let _ = writeln!(
        output,
        "- interview rate: {}",
        rate_label(stats.overall.interview_rate)
    );

    for breakdown in &stats.breakdowns {
        write_breakdown(&mut output, breakdown);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Detected Patterns");
    if patterns.is_empty() {
        let _ = writeln!(output, "No patterns surfaced for this dataset.");
    } else {
        for pattern in patterns {
            let _ = writeln!(output, "{}", pattern_line(pattern));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Observations");
    if sentences.is_empty() {
        let _ = writeln!(output, "No rate deviations above the reporting threshold.");
    } else {
        for sentence in sentences {
            let _ = writeln!(output, "- {}", sentence.text);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BreakdownRow, Dimension, OverallStats, PatternKind, StatsMeta, Strength, StatusCounts,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn finding(key: &str, group_total: usize, group_rate: f64, overall_rate: f64) -> DeltaFinding {
        let delta = group_rate - overall_rate;
        DeltaFinding {
            dimension: Dimension::JobSource,
            key: key.to_string(),
            metric: "interview_rate",
            group_total,
            overall_total: 50,
            group_rate,
            overall_rate,
            delta,
            direction: if delta >= 0.0 {
                Direction::Higher
            } else {
                Direction::Lower
            },
        }
    }

    #[test]
    fn small_groups_get_the_cautionary_clause() {
        let sentences = narrate(&[finding("Referral", 4, 0.5, 0.25)]);
        assert!(sentences[0].text.contains("limited sample size"));
    }

    #[test]
    fn large_groups_do_not_get_the_cautionary_clause() {
        let sentences = narrate(&[finding("LinkedIn", 50, 0.083, 0.25)]);
        assert!(!sentences[0].text.contains("limited sample size"));
    }

    #[test]
    fn rates_render_as_percentages_with_one_decimal() {
        let sentences = narrate(&[finding("LinkedIn", 50, 0.083, 0.25)]);
        assert!(sentences[0].text.contains("8.3% vs 25.0%"));
        assert!(sentences[0].text.contains("lower interview rate"));
        assert!(sentences[0].text.contains("\"LinkedIn\" group (job_source)"));
    }

    #[test]
    fn report_covers_all_sections() {
        let stats = StatsResult {
            overall: OverallStats {
                total: 12,
                by_status: StatusCounts {
                    interview: 2,
                    rejected: 4,
                    no_response: 6,
                },
                interview_rate: Some(2.0 / 12.0),
            },
            breakdowns: vec![BreakdownResult {
                dimension: Dimension::JobSource,
                rows: vec![BreakdownRow {
                    key: "LinkedIn".to_string(),
                    total: 12,
                    by_status: StatusCounts::default(),
                    interview_rate: Some(2.0 / 12.0),
                }],
            }],
            meta: StatsMeta {
                generated_at: Utc::now(),
                status_values: Status::ALL,
            },
        };

        let mut metrics = BTreeMap::new();
        metrics.insert("dominant_ratio".to_string(), 0.7);
        let pattern = Pattern {
            kind: PatternKind::DistributionConcentration,
            strength: Strength::Weak,
            metrics,
            confidence: 0.6,
            meta: BTreeMap::new(),
        };

        let report = build_report("apps.csv", &stats, &[pattern], &[]);
        assert!(report.contains("# Application Funnel Report"));
        assert!(report.contains("Generated from apps.csv"));
        assert!(report.contains("- applications: 12"));
        assert!(report.contains("- interview rate: 16.7%"));
        assert!(report.contains("## Breakdown by job_source"));
        assert!(report.contains("- LinkedIn: 12 applications"));
        assert!(report.contains("distribution_concentration [weak] confidence 0.6"));
        assert!(report.contains("dominant_ratio 0.700"));
        assert!(report.contains("No rate deviations above the reporting threshold."));
    }

    #[test]
    fn empty_pattern_list_renders_placeholder() {
        let stats = StatsResult {
            overall: OverallStats {
                total: 0,
                by_status: StatusCounts::default(),
                interview_rate: None,
            },
            breakdowns: Vec::new(),
            meta: StatsMeta {
                generated_at: Utc::now(),
                status_values: Status::ALL,
            },
        };
        let report = build_report("apps.csv", &stats, &[], &[]);
        assert!(report.contains("No patterns surfaced for this dataset."));
        assert!(report.contains("n/a (sample below minimum)"));
    }
}
