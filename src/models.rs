use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Semantic fields a CSV column can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AppliedDate,
    Company,
    Position,
    JobSource,
    Location,
    Status,
    Notes,
    ResumeVersion,
    Link,
}

impl Field {
    /// Declaration order. Missing-column reports follow this order.
    pub const REQUIRED: [Field; 4] = [
        Field::AppliedDate,
        Field::Company,
        Field::Position,
        Field::Status,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::AppliedDate => "applied_date",
            Field::Company => "company",
            Field::Position => "position",
            Field::JobSource => "job_source",
            Field::Location => "location",
            Field::Status => "status",
            Field::Notes => "notes",
            Field::ResumeVersion => "resume_version",
            Field::Link => "link",
        }
    }
}

/// Column index for each semantic field, `None` when no header matched.
/// Built once per upload and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeaderIndexMap {
    pub applied_date: Option<usize>,
    pub company: Option<usize>,
    pub position: Option<usize>,
    pub job_source: Option<usize>,
    pub location: Option<usize>,
    pub status: Option<usize>,
    pub notes: Option<usize>,
    pub resume_version: Option<usize>,
    pub link: Option<usize>,
}

impl HeaderIndexMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::AppliedDate => self.applied_date,
            Field::Company => self.company,
            Field::Position => self.position,
            Field::JobSource => self.job_source,
            Field::Location => self.location,
            Field::Status => self.status,
            Field::Notes => self.notes,
            Field::ResumeVersion => self.resume_version,
            Field::Link => self.link,
        }
    }

    pub fn set(&mut self, field: Field, index: Option<usize>) {
        match field {
            Field::AppliedDate => self.applied_date = index,
            Field::Company => self.company = index,
            Field::Position => self.position = index,
            Field::JobSource => self.job_source = index,
            Field::Location => self.location = index,
            Field::Status => self.status = index,
            Field::Notes => self.notes = index,
            Field::ResumeVersion => self.resume_version = index,
            Field::Link => self.link = index,
        }
    }

    /// Names of required fields with no matched column, in declaration order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        Field::REQUIRED
            .iter()
            .copied()
            .filter(|field| self.get(*field).is_none())
            .map(Field::name)
            .collect()
    }
}

/// Normalized application outcome. Every record carries exactly one of
/// these; free-text status never leaves the ingestion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Interview,
    Rejected,
    NoResponse,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Interview, Status::Rejected, Status::NoResponse];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Interview => "interview",
            Status::Rejected => "rejected",
            Status::NoResponse => "no_response",
        }
    }
}

/// One normalized job application. Created once per data row and held in
/// memory for the duration of an analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationRecord {
    pub application_id: Uuid,
    pub applied_date: String,
    pub company: String,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Fixed three-bucket status counter. All buckets always exist, zero-filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub interview: usize,
    pub rejected: usize,
    pub no_response: usize,
}

impl StatusCounts {
    pub fn bump(&mut self, status: Status) {
        match status {
            Status::Interview => self.interview += 1,
            Status::Rejected => self.rejected += 1,
            Status::NoResponse => self.no_response += 1,
        }
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Interview => self.interview,
            Status::Rejected => self.rejected,
            Status::NoResponse => self.no_response,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallStats {
    pub total: usize,
    pub by_status: StatusCounts,
    /// `None` when the sample is below the overall minimum.
    pub interview_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    JobSource,
    Location,
    Month,
    PositionKeyword,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::JobSource => "job_source",
            Dimension::Location => "location",
            Dimension::Month => "month",
            Dimension::PositionKeyword => "position_keyword",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownRow {
    pub key: String,
    pub total: usize,
    pub by_status: StatusCounts,
    /// `None` when the group is below the per-group minimum.
    pub interview_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownResult {
    pub dimension: Dimension,
    /// Sorted by descending total, ties broken by ascending key.
    pub rows: Vec<BreakdownRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsMeta {
    pub generated_at: DateTime<Utc>,
    pub status_values: [Status; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResult {
    pub overall: OverallStats,
    /// Fixed order: job_source, location, month, position_keyword.
    pub breakdowns: Vec<BreakdownResult>,
    pub meta: StatsMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    ConversionImbalance,
    DistributionConcentration,
    TargetNarrowness,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::ConversionImbalance => "conversion_imbalance",
            PatternKind::DistributionConcentration => "distribution_concentration",
            PatternKind::TargetNarrowness => "target_narrowness",
        }
    }

    /// Fixed ranking used when strength and confidence tie.
    pub fn priority(self) -> u8 {
        match self {
            PatternKind::ConversionImbalance => 3,
            PatternKind::DistributionConcentration => 2,
            PatternKind::TargetNarrowness => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Weak,
    Strong,
}

impl Strength {
    pub fn as_str(self) -> &'static str {
        match self {
            Strength::Weak => "weak",
            Strength::Strong => "strong",
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Strength::Strong => 1,
            Strength::Weak => 0,
        }
    }
}

/// A graded finding produced by one threshold rule.
#[derive(Debug, Clone, Serialize)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub strength: Strength,
    /// Rule-specific numeric metrics.
    pub metrics: BTreeMap<String, f64>,
    /// Heuristic confidence in [0, 1], derived from sample size alone.
    pub confidence: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Higher,
    Lower,
}

/// A per-group rate deviation from the overall interview rate.
#[derive(Debug, Clone, Serialize)]
pub struct DeltaFinding {
    pub dimension: Dimension,
    pub key: String,
    pub metric: &'static str,
    pub group_total: usize,
    pub overall_total: usize,
    pub group_rate: f64,
    pub overall_rate: f64,
    /// group_rate - overall_rate, signed.
    pub delta: f64,
    pub direction: Direction,
}

/// One narrated observation, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct InsightSentence {
    pub dimension: Dimension,
    pub key: String,
    pub text: String,
}
