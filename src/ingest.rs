use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::{ApplicationRecord, Field, HeaderIndexMap, Status};

/// Header aliases per semantic field. A header claims a field when its
/// trimmed, lower-cased text equals one alias exactly. The first matching
/// column wins; fields resolve independently of each other.
const HEADER_ALIASES: &[(Field, &[&str])] = &[
    (Field::AppliedDate, &["applied_date", "date", "applied", "applied date"]),
    (Field::Company, &["company", "company_name", "employer"]),
    (Field::Position, &["position", "role", "job_title", "title"]),
    (Field::JobSource, &["job_source", "source", "platform"]),
    (Field::Location, &["location", "city", "region"]),
    (Field::Status, &["status", "result", "outcome"]),
    (Field::Notes, &["notes", "memo", "comment"]),
    (Field::ResumeVersion, &["resume_version", "cv_version", "resume"]),
    (Field::Link, &["link", "url", "posting", "job_link"]),
];

/// Ordered status rules, first match wins. Matching is case-insensitive
/// substring search, so "Interview Scheduled" lands in the interview bucket.
/// Text matching no rule defaults to no_response; ambiguous input must never
/// be classified as a positive outcome.
const STATUS_RULES: &[(&[&str], Status)] = &[
    (
        &["interview", "phone screen", "screening", "1st interview", "first interview"],
        Status::Interview,
    ),
    (
        &["reject", "rejected", "declined", "unsuccessful", "no longer"],
        Status::Rejected,
    ),
    (
        &["no response", "ghost", "pending", "applied", "submitted", "waiting", "in progress"],
        Status::NoResponse,
    ),
];

/// Tokenized CSV: one header row plus data rows, fields trimmed.
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Split raw CSV text into trimmed headers and rows. Quoted fields with
/// embedded commas and doubled-quote escapes are honored; blank lines are
/// dropped. Empty input yields empty headers and rows.
pub fn tokenize(text: &str) -> ParsedCsv {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(str::to_string).collect(),
        Err(err) => {
            warn!(%err, "failed to read CSV header row");
            Vec::new()
        }
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => {
                let fields: Vec<String> = record.iter().map(str::to_string).collect();
                // A whitespace-only line trims to one empty field and counts
                // as blank. A delimiter-only line like ",,," is a real row of
                // empty fields and is kept.
                if fields.len() <= 1 && fields.iter().all(|field| field.is_empty()) {
                    continue;
                }
                rows.push(fields);
            }
            Err(err) => warn!(%err, "skipping malformed CSV row"),
        }
    }

    ParsedCsv { headers, rows }
}

/// Resolve raw headers to semantic fields via the alias table.
pub fn build_header_index_map(headers: &[String]) -> HeaderIndexMap {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut map = HeaderIndexMap::default();
    for (field, aliases) in HEADER_ALIASES {
        let index = lowered.iter().position(|h| aliases.contains(&h.as_str()));
        map.set(*field, index);
    }
    map
}

/// Map free-text status to one of the three canonical values. Total: every
/// input, including empty text, yields a value.
pub fn normalize_status(raw: &str) -> Status {
    let text = raw.trim().to_lowercase();
    for (needles, status) in STATUS_RULES {
        if needles.iter().any(|needle| text.contains(needle)) {
            return *status;
        }
    }
    Status::NoResponse
}

fn pick<'a>(row: &'a [String], index: Option<usize>) -> &'a str {
    index
        .and_then(|i| row.get(i))
        .map(|value| value.trim())
        .unwrap_or("")
}

fn pick_opt(row: &[String], index: Option<usize>) -> Option<String> {
    let value = pick(row, index);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Build one record per row, preserving row order. Record ids are unique
/// within one invocation only; re-importing the same CSV mints fresh ids.
pub fn to_records(rows: &[Vec<String>], map: &HeaderIndexMap) -> Vec<ApplicationRecord> {
    rows.iter()
        .map(|row| ApplicationRecord {
            application_id: Uuid::new_v4(),
            applied_date: pick(row, map.get(Field::AppliedDate)).to_string(),
            company: pick(row, map.get(Field::Company)).to_string(),
            position: pick(row, map.get(Field::Position)).to_string(),
            job_source: pick_opt(row, map.get(Field::JobSource)),
            location: pick_opt(row, map.get(Field::Location)),
            status: normalize_status(pick(row, map.get(Field::Status))),
            notes: pick_opt(row, map.get(Field::Notes)),
            resume_version: pick_opt(row, map.get(Field::ResumeVersion)),
            link: pick_opt(row, map.get(Field::Link)),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineMeta {
    pub total_rows: usize,
    pub mapped_fields: HeaderIndexMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub records: Vec<ApplicationRecord>,
    pub meta: PipelineMeta,
}

/// Run tokenized CSV through header resolution and record normalization.
/// Failures are terminal for the upload and carry a stable error code.
pub fn run_pipeline(parsed: &ParsedCsv) -> Result<PipelineOutput, PipelineError> {
    if parsed.headers.is_empty() {
        return Err(PipelineError::EmptyFile);
    }
    if parsed.rows.is_empty() {
        return Err(PipelineError::NoDataRows);
    }

    let map = build_header_index_map(&parsed.headers);
    let missing = map.missing_required();
    if !missing.is_empty() {
        return Err(PipelineError::MissingRequiredColumns {
            missing: missing.iter().map(|name| name.to_string()).collect(),
        });
    }

    let records = to_records(&parsed.rows, &map);
    debug!(total_rows = records.len(), "normalized application records");

    Ok(PipelineOutput {
        meta: PipelineMeta {
            total_rows: parsed.rows.len(),
            mapped_fields: map,
        },
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn tokenize_honors_quotes_and_blank_lines() {
        let text = "company,notes\n\nAcme,\"hello, world\"\n\"Say \"\"hi\"\"\",ok\n";
        let parsed = tokenize(text);
        assert_eq!(parsed.headers, vec!["company", "notes"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0], vec!["Acme", "hello, world"]);
        assert_eq!(parsed.rows[1], vec!["Say \"hi\"", "ok"]);
    }

    #[test]
    fn delimiter_only_rows_are_kept_as_empty_fields() {
        let text = "date,company,position,status\n,,,\n   \n";
        let parsed = tokenize(text);
        assert_eq!(parsed.rows, vec![vec!["", "", "", ""]]);

        let output = run_pipeline(&parsed).expect("pipeline succeeds");
        assert_eq!(output.meta.total_rows, 1);
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].company, "");
        assert_eq!(output.records[0].status, Status::NoResponse);
    }

    #[test]
    fn tokenize_empty_text_yields_empty_shape() {
        let parsed = tokenize("");
        assert!(parsed.headers.is_empty());
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn header_aliases_match_case_insensitively() {
        let map = build_header_index_map(&headers(&[
            "Applied Date",
            "EMPLOYER",
            "Role",
            "Outcome",
            "Platform",
        ]));
        assert_eq!(map.applied_date, Some(0));
        assert_eq!(map.company, Some(1));
        assert_eq!(map.position, Some(2));
        assert_eq!(map.status, Some(3));
        assert_eq!(map.job_source, Some(4));
        assert_eq!(map.location, None);
    }

    #[test]
    fn missing_required_reports_declaration_order() {
        let map = build_header_index_map(&headers(&["company", "notes"]));
        assert_eq!(map.missing_required(), vec!["applied_date", "position", "status"]);
    }

    #[test]
    fn status_rules_first_match_wins() {
        assert_eq!(normalize_status("Interview Scheduled"), Status::Interview);
        // "interview pending" also contains a no_response keyword, but the
        // interview rule is evaluated first.
        assert_eq!(normalize_status("interview pending"), Status::Interview);
        assert_eq!(normalize_status("Phone Screen next week"), Status::Interview);
        assert_eq!(normalize_status("REJECTED"), Status::Rejected);
        assert_eq!(normalize_status("no longer under consideration"), Status::Rejected);
        assert_eq!(normalize_status("ghosted"), Status::NoResponse);
        assert_eq!(normalize_status("Applied"), Status::NoResponse);
    }

    #[test]
    fn status_is_total_with_conservative_default() {
        assert_eq!(normalize_status(""), Status::NoResponse);
        assert_eq!(normalize_status("   "), Status::NoResponse);
        assert_eq!(normalize_status("???"), Status::NoResponse);
        assert_eq!(normalize_status("offer accepted"), Status::NoResponse);
    }

    #[test]
    fn records_preserve_order_and_blank_optionals() {
        let map = build_header_index_map(&headers(&[
            "date", "company", "position", "status", "source",
        ]));
        let rows = vec![
            vec![
                "2026-01-02".to_string(),
                "Acme".to_string(),
                "Engineer".to_string(),
                "Applied".to_string(),
                "".to_string(),
            ],
            vec![
                "2026-01-03".to_string(),
                "Globex".to_string(),
                "Analyst".to_string(),
                "Interview".to_string(),
                "LinkedIn".to_string(),
            ],
        ];
        let records = to_records(&rows, &map);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company, "Acme");
        assert_eq!(records[0].job_source, None);
        assert_eq!(records[0].status, Status::NoResponse);
        assert_eq!(records[1].job_source.as_deref(), Some("LinkedIn"));
        assert_eq!(records[1].status, Status::Interview);
        assert_ne!(records[0].application_id, records[1].application_id);
    }

    #[test]
    fn short_rows_fall_back_to_empty_fields() {
        let map = build_header_index_map(&headers(&["date", "company", "position", "status"]));
        let rows = vec![vec!["2026-01-02".to_string(), "Acme".to_string()]];
        let records = to_records(&rows, &map);
        assert_eq!(records[0].position, "");
        assert_eq!(records[0].status, Status::NoResponse);
    }

    #[test]
    fn pipeline_rejects_empty_file() {
        let err = run_pipeline(&tokenize("")).unwrap_err();
        assert_eq!(err.code(), "EMPTY_FILE");
    }

    #[test]
    fn pipeline_rejects_header_only_file() {
        let err = run_pipeline(&tokenize("date,company,position,status\n")).unwrap_err();
        assert_eq!(err.code(), "NO_DATA_ROWS");
    }

    #[test]
    fn pipeline_rejects_unresolvable_required_columns() {
        let err = run_pipeline(&tokenize("company,notes\nAcme,hi\n")).unwrap_err();
        match err {
            PipelineError::MissingRequiredColumns { ref missing } => {
                assert_eq!(missing, &["applied_date", "position", "status"]);
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pipeline_success_carries_meta() {
        let text = "applied_date,company,position,status\n2026-01-02,Acme,Engineer,Applied\n";
        let output = run_pipeline(&tokenize(text)).expect("pipeline succeeds");
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.meta.total_rows, 1);
        assert_eq!(output.meta.mapped_fields.status, Some(3));
        assert_eq!(output.meta.mapped_fields.location, None);
    }
}
