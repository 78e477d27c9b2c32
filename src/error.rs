use serde_json::json;
use thiserror::Error;

/// Pipeline failures surfaced to the caller as structured values. Each
/// variant carries a stable machine-readable code for display layers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Tokenizer produced no header row.
    #[error("CSV headers are missing")]
    EmptyFile,

    /// Headers present but zero data rows.
    #[error("CSV has no data rows")]
    NoDataRows,

    /// One or more required columns could not be resolved.
    #[error("missing required columns: {}", missing.join(", "))]
    MissingRequiredColumns { missing: Vec<String> },
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::EmptyFile => "EMPTY_FILE",
            PipelineError::NoDataRows => "NO_DATA_ROWS",
            PipelineError::MissingRequiredColumns { .. } => "MISSING_REQUIRED_COLUMNS",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            PipelineError::MissingRequiredColumns { missing } => {
                Some(json!({ "missing": missing }))
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "ok": false,
            "code": self.code(),
            "message": self.to_string(),
            "details": self.details(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(PipelineError::EmptyFile.code(), "EMPTY_FILE");
        assert_eq!(PipelineError::NoDataRows.code(), "NO_DATA_ROWS");
        let err = PipelineError::MissingRequiredColumns {
            missing: vec!["status".to_string()],
        };
        assert_eq!(err.code(), "MISSING_REQUIRED_COLUMNS");
    }

    #[test]
    fn missing_columns_carry_details() {
        let err = PipelineError::MissingRequiredColumns {
            missing: vec!["applied_date".to_string(), "status".to_string()],
        };
        assert_eq!(err.to_string(), "missing required columns: applied_date, status");
        let details = err.details().unwrap();
        assert_eq!(details["missing"][1], "status");
        assert!(PipelineError::EmptyFile.details().is_none());
    }

    #[test]
    fn json_shape_includes_code_and_message() {
        let value = PipelineError::NoDataRows.to_json();
        assert_eq!(value["ok"], false);
        assert_eq!(value["code"], "NO_DATA_ROWS");
        assert_eq!(value["message"], "CSV has no data rows");
        assert!(value["details"].is_null());
    }
}
