use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::models::{AnalysisStatus, FinalReport};

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Stored status strings map back leniently; anything unrecognized stays
/// visible instead of poisoning the whole row.
pub fn parse_status(value: &str) -> AnalysisStatus {
    match value {
        "processing" => AnalysisStatus::Processing,
        "completed" => AnalysisStatus::Completed,
        "failed" => AnalysisStatus::Failed,
        other => AnalysisStatus::Unknown(other.to_string()),
    }
}

pub fn to_progress(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

pub fn parse_report(value: Option<String>, field: &str) -> Result<Option<FinalReport>> {
    match value {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .with_context(|| format!("failed to parse {field}")),
        None => Ok(None),
    }
}

pub fn encode_report(report: Option<&FinalReport>) -> Result<Option<String>> {
    report
        .map(|value| serde_json::to_string(value).map_err(|err| anyhow!("{err}")))
        .transpose()
        .context("failed to encode report payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_lenient() {
        assert_eq!(parse_status("processing"), AnalysisStatus::Processing);
        assert_eq!(parse_status("failed"), AnalysisStatus::Failed);
        assert_eq!(
            parse_status("archived"),
            AnalysisStatus::Unknown("archived".to_string())
        );
    }

    #[test]
    fn progress_clamps_to_display_range() {
        assert_eq!(to_progress(-5), 0);
        assert_eq!(to_progress(45), 45);
        assert_eq!(to_progress(250), 100);
    }

    #[test]
    fn datetime_errors_name_the_field() {
        let err = parse_datetime("not-a-date", "created_at").unwrap_err();
        assert!(err.to_string().contains("created_at"));
    }
}
