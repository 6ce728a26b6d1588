//! Analysis job models shared by the API client, the local mirror, and the
//! polling layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::FinalReport;

/// Backend job status. Unrecognized values are preserved as-is so a newer
/// backend cannot crash the client; they render as an unexpected status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisStatus {
    Processing,
    Completed,
    Failed,
    #[serde(untagged)]
    Unknown(String),
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
            AnalysisStatus::Unknown(other) => other,
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: String,
    pub status: AnalysisStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<FinalReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub repository_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Analysis {
    /// Fresh processing record, as seeded right after submission.
    pub fn processing(id: String, repository_url: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: AnalysisStatus::Processing,
            progress: 0,
            results: None,
            error: None,
            repository_url,
            created_at: now,
            updated_at: now,
        }
    }
}
