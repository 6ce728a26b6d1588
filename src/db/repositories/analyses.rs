use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{encode_report, parse_datetime, parse_report, parse_status, to_progress},
};
use crate::models::Analysis;

fn row_to_analysis(row: &Row) -> Result<Analysis> {
    let status: String = row.get("status")?;
    let progress: i64 = row.get("progress")?;
    let results: Option<String> = row.get("results")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Analysis {
        id: row.get("id")?,
        status: parse_status(&status),
        progress: to_progress(progress),
        results: parse_report(results, "results")?,
        error: row.get("error")?,
        repository_url: row.get("repository_url")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_analysis(&self, analysis: &Analysis) -> Result<()> {
        let record = analysis.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO analyses (id, status, progress, results, error, repository_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.status.as_str(),
                    i64::from(record.progress),
                    encode_report(record.results.as_ref())?,
                    record.error,
                    record.repository_url,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Upsert for reconciliation writes. Creates the row if absent; an
    /// existing row only has its mutable fields replaced, never
    /// `repository_url` or `created_at`.
    pub async fn upsert_analysis(&self, analysis: &Analysis) -> Result<()> {
        let record = analysis.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO analyses (id, status, progress, results, error, repository_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     status = excluded.status,
                     progress = excluded.progress,
                     results = excluded.results,
                     error = excluded.error,
                     updated_at = excluded.updated_at",
                params![
                    record.id,
                    record.status.as_str(),
                    i64::from(record.progress),
                    encode_report(record.results.as_ref())?,
                    record.error,
                    record.repository_url,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_analysis(&self, analysis_id: &str) -> Result<Option<Analysis>> {
        let analysis_id = analysis_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, status, progress, results, error, repository_url, created_at, updated_at
                 FROM analyses
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![analysis_id])?;
            let analysis = match rows.next()? {
                Some(row) => Some(row_to_analysis(row)?),
                None => None,
            };
            Ok(analysis)
        })
        .await
    }

    pub async fn list_analyses(&self) -> Result<Vec<Analysis>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, status, progress, results, error, repository_url, created_at, updated_at
                 FROM analyses
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut analyses = Vec::new();
            while let Some(row) = rows.next()? {
                analyses.push(row_to_analysis(row)?);
            }

            Ok(analyses)
        })
        .await
    }

    pub async fn delete_analysis(&self, analysis_id: &str) -> Result<()> {
        let analysis_id = analysis_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM analyses WHERE id = ?1", params![analysis_id])?;

            if rows_affected == 0 {
                return Err(anyhow::anyhow!("analysis not found"));
            }

            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    use crate::models::{Analysis, AnalysisStatus};

    use crate::db::connection::Database;

    fn open_temp_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("codelens.sqlite3")).unwrap();
        (dir, db)
    }

    fn sample(id: &str) -> Analysis {
        Analysis::processing(
            id.to_string(),
            "https://github.com/acme/widget".to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let (_dir, db) = open_temp_db();
        let analysis = sample("analysis_1");

        db.insert_analysis(&analysis).await.unwrap();
        let loaded = db.get_analysis("analysis_1").await.unwrap().unwrap();

        assert_eq!(loaded.id, analysis.id);
        assert_eq!(loaded.status, AnalysisStatus::Processing);
        assert_eq!(loaded.progress, 0);
        assert_eq!(loaded.repository_url, analysis.repository_url);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let (_dir, db) = open_temp_db();
        assert!(db.get_analysis("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_creates_when_absent() {
        let (_dir, db) = open_temp_db();
        let analysis = sample("analysis_2");

        db.upsert_analysis(&analysis).await.unwrap();
        assert!(db.get_analysis("analysis_2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn upsert_leaves_immutable_fields_alone() {
        let (_dir, db) = open_temp_db();
        let original = sample("analysis_3");
        db.insert_analysis(&original).await.unwrap();

        let mut update = original.clone();
        update.status = AnalysisStatus::Completed;
        update.progress = 100;
        update.repository_url = "https://github.com/evil/other".to_string();
        update.created_at = original.created_at + Duration::hours(3);
        update.updated_at = original.updated_at + Duration::minutes(5);
        db.upsert_analysis(&update).await.unwrap();

        let loaded = db.get_analysis("analysis_3").await.unwrap().unwrap();
        assert_eq!(loaded.status, AnalysisStatus::Completed);
        assert_eq!(loaded.progress, 100);
        assert_eq!(loaded.repository_url, original.repository_url);
        assert_eq!(
            loaded.created_at.to_rfc3339(),
            original.created_at.to_rfc3339()
        );
        assert_eq!(
            loaded.updated_at.to_rfc3339(),
            update.updated_at.to_rfc3339()
        );
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (_dir, db) = open_temp_db();

        let mut older = sample("analysis_old");
        older.created_at = Utc::now() - Duration::hours(2);
        older.updated_at = older.created_at;
        let newer = sample("analysis_new");

        db.insert_analysis(&older).await.unwrap();
        db.insert_analysis(&newer).await.unwrap();

        let listed = db.list_analyses().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "analysis_new");
        assert_eq!(listed[1].id, "analysis_old");
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let (_dir, db) = open_temp_db();
        db.insert_analysis(&sample("analysis_4")).await.unwrap();

        db.delete_analysis("analysis_4").await.unwrap();
        assert!(db.get_analysis("analysis_4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_reports_not_found() {
        let (_dir, db) = open_temp_db();
        let err = db.delete_analysis("ghost").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn report_payload_survives_storage() {
        let (_dir, db) = open_temp_db();
        let report: crate::models::FinalReport =
            serde_json::from_str(crate::models::report::SAMPLE_REPORT_JSON).unwrap();

        let mut analysis = sample("analysis_5");
        analysis.status = AnalysisStatus::Completed;
        analysis.progress = 100;
        analysis.results = Some(report.clone());

        db.insert_analysis(&analysis).await.unwrap();
        let loaded = db.get_analysis("analysis_5").await.unwrap().unwrap();
        assert_eq!(loaded.results, Some(report));
    }
}
