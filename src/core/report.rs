use crate::core::engine::{BatchOutcome, Evaluation};
use crate::domain::model::MatchReport;
use crate::domain::ports::Storage;
use crate::utils::error::{CopilotError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

const BATCH_CSV: &str = "reports.csv";
const BATCH_JSON: &str = "reports.json";

#[derive(Debug, Serialize)]
struct BatchCsvRow<'a> {
    resume_id: &'a str,
    status: &'static str,
    score: Option<f64>,
    matched_skills: String,
    missing_required_skills: String,
    missing_nice_to_have_skills: String,
    semantic_matches: String,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchJsonEntry<'a> {
    resume_id: &'a str,
    report: Option<&'a MatchReport>,
    error: Option<String>,
}

/// Persists match results through a `Storage` backend.
pub struct ReportWriter<S: Storage> {
    storage: S,
}

impl<S: Storage> ReportWriter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn write_report(&self, evaluation: &Evaluation, filename: &str) -> Result<String> {
        let json = serde_json::to_string_pretty(evaluation)?;
        tracing::debug!("Writing report ({} bytes) to {}", json.len(), filename);
        self.storage.write_file(filename, json.as_bytes()).await?;
        Ok(filename.to_string())
    }

    pub async fn load_report(&self, filename: &str) -> Result<Evaluation> {
        let data = self.storage.read_file(filename).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Bundles a CSV summary and the full JSON reports into one ZIP archive.
    pub async fn write_batch(&self, outcomes: &[BatchOutcome], filename: &str) -> Result<String> {
        let csv_data = batch_csv(outcomes)?;
        let entries: Vec<BatchJsonEntry> = outcomes
            .iter()
            .map(|outcome| BatchJsonEntry {
                resume_id: &outcome.resume_id,
                report: outcome.result.as_ref().ok(),
                error: outcome.result.as_ref().err().map(|e| e.to_string()),
            })
            .collect();
        let json_data = serde_json::to_string_pretty(&entries)?;

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>(BATCH_CSV, FileOptions::default())?;
            zip.write_all(&csv_data)?;

            zip.start_file::<_, ()>(BATCH_JSON, FileOptions::default())?;
            zip.write_all(json_data.as_bytes())?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!(
            "Writing batch archive with {} reports ({} bytes) to {}",
            outcomes.len(),
            zip_data.len(),
            filename
        );
        self.storage.write_file(filename, &zip_data).await?;
        Ok(filename.to_string())
    }
}

fn batch_csv(outcomes: &[BatchOutcome]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for outcome in outcomes {
        let row = match &outcome.result {
            Ok(report) => BatchCsvRow {
                resume_id: &outcome.resume_id,
                status: "ok",
                score: Some(report.score),
                matched_skills: join(&report.matched_skills),
                missing_required_skills: join(&report.missing_required_skills),
                missing_nice_to_have_skills: join(&report.missing_nice_to_have_skills),
                semantic_matches: report
                    .semantic_matches
                    .iter()
                    .map(|m| format!("{}~{}", m.job_skill, m.resume_skill))
                    .collect::<Vec<_>>()
                    .join(";"),
                error: None,
            },
            Err(e) => BatchCsvRow {
                resume_id: &outcome.resume_id,
                status: "error",
                score: None,
                matched_skills: String::new(),
                missing_required_skills: String::new(),
                missing_nice_to_have_skills: String::new(),
                semantic_matches: String::new(),
                error: Some(e.to_string()),
            },
        };
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| CopilotError::IoError(e.into_error()))
}

fn join(skills: &BTreeSet<String>) -> String {
    skills.iter().map(String::as_str).collect::<Vec<_>>().join(";")
}
