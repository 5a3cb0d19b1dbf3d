use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::models::resume::{id_from_key, ResumeSummary, StoredRecord, RECORD_KEY_PREFIX};
use crate::stores::KvStore;

/// Home listing of every saved resume.
pub struct HomeView {
    kv: Arc<dyn KvStore>,
}

impl HomeView {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Lists saved resumes sorted by id. Records that fail to parse are skipped.
    pub async fn list(&self) -> Result<Vec<ResumeSummary>> {
        let pattern = format!("{RECORD_KEY_PREFIX}*");
        let entries = self.kv.list(&pattern).await?;

        let mut summaries: Vec<ResumeSummary> = entries
            .into_iter()
            .filter_map(|(key, raw)| {
                let id = id_from_key(&key)?.to_string();
                match serde_json::from_str::<StoredRecord>(&raw) {
                    Ok(record) => Some(ResumeSummary {
                        id,
                        company_name: record.company_name,
                        job_title: record.job_title,
                        overall_score: record.feedback.overall_score,
                        ats_score: record.feedback.ats.score,
                        image_path: record.image_path,
                    }),
                    Err(e) => {
                        warn!("Skipping malformed record {key}: {e}");
                        None
                    }
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));

        info!("Listed {} resume(s)", summaries.len());
        Ok(summaries)
    }
}
