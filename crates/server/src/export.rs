use chrono::{DateTime, Local, Utc};
use sentiment_space_common::{Result, SentimentSpaceError};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::types::ThoughtRecord;

/// Exported file contents
#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    exported_at: DateTime<Utc>,
    thought_count: usize,
    thoughts: &'a [ThoughtRecord],
}

/// Where an export landed
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub success: bool,
    pub path: PathBuf,
    pub thought_count: usize,
}

/// Writes thought snapshots as JSON files into a local directory
pub struct Exporter {
    enabled: bool,
    dir: PathBuf,
}

impl Exporter {
    pub fn new(enabled: bool, dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            dir: dir.into(),
        }
    }

    /// Write `thoughts` to `thoughts_export_<YYYYmmdd_HHMMSS>.json`
    pub fn export(&self, thoughts: &[ThoughtRecord]) -> Result<ExportOutcome> {
        if !self.enabled {
            return Err(SentimentSpaceError::disabled(
                "Export is disabled. Set EXPORT_ENABLED=true in .env to enable.",
            ));
        }

        fs::create_dir_all(&self.dir)?;

        let file_name = format!("thoughts_export_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(file_name);

        let document = ExportDocument {
            exported_at: Utc::now(),
            thought_count: thoughts.len(),
            thoughts,
        };
        fs::write(&path, serde_json::to_string_pretty(&document)?)?;

        info!("Exported {} thoughts to {}", thoughts.len(), path.display());

        Ok(ExportOutcome {
            success: true,
            path,
            thought_count: thoughts.len(),
        })
    }
}
