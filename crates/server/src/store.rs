use chrono::Utc;
use sentiment_space_common::{Result, SentimentSpaceError};
use sentiment_space_llm::{AnalysisResult, Sentiment};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{StoreStats, ThoughtRecord, ThoughtUpdate};

/// On-disk layout
#[derive(Debug, Default, Deserialize)]
struct StoreFile {
    #[serde(default)]
    next_id: u64,
    thoughts: Vec<ThoughtRecord>,
}

/// JSON-file backed store of analyzed thoughts
///
/// Every mutation is written through to disk; a mutation whose write fails
/// is undone in memory. Ids are never reused, even after the newest record
/// is deleted.
pub struct ThoughtStore {
    next_id: u64,
    thoughts: Vec<ThoughtRecord>,
    file_path: PathBuf,
}

impl ThoughtStore {
    /// Open the store at `path`, starting empty when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let file: StoreFile = if path.exists() {
            let data = fs::read_to_string(path)?;
            serde_json::from_str(&data).map_err(|e| {
                SentimentSpaceError::storage(format!(
                    "Corrupt thought store {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            StoreFile::default()
        };

        let max_id = file.thoughts.iter().map(|t| t.id).max().unwrap_or(0);
        info!("Loaded {} thoughts from {}", file.thoughts.len(), path.display());

        Ok(Self {
            next_id: file.next_id.max(max_id + 1),
            thoughts: file.thoughts,
            file_path: path.to_path_buf(),
        })
    }

    /// Store an analyzed thought, returning the new record
    pub fn insert(&mut self, raw_text: &str, analysis: &AnalysisResult) -> Result<ThoughtRecord> {
        let now = Utc::now();
        let record = ThoughtRecord {
            id: self.next_id,
            raw_text: raw_text.to_string(),
            summary: Some(analysis.summary.clone()),
            sentiment: Some(analysis.sentiment),
            confidence: Some(analysis.confidence),
            created_at: now,
            updated_at: now,
        };

        self.next_id += 1;
        self.thoughts.push(record.clone());
        if let Err(e) = self.save() {
            self.thoughts.pop();
            self.next_id -= 1;
            return Err(e);
        }

        debug!("Stored thought {}", record.id);
        Ok(record)
    }

    pub fn get(&self, id: u64) -> Option<&ThoughtRecord> {
        self.thoughts.iter().find(|t| t.id == id)
    }

    /// Newest first
    pub fn list(&self, limit: usize, offset: usize) -> Vec<ThoughtRecord> {
        self.newest_first()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Newest first, only `sentiment`
    pub fn by_sentiment(&self, sentiment: Sentiment) -> Vec<ThoughtRecord> {
        self.newest_first()
            .filter(|t| t.sentiment == Some(sentiment))
            .cloned()
            .collect()
    }

    /// Apply the set fields of `update`; false when `id` is unknown
    pub fn update(&mut self, id: u64, update: ThoughtUpdate) -> Result<bool> {
        let Some(index) = self.thoughts.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let previous = self.thoughts[index].clone();
        let record = &mut self.thoughts[index];

        if let Some(summary) = update.summary {
            record.summary = Some(summary);
        }
        if let Some(sentiment) = update.sentiment {
            record.sentiment = Some(sentiment);
        }
        if let Some(confidence) = update.confidence {
            record.confidence = Some(confidence.clamp(0.0, 1.0));
        }
        record.updated_at = Utc::now();

        if let Err(e) = self.save() {
            self.thoughts[index] = previous;
            return Err(e);
        }
        Ok(true)
    }

    /// Remove a thought; false when `id` is unknown
    pub fn delete(&mut self, id: u64) -> Result<bool> {
        let Some(index) = self.thoughts.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let removed = self.thoughts.remove(index);

        if let Err(e) = self.save() {
            self.thoughts.insert(index, removed);
            return Err(e);
        }
        Ok(true)
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total: self.thoughts.len(),
            ..StoreStats::default()
        };
        for sentiment in self.thoughts.iter().filter_map(|t| t.sentiment) {
            *stats.sentiment_distribution.entry(sentiment).or_insert(0) += 1;
        }
        stats
    }

    /// Records to export: the listed ids that exist, or everything
    pub fn snapshot(&self, ids: Option<&[u64]>) -> Vec<ThoughtRecord> {
        match ids {
            Some(ids) => ids.iter().filter_map(|id| self.get(*id)).cloned().collect(),
            None => self.newest_first().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.thoughts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thoughts.is_empty()
    }

    fn newest_first(&self) -> impl Iterator<Item = &ThoughtRecord> {
        // insertion order matches creation order
        self.thoughts.iter().rev()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = StoreFileRef {
            next_id: self.next_id,
            thoughts: &self.thoughts,
        };
        let data = serde_json::to_string_pretty(&file)?;

        // readers only ever see a complete file
        let staging = self.staging_path();
        fs::write(&staging, data)?;
        if let Err(e) = fs::rename(&staging, &self.file_path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.file_path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    next_id: u64,
    thoughts: &'a [ThoughtRecord],
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn analysis(sentiment: Sentiment) -> AnalysisResult {
        AnalysisResult {
            summary: "summary".to_string(),
            sentiment,
            confidence: 0.8,
            timestamp: Utc::now(),
        }
    }

    fn open(dir: &TempDir) -> ThoughtStore {
        ThoughtStore::load(&dir.path().join("thoughts.json")).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        assert!(store.is_empty());

        let record = store.insert("Great run today", &analysis(Sentiment::Positive)).unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.sentiment, Some(Sentiment::Positive));
        assert_eq!(store.get(1), Some(&record));
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_list_newest_first_with_pagination() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        for text in ["one", "two", "three", "four"] {
            store.insert(text, &analysis(Sentiment::Neutral)).unwrap();
        }

        let texts = |records: Vec<ThoughtRecord>| -> Vec<String> {
            records.into_iter().map(|r| r.raw_text).collect()
        };
        assert_eq!(texts(store.list(2, 0)), vec!["four", "three"]);
        assert_eq!(texts(store.list(2, 2)), vec!["two", "one"]);
        assert!(store.list(10, 10).is_empty());
    }

    #[test]
    fn test_persists_across_reloads() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = open(&dir);
            store.insert("first", &analysis(Sentiment::Positive)).unwrap();
            store.insert("second", &analysis(Sentiment::Negative)).unwrap();
        }

        let store = open(&dir);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(2).unwrap().raw_text, "second");
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.insert("first", &analysis(Sentiment::Neutral)).unwrap();
        store.insert("second", &analysis(Sentiment::Neutral)).unwrap();
        assert!(store.delete(2).unwrap());
        assert!(!store.delete(2).unwrap());

        let mut store = open(&dir);
        let record = store.insert("third", &analysis(Sentiment::Neutral)).unwrap();
        assert_eq!(record.id, 3);
    }

    #[test]
    fn test_partial_update() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let record = store.insert("edited later", &analysis(Sentiment::Neutral)).unwrap();

        let updated = store
            .update(
                record.id,
                ThoughtUpdate {
                    sentiment: Some(Sentiment::Negative),
                    ..ThoughtUpdate::default()
                },
            )
            .unwrap();
        assert!(updated);

        let stored = store.get(record.id).unwrap();
        assert_eq!(stored.sentiment, Some(Sentiment::Negative));
        assert_eq!(stored.summary.as_deref(), Some("summary"));
        assert_eq!(stored.confidence, Some(0.8));
        assert!(stored.updated_at >= record.updated_at);

        assert!(!store.update(99, ThoughtUpdate::default()).unwrap());
    }

    #[test]
    fn test_filter_and_stats() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.insert("a", &analysis(Sentiment::Positive)).unwrap();
        store.insert("b", &analysis(Sentiment::Negative)).unwrap();
        store.insert("c", &analysis(Sentiment::Positive)).unwrap();

        let positive: Vec<u64> = store.by_sentiment(Sentiment::Positive).iter().map(|r| r.id).collect();
        assert_eq!(positive, vec![3, 1]);

        let stats = store.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.sentiment_distribution.get(&Sentiment::Positive), Some(&2));
        assert_eq!(stats.sentiment_distribution.get(&Sentiment::Negative), Some(&1));
    }

    #[test]
    fn test_snapshot_selected_ids() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.insert("a", &analysis(Sentiment::Positive)).unwrap();
        store.insert("b", &analysis(Sentiment::Negative)).unwrap();

        let ids: Vec<u64> = store.snapshot(Some(&[2, 7, 1])).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(store.snapshot(None).len(), 2);
    }

    /// Path whose parent is a regular file, so nothing can be written there
    fn unwritable_path(dir: &TempDir) -> PathBuf {
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        blocker.join("thoughts.json")
    }

    #[test]
    fn test_failed_insert_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let mut store = ThoughtStore::load(&unwritable_path(&dir)).unwrap();

        assert!(store.insert("lost", &analysis(Sentiment::Positive)).is_err());
        assert!(store.is_empty());
        assert!(store.get(1).is_none());
        assert_eq!(store.stats().total, 0);

        // the failed insert did not consume an id
        store.file_path = dir.path().join("thoughts.json");
        let record = store.insert("kept", &analysis(Sentiment::Positive)).unwrap();
        assert_eq!(record.id, 1);
    }

    #[test]
    fn test_failed_update_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let record = store.insert("stable", &analysis(Sentiment::Neutral)).unwrap();

        store.file_path = unwritable_path(&dir);
        let result = store.update(
            record.id,
            ThoughtUpdate {
                summary: Some("changed".to_string()),
                sentiment: Some(Sentiment::Negative),
                confidence: Some(0.1),
            },
        );
        assert!(result.is_err());
        assert_eq!(store.get(record.id), Some(&record));
    }

    #[test]
    fn test_failed_delete_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        for text in ["a", "b", "c"] {
            store.insert(text, &analysis(Sentiment::Neutral)).unwrap();
        }
        let before = store.list(10, 0);

        store.file_path = unwritable_path(&dir);
        assert!(store.delete(2).is_err());
        assert_eq!(store.list(10, 0), before);
    }

    #[test]
    fn test_save_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.insert("first", &analysis(Sentiment::Positive)).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["thoughts.json"]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thoughts.json");
        fs::write(&path, "not json").unwrap();
        assert!(ThoughtStore::load(&path).is_err());
    }
}
