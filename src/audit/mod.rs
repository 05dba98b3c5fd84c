//! Brief persistence and audit integrity
//!
//! Every completed run produces exactly one investigation brief, handed to
//! a [`BriefSink`] once. The archive keeps briefs queryable in-process and
//! can re-verify a stored transcript against its recorded hash.

use crate::error::AgentError;
use crate::models::{InvestigationBrief, Transcript};
use crate::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Persistence hook called once per completed run. Storage format and
/// location are the implementor's concern.
#[async_trait::async_trait]
pub trait BriefSink: Send + Sync {
    async fn save(&self, brief: &InvestigationBrief) -> Result<()>;
}

//
// ================= In-Process Archive =================
//

/// In-process brief archive, keyed by brief id.
pub struct BriefArchive {
    briefs: Arc<RwLock<HashMap<Uuid, InvestigationBrief>>>,
}

impl BriefArchive {
    pub fn new() -> Self {
        Self {
            briefs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, brief_id: Uuid) -> Option<InvestigationBrief> {
        let briefs = self.briefs.read().await;
        briefs.get(&brief_id).cloned()
    }

    /// Brief ids for a transaction, oldest first.
    pub async fn list_for_transaction(&self, transaction_id: &str) -> Vec<Uuid> {
        let briefs = self.briefs.read().await;

        let mut items: Vec<_> = briefs
            .values()
            .filter(|b| b.alert.transaction_id == transaction_id)
            .map(|b| (b.brief_id, b.created_at))
            .collect();

        items.sort_by_key(|(_, created_at)| *created_at);
        items.into_iter().map(|(id, _)| id).collect()
    }

    /// Recompute the transcript hash of a stored brief and compare it with
    /// the hash recorded at assembly time.
    pub async fn verify_integrity(&self, brief_id: Uuid) -> Result<bool> {
        let briefs = self.briefs.read().await;

        match briefs.get(&brief_id) {
            Some(brief) => {
                Ok(compute_transcript_hash(&brief.transcript) == brief.transcript_hash)
            }
            None => Ok(false),
        }
    }
}

impl Default for BriefArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BriefSink for BriefArchive {
    async fn save(&self, brief: &InvestigationBrief) -> Result<()> {
        let mut briefs = self.briefs.write().await;
        briefs.insert(brief.brief_id, brief.clone());
        Ok(())
    }
}

//
// ================= File Sink =================
//

/// Writes each brief as `<transaction>_<timestamp>.json` under a results
/// directory.
pub struct JsonFileSink {
    directory: PathBuf,
}

impl JsonFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait::async_trait]
impl BriefSink for JsonFileSink {
    async fn save(&self, brief: &InvestigationBrief) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let filename = format!(
            "{}_{}.json",
            brief.alert.transaction_id.replace('/', "_"),
            brief.created_at.format("%Y%m%d_%H%M%S")
        );
        let path = self.directory.join(filename);

        let payload = serde_json::to_vec_pretty(brief)?;
        tokio::fs::write(&path, payload).await.map_err(|e| {
            AgentError::PersistenceError(format!("failed to write {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "Investigation brief saved");
        Ok(())
    }
}

//
// ================= Integrity Hash =================
//

/// SHA-256 over the serialized transcript, streamed straight into the
/// hasher without an intermediate String.
pub fn compute_transcript_hash(transcript: &Transcript) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), transcript).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreThresholds;
    use crate::models::{Alert, TranscriptEntry};
    use crate::scorer::RecommendationScorer;

    fn sample_brief() -> InvestigationBrief {
        let alert = Alert::new("TXN-777", "velocity spike", 0.6);
        let mut transcript = Transcript::new();
        transcript.push(|turn| TranscriptEntry::AlertReceived {
            turn,
            alert: alert.clone(),
        });

        RecommendationScorer::new(ScoreThresholds::default())
            .assemble(&alert, transcript, 0.5, "inconclusive".to_string(), 40, false)
            .unwrap()
    }

    #[tokio::test]
    async fn archive_stores_and_retrieves_briefs() {
        let archive = BriefArchive::new();
        let brief = sample_brief();
        let id = brief.brief_id;

        archive.save(&brief).await.unwrap();

        let stored = archive.get(id).await.unwrap();
        assert_eq!(stored.alert.transaction_id, "TXN-777");

        let ids = archive.list_for_transaction("TXN-777").await;
        assert_eq!(ids, vec![id]);
    }

    #[tokio::test]
    async fn stored_brief_passes_integrity_check() {
        let archive = BriefArchive::new();
        let brief = sample_brief();
        let id = brief.brief_id;
        archive.save(&brief).await.unwrap();

        assert!(archive.verify_integrity(id).await.unwrap());
        assert!(!archive.verify_integrity(Uuid::new_v4()).await.unwrap());
    }

    #[test]
    fn identical_transcripts_hash_identically() {
        let alert = Alert::new("TXN-1", "test", 0.5);
        let mut a = Transcript::new();
        a.push(|turn| TranscriptEntry::AlertReceived {
            turn,
            alert: alert.clone(),
        });
        let b = a.clone();

        assert_eq!(compute_transcript_hash(&a), compute_transcript_hash(&b));
    }

    #[tokio::test]
    async fn file_sink_writes_a_json_brief() {
        let dir = std::env::temp_dir().join(format!("briefs_{}", Uuid::new_v4()));
        let sink = JsonFileSink::new(dir.clone());
        let brief = sample_brief();

        sink.save(&brief).await.unwrap();

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let entry = entries.next_entry().await.unwrap().unwrap();
        let contents = tokio::fs::read_to_string(entry.path()).await.unwrap();
        assert!(contents.contains("TXN-777"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
