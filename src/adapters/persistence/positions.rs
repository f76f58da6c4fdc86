//! JSONL Position Repository - Append-only Position Log
//!
//! Every mutation appends the full position record as one JSON line to
//! `positions.jsonl`; the latest line per id wins on replay. This keeps
//! writes append-only (no read-modify-write on disk), makes the log a
//! complete audit trail, and lets the bot resume the state machine
//! purely from persisted state after a restart.
//!
//! An in-memory index serializes mutations per call behind a write
//! lock, satisfying the atomic-per-call repository contract.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::position::{Position, PositionId, PositionStatus};
use crate::ports::repository::{NewPosition, PositionRepository, RepositoryError};

/// Append-only JSONL repository with an in-memory index.
pub struct JsonlPositionRepository {
    /// Path of the position log file.
    log_path: PathBuf,
    /// Latest record per position id.
    index: RwLock<HashMap<PositionId, Position>>,
}

impl JsonlPositionRepository {
    /// Open (or create) the position log in `data_dir` and replay it.
    pub async fn new(data_dir: &str) -> anyhow::Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir).await?;
        let log_path = dir.join("positions.jsonl");

        let mut index = HashMap::new();
        if fs::try_exists(&log_path).await.unwrap_or(false) {
            let content = fs::read_to_string(&log_path).await?;
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Position>(line) {
                    Ok(position) => {
                        // Last write wins.
                        index.insert(position.id.clone(), position);
                    }
                    Err(e) => {
                        warn!(
                            file = %log_path.display(),
                            error = %e,
                            "Skipping malformed position record"
                        );
                    }
                }
            }
        }

        let open = index
            .values()
            .filter(|p| p.status == PositionStatus::Open)
            .count();
        info!(
            total = index.len(),
            open,
            file = %log_path.display(),
            "Position log replayed"
        );

        Ok(Self {
            log_path,
            index: RwLock::new(index),
        })
    }

    /// Append one full record to the log.
    async fn append(&self, position: &Position) -> Result<(), RepositoryError> {
        let mut json = serde_json::to_string(position)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        file
            .write_all(json.as_bytes())
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        file
            .flush()
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Fetch a copy of a record that must still be `Open`. Mutations are
    /// staged on the copy, appended to disk, and only then committed to
    /// the index, so a failed append never leaves memory ahead of disk.
    fn open_record(
        index: &HashMap<PositionId, Position>,
        id: &PositionId,
    ) -> Result<Position, RepositoryError> {
        match index.get(id) {
            Some(position) if position.status == PositionStatus::Open => Ok(position.clone()),
            Some(_) | None => Err(RepositoryError::NotFound(id.clone())),
        }
    }
}

#[async_trait]
impl PositionRepository for JsonlPositionRepository {
    #[instrument(skip(self, data), fields(pair = %data.pair_symbol))]
    async fn create_position(&self, data: NewPosition) -> Result<Position, RepositoryError> {
        data.validate()?;

        let position = Position {
            id: Uuid::new_v4().to_string(),
            strategy: data.strategy,
            pair_symbol: data.pair_symbol,
            token_symbol: data.token_symbol,
            token_identifier: data.token_identifier,
            entry_trade_id: data.entry_trade_id,
            entry_price: data.entry_price,
            entry_amount: data.entry_amount,
            token_amount: data.token_amount,
            profit_threshold: data.profit_threshold,
            loss_threshold: data.loss_threshold,
            status: PositionStatus::Open,
            close_trade_id: None,
            retry_count: 0,
            created_at: Utc::now(),
            closed_at: None,
            notes: Vec::new(),
        };

        let mut index = self.index.write().await;
        self.append(&position).await?;
        index.insert(position.id.clone(), position.clone());
        Ok(position)
    }

    async fn get_position(&self, id: &PositionId) -> Result<Position, RepositoryError> {
        let index = self.index.read().await;
        index
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }

    async fn get_open_positions(
        &self,
        strategy_filter: Option<&str>,
    ) -> Result<Vec<Position>, RepositoryError> {
        let index = self.index.read().await;
        let mut positions: Vec<Position> = index
            .values()
            .filter(|p| p.status == PositionStatus::Open)
            .filter(|p| strategy_filter.map_or(true, |s| p.strategy == s))
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(positions)
    }

    #[instrument(skip(self, note), fields(position_id = %id))]
    async fn close_position(
        &self,
        id: &PositionId,
        close_trade_id: Option<String>,
        note: String,
    ) -> Result<(), RepositoryError> {
        let mut index = self.index.write().await;
        let mut updated = Self::open_record(&index, id)?;
        updated.status = PositionStatus::Closed;
        updated.close_trade_id = close_trade_id;
        updated.closed_at = Some(Utc::now());
        updated.notes.push(note);
        self.append(&updated).await?;
        index.insert(id.clone(), updated);
        Ok(())
    }

    #[instrument(skip(self, note), fields(position_id = %id, new_retry_count))]
    async fn update_retry(
        &self,
        id: &PositionId,
        new_retry_count: u32,
        note: String,
    ) -> Result<(), RepositoryError> {
        let mut index = self.index.write().await;
        let mut updated = Self::open_record(&index, id)?;
        if new_retry_count <= updated.retry_count {
            return Err(RepositoryError::Storage(format!(
                "retry count must increase: {} -> {new_retry_count}",
                updated.retry_count
            )));
        }
        updated.retry_count = new_retry_count;
        updated.notes.push(note);
        self.append(&updated).await?;
        index.insert(id.clone(), updated);
        Ok(())
    }

    #[instrument(skip(self, reason), fields(position_id = %id, final_retry_count))]
    async fn mark_failed(
        &self,
        id: &PositionId,
        final_retry_count: u32,
        reason: String,
    ) -> Result<(), RepositoryError> {
        let mut index = self.index.write().await;
        let mut updated = Self::open_record(&index, id)?;
        if final_retry_count < updated.retry_count {
            return Err(RepositoryError::Storage(format!(
                "retry count must not decrease: {} -> {final_retry_count}",
                updated.retry_count
            )));
        }
        updated.status = PositionStatus::Failed;
        updated.retry_count = final_retry_count;
        updated.closed_at = Some(Utc::now());
        updated.notes.push(reason);
        self.append(&updated).await?;
        index.insert(id.clone(), updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_position() -> NewPosition {
        NewPosition {
            strategy: "dca".to_string(),
            pair_symbol: "GALA/GUSDC".to_string(),
            token_symbol: "GUSDC".to_string(),
            token_identifier: "GUSDC|Unit|none|none".to_string(),
            entry_trade_id: "trade-1".to_string(),
            entry_price: 0.05,
            entry_amount: 100.0,
            token_amount: 2000.0,
            profit_threshold: 0.05,
            loss_threshold: -0.02,
        }
    }

    #[tokio::test]
    async fn test_create_then_load_open() {
        let dir = tempdir().unwrap();
        let repo = JsonlPositionRepository::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        let created = repo.create_position(new_position()).await.unwrap();
        assert_eq!(created.status, PositionStatus::Open);
        assert_eq!(created.retry_count, 0);

        let open = repo.get_open_positions(None).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, created.id);

        // Strategy filter
        let filtered = repo.get_open_positions(Some("manual")).await.unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_close_removes_from_open_set() {
        let dir = tempdir().unwrap();
        let repo = JsonlPositionRepository::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        let created = repo.create_position(new_position()).await.unwrap();

        repo
            .close_position(&created.id, Some("trade-exit".to_string()), "done".to_string())
            .await
            .unwrap();

        let open = repo.get_open_positions(None).await.unwrap();
        assert!(open.is_empty());

        let stored = repo.get_position(&created.id).await.unwrap();
        assert_eq!(stored.status, PositionStatus::Closed);
        assert_eq!(stored.close_trade_id.as_deref(), Some("trade-exit"));
        assert!(stored.closed_at.is_some());
        assert_eq!(stored.notes, vec!["done".to_string()]);
    }

    #[tokio::test]
    async fn test_terminal_positions_reject_further_transitions() {
        let dir = tempdir().unwrap();
        let repo = JsonlPositionRepository::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        let created = repo.create_position(new_position()).await.unwrap();

        repo
            .mark_failed(&created.id, 5, "retries exhausted".to_string())
            .await
            .unwrap();

        let err = repo
            .close_position(&created.id, None, "too late".to_string())
            .await;
        assert!(matches!(err, Err(RepositoryError::NotFound(_))));

        let err = repo.update_retry(&created.id, 6, "nope".to_string()).await;
        assert!(matches!(err, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_failed_persists_final_retry_count() {
        let dir = tempdir().unwrap();
        let repo = JsonlPositionRepository::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        let created = repo.create_position(new_position()).await.unwrap();

        repo
            .update_retry(&created.id, 4, "attempt 4".to_string())
            .await
            .unwrap();
        repo
            .mark_failed(&created.id, 5, "retries exhausted".to_string())
            .await
            .unwrap();

        let stored = repo.get_position(&created.id).await.unwrap();
        assert_eq!(stored.status, PositionStatus::Failed);
        assert_eq!(stored.retry_count, 5);

        // Decreasing the count on a fresh record is rejected.
        let other = repo.create_position(new_position()).await.unwrap();
        repo
            .update_retry(&other.id, 3, "attempt 3".to_string())
            .await
            .unwrap();
        let err = repo.mark_failed(&other.id, 2, "bad count".to_string()).await;
        assert!(matches!(err, Err(RepositoryError::Storage(_))));
    }

    #[tokio::test]
    async fn test_failed_append_leaves_record_open() {
        let dir = tempdir().unwrap();
        let repo = JsonlPositionRepository::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        let created = repo.create_position(new_position()).await.unwrap();

        // Make the log unwritable: swap the file for a directory.
        let log = dir.path().join("positions.jsonl");
        std::fs::remove_file(&log).unwrap();
        std::fs::create_dir(&log).unwrap();

        let err = repo
            .close_position(&created.id, Some("t".to_string()), "x".to_string())
            .await;
        assert!(matches!(err, Err(RepositoryError::Storage(_))));

        // The write failed, so the record must not have transitioned.
        let stored = repo.get_position(&created.id).await.unwrap();
        assert_eq!(stored.status, PositionStatus::Open);
        assert!(stored.close_trade_id.is_none());

        let err = repo.update_retry(&created.id, 1, "retry".to_string()).await;
        assert!(matches!(err, Err(RepositoryError::Storage(_))));
        let stored = repo.get_position(&created.id).await.unwrap();
        assert_eq!(stored.retry_count, 0);
    }

    #[tokio::test]
    async fn test_retry_count_must_increase() {
        let dir = tempdir().unwrap();
        let repo = JsonlPositionRepository::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        let created = repo.create_position(new_position()).await.unwrap();

        repo
            .update_retry(&created.id, 1, "attempt 1".to_string())
            .await
            .unwrap();
        let err = repo.update_retry(&created.id, 1, "again".to_string()).await;
        assert!(matches!(err, Err(RepositoryError::Storage(_))));

        let stored = repo.get_position(&created.id).await.unwrap();
        assert_eq!(stored.retry_count, 1);
        assert_eq!(stored.status, PositionStatus::Open);
    }

    #[tokio::test]
    async fn test_replay_after_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();

        let first_id;
        {
            let repo = JsonlPositionRepository::new(&path).await.unwrap();
            let a = repo.create_position(new_position()).await.unwrap();
            let b = repo.create_position(new_position()).await.unwrap();
            repo
                .close_position(&b.id, Some("t".to_string()), "closed".to_string())
                .await
                .unwrap();
            repo.update_retry(&a.id, 2, "two strikes".to_string()).await.unwrap();
            first_id = a.id;
        }

        // Fresh instance replays the log: one open position with its
        // persisted retry history intact.
        let repo = JsonlPositionRepository::new(&path).await.unwrap();
        let open = repo.get_open_positions(None).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, first_id);
        assert_eq!(open[0].retry_count, 2);
    }
}
