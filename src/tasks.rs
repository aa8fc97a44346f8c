use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::index::IndexStore;
use crate::models::{NewTask, Task, TaskStatus, TaskType};
use crate::schema::tasks;

/// Ingestion-task bookkeeping: `pending -> running -> {completed, failed}`,
/// per spec section 4.8. Transitions are monotonic; only the worker owning
/// a task is expected to advance it, and progress updates are idempotent
/// writes (re-setting the same `processed_items` is harmless).
#[derive(Clone)]
pub struct TaskLedger {
    store: IndexStore,
}

impl TaskLedger {
    pub fn new(store: IndexStore) -> Self {
        Self { store }
    }

    pub fn create(&self, task_type: TaskType, source_url: &str, total_items: i32) -> Result<String> {
        let task_id = Uuid::new_v4().to_string();
        let new_task = NewTask {
            task_id: task_id.clone(),
            task_type: task_type.to_string(),
            source_url: source_url.to_string(),
            status: TaskStatus::Pending.to_string(),
            created_at: Utc::now().naive_utc(),
            started_at: None,
            completed_at: None,
            processed_items: 0,
            total_items,
            result_blob: None,
        };

        let mut conn = self.store.pooled_connection()?;
        diesel::insert_into(tasks::table)
            .values(&new_task)
            .execute(&mut conn)?;
        Ok(task_id)
    }

    pub fn get(&self, task_id: &str) -> Result<Option<Task>> {
        let mut conn = self.store.pooled_connection()?;
        Ok(tasks::table
            .find(task_id)
            .first::<Task>(&mut conn)
            .optional()?)
    }

    pub fn mark_running(&self, task_id: &str) -> Result<()> {
        let mut conn = self.store.pooled_connection()?;
        diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Running.to_string()),
                tasks::started_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn update_progress(&self, task_id: &str, processed_items: i32) -> Result<()> {
        let mut conn = self.store.pooled_connection()?;
        diesel::update(tasks::table.find(task_id))
            .set(tasks::processed_items.eq(processed_items))
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn mark_completed(&self, task_id: &str, result_blob: serde_json::Value) -> Result<()> {
        let mut conn = self.store.pooled_connection()?;
        diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Completed.to_string()),
                tasks::completed_at.eq(Utc::now().naive_utc()),
                tasks::result_blob.eq(result_blob.to_string()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn mark_failed(&self, task_id: &str, error: &str) -> Result<()> {
        let blob = serde_json::json!({ "error": error }).to_string();
        let mut conn = self.store.pooled_connection()?;
        diesel::update(tasks::table.find(task_id))
            .set((
                tasks::status.eq(TaskStatus::Failed.to_string()),
                tasks::completed_at.eq(Utc::now().naive_utc()),
                tasks::result_blob.eq(blob),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    /// Deletes `completed` tasks whose `completed_at` is older than
    /// `Config::task_retention_days`. Present in the original only as an
    /// unused table migration; wired up here since spec.md §3 calls for
    /// garbage collection after a configurable retention window.
    pub fn sweep_expired(&self, cfg: &Config) -> Result<usize> {
        let cutoff: NaiveDateTime = Utc::now().naive_utc() - Duration::days(cfg.task_retention_days);
        let mut conn = self.store.pooled_connection()?;
        let deleted = diesel::delete(
            tasks::table
                .filter(tasks::status.eq(TaskStatus::Completed.to_string()))
                .filter(tasks::completed_at.lt(cutoff)),
        )
        .execute(&mut conn)?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> TaskLedger {
        let path = tempfile::NamedTempFile::new().unwrap().into_temp_path();
        let url = path.to_str().unwrap().to_string();
        std::mem::forget(path);
        let store = IndexStore::new(&url).unwrap();
        store.apply_migrations_for_test();
        TaskLedger::new(store)
    }

    #[test]
    fn lifecycle_transitions_are_observable() {
        let ledger = fixture();
        let task_id = ledger.create(TaskType::Track, "file:///tmp/a.wav", 1).unwrap();

        let task = ledger.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, "pending");

        ledger.mark_running(&task_id).unwrap();
        let task = ledger.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, "running");
        assert!(task.started_at.is_some());

        ledger
            .mark_completed(&task_id, serde_json::json!({"success_count": 1}))
            .unwrap();
        let task = ledger.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, "completed");
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn progress_updates_are_idempotent() {
        let ledger = fixture();
        let task_id = ledger
            .create(TaskType::Playlist, "dir:///tmp/playlist", 10)
            .unwrap();
        ledger.update_progress(&task_id, 5).unwrap();
        ledger.update_progress(&task_id, 5).unwrap();
        let task = ledger.get(&task_id).unwrap().unwrap();
        assert_eq!(task.processed_items, 5);
    }

    #[test]
    fn unknown_task_returns_none() {
        let ledger = fixture();
        assert!(ledger.get("not-a-real-task").unwrap().is_none());
    }
}
