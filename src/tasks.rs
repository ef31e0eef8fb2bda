//! Task entity and document store.
//!
//! Tasks are kept in memory in per-owner buckets and persisted as JSON to
//! `{data_dir}/tasks.json` after every mutation. The per-owner bucket is the
//! access path for listing: queries never touch another owner's documents,
//! and the optional category filter scans only the owner's bucket.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors produced by the task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required field is missing or empty after trimming.
    #[error("validation failed: {0}")]
    Validation(String),
    /// No task with the given id is owned by the requester.
    ///
    /// "Does not exist" and "owned by someone else" are deliberately the same
    /// outcome so that requests cannot probe for other users' task ids.
    #[error("task not found")]
    NotFound,
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single task document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    /// Set once at creation from the verified identity; never reassigned.
    pub owner_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Defaults to empty when absent so a missing field reports the same
    /// validation error as an empty one.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// Partial update for a task. Only these four fields are mutable; anything
/// else in an incoming payload is dropped at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_done: Option<bool>,
}

/// Document store for tasks, bucketed by owner.
#[derive(Debug)]
pub struct TaskStore {
    tasks: RwLock<HashMap<Uuid, HashMap<Uuid, Task>>>,
    storage_path: PathBuf,
}

impl TaskStore {
    /// Open the store, loading any existing documents from disk.
    pub async fn new(data_dir: &PathBuf) -> Result<Self, StoreError> {
        let storage_path = data_dir.join("tasks.json");

        let mut buckets: HashMap<Uuid, HashMap<Uuid, Task>> = HashMap::new();
        if storage_path.exists() {
            let contents = fs::read_to_string(&storage_path).await?;
            let loaded: Vec<Task> = serde_json::from_str(&contents)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            tracing::info!("Loaded {} tasks from {}", loaded.len(), storage_path.display());
            for task in loaded {
                buckets.entry(task.owner_id).or_default().insert(task.id, task);
            }
        }

        Ok(Self {
            tasks: RwLock::new(buckets),
            storage_path,
        })
    }

    /// Save all documents to disk.
    ///
    /// Called with the write guard still held so that persisted state always
    /// matches a single consistent snapshot.
    async fn save_to_disk(
        &self,
        buckets: &HashMap<Uuid, HashMap<Uuid, Task>>,
    ) -> Result<(), StoreError> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut all: Vec<&Task> = buckets.values().flat_map(|b| b.values()).collect();
        all.sort_by_key(|t| t.created_at);

        let contents = serde_json::to_string_pretty(&all)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.storage_path, contents).await?;
        Ok(())
    }

    /// Insert a new task owned by `owner_id`. Assigns id and creation time.
    pub async fn insert(&self, owner_id: Uuid, new: NewTask) -> Result<Task, StoreError> {
        let title = non_empty_trimmed("title", &new.title)?;
        let category = non_empty_trimmed("category", &new.category)?;

        let task = Task {
            id: Uuid::new_v4(),
            owner_id,
            title,
            description: new.description.trim().to_string(),
            category,
            is_done: false,
            created_at: Utc::now(),
        };

        let mut buckets = self.tasks.write().await;
        buckets
            .entry(owner_id)
            .or_default()
            .insert(task.id, task.clone());
        self.save_to_disk(&buckets).await?;

        Ok(task)
    }

    /// All tasks owned by `owner_id`, optionally filtered to an exact
    /// (case-sensitive, trimmed) category. Ordered by creation time.
    pub async fn find_by_owner(&self, owner_id: Uuid, category: Option<&str>) -> Vec<Task> {
        let category = category.map(str::trim);
        let buckets = self.tasks.read().await;

        let mut tasks: Vec<Task> = buckets
            .get(&owner_id)
            .map(|bucket| {
                bucket
                    .values()
                    .filter(|t| category.map_or(true, |c| t.category == c))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// The task with the given id, if it is owned by `owner_id`.
    pub async fn find_one_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Task, StoreError> {
        let buckets = self.tasks.read().await;
        buckets
            .get(&owner_id)
            .and_then(|bucket| bucket.get(&id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Apply a partial update to an owned task. The patch is validated in
    /// full before any field is written, so it applies atomically or not at
    /// all.
    pub async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        let title = patch
            .title
            .as_deref()
            .map(|t| non_empty_trimmed("title", t))
            .transpose()?;
        let category = patch
            .category
            .as_deref()
            .map(|c| non_empty_trimmed("category", c))
            .transpose()?;

        let mut buckets = self.tasks.write().await;
        let task = buckets
            .get_mut(&owner_id)
            .and_then(|bucket| bucket.get_mut(&id))
            .ok_or(StoreError::NotFound)?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description.trim().to_string();
        }
        if let Some(category) = category {
            task.category = category;
        }
        if let Some(is_done) = patch.is_done {
            task.is_done = is_done;
        }

        let updated = task.clone();
        self.save_to_disk(&buckets).await?;

        Ok(updated)
    }

    /// Delete an owned task.
    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<(), StoreError> {
        let mut buckets = self.tasks.write().await;
        let removed = buckets
            .get_mut(&owner_id)
            .and_then(|bucket| bucket.remove(&id));

        if removed.is_none() {
            return Err(StoreError::NotFound);
        }

        self.save_to_disk(&buckets).await?;
        Ok(())
    }
}

fn non_empty_trimmed(field: &str, value: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_task(title: &str, category: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
            category: category.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();

        let created = store
            .insert(owner, new_task("Buy milk", "shopping"))
            .await
            .unwrap();
        assert_eq!(created.title, "Buy milk");
        assert_eq!(created.category, "shopping");
        assert_eq!(created.owner_id, owner);
        assert!(!created.is_done);

        let tasks = store.find_by_owner(owner, None).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, created.id);

        // Another user sees nothing.
        let other = Uuid::new_v4();
        assert!(store.find_by_owner(other, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_insert_trims_fields() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();

        let created = store
            .insert(
                owner,
                NewTask {
                    title: "  Water plants  ".to_string(),
                    description: "  balcony only  ".to_string(),
                    category: " personal ".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(created.title, "Water plants");
        assert_eq!(created.description, "balcony only");
        assert_eq!(created.category, "personal");
    }

    #[tokio::test]
    async fn test_insert_rejects_empty_required_fields() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();

        let err = store.insert(owner, new_task("   ", "work")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store.insert(owner, new_task("Report", "  ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_category_filter_is_exact_and_owner_scoped() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        store.insert(u1, new_task("Report", "work")).await.unwrap();
        store.insert(u1, new_task("Groceries", "personal")).await.unwrap();
        store.insert(u2, new_task("Standup", "work")).await.unwrap();

        let work = store.find_by_owner(u1, Some("work")).await;
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].title, "Report");

        // Case-sensitive match, trimmed filter.
        assert!(store.find_by_owner(u1, Some("Work")).await.is_empty());
        assert_eq!(store.find_by_owner(u1, Some(" work ")).await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_one_owned_hides_other_owners_tasks() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();

        let created = store.insert(owner, new_task("Secret", "work")).await.unwrap();

        assert!(store.find_one_owned(created.id, owner).await.is_ok());
        let err = store.find_one_owned(created.id, intruder).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_update_applies_patch_and_is_idempotent() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();

        let created = store.insert(owner, new_task("Run", "health")).await.unwrap();

        let patch = TaskPatch {
            is_done: Some(true),
            ..Default::default()
        };
        let first = store.update(created.id, owner, patch.clone()).await.unwrap();
        let second = store.update(created.id, owner, patch).await.unwrap();

        assert!(first.is_done);
        assert!(second.is_done);
        assert_eq!(first.title, "Run");
        assert_eq!(second.created_at, created.created_at);

        let fetched = store.find_one_owned(created.id, owner).await.unwrap();
        assert!(fetched.is_done);
        assert_eq!(fetched.title, "Run");
    }

    #[tokio::test]
    async fn test_update_rejects_emptying_required_fields() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();

        let created = store.insert(owner, new_task("Run", "health")).await.unwrap();

        let err = store
            .update(
                created.id,
                owner,
                TaskPatch {
                    title: Some("  ".to_string()),
                    is_done: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        // The invalid patch must not have been partially applied.
        let fetched = store.find_one_owned(created.id, owner).await.unwrap();
        assert_eq!(fetched.title, "Run");
        assert!(!fetched.is_done);
    }

    #[tokio::test]
    async fn test_update_ignores_ownership_crossing() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();

        let created = store.insert(owner, new_task("Run", "health")).await.unwrap();

        let err = store
            .update(
                created.id,
                intruder,
                TaskPatch {
                    is_done: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        let fetched = store.find_one_owned(created.id, owner).await.unwrap();
        assert!(!fetched.is_done);
    }

    #[tokio::test]
    async fn test_delete_then_operations_fail() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();

        let created = store.insert(owner, new_task("Run", "health")).await.unwrap();
        store.delete(created.id, owner).await.unwrap();

        assert!(matches!(
            store.find_one_owned(created.id, owner).await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(matches!(
            store.delete(created.id, owner).await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(matches!(
            store
                .update(created.id, owner, TaskPatch::default())
                .await
                .unwrap_err(),
            StoreError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(&temp.path().to_path_buf()).await.unwrap();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();

        let created = store.insert(owner, new_task("Run", "health")).await.unwrap();

        assert!(matches!(
            store.delete(created.id, intruder).await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(store.find_one_owned(created.id, owner).await.is_ok());
    }

    #[tokio::test]
    async fn test_tasks_survive_reopen() {
        let temp = tempdir().unwrap();
        let data_dir = temp.path().to_path_buf();
        let owner = Uuid::new_v4();

        let created = {
            let store = TaskStore::new(&data_dir).await.unwrap();
            store.insert(owner, new_task("Persist me", "other")).await.unwrap()
        };

        let store = TaskStore::new(&data_dir).await.unwrap();
        let fetched = store.find_one_owned(created.id, owner).await.unwrap();
        assert_eq!(fetched.title, "Persist me");
        assert_eq!(fetched.created_at, created.created_at);
    }
}
