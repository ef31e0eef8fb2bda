//! Task service: the logic boundary between the HTTP surface and the store.
//!
//! Every operation takes the owner id from the verified identity, never from
//! the request payload, so no call can cross an ownership boundary.

use std::sync::Arc;

use uuid::Uuid;

use crate::tasks::{NewTask, StoreError, Task, TaskPatch, TaskStore};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }

    /// List the owner's tasks. An absent or blank filter means "all
    /// categories".
    pub async fn list_tasks(&self, owner_id: Uuid, category: Option<&str>) -> Vec<Task> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        self.store.find_by_owner(owner_id, category).await
    }

    /// Create a task owned by the requester.
    pub async fn create_task(&self, owner_id: Uuid, new: NewTask) -> Result<Task, StoreError> {
        self.store.insert(owner_id, new).await
    }

    /// Fetch a single owned task.
    pub async fn get_task(&self, owner_id: Uuid, id: Uuid) -> Result<Task, StoreError> {
        self.store.find_one_owned(id, owner_id).await
    }

    /// Apply a partial update to an owned task. Fields outside the patch
    /// whitelist never reach this point; they are dropped at
    /// deserialization.
    pub async fn update_task(
        &self,
        owner_id: Uuid,
        id: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        self.store.update(id, owner_id, patch).await
    }

    /// Delete an owned task.
    pub async fn delete_task(&self, owner_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        self.store.delete(id, owner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn service(dir: &std::path::Path) -> TaskService {
        let store = TaskStore::new(&dir.to_path_buf()).await.unwrap();
        TaskService::new(Arc::new(store))
    }

    fn new_task(title: &str, category: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
            category: category.to_string(),
        }
    }

    #[tokio::test]
    async fn test_blank_filter_means_no_filter() {
        let temp = tempdir().unwrap();
        let svc = service(temp.path()).await;
        let owner = Uuid::new_v4();

        svc.create_task(owner, new_task("Report", "work")).await.unwrap();
        svc.create_task(owner, new_task("Groceries", "personal")).await.unwrap();

        assert_eq!(svc.list_tasks(owner, None).await.len(), 2);
        assert_eq!(svc.list_tasks(owner, Some("")).await.len(), 2);
        assert_eq!(svc.list_tasks(owner, Some("   ")).await.len(), 2);
        assert_eq!(svc.list_tasks(owner, Some("work")).await.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_is_owner_scoped() {
        let temp = tempdir().unwrap();
        let svc = service(temp.path()).await;
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        svc.create_task(u1, new_task("Buy milk", "shopping")).await.unwrap();

        let mine = svc.list_tasks(u1, None).await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Buy milk");
        assert!(svc.list_tasks(u2, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_patch_whitelist_ignores_unknown_fields() {
        // Unknown fields in a PATCH body are dropped when the payload is
        // deserialized into TaskPatch, not treated as errors.
        let patch: TaskPatch = serde_json::from_str(
            r#"{"isDone": true, "ownerId": "intruder", "createdAt": "2020-01-01", "nonsense": 1}"#,
        )
        .unwrap();
        assert_eq!(patch.is_done, Some(true));
        assert!(patch.title.is_none());

        let temp = tempdir().unwrap();
        let svc = service(temp.path()).await;
        let owner = Uuid::new_v4();

        let created = svc.create_task(owner, new_task("Run", "health")).await.unwrap();
        let updated = svc.update_task(owner, created.id, patch).await.unwrap();
        assert!(updated.is_done);
        assert_eq!(updated.owner_id, owner);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_mutations_propagate_not_found() {
        let temp = tempdir().unwrap();
        let svc = service(temp.path()).await;
        let owner = Uuid::new_v4();

        let err = svc
            .update_task(owner, Uuid::new_v4(), TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        let err = svc.delete_task(owner, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
