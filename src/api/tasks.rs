//! Task endpoints. All of these sit behind the auth middleware and receive
//! the verified identity as an [`AuthUser`] extension.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::ListTasksQuery;
use crate::tasks::{NewTask, StoreError, Task, TaskPatch};

fn store_error_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        StoreError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Io(_) => {
            tracing::error!("Task store failure: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage failure".to_string(),
            )
        }
    }
}

/// GET /tasks?category= - List the requester's tasks.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListTasksQuery>,
) -> Json<Vec<Task>> {
    let tasks = state
        .tasks
        .list_tasks(user.id, query.category.as_deref())
        .await;
    Json(tasks)
}

/// POST /tasks - Create a task owned by the requester.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    let task = state
        .tasks
        .create_task(user.id, req)
        .await
        .map_err(store_error_response)?;

    tracing::debug!("User {} created task {}", user.id, task.id);

    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /tasks/:id - Partially update an owned task.
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task = state
        .tasks
        .update_task(user.id, id, patch)
        .await
        .map_err(store_error_response)?;

    Ok(Json(task))
}

/// DELETE /tasks/:id - Delete an owned task.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state
        .tasks
        .delete_task(user.id, id)
        .await
        .map_err(store_error_response)?;

    Ok(Json(serde_json::json!({ "deleted": id })))
}
