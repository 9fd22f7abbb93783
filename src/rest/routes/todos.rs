// rest/routes/todos.rs — Todo collection routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::tasks::{CreateTaskRequest, TaskError};
use crate::AppContext;

/// Map a service error onto a REST response.
fn error_response(err: TaskError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        TaskError::Validation(_) => StatusCode::BAD_REQUEST,
        TaskError::NotFound(_) => StatusCode::NOT_FOUND,
        TaskError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

pub async fn list_todos(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match ctx.tasks.list_tasks().await {
        Ok(tasks) => Ok(Json(json!(tasks))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn create_todo(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    match ctx.tasks.create_task(body).await {
        Ok(task) => Ok((StatusCode::CREATED, Json(json!(task)))),
        Err(e) => Err(error_response(e)),
    }
}

#[derive(Deserialize)]
pub struct UpdateTodoRequest {
    pub completed: bool,
}

pub async fn update_todo(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTodoRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match ctx.tasks.set_completed(&id, body.completed).await {
        Ok(task) => Ok(Json(json!(task))),
        Err(e) => Err(error_response(e)),
    }
}
