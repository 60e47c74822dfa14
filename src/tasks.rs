// src/tasks.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::Principal;
use crate::error::AppError;
use crate::filter::{listing, Page, TaskCriteria, TaskParams};
use crate::guard::{ensure_not_blank, resolve, resolve_all};
use crate::models::{Label, Task, TaskDto, TaskStatus, User};
use crate::patch::Patch;
use crate::store::Record;
use crate::task_statuses;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default, alias = "description")]
    pub content: Option<String>,
    pub task_status_id: i64,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default, alias = "taskLabelIds")]
    pub label_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(alias = "name")]
    pub title: Patch<String>,
    pub index: Patch<i32>,
    #[serde(alias = "description")]
    pub content: Patch<String>,
    pub task_status_id: Patch<i64>,
    pub assignee_id: Patch<i64>,
    /// `null` detaches every label.
    #[serde(alias = "taskLabelIds")]
    pub label_ids: Patch<Vec<i64>>,
}

/// Filtered listing plus the number of matches before paging.
pub async fn find_all(state: &AppState, params: &TaskParams) -> Result<(Vec<Task>, u64), AppError> {
    let page = Page::from_params(params.page, params.size)?;

    let status_id = match params.status.as_deref() {
        Some(slug) => match task_statuses::find_by_slug(state, slug).await? {
            Some(status) => Some(status.id),
            None => {
                debug!("No task status with slug {}", slug);
                return Ok((Vec::new(), 0));
            }
        },
        None => None,
    };

    let criteria = TaskCriteria::new()
        .assignee(params.assignee_id)
        .label(params.label_id)
        .title_contains(params.title_cont.as_deref())
        .status(status_id);
    Ok(state.stores.tasks.find_matching(&criteria, page).await?)
}

pub async fn find_by_id(state: &AppState, id: i64) -> Result<Task, AppError> {
    resolve(&*state.stores.tasks, id).await
}

pub async fn create(state: &AppState, payload: CreateTaskRequest) -> Result<Task, AppError> {
    ensure_not_blank("title", &payload.title)?;

    let _writes = state.writes.lock().await;
    let stores = &state.stores;
    resolve::<TaskStatus, _>(&*stores.statuses, payload.task_status_id).await?;
    if let Some(assignee_id) = payload.assignee_id {
        resolve::<User, _>(&*stores.users, assignee_id).await?;
    }
    let label_ids = resolve_all::<Label, _>(&*stores.labels, &payload.label_ids).await?;

    let task = stores
        .tasks
        .insert(Task {
            id: 0,
            title: payload.title,
            index: payload.index,
            content: payload.content,
            task_status_id: payload.task_status_id,
            assignee_id: payload.assignee_id,
            label_ids,
            created_at: Utc::now(),
        })
        .await?;
    info!("Task created: {}", task.id);
    Ok(task)
}

/// Every reference in the payload is resolved before the task is touched, so
/// a missing status, assignee or label leaves the stored task as it was.
pub async fn update(
    state: &AppState,
    id: i64,
    payload: UpdateTaskRequest,
) -> Result<Task, AppError> {
    let title = payload.title.required("title")?;
    if let Some(title) = &title {
        ensure_not_blank("title", title)?;
    }
    let task_status_id = payload.task_status_id.required("taskStatusId")?;

    let _writes = state.writes.lock().await;
    let stores = &state.stores;
    let mut task: Task = resolve(&*stores.tasks, id).await?;

    if let Some(status_id) = task_status_id {
        resolve::<TaskStatus, _>(&*stores.statuses, status_id).await?;
    }
    if let Some(assignee_id) = payload.assignee_id.as_value() {
        resolve::<User, _>(&*stores.users, *assignee_id).await?;
    }
    let label_ids = match payload.label_ids {
        Patch::Unset => None,
        Patch::Null => Some(Vec::new()),
        Patch::Value(ids) => Some(resolve_all::<Label, _>(&*stores.labels, &ids).await?),
    };

    if let Some(title) = title {
        task.title = title;
    }
    payload.index.apply("index", &mut task.index)?;
    if let Some(status_id) = task_status_id {
        task.task_status_id = status_id;
    }
    if let Some(label_ids) = label_ids {
        task.label_ids = label_ids;
    }
    payload.content.apply_nullable(&mut task.content);
    payload.assignee_id.apply_nullable(&mut task.assignee_id);

    if !stores.tasks.replace(&task).await? {
        return Err(AppError::not_found(Task::KIND, id));
    }
    info!("Task updated: {}", id);
    Ok(task)
}

pub async fn delete(state: &AppState, id: i64) -> Result<(), AppError> {
    let _writes = state.writes.lock().await;
    if !state.stores.tasks.delete(id).await? {
        return Err(AppError::not_found(Task::KIND, id));
    }
    info!("Task deleted: {}", id);
    Ok(())
}

/// GET /api/tasks?assigneeId=&labelId=&titleCont=&status=&page=&size=
pub async fn list_tasks(
    data: web::Data<AppState>,
    _principal: Principal,
    params: web::Query<TaskParams>,
) -> Result<HttpResponse, AppError> {
    let (tasks, total) = find_all(&data, &params).await?;
    let tasks: Vec<TaskDto> = tasks.into_iter().map(TaskDto::from).collect();
    Ok(listing(tasks, total))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let task = find_by_id(&data, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TaskDto::from(task)))
}

/// POST /api/tasks
pub async fn create_task(
    data: web::Data<AppState>,
    _principal: Principal,
    payload: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let task = create(&data, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(TaskDto::from(task)))
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
    payload: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, AppError> {
    let task = update(&data, id.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TaskDto::from(task)))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    delete(&data, id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
