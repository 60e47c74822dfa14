// src/task_statuses.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::Principal;
use crate::error::AppError;
use crate::filter::listing;
use crate::guard::{ensure_not_blank, ensure_unique, ensure_unreferenced, resolve};
use crate::models::{TaskStatus, TaskStatusDto};
use crate::patch::Patch;
use crate::store::{Record, TaskReference};

#[derive(Debug, Deserialize)]
pub struct CreateTaskStatusRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTaskStatusRequest {
    pub name: Patch<String>,
    pub slug: Patch<String>,
}

pub async fn find_all(state: &AppState) -> Result<Vec<TaskStatus>, AppError> {
    Ok(state.stores.statuses.find_all().await?)
}

pub async fn find_by_id(state: &AppState, id: i64) -> Result<TaskStatus, AppError> {
    resolve(&*state.stores.statuses, id).await
}

/// Slug lookup used by task filters; unknown slugs are not an error there.
pub async fn find_by_slug(state: &AppState, slug: &str) -> Result<Option<TaskStatus>, AppError> {
    Ok(state.stores.statuses.find_by_key("slug", slug).await?)
}

pub async fn create(
    state: &AppState,
    author: Option<&Principal>,
    payload: CreateTaskStatusRequest,
) -> Result<TaskStatus, AppError> {
    ensure_not_blank("name", &payload.name)?;
    ensure_not_blank("slug", &payload.slug)?;

    let _writes = state.writes.lock().await;
    let statuses = &*state.stores.statuses;
    ensure_unique::<TaskStatus, _>(statuses, "name", &payload.name, None).await?;
    ensure_unique::<TaskStatus, _>(statuses, "slug", &payload.slug, None).await?;

    let status = statuses
        .insert(TaskStatus {
            id: 0,
            name: payload.name,
            slug: payload.slug,
            author_id: author.map(|p| p.user_id),
            created_at: Utc::now(),
        })
        .await?;
    info!("Task status created: {} ({})", status.id, status.slug);
    Ok(status)
}

pub async fn update(
    state: &AppState,
    id: i64,
    payload: UpdateTaskStatusRequest,
) -> Result<TaskStatus, AppError> {
    let _writes = state.writes.lock().await;
    let statuses = &*state.stores.statuses;
    let mut status: TaskStatus = resolve(statuses, id).await?;

    if let Some(name) = payload.name.required("name")? {
        ensure_not_blank("name", &name)?;
        ensure_unique::<TaskStatus, _>(statuses, "name", &name, Some(id)).await?;
        status.name = name;
    }
    if let Some(slug) = payload.slug.required("slug")? {
        ensure_not_blank("slug", &slug)?;
        ensure_unique::<TaskStatus, _>(statuses, "slug", &slug, Some(id)).await?;
        status.slug = slug;
    }

    if !statuses.replace(&status).await? {
        return Err(AppError::not_found(TaskStatus::KIND, id));
    }
    info!("Task status updated: {}", id);
    Ok(status)
}

pub async fn delete(state: &AppState, id: i64) -> Result<(), AppError> {
    let _writes = state.writes.lock().await;
    resolve::<TaskStatus, _>(&*state.stores.statuses, id).await?;
    ensure_unreferenced(&*state.stores.tasks, TaskReference::Status(id)).await?;

    if !state.stores.statuses.delete(id).await? {
        return Err(AppError::not_found(TaskStatus::KIND, id));
    }
    info!("Task status deleted: {}", id);
    Ok(())
}

/// GET /api/task_statuses (public)
pub async fn list_task_statuses(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let statuses: Vec<TaskStatusDto> = find_all(&data)
        .await?
        .into_iter()
        .map(TaskStatusDto::from)
        .collect();
    let total = statuses.len() as u64;
    Ok(listing(statuses, total))
}

/// GET /api/task_statuses/{id} (public)
pub async fn get_task_status(
    data: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let status = find_by_id(&data, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TaskStatusDto::from(status)))
}

/// POST /api/task_statuses
pub async fn create_task_status(
    data: web::Data<AppState>,
    principal: Principal,
    payload: web::Json<CreateTaskStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let status = create(&data, Some(&principal), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(TaskStatusDto::from(status)))
}

/// PUT /api/task_statuses/{id}
pub async fn update_task_status(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
    payload: web::Json<UpdateTaskStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let status = update(&data, id.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TaskStatusDto::from(status)))
}

/// DELETE /api/task_statuses/{id}
pub async fn delete_task_status(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    delete(&data, id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
