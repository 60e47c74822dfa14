// src/labels.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::Principal;
use crate::error::AppError;
use crate::filter::listing;
use crate::guard::{ensure_length, ensure_not_blank, ensure_unique, ensure_unreferenced, resolve};
use crate::models::{Label, LabelDto};
use crate::patch::Patch;
use crate::store::{Record, TaskReference};

#[derive(Debug, Deserialize)]
pub struct CreateLabelRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateLabelRequest {
    pub name: Patch<String>,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    ensure_not_blank("name", name)?;
    ensure_length("name", name, 3, 1000)
}

pub async fn find_all(state: &AppState) -> Result<Vec<Label>, AppError> {
    Ok(state.stores.labels.find_all().await?)
}

pub async fn find_by_id(state: &AppState, id: i64) -> Result<Label, AppError> {
    resolve(&*state.stores.labels, id).await
}

pub async fn create(state: &AppState, payload: CreateLabelRequest) -> Result<Label, AppError> {
    validate_name(&payload.name)?;

    let _writes = state.writes.lock().await;
    ensure_unique::<Label, _>(&*state.stores.labels, "name", &payload.name, None).await?;
    let label = state
        .stores
        .labels
        .insert(Label {
            id: 0,
            name: payload.name,
            created_at: Utc::now(),
        })
        .await?;
    info!("Label created: {}", label.id);
    Ok(label)
}

pub async fn update(
    state: &AppState,
    id: i64,
    payload: UpdateLabelRequest,
) -> Result<Label, AppError> {
    let _writes = state.writes.lock().await;
    let mut label: Label = resolve(&*state.stores.labels, id).await?;

    if let Some(name) = payload.name.required("name")? {
        validate_name(&name)?;
        ensure_unique::<Label, _>(&*state.stores.labels, "name", &name, Some(id)).await?;
        label.name = name;
    }

    if !state.stores.labels.replace(&label).await? {
        return Err(AppError::not_found(Label::KIND, id));
    }
    info!("Label updated: {}", id);
    Ok(label)
}

pub async fn delete(state: &AppState, id: i64) -> Result<(), AppError> {
    let _writes = state.writes.lock().await;
    resolve::<Label, _>(&*state.stores.labels, id).await?;
    ensure_unreferenced(&*state.stores.tasks, TaskReference::Label(id)).await?;

    if !state.stores.labels.delete(id).await? {
        return Err(AppError::not_found(Label::KIND, id));
    }
    info!("Label deleted: {}", id);
    Ok(())
}

/// GET /api/labels
pub async fn list_labels(
    data: web::Data<AppState>,
    _principal: Principal,
) -> Result<HttpResponse, AppError> {
    let labels: Vec<LabelDto> = find_all(&data).await?.into_iter().map(LabelDto::from).collect();
    let total = labels.len() as u64;
    Ok(listing(labels, total))
}

/// GET /api/labels/{id}
pub async fn get_label(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let label = find_by_id(&data, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LabelDto::from(label)))
}

/// POST /api/labels
pub async fn create_label(
    data: web::Data<AppState>,
    _principal: Principal,
    payload: web::Json<CreateLabelRequest>,
) -> Result<HttpResponse, AppError> {
    let label = create(&data, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(LabelDto::from(label)))
}

/// PUT /api/labels/{id}
pub async fn update_label(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
    payload: web::Json<UpdateLabelRequest>,
) -> Result<HttpResponse, AppError> {
    let label = update(&data, id.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LabelDto::from(label)))
}

/// DELETE /api/labels/{id}
pub async fn delete_label(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    delete(&data, id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
