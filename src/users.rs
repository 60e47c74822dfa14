// src/users.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::{hash_password, Principal};
use crate::error::AppError;
use crate::filter::listing;
use crate::guard::{ensure_email, ensure_length, ensure_unique, ensure_unreferenced, resolve};
use crate::models::{User, UserDto};
use crate::patch::Patch;
use crate::store::{Record, TaskReference};

const MIN_PASSWORD: usize = 3;
const MAX_PASSWORD: usize = 72;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Patch<String>,
    pub last_name: Patch<String>,
    pub email: Patch<String>,
    pub password: Patch<String>,
}

fn validate_password(password: &str) -> Result<(), AppError> {
    // bcrypt only looks at the first 72 bytes.
    ensure_length("password", password, MIN_PASSWORD, MAX_PASSWORD)
}

pub async fn find_all(state: &AppState) -> Result<Vec<User>, AppError> {
    Ok(state.stores.users.find_all().await?)
}

pub async fn find_by_id(state: &AppState, id: i64) -> Result<User, AppError> {
    resolve(&*state.stores.users, id).await
}

pub async fn create(state: &AppState, payload: CreateUserRequest) -> Result<User, AppError> {
    ensure_email(&payload.email)?;
    validate_password(&payload.password)?;
    let digest = hash_password(&payload.password, state.config.bcrypt_cost)?;

    let _writes = state.writes.lock().await;
    ensure_unique::<User, _>(&*state.stores.users, "email", &payload.email, None).await?;
    let now = Utc::now();
    let user = state
        .stores
        .users
        .insert(User {
            id: 0,
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password_digest: digest,
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!("User created: {}", user.id);
    Ok(user)
}

pub async fn update(
    state: &AppState,
    id: i64,
    payload: UpdateUserRequest,
) -> Result<User, AppError> {
    let email = payload.email.required("email")?;
    if let Some(email) = &email {
        ensure_email(email)?;
    }
    let digest = match payload.password.required("password")? {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_password(&password, state.config.bcrypt_cost)?)
        }
        None => None,
    };

    let _writes = state.writes.lock().await;
    let users = &*state.stores.users;
    let mut user: User = resolve(users, id).await?;

    if let Some(email) = email {
        ensure_unique::<User, _>(users, "email", &email, Some(id)).await?;
        user.email = email;
    }
    if let Some(digest) = digest {
        user.password_digest = digest;
    }
    payload.first_name.apply_nullable(&mut user.first_name);
    payload.last_name.apply_nullable(&mut user.last_name);
    user.updated_at = Utc::now();

    if !users.replace(&user).await? {
        return Err(AppError::not_found(User::KIND, id));
    }
    info!("User updated: {}", id);
    Ok(user)
}

pub async fn delete(state: &AppState, id: i64) -> Result<(), AppError> {
    let _writes = state.writes.lock().await;
    resolve::<User, _>(&*state.stores.users, id).await?;
    ensure_unreferenced(&*state.stores.tasks, TaskReference::Assignee(id)).await?;

    if !state.stores.users.delete(id).await? {
        return Err(AppError::not_found(User::KIND, id));
    }
    info!("User deleted: {}", id);
    Ok(())
}

/// GET /api/users
pub async fn list_users(
    data: web::Data<AppState>,
    _principal: Principal,
) -> Result<HttpResponse, AppError> {
    let users: Vec<UserDto> = find_all(&data).await?.into_iter().map(UserDto::from).collect();
    let total = users.len() as u64;
    Ok(listing(users, total))
}

/// GET /api/users/{id}
pub async fn get_user(
    data: web::Data<AppState>,
    _principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = find_by_id(&data, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserDto::from(user)))
}

/// POST /api/users
pub async fn create_user(
    data: web::Data<AppState>,
    _principal: Principal,
    payload: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let user = create(&data, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(UserDto::from(user)))
}

/// PUT /api/users/{id}, own account only.
pub async fn update_user(
    data: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
    payload: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    find_by_id(&data, id).await?;
    principal.ensure_self(id)?;
    let user = update(&data, id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserDto::from(user)))
}

/// DELETE /api/users/{id}, own account only.
pub async fn delete_user(
    data: web::Data<AppState>,
    principal: Principal,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    find_by_id(&data, id).await?;
    principal.ensure_self(id)?;
    delete(&data, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::test_support::{seed_status, seed_task, seed_user, state};

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: email.to_string(),
            password: "secret".to_string(),
        }
    }

    #[actix_web::test]
    async fn create_hashes_the_password_and_guards_email() {
        let state = state();
        let jane = create(&state, request("jane@example.com")).await.unwrap();
        assert!(verify_password("secret", &jane.password_digest));

        assert!(matches!(
            create(&state, request("jane@example.com")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            create(&state, request("not-an-email")).await,
            Err(AppError::Validation(_))
        ));

        let mut short = request("short@example.com");
        short.password = "ab".into();
        assert!(matches!(create(&state, short).await, Err(AppError::Validation(_))));
    }

    #[actix_web::test]
    async fn partial_update_keeps_unmentioned_fields() {
        let state = state();
        let jane = seed_user(&state, "jane@example.com").await;

        let payload: UpdateUserRequest = serde_json::from_str(r#"{"lastName": null}"#).unwrap();
        let updated = update(&state, jane.id, payload).await.unwrap();
        assert_eq!(updated.last_name, None);
        assert_eq!(updated.first_name, jane.first_name);
        assert_eq!(updated.email, jane.email);
        assert_eq!(updated.password_digest, jane.password_digest);

        let payload: UpdateUserRequest =
            serde_json::from_str(r#"{"password": "changed"}"#).unwrap();
        let updated = update(&state, jane.id, payload).await.unwrap();
        assert!(verify_password("changed", &updated.password_digest));
        assert_eq!(updated.last_name, None);
    }

    #[actix_web::test]
    async fn email_changes_respect_uniqueness() {
        let state = state();
        let jane = seed_user(&state, "jane@example.com").await;
        seed_user(&state, "john@example.com").await;

        let own: UpdateUserRequest =
            serde_json::from_str(r#"{"email": "jane@example.com"}"#).unwrap();
        assert!(update(&state, jane.id, own).await.is_ok());

        let taken: UpdateUserRequest =
            serde_json::from_str(r#"{"email": "john@example.com"}"#).unwrap();
        assert!(matches!(update(&state, jane.id, taken).await, Err(AppError::Conflict(_))));

        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert!(matches!(update(&state, jane.id, cleared).await, Err(AppError::Validation(_))));
        assert_eq!(find_by_id(&state, jane.id).await.unwrap().email, "jane@example.com");
    }

    #[actix_web::test]
    async fn assignees_cannot_be_deleted() {
        let state = state();
        let jane = seed_user(&state, "jane@example.com").await;
        let status = seed_status(&state, "draft", "draft").await;
        let task = seed_task(&state, "Assigned", status.id, Some(jane.id), vec![]).await;

        assert!(matches!(delete(&state, jane.id).await, Err(AppError::Conflict(_))));
        state.stores.tasks.delete(task.id).await.unwrap();
        delete(&state, jane.id).await.unwrap();
        assert!(matches!(delete(&state, jane.id).await, Err(AppError::NotFound(_))));
    }
}
