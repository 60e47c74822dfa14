// src/test_support.rs

//! Fixtures shared by the unit and API tests. Records are written straight to
//! the store so each test only exercises the operation it is about.

use chrono::Utc;

use crate::app_state::AppState;
use crate::auth::{create_jwt, hash_password};
use crate::config::Config;
use crate::models::{Label, Task, TaskStatus, User};
use crate::store::Stores;

pub const PASSWORD: &str = "password";

pub fn state() -> AppState {
    AppState::new(Stores::in_memory(), Config::for_tests())
}

pub async fn seed_user(state: &AppState, email: &str) -> User {
    let now = Utc::now();
    state
        .stores
        .users
        .insert(User {
            id: 0,
            first_name: Some("Test".into()),
            last_name: Some("User".into()),
            email: email.to_string(),
            password_digest: hash_password(PASSWORD, state.config.bcrypt_cost).unwrap(),
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
}

pub async fn seed_status(state: &AppState, name: &str, slug: &str) -> TaskStatus {
    state
        .stores
        .statuses
        .insert(TaskStatus {
            id: 0,
            name: name.to_string(),
            slug: slug.to_string(),
            author_id: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub async fn seed_label(state: &AppState, name: &str) -> Label {
    state
        .stores
        .labels
        .insert(Label {
            id: 0,
            name: name.to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub async fn seed_task(
    state: &AppState,
    title: &str,
    status_id: i64,
    assignee_id: Option<i64>,
    label_ids: Vec<i64>,
) -> Task {
    state
        .stores
        .tasks
        .insert(Task {
            id: 0,
            title: title.to_string(),
            index: 0,
            content: Some(format!("About {}", title)),
            task_status_id: status_id,
            assignee_id,
            label_ids,
            created_at: Utc::now(),
        })
        .await
        .unwrap()
}

pub fn token_for(state: &AppState, user: &User) -> String {
    create_jwt(user.id, &user.email, &state.config).unwrap()
}
