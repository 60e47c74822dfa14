// src/seed.rs

//! Startup data. Safe to run on every boot: nothing is created twice.

use chrono::Utc;
use log::info;

use crate::app_state::AppState;
use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::{Label, TaskStatus, User};

const STATUSES: &[(&str, &str)] = &[
    ("draft", "draft"),
    ("to review", "to_review"),
    ("to be fixed", "to_be_fixed"),
    ("to publish", "to_publish"),
    ("published", "published"),
];

const LABELS: &[&str] = &["feature", "bug"];

pub async fn run(state: &AppState) -> Result<(), AppError> {
    let _writes = state.writes.lock().await;
    seed_admin(state).await?;
    if state.config.seed_catalog {
        seed_catalog(state).await?;
    }
    Ok(())
}

/// Creates the admin account unless a user with that email exists.
async fn seed_admin(state: &AppState) -> Result<(), AppError> {
    let (email, password) = match (&state.config.admin_email, &state.config.admin_password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Ok(()),
    };
    let users = &state.stores.users;
    if users.find_by_key("email", email).await?.is_some() {
        return Ok(());
    }

    let now = Utc::now();
    let admin = users
        .insert(User {
            id: 0,
            first_name: None,
            last_name: None,
            email: email.clone(),
            password_digest: hash_password(password, state.config.bcrypt_cost)?,
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!("Seeded admin user {} ({})", admin.id, admin.email);
    Ok(())
}

/// Default statuses and labels, only into an empty catalog.
async fn seed_catalog(state: &AppState) -> Result<(), AppError> {
    let statuses = &state.stores.statuses;
    if statuses.count().await? == 0 {
        for (name, slug) in STATUSES {
            statuses
                .insert(TaskStatus {
                    id: 0,
                    name: name.to_string(),
                    slug: slug.to_string(),
                    author_id: None,
                    created_at: Utc::now(),
                })
                .await?;
        }
        info!("Seeded {} task statuses", STATUSES.len());
    }

    let labels = &state.stores.labels;
    if labels.count().await? == 0 {
        for name in LABELS {
            labels
                .insert(Label {
                    id: 0,
                    name: name.to_string(),
                    created_at: Utc::now(),
                })
                .await?;
        }
        info!("Seeded {} labels", LABELS.len());
    }
    Ok(())
}
