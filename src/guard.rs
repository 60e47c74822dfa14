// src/guard.rs

//! Preconditions checked before any write: existence, uniqueness, referential
//! blocks and field constraints. They only read, so a failed check leaves the
//! store untouched.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AppError;
use crate::store::{Record, Repository, TaskReference, TaskRepository};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Loads a live record or fails with NotFound.
pub async fn resolve<T, R>(repo: &R, id: i64) -> Result<T, AppError>
where
    T: Record,
    R: Repository<T> + ?Sized,
{
    repo.find(id)
        .await?
        .ok_or_else(|| AppError::not_found(T::KIND, id))
}

/// Resolves every id of a submitted list. Duplicates collapse; the result is sorted.
pub async fn resolve_all<T, R>(repo: &R, ids: &[i64]) -> Result<Vec<i64>, AppError>
where
    T: Record,
    R: Repository<T> + ?Sized,
{
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    for id in &ids {
        resolve::<T, R>(repo, *id).await?;
    }
    Ok(ids)
}

/// Fails with Conflict when a record other than `current` already holds `value`.
pub async fn ensure_unique<T, R>(
    repo: &R,
    field: &str,
    value: &str,
    current: Option<i64>,
) -> Result<(), AppError>
where
    T: Record,
    R: Repository<T> + ?Sized,
{
    match repo.find_by_key(field, value).await? {
        Some(other) if Some(other.id()) != current => {
            warn!("{} {} '{}' already taken by id {}", T::KIND, field, value, other.id());
            Err(AppError::Conflict(format!(
                "{} with {} '{}' already exists",
                T::KIND,
                field,
                value
            )))
        }
        _ => Ok(()),
    }
}

/// Refuses to delete a record that live tasks still point at.
pub async fn ensure_unreferenced<R>(tasks: &R, reference: TaskReference) -> Result<(), AppError>
where
    R: TaskRepository + ?Sized,
{
    let count = tasks.count_referencing(reference).await?;
    if count == 0 {
        return Ok(());
    }
    let (kind, id) = match reference {
        TaskReference::Label(id) => ("Label", id),
        TaskReference::Status(id) => ("Task status", id),
        TaskReference::Assignee(id) => ("User", id),
    };
    warn!("{} {} still referenced by {} task(s)", kind, id, count);
    Err(AppError::Conflict(format!(
        "{} {} is used by {} task(s) and cannot be deleted",
        kind, id, count
    )))
}

pub fn ensure_not_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} cannot be blank", field)));
    }
    Ok(())
}

/// Length in characters, inclusive bounds.
pub fn ensure_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::validation(format!(
            "{} must be between {} and {} characters long",
            field, min, max
        )));
    }
    Ok(())
}

pub fn ensure_email(value: &str) -> Result<(), AppError> {
    if !EMAIL.is_match(value) {
        return Err(AppError::validation(format!("'{}' is not a valid email", value)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Label, Task};
    use crate::store::memory::MemoryRepository;
    use chrono::Utc;

    async fn labels(names: &[&str]) -> MemoryRepository<Label> {
        let repo = MemoryRepository::new();
        for name in names {
            repo.insert(Label {
                id: 0,
                name: name.to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        repo
    }

    #[actix_web::test]
    async fn resolve_reports_missing_ids() {
        let repo = labels(&["bug"]).await;
        let found: Label = resolve(&repo, 1).await.unwrap();
        assert_eq!(found.name, "bug");

        let err = resolve::<Label, _>(&repo, 2).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Label not found with id: 2"));
    }

    #[actix_web::test]
    async fn resolve_all_dedups_and_fails_on_any_missing_id() {
        let repo = labels(&["bug", "feature"]).await;
        assert_eq!(resolve_all::<Label, _>(&repo, &[2, 1, 2]).await.unwrap(), vec![1, 2]);
        assert!(resolve_all::<Label, _>(&repo, &[1, 9]).await.is_err());
        assert!(resolve_all::<Label, _>(&repo, &[]).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn uniqueness_ignores_the_record_itself() {
        let repo = labels(&["bug", "feature"]).await;
        assert!(ensure_unique::<Label, _>(&repo, "name", "docs", None).await.is_ok());
        assert!(ensure_unique::<Label, _>(&repo, "name", "bug", Some(1)).await.is_ok());

        let taken = ensure_unique::<Label, _>(&repo, "name", "bug", Some(2)).await;
        assert!(matches!(taken, Err(AppError::Conflict(_))));
        let created = ensure_unique::<Label, _>(&repo, "name", "bug", None).await;
        assert!(matches!(created, Err(AppError::Conflict(_))));
    }

    #[actix_web::test]
    async fn referenced_records_are_blocked() {
        let tasks = MemoryRepository::<Task>::new();
        tasks
            .insert(Task {
                id: 0,
                title: "t".into(),
                index: 0,
                content: None,
                task_status_id: 3,
                assignee_id: Some(4),
                label_ids: vec![5],
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        for reference in [
            TaskReference::Label(5),
            TaskReference::Status(3),
            TaskReference::Assignee(4),
        ] {
            assert!(matches!(
                ensure_unreferenced(&tasks, reference).await,
                Err(AppError::Conflict(_))
            ));
        }
        assert!(ensure_unreferenced(&tasks, TaskReference::Label(6)).await.is_ok());
    }

    #[test]
    fn field_constraints() {
        assert!(ensure_not_blank("title", "  ").is_err());
        assert!(ensure_not_blank("title", "x").is_ok());

        assert!(ensure_length("name", "ab", 3, 1000).is_err());
        assert!(ensure_length("name", "abc", 3, 1000).is_ok());
        assert!(ensure_length("name", &"a".repeat(1001), 3, 1000).is_err());
        // Characters, not bytes.
        assert!(ensure_length("name", "äöü", 3, 3).is_ok());

        assert!(ensure_email("jane@example.com").is_ok());
        assert!(ensure_email("jane.example.com").is_err());
        assert!(ensure_email("jane@example").is_err());
    }
}
