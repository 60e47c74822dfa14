// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Record, Repository, StoreError, StoreResult, TaskReference, TaskRepository};
use crate::filter::{Page, TaskCriteria};
use crate::models::Task;

struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T: Record> Table<T> {
    /// Mirrors a unique index: no other row may share a key value.
    fn check_keys(&self, record: &T) -> StoreResult<()> {
        for field in T::KEYS {
            let value = record.key(field);
            let clash = self
                .rows
                .values()
                .any(|row| row.id() != record.id() && row.key(field) == value);
            if clash {
                return Err(StoreError::Duplicate((*field).to_string()));
            }
        }
        Ok(())
    }
}

/// Process-local backend; rows live in id order so listings are deterministic.
pub struct MemoryRepository<T> {
    table: RwLock<Table<T>>,
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl<T: Record> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryRepository<T> {
    async fn find(&self, id: i64) -> StoreResult<Option<T>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<T>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn find_by_key(&self, field: &str, value: &str) -> StoreResult<Option<T>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|row| row.key(field) == Some(value))
            .cloned())
    }

    async fn insert(&self, mut record: T) -> StoreResult<T> {
        let mut table = self.table.write().await;
        record.set_id(table.next_id);
        table.check_keys(&record)?;
        table.next_id += 1;
        table.rows.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn replace(&self, record: &T) -> StoreResult<bool> {
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&record.id()) {
            return Ok(false);
        }
        table.check_keys(record)?;
        table.rows.insert(record.id(), record.clone());
        Ok(true)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.table.read().await.rows.len() as u64)
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository<Task> {
    async fn find_matching(
        &self,
        criteria: &TaskCriteria,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Task>, u64)> {
        let matches = criteria.predicate();
        let table = self.table.read().await;
        let found: Vec<Task> = table.rows.values().filter(|task| matches(*task)).cloned().collect();
        let total = found.len() as u64;
        let found = match page {
            Some(page) => page.slice(found),
            None => found,
        };
        Ok((found, total))
    }

    async fn count_referencing(&self, reference: TaskReference) -> StoreResult<u64> {
        let matches = reference.criteria().predicate();
        let table = self.table.read().await;
        Ok(table.rows.values().filter(|task| matches(*task)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;
    use chrono::Utc;

    fn label(name: &str) -> Label {
        Label {
            id: 0,
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    fn task(title: &str, labels: Vec<i64>) -> Task {
        Task {
            id: 0,
            title: title.to_string(),
            index: 0,
            content: None,
            task_status_id: 1,
            assignee_id: None,
            label_ids: labels,
            created_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn assigns_sequential_ids_and_lists_in_order() {
        let repo = MemoryRepository::<Label>::new();
        let a = repo.insert(label("feature")).await.unwrap();
        let b = repo.insert(label("bug")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let names: Vec<String> =
            repo.find_all().await.unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["feature", "bug"]);
        assert_eq!(repo.find_by_key("name", "bug").await.unwrap().map(|l| l.id), Some(2));
    }

    #[actix_web::test]
    async fn rejects_duplicate_keys_but_not_self() {
        let repo = MemoryRepository::<Label>::new();
        let mut bug = repo.insert(label("bug")).await.unwrap();
        assert!(matches!(
            repo.insert(label("bug")).await,
            Err(StoreError::Duplicate(field)) if field == "name"
        ));
        // A rejected insert does not burn an id.
        assert_eq!(repo.insert(label("docs")).await.unwrap().id, 2);

        assert!(repo.replace(&bug).await.unwrap());
        bug.name = "docs".into();
        assert!(repo.replace(&bug).await.is_err());
        assert_eq!(repo.find(1).await.unwrap().unwrap().name, "bug");
    }

    #[actix_web::test]
    async fn replace_and_delete_report_missing_rows() {
        let repo = MemoryRepository::<Label>::new();
        let mut ghost = label("ghost");
        ghost.id = 42;
        assert!(!repo.replace(&ghost).await.unwrap());
        assert!(!repo.delete(42).await.unwrap());
    }

    #[actix_web::test]
    async fn task_matching_pages_after_counting() {
        let repo = MemoryRepository::<Task>::new();
        for i in 0..5 {
            repo.insert(task(&format!("task {}", i), vec![7])).await.unwrap();
        }
        repo.insert(task("other", vec![])).await.unwrap();

        let criteria = TaskCriteria::new().label(Some(7));
        let page = Page { number: 2, size: 2 };
        let (found, total) = repo.find_matching(&criteria, Some(page)).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(found.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3, 4]);

        assert_eq!(repo.count_referencing(TaskReference::Label(7)).await.unwrap(), 5);
        assert_eq!(repo.count_referencing(TaskReference::Label(8)).await.unwrap(), 0);
    }
}
