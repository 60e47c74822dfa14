// src/store/mod.rs

//! Persistence interface the operations delegate to, with an in-memory
//! backend and a MongoDB backend behind the same traits.

pub mod memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::filter::{Page, TaskCriteria};
use crate::models::{Label, Task, TaskStatus, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field {0}")]
    Duplicate(String),
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Record: Clone + Send + Sync + Unpin + Serialize + DeserializeOwned + 'static {
    /// Human readable name used in error messages.
    const KIND: &'static str;
    const COLLECTION: &'static str;
    /// Fields whose values are unique across live records.
    const KEYS: &'static [&'static str] = &[];

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Value of a uniquely keyed field, `None` for fields that are not keys.
    fn key(&self, _field: &str) -> Option<&str> {
        None
    }
}

#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn find(&self, id: i64) -> StoreResult<Option<T>>;

    /// Every record, ordered by id.
    async fn find_all(&self) -> StoreResult<Vec<T>>;

    async fn find_by_key(&self, field: &str, value: &str) -> StoreResult<Option<T>>;

    /// Assigns the next id and stores the record.
    async fn insert(&self, record: T) -> StoreResult<T>;

    /// Returns false when no record has that id.
    async fn replace(&self, record: &T) -> StoreResult<bool>;

    /// Returns false when no record has that id.
    async fn delete(&self, id: i64) -> StoreResult<bool>;

    async fn count(&self) -> StoreResult<u64>;
}

/// A record that tasks point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskReference {
    Label(i64),
    Status(i64),
    Assignee(i64),
}

impl TaskReference {
    pub fn criteria(self) -> TaskCriteria {
        match self {
            TaskReference::Label(id) => TaskCriteria::new().label(Some(id)),
            TaskReference::Status(id) => TaskCriteria::new().status(Some(id)),
            TaskReference::Assignee(id) => TaskCriteria::new().assignee(Some(id)),
        }
    }
}

#[async_trait]
pub trait TaskRepository: Repository<Task> {
    /// Matching tasks ordered by id, plus the number of matches before paging.
    async fn find_matching(
        &self,
        criteria: &TaskCriteria,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Task>, u64)>;

    async fn count_referencing(&self, reference: TaskReference) -> StoreResult<u64>;
}

/// One repository per record type.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn Repository<User>>,
    pub statuses: Arc<dyn Repository<TaskStatus>>,
    pub labels: Arc<dyn Repository<Label>>,
    pub tasks: Arc<dyn TaskRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryRepository::<User>::new()),
            statuses: Arc::new(memory::MemoryRepository::<TaskStatus>::new()),
            labels: Arc::new(memory::MemoryRepository::<Label>::new()),
            tasks: Arc::new(memory::MemoryRepository::<Task>::new()),
        }
    }

    pub async fn mongo(uri: &str, database: &str) -> StoreResult<Self> {
        let db = mongo::MongoDB::init(uri, database).await?;
        db.ensure_indexes().await?;
        Ok(Self {
            users: Arc::new(db.repository::<User>()),
            statuses: Arc::new(db.repository::<TaskStatus>()),
            labels: Arc::new(db.repository::<Label>()),
            tasks: Arc::new(db.repository::<Task>()),
        })
    }
}
