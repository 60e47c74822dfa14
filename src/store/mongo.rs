// src/store/mongo.rs

use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use super::{Record, Repository, StoreError, StoreResult, TaskReference, TaskRepository};
use crate::filter::{Page, TaskCriteria};
use crate::models::{Label, Task, TaskStatus, User};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoDB {
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        info!("Using MongoDB database {}", db_name);
        Ok(MongoDB { db })
    }

    pub fn repository<T: Record>(&self) -> MongoRepository<T> {
        MongoRepository {
            records: self.db.collection::<T>(T::COLLECTION),
            counters: self.db.collection::<Document>("counters"),
        }
    }

    /// Unique indexes back up the uniqueness checks done before each write.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        self.unique_indexes::<User>().await?;
        self.unique_indexes::<TaskStatus>().await?;
        self.unique_indexes::<Label>().await?;
        Ok(())
    }

    async fn unique_indexes<T: Record>(&self) -> StoreResult<()> {
        let collection = self.db.collection::<Document>(T::COLLECTION);
        for field in T::KEYS {
            let mut keys = Document::new();
            keys.insert(*field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            collection.create_index(index).await?;
        }
        Ok(())
    }
}

pub struct MongoRepository<T: Send + Sync> {
    records: Collection<T>,
    counters: Collection<Document>,
}

impl<T: Record> MongoRepository<T> {
    /// Sequential ids per collection, kept in `counters`.
    async fn next_id(&self) -> StoreResult<i64> {
        let counter = self
            .counters
            .find_one_and_update(doc! { "_id": T::COLLECTION }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;
        counter
            .as_ref()
            .and_then(|c| c.get_i64("seq").ok())
            .ok_or_else(|| {
                StoreError::Backend(format!("id counter for {} unavailable", T::COLLECTION))
            })
    }
}

fn classify(err: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
        if write_error.code == DUPLICATE_KEY {
            return StoreError::Duplicate(write_error.message.clone());
        }
    }
    StoreError::Mongo(err)
}

#[async_trait]
impl<T: Record> Repository<T> for MongoRepository<T> {
    async fn find(&self, id: i64) -> StoreResult<Option<T>> {
        Ok(self.records.find_one(doc! { "_id": id }).await?)
    }

    async fn find_all(&self) -> StoreResult<Vec<T>> {
        let cursor = self.records.find(doc! {}).sort(doc! { "_id": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_key(&self, field: &str, value: &str) -> StoreResult<Option<T>> {
        let mut filter = Document::new();
        filter.insert(field, value);
        Ok(self.records.find_one(filter).await?)
    }

    async fn insert(&self, mut record: T) -> StoreResult<T> {
        record.set_id(self.next_id().await?);
        self.records.insert_one(&record).await.map_err(classify)?;
        Ok(record)
    }

    async fn replace(&self, record: &T) -> StoreResult<bool> {
        let result = self
            .records
            .replace_one(doc! { "_id": record.id() }, record)
            .await
            .map_err(classify)?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = self.records.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.records.count_documents(doc! {}).await?)
    }
}

#[async_trait]
impl TaskRepository for MongoRepository<Task> {
    async fn find_matching(
        &self,
        criteria: &TaskCriteria,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Task>, u64)> {
        let filter = criteria.to_document();
        let total = self.records.count_documents(filter.clone()).await?;

        let mut find = self.records.find(filter).sort(doc! { "_id": 1 });
        if let Some(page) = page {
            let limit = i64::try_from(page.size).unwrap_or(i64::MAX);
            find = find.skip(page.offset()).limit(limit);
        }
        let tasks: Vec<Task> = find.await?.try_collect().await?;
        Ok((tasks, total))
    }

    async fn count_referencing(&self, reference: TaskReference) -> StoreResult<u64> {
        let filter = reference.criteria().to_document();
        Ok(self.records.count_documents(filter).await?)
    }
}
