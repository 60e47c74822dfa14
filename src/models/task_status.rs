use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    /// Stable identifier used by task filters.
    pub slug: String,
    pub author_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Record for TaskStatus {
    const KIND: &'static str = "Task status";
    const COLLECTION: &'static str = "task_statuses";
    const KEYS: &'static [&'static str] = &["name", "slug"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn key(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(&self.name),
            "slug" => Some(&self.slug),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub author_id: Option<i64>,
    pub created_at: NaiveDate,
}

impl From<TaskStatus> for TaskStatusDto {
    fn from(s: TaskStatus) -> Self {
        Self {
            id: s.id,
            name: s.name,
            slug: s.slug,
            author_id: s.author_id,
            created_at: s.created_at.date_naive(),
        }
    }
}
