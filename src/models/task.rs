use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: i64,
    pub title: String,
    /// Ordering hint inside a status column.
    pub index: i32,
    pub content: Option<String>,
    pub task_status_id: i64,
    pub assignee_id: Option<i64>,
    /// Kept sorted and free of duplicates.
    pub label_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl Record for Task {
    const KIND: &'static str = "Task";
    const COLLECTION: &'static str = "tasks";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: i64,
    pub title: String,
    pub index: i32,
    pub content: Option<String>,
    pub task_status_id: i64,
    pub assignee_id: Option<i64>,
    pub label_ids: Vec<i64>,
    pub created_at: NaiveDate,
}

impl From<Task> for TaskDto {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            title: t.title,
            index: t.index,
            content: t.content,
            task_status_id: t.task_status_id,
            assignee_id: t.assignee_id,
            label_ids: t.label_ids,
            created_at: t.created_at.date_naive(),
        }
    }
}
