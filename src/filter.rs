// src/filter.rs

//! Task list filtering.
//!
//! Each query parameter becomes one [`Criterion`]; a [`TaskCriteria`] is the
//! AND of every criterion pushed into it, and an empty one matches every
//! task. The same criteria render either to a predicate over in-memory tasks
//! or to a MongoDB filter document.

use std::fmt::Display;
use std::str::FromStr;

use actix_web::HttpResponse;
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::models::Task;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Query string of `GET /api/tasks`. Empty values (`?assigneeId=`) count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub assignee_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub label_id: Option<i64>,
    /// Kept verbatim, surrounding spaces are part of the needle.
    #[serde(default, deserialize_with = "blank_text_as_none")]
    pub title_cont: Option<String>,
    /// Status slug.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub size: Option<u64>,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn blank_text_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|raw| !raw.trim().is_empty()))
}

type TaskPredicate = Box<dyn Fn(&Task) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Assignee(i64),
    Label(i64),
    /// Lowercased needle.
    TitleContains(String),
    Status(i64),
}

impl Criterion {
    fn into_predicate(self) -> TaskPredicate {
        match self {
            Criterion::Assignee(id) => Box::new(move |task: &Task| task.assignee_id == Some(id)),
            Criterion::Label(id) => Box::new(move |task: &Task| task.label_ids.contains(&id)),
            Criterion::TitleContains(needle) => {
                Box::new(move |task: &Task| task.title.to_lowercase().contains(&needle))
            }
            Criterion::Status(id) => Box::new(move |task: &Task| task.task_status_id == id),
        }
    }

    fn to_document(&self) -> Document {
        match self {
            Criterion::Assignee(id) => doc! { "assignee_id": id },
            // Array membership: a task is returned once however its labels match.
            Criterion::Label(id) => doc! { "label_ids": id },
            Criterion::TitleContains(needle) => doc! {
                "title": { "$regex": regex::escape(needle), "$options": "i" }
            },
            Criterion::Status(id) => doc! { "task_status_id": id },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCriteria {
    criteria: Vec<Criterion>,
}

impl TaskCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignee(self, id: Option<i64>) -> Self {
        self.push(id.map(Criterion::Assignee))
    }

    pub fn label(self, id: Option<i64>) -> Self {
        self.push(id.map(Criterion::Label))
    }

    pub fn title_contains(self, needle: Option<&str>) -> Self {
        self.push(needle.map(|n| Criterion::TitleContains(n.to_lowercase())))
    }

    pub fn status(self, id: Option<i64>) -> Self {
        self.push(id.map(Criterion::Status))
    }

    fn push(mut self, criterion: Option<Criterion>) -> Self {
        if let Some(c) = criterion {
            self.criteria.push(c);
        }
        self
    }

    /// Folds the criteria into a single AND predicate.
    pub fn predicate(&self) -> impl Fn(&Task) -> bool + Send + Sync {
        let checks: Vec<TaskPredicate> = self
            .criteria
            .iter()
            .cloned()
            .map(Criterion::into_predicate)
            .collect();
        move |task: &Task| checks.iter().all(|check| check(task))
    }

    pub fn to_document(&self) -> Document {
        match self.criteria.as_slice() {
            [] => doc! {},
            [single] => single.to_document(),
            many => {
                let parts: Vec<Document> = many.iter().map(Criterion::to_document).collect();
                doc! { "$and": parts }
            }
        }
    }
}

/// 1-based page of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    /// `None` when the caller asked for no pagination at all.
    pub fn from_params(number: Option<u64>, size: Option<u64>) -> Result<Option<Self>, AppError> {
        if number.is_none() && size.is_none() {
            return Ok(None);
        }
        let number = number.unwrap_or(1);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        if number == 0 {
            return Err(AppError::BadRequest("page must be at least 1".into()));
        }
        if size == 0 || i64::try_from(size).is_err() {
            return Err(AppError::BadRequest(format!(
                "size must be between 1 and {}",
                i64::MAX
            )));
        }
        Ok(Some(Self { number, size }))
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }

    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.size as usize)
            .collect()
    }
}

/// JSON array response carrying the size of the whole result set.
pub fn listing<T: Serialize>(items: Vec<T>, total: u64) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((TOTAL_COUNT_HEADER, total.to_string()))
        .json(items)
}
