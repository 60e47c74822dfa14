//! Stored records. Each one serializes its id as `_id` so the same struct
//! round-trips through MongoDB; the `*Dto` types are what the API exposes.

pub mod label;
pub mod task;
pub mod task_status;
pub mod user;

pub use label::{Label, LabelDto};
pub use task::{Task, TaskDto};
pub use task_status::{TaskStatus, TaskStatusDto};
pub use user::{User, UserDto};
