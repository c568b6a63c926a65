//! Tasks a focus session can be attached to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: Utc::now(),
            done: false,
        }
    }
}

/// Where `start` looks for a task when the caller names none.
pub trait TaskSource {
    /// The task to fall back to, if any.
    fn first_available(&self) -> Option<String>;
}

impl TaskSource for [String] {
    fn first_available(&self) -> Option<String> {
        self.first().cloned()
    }
}

impl TaskSource for Vec<String> {
    fn first_available(&self) -> Option<String> {
        self.as_slice().first_available()
    }
}

impl TaskSource for [Task] {
    fn first_available(&self) -> Option<String> {
        self.iter().find(|t| !t.done).map(|t| t.id.clone())
    }
}

impl TaskSource for Vec<Task> {
    fn first_available(&self) -> Option<String> {
        self.as_slice().first_available()
    }
}

impl<T: TaskSource + ?Sized> TaskSource for &T {
    fn first_available(&self) -> Option<String> {
        (**self).first_available()
    }
}

/// A source with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTasks;

impl TaskSource for NoTasks {
    fn first_available(&self) -> Option<String> {
        None
    }
}
