//! Task data model.
//!
//! A [`Task`] is a single to-do item with a name, a due date, a
//! [`Priority`] and a completion flag. [`TaskList`] is the ordered
//! collection the store persists: insertion order is display order and
//! also the index space used by [`TaskList::complete`] and
//! [`TaskList::delete`].

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name substituted when a task is created without one.
pub const UNTITLED_TASK_NAME: &str = "(untitled)";

/// Errors raised by positional operations on a [`TaskList`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    /// The position does not address an existing task.
    #[error("task index {index} is out of range (list has {len} tasks)")]
    IndexOutOfRange {
        /// Requested zero-based position.
        index: usize,
        /// Length of the collection at the time of the call.
        len: usize,
    },
}

/// Urgency of a task.
///
/// The wire values are `"alta"`, `"media"` and `"baja"`. Parsing is
/// lenient: anything unrecognized becomes [`Priority::Medium`], so no
/// other value is ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Urgent.
    High,
    /// The default.
    #[default]
    Medium,
    /// Can wait.
    Low,
}

impl Priority {
    /// All priorities, highest first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Parses user or wire input, falling back to [`Priority::Medium`].
    ///
    /// Accepts the wire values and the English names, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn parse_lenient(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "alta" | "high" => Self::High,
            "baja" | "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    /// The value written to disk and sent over the wire.
    #[must_use]
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::High => "alta",
            Self::Medium => "media",
            Self::Low => "baja",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Priority {
    /// Never fails on the value itself: non-strings (`null`, numbers,
    /// objects) read as [`Priority::Medium`] like any unknown word.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(raw) => Self::parse_lenient(&raw),
            _ => Self::Medium,
        })
    }
}

/// A single to-do item.
///
/// Field names on the wire are English; the keys written by older
/// versions of the tool (`nombre`, `fecha`, ...) are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Display label, never empty.
    #[serde(
        alias = "nombre",
        default = "untitled",
        deserialize_with = "deserialize_name"
    )]
    pub name: String,
    /// Calendar day the task is due (`YYYY-MM-DD` on the wire).
    #[serde(alias = "fecha")]
    pub due_date: NaiveDate,
    /// Urgency; unknown values normalize to medium.
    #[serde(alias = "prioridad", default)]
    pub priority: Priority,
    /// Set once by [`TaskList::complete`], never cleared.
    #[serde(alias = "completada", default)]
    pub completed: bool,
    /// Optional subject code the task belongs to.
    #[serde(alias = "materia", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Optional person associated with the subject.
    #[serde(alias = "maestro", default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
}

fn untitled() -> String {
    UNTITLED_TASK_NAME.to_string()
}

fn deserialize_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        Ok(untitled())
    } else {
        Ok(raw)
    }
}

impl Task {
    /// Creates an incomplete task, substituting a placeholder for a blank name.
    #[must_use]
    pub fn new(name: &str, due_date: NaiveDate, priority: Priority) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                untitled()
            } else {
                name.to_string()
            },
            due_date,
            priority,
            completed: false,
            subject: None,
            teacher: None,
        }
    }

    /// Attaches subject metadata.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>, teacher: Option<String>) -> Self {
        self.subject = Some(subject.into());
        self.teacher = teacher;
        self
    }

    /// Whether the task is still open and due on `day`.
    #[must_use]
    pub fn is_pending_on(&self, day: NaiveDate) -> bool {
        !self.completed && self.due_date == day
    }
}

/// Ordered task collection.
///
/// Duplicates are allowed; positions are zero-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList(Vec<Task>);

impl TaskList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a task at the end.
    pub fn add(&mut self, task: Task) {
        self.0.push(task);
    }

    /// Marks the task at `index` as completed.
    ///
    /// Completing an already completed task is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::IndexOutOfRange`] if `index >= len`; the list
    /// is left unchanged.
    pub fn complete(&mut self, index: usize) -> Result<&Task, TaskError> {
        let len = self.0.len();
        let task = self
            .0
            .get_mut(index)
            .ok_or(TaskError::IndexOutOfRange { index, len })?;
        task.completed = true;
        Ok(task)
    }

    /// Removes and returns the task at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::IndexOutOfRange`] if `index >= len`; the list
    /// is left unchanged.
    pub fn delete(&mut self, index: usize) -> Result<Task, TaskError> {
        let len = self.0.len();
        if index >= len {
            return Err(TaskError::IndexOutOfRange { index, len });
        }
        Ok(self.0.remove(index))
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.0.iter()
    }

    /// Borrows the tasks as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Task] {
        &self.0
    }

    /// Consumes the list, returning the tasks.
    #[must_use]
    pub fn into_vec(self) -> Vec<Task> {
        self.0
    }
}

impl From<Vec<Task>> for TaskList {
    fn from(tasks: Vec<Task>) -> Self {
        Self(tasks)
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parses a due date typed by a person.
///
/// Accepts `dd/mm/yy` (years below 100 are taken as 20yy), `dd/mm/yyyy`
/// and ISO `yyyy-mm-dd`. Returns `None` for anything else, including
/// impossible dates.
#[must_use]
pub fn parse_due_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    let mut parts = text.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let day: u32 = day.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;
    let year: u32 = year.trim().parse().ok()?;
    let year = if year < 100 { year + 2000 } else { year };

    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Formats a date as `dd/mm/yy` for display.
#[must_use]
pub fn format_short(date: NaiveDate) -> String {
    date.format("%d/%m/%y").to_string()
}
