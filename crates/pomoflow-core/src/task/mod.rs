//! Task list with per-task pomodoro progress.
//!
//! The store owns task lifetime and the single "active" selection. It
//! never touches statistics: callers react to [`ToggleOutcome`] instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CoreError, Result, ValidationError};
use crate::storage::{keys, Persistence};

pub const TITLE_MAX_CHARS: usize = 100;
pub const ESTIMATE_RANGE: (u32, u32) = (1, 10);

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    pub title: String,
    pub estimated_pomodoros: u32,
    /// Never decreases, may exceed the estimate.
    pub completed_pomodoros: u32,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    fn new(title: String, estimated_pomodoros: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            estimated_pomodoros,
            completed_pomodoros: 0,
            is_completed: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// True when more pomodoros were spent than estimated.
    pub fn is_over_estimate(&self) -> bool {
        self.completed_pomodoros > self.estimated_pomodoros
    }
}

/// Fields to change in [`TaskStore::edit`].
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub estimated_pomodoros: Option<u32>,
}

/// Result of [`TaskStore::toggle_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Flipped into completed; the caller should count it.
    Completed,
    /// Flipped back to open.
    Reopened,
}

/// Validate and normalize a title. Length is counted in characters.
fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let len = trimmed.chars().count();
    if len > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleLength {
            len,
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

fn validate_estimate(estimate: u32) -> Result<u32, ValidationError> {
    let (min, max) = ESTIMATE_RANGE;
    if estimate < min || estimate > max {
        return Err(ValidationError::out_of_range(
            "estimated_pomodoros",
            i64::from(estimate),
            i64::from(min),
            i64::from(max),
        ));
    }
    Ok(estimate)
}

/// Ordered task collection plus the active selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStore {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    active_task_id: Option<String>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted list. A dangling selection is dropped.
    pub fn load(persistence: &Persistence) -> Self {
        let mut store: TaskStore = persistence.load(keys::TASKS);
        if let Some(id) = store.active_task_id.clone() {
            if store.get(&id).is_none() {
                tracing::warn!(task_id = %id, "selected task no longer exists, clearing selection");
                store.active_task_id = None;
            }
        }
        store
    }

    pub fn save(&self, persistence: &Persistence) -> bool {
        persistence.save(keys::TASKS, self)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.active_task_id.as_deref()
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.active_task_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Append a new open task.
    pub fn add(&mut self, title: &str, estimated_pomodoros: u32) -> Result<&Task> {
        let title = validate_title(title)?;
        let estimate = validate_estimate(estimated_pomodoros)?;
        self.tasks.push(Task::new(title, estimate));
        let task = &self.tasks[self.tasks.len() - 1];
        tracing::debug!(task_id = %task.id, "task added");
        Ok(task)
    }

    /// Change title and/or estimate. All changed fields are validated
    /// before anything is written.
    pub fn edit(&mut self, id: &str, patch: TaskPatch) -> Result<&Task> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let estimate = patch
            .estimated_pomodoros
            .map(validate_estimate)
            .transpose()?;

        let task = self.get_mut(id)?;
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(estimate) = estimate {
            task.estimated_pomodoros = estimate;
        }
        Ok(task)
    }

    /// Delete a task, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: &str) -> Result<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TaskNotFound(id.to_string()))?;
        if self.active_task_id.as_deref() == Some(id) {
            self.active_task_id = None;
        }
        Ok(self.tasks.remove(idx))
    }

    /// Flip `is_completed`. Reopening keeps `completed_pomodoros`.
    pub fn toggle_completion(&mut self, id: &str) -> Result<ToggleOutcome> {
        let task = self.get_mut(id)?;
        task.is_completed = !task.is_completed;
        if task.is_completed {
            task.completed_at = Some(Utc::now());
            Ok(ToggleOutcome::Completed)
        } else {
            task.completed_at = None;
            Ok(ToggleOutcome::Reopened)
        }
    }

    /// Set or clear the active task.
    pub fn select(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => {
                if self.get(id).is_none() {
                    return Err(CoreError::TaskNotFound(id.to_string()));
                }
                self.active_task_id = Some(id.to_string());
            }
            None => self.active_task_id = None,
        }
        Ok(())
    }

    /// Replace the order with `ids`, which must name every task exactly once.
    pub fn reorder(&mut self, ids: &[String]) -> Result<()> {
        if ids.len() != self.tasks.len() {
            return Err(ValidationError::InvalidOrder(format!(
                "expected {} ids, got {}",
                self.tasks.len(),
                ids.len()
            ))
            .into());
        }
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(ValidationError::InvalidOrder(format!("duplicate id {id}")).into());
            }
            if self.get(id).is_none() {
                return Err(ValidationError::InvalidOrder(format!("unknown id {id}")).into());
            }
        }

        let mut remaining = std::mem::take(&mut self.tasks);
        for id in ids {
            if let Some(pos) = remaining.iter().position(|t| &t.id == id) {
                self.tasks.push(remaining.swap_remove(pos));
            }
        }
        Ok(())
    }

    /// Add one finished pomodoro to a task. The estimate is not a cap.
    pub fn increment_pomodoro(&mut self, id: &str) -> Result<u32> {
        let task = self.get_mut(id)?;
        task.completed_pomodoros = task.completed_pomodoros.saturating_add(1);
        if task.is_over_estimate() {
            tracing::debug!(task_id = %task.id, "task is past its estimate");
        }
        Ok(task.completed_pomodoros)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CoreError::TaskNotFound(id.to_string()))
    }
}
