use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{TimerMode, TimerState};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    /// The countdown reached zero.
    Natural,
    /// The user skipped ahead. Never counted in statistics.
    Skipped,
}

/// One-shot record of a mode transition out of a session.
///
/// `completed_mode` is what finished; `next_mode` is already staged in the
/// engine by the time anyone sees this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub sequence: u64,
    pub kind: CompletionKind,
    pub completed_mode: TimerMode,
    pub next_mode: TimerMode,
    pub task_id: Option<String>,
    /// Length of the finished session as it was loaded.
    pub duration_secs: u64,
    pub at: DateTime<Utc>,
}

impl Completion {
    pub fn was_focus(&self) -> bool {
        self.completed_mode == TimerMode::Focus
    }

    pub fn is_natural(&self) -> bool {
        self.kind == CompletionKind::Natural
    }

    /// Whole minutes credited to the day's focus total.
    pub fn focus_minutes(&self) -> u32 {
        u32::try_from(self.duration_secs.div_ceil(60)).unwrap_or(u32::MAX)
    }
}

/// Every state change in the engine produces an Event.
/// Front ends print or forward them; the coordinator consumes completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        duration_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ModeChanged {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        completion: Completion,
    },
    TimerCompleted {
        completion: Completion,
    },
    AutoStartScheduled {
        mode: TimerMode,
        delay_ms: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        mode: TimerMode,
        mode_label: String,
        remaining_secs: u64,
        total_secs: u64,
        display_time: String,
        progress_pct: f64,
        pomodoros_in_cycle: u32,
        selected_task_id: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The completion carried by this event, if any.
    pub fn completion(&self) -> Option<&Completion> {
        match self {
            Event::TimerCompleted { completion } | Event::TimerSkipped { completion } => {
                Some(completion)
            }
            _ => None,
        }
    }
}
