//! Achievement triggers and the rate-limited display queue.
//!
//! Unlocks are decided elsewhere; this side only says when something
//! happened and then shows the results one at a time.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTrigger {
    SessionComplete,
    TaskComplete,
    StreakUpdate,
}

impl AchievementTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementTrigger::SessionComplete => "session_complete",
            AchievementTrigger::TaskComplete => "task_complete",
            AchievementTrigger::StreakUpdate => "streak_update",
        }
    }
}

/// Descriptor of an unlocked achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// FIFO of unlocks waiting to be shown, at most one per interval.
#[derive(Debug)]
pub struct AchievementQueue {
    pending: VecDeque<Achievement>,
    interval: Duration,
    last_shown: Option<Instant>,
}

impl AchievementQueue {
    pub fn new(interval: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            interval,
            last_shown: None,
        }
    }

    /// Queue unlocks, skipping any already waiting.
    pub fn enqueue(&mut self, unlocked: Vec<Achievement>) {
        for achievement in unlocked {
            if !self.pending.iter().any(|a| a.id == achievement.id) {
                self.pending.push_back(achievement);
            }
        }
    }

    /// Next achievement to display, if one is waiting and the interval has
    /// passed since the last one.
    pub fn next_due(&mut self, now: Instant) -> Option<Achievement> {
        if let Some(last) = self.last_shown {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        let next = self.pending.pop_front()?;
        self.last_shown = Some(now);
        Some(next)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for AchievementQueue {
    fn default() -> Self {
        Self::new(Duration::from_millis(4000))
    }
}
