//! # pomoflow Core Library
//!
//! Business logic for the pomoflow focus timer: a work/break session
//! engine, task tracking and daily statistics. Front ends (the CLI in this
//! workspace) drive it; nothing in here blocks or spawns threads.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven state machine; the caller invokes
//!   `tick()` once per second while it runs
//! - **Coordinator**: turns a finished session into sound, notification,
//!   statistics, task progress, auto-start and achievement triggers
//! - **Stores**: settings, tasks and statistics, each persisted as JSON
//!   through a failure-tolerant key-value layer
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`CompletionCoordinator`]: At-most-once completion side effects
//! - [`FocusApp`]: Facade owning all state, with injected [`Adapters`]
//! - [`Persistence`]: Key-value persistence over [`SqliteStore`] or [`MemoryStore`]

pub mod achievements;
pub mod adapters;
pub mod app;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use achievements::{Achievement, AchievementQueue, AchievementTrigger};
pub use adapters::{
    AchievementEvaluator, Adapters, NotificationPermission, Notifier, SoundId, SoundPlayer,
};
pub use app::{AppOptions, FocusApp, PollOutcome};
pub use coordinator::{CompletionContext, CompletionCoordinator, CompletionReport};
pub use error::{ConfigError, CoreError, DispatchError, StorageError, ValidationError};
pub use events::{Completion, CompletionKind, Event};
pub use settings::{Settings, SettingsPatch, SettingsStore, Theme};
pub use stats::{DailyStats, PeriodSummary, StatsStore};
pub use storage::{AppConfig, KeyValueStore, MemoryStore, Persistence, SqliteStore};
pub use task::{Task, TaskPatch, TaskStore, ToggleOutcome};
pub use timer::{Durations, TimerEngine, TimerMode, TimerState};
