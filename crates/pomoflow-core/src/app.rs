//! Application facade.
//!
//! [`FocusApp`] owns every store, the engine and the coordinator, persists
//! after each mutation, and is what front ends drive. It is single-threaded:
//! the caller supplies a one-second cadence through [`FocusApp::tick`] and
//! polls deferred work through [`FocusApp::poll`].

use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::achievements::{Achievement, AchievementQueue, AchievementTrigger};
use crate::adapters::{Adapters, NotificationPermission};
use crate::coordinator::{CompletionContext, CompletionCoordinator, CompletionReport};
use crate::error::Result;
use crate::events::Event;
use crate::settings::{Settings, SettingsPatch, SettingsStore};
use crate::stats::{local_today, DailyStats, PeriodSummary, StatsStore};
use crate::storage::{AppConfig, Persistence};
use crate::task::{Task, TaskPatch, TaskStore, ToggleOutcome};
use crate::timer::{TimerEngine, TimerMode};

/// Timing knobs for the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppOptions {
    pub auto_start_delay: Duration,
    pub achievement_interval: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for AppOptions {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            auto_start_delay: cfg.auto_start_delay(),
            achievement_interval: cfg.achievement_display_interval(),
        }
    }
}

/// Output of [`FocusApp::poll`].
#[derive(Debug, Default)]
pub struct PollOutcome {
    pub events: Vec<Event>,
    /// Achievement to display now, rate-limited.
    pub achievement: Option<Achievement>,
    /// The calendar day changed and statistics rolled over.
    pub day_rolled_over: bool,
}

pub struct FocusApp {
    persistence: Persistence,
    settings: SettingsStore,
    tasks: TaskStore,
    stats: StatsStore,
    engine: TimerEngine,
    coordinator: CompletionCoordinator,
    achievements: AchievementQueue,
    adapters: Adapters,
}

impl FocusApp {
    /// Load all stores once and build an idle engine from the settings.
    pub fn load(persistence: Persistence, mut adapters: Adapters, options: AppOptions) -> Self {
        let settings = SettingsStore::load(&persistence);
        let tasks = TaskStore::load(&persistence);
        let mut stats = StatsStore::load(&persistence);
        if stats.roll_over(local_today()) {
            stats.save(&persistence);
        }

        if settings.settings().notifications_enabled
            && adapters.notifier.permission() == NotificationPermission::Unknown
        {
            let answer = adapters.notifier.request_permission();
            tracing::debug!(permission = ?answer, "notification permission requested");
        }

        let mut engine = TimerEngine::new(settings.settings().durations());
        engine.set_selected_task(tasks.active_task_id().map(str::to_string));

        Self {
            persistence,
            settings,
            tasks,
            stats,
            engine,
            coordinator: CompletionCoordinator::new(options.auto_start_delay),
            achievements: AchievementQueue::new(options.achievement_interval),
            adapters,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn settings(&self) -> &Settings {
        self.settings.settings()
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    pub fn coordinator(&self) -> &CompletionCoordinator {
        &self.coordinator
    }

    /// Current display state for rendering.
    pub fn display(&self) -> Event {
        self.engine.snapshot()
    }

    pub fn today(&self) -> &DailyStats {
        self.stats.today()
    }

    pub fn history(&self) -> &[DailyStats] {
        self.stats.history()
    }

    pub fn week(&self) -> PeriodSummary {
        self.stats.week(local_today())
    }

    pub fn month(&self) -> PeriodSummary {
        self.stats.month(local_today())
    }

    pub fn streak(&self) -> u32 {
        self.stats.streak(local_today())
    }

    // ── Timer commands ───────────────────────────────────────────────
    //
    // Any manual command cancels a pending auto-start.

    pub fn start(&mut self) -> Option<Event> {
        self.coordinator.cancel_auto_start();
        self.engine.start()
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.coordinator.cancel_auto_start();
        self.engine.pause()
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.coordinator.cancel_auto_start();
        self.engine.reset()
    }

    pub fn set_mode(&mut self, mode: TimerMode) -> Option<Event> {
        self.coordinator.cancel_auto_start();
        self.engine.set_mode(mode)
    }

    pub fn skip(&mut self) -> Option<Event> {
        let event = self.engine.skip()?;
        if let Some(completion) = event.completion() {
            let (coordinator, ctx) = self.split();
            coordinator.handle(completion, ctx, Instant::now());
        }
        Some(event)
    }

    /// Advance the countdown by one second and process a completion if
    /// the session just ended.
    pub fn tick(&mut self, now: Instant) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(event) = self.engine.tick() {
            events.push(event);
        }
        if let Some(report) = self.process_completion(now) {
            if let Some(mode) = report.auto_start {
                events.push(Event::AutoStartScheduled {
                    mode,
                    delay_ms: self.coordinator.auto_start_delay().as_millis() as u64,
                    at: chrono::Utc::now(),
                });
            }
        }
        events
    }

    /// Deferred work: due auto-starts, achievement display, day rollover.
    pub fn poll(&mut self, now: Instant) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        if let Some(event) = self.coordinator.poll_auto_start(&mut self.engine, now) {
            outcome.events.push(event);
        }
        outcome.achievement = self.achievements.next_due(now);
        outcome.day_rolled_over = self.roll_over_day(local_today());
        outcome
    }

    fn process_completion(&mut self, now: Instant) -> Option<CompletionReport> {
        let completion = self.coordinator.observe(&self.engine)?;
        let (coordinator, ctx) = self.split();
        let report = coordinator.handle(&completion, ctx, now);
        self.engine.acknowledge_completion();
        if report.is_some() {
            self.stats.save(&self.persistence);
            self.tasks.save(&self.persistence);
        }
        report
    }

    fn split(&mut self) -> (&mut CompletionCoordinator, CompletionContext<'_>) {
        (
            &mut self.coordinator,
            CompletionContext {
                settings: self.settings.settings(),
                tasks: &mut self.tasks,
                stats: &mut self.stats,
                adapters: &self.adapters,
                achievements: &mut self.achievements,
            },
        )
    }

    // ── Task commands ────────────────────────────────────────────────

    pub fn add_task(&mut self, title: &str, estimated_pomodoros: u32) -> Result<Task> {
        let task = self.tasks.add(title, estimated_pomodoros)?.clone();
        self.tasks.save(&self.persistence);
        Ok(task)
    }

    pub fn edit_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let task = self.tasks.edit(id, patch)?.clone();
        self.tasks.save(&self.persistence);
        Ok(task)
    }

    pub fn remove_task(&mut self, id: &str) -> Result<Task> {
        let removed = self.tasks.remove(id)?;
        if self.engine.selected_task_id() == Some(id) {
            self.engine.set_selected_task(None);
        }
        self.tasks.save(&self.persistence);
        Ok(removed)
    }

    /// Flip completion. Only a flip into completed is counted in today's
    /// statistics and reported for achievement evaluation.
    pub fn toggle_task(&mut self, id: &str) -> Result<ToggleOutcome> {
        let outcome = self.tasks.toggle_completion(id)?;
        self.tasks.save(&self.persistence);
        if outcome == ToggleOutcome::Completed {
            self.stats.increment_tasks_completed();
            self.stats.save(&self.persistence);
            self.evaluate_achievements(AchievementTrigger::TaskComplete);
        }
        Ok(outcome)
    }

    pub fn select_task(&mut self, id: Option<&str>) -> Result<()> {
        self.tasks.select(id)?;
        self.engine.set_selected_task(id.map(str::to_string));
        self.tasks.save(&self.persistence);
        Ok(())
    }

    pub fn reorder_tasks(&mut self, ids: &[String]) -> Result<()> {
        self.tasks.reorder(ids)?;
        self.tasks.save(&self.persistence);
        Ok(())
    }

    fn evaluate_achievements(&mut self, trigger: AchievementTrigger) {
        match self.adapters.achievements.evaluate(trigger) {
            Ok(unlocked) => self.achievements.enqueue(unlocked),
            Err(e) => {
                tracing::warn!(trigger = trigger.as_str(), error = %e, "achievement evaluation failed")
            }
        }
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<Settings> {
        self.settings.update(patch)?;
        Ok(self.after_settings_change())
    }

    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<Settings> {
        self.settings.set(key, value)?;
        Ok(self.after_settings_change())
    }

    pub fn reset_settings(&mut self) -> Settings {
        self.settings.reset();
        self.after_settings_change()
    }

    fn after_settings_change(&mut self) -> Settings {
        let settings = self.settings.settings().clone();
        self.engine.set_durations(settings.durations());
        if settings.notifications_enabled
            && self.adapters.notifier.permission() == NotificationPermission::Unknown
        {
            self.adapters.notifier.request_permission();
        }
        self.settings.save(&self.persistence);
        settings
    }

    // ── Statistics ───────────────────────────────────────────────────

    /// Archive today explicitly and start `next_day`.
    pub fn add_day_to_history(&mut self, next_day: NaiveDate) -> bool {
        let archived = self.stats.add_day_to_history(next_day);
        if archived {
            self.stats.save(&self.persistence);
        }
        archived
    }

    /// Roll statistics over if the calendar moved past the hot record.
    pub fn roll_over_day(&mut self, today: NaiveDate) -> bool {
        let rolled = self.stats.roll_over(today);
        if rolled {
            self.stats.save(&self.persistence);
        }
        rolled
    }
}

impl std::fmt::Debug for FocusApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusApp")
            .field("engine", &self.engine)
            .field("settings", self.settings.settings())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
