//! Completion coordinator.
//!
//! Turns a finished session into its side effects, in a fixed order:
//!
//! 1. decide whether a focus session just ended
//! 2. play a sound
//! 3. show a notification
//! 4. count the pomodoro (day totals and the selected task)
//! 5. schedule an automatic start of the next mode
//! 6. ask for achievement evaluation
//!
//! Each step stands alone: a failing adapter is logged and the next step
//! still runs. A completion is handled at most once.

use std::time::{Duration, Instant};

use crate::achievements::{AchievementQueue, AchievementTrigger};
use crate::adapters::{Adapters, NotificationPermission, SoundId};
use crate::events::{Completion, CompletionKind, Event};
use crate::settings::Settings;
use crate::stats::StatsStore;
use crate::task::TaskStore;
use crate::timer::{TimerEngine, TimerMode, TimerState};

/// Everything a completion may touch.
pub struct CompletionContext<'a> {
    pub settings: &'a Settings,
    pub tasks: &'a mut TaskStore,
    pub stats: &'a mut StatsStore,
    pub adapters: &'a Adapters,
    pub achievements: &'a mut AchievementQueue,
}

/// What a handled completion actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionReport {
    pub sequence: u64,
    pub sound_played: bool,
    pub notified: bool,
    pub pomodoro_counted: bool,
    /// Task that received progress and its new count.
    pub task_progress: Option<(String, u32)>,
    pub auto_start: Option<TimerMode>,
    pub achievements_unlocked: usize,
}

#[derive(Debug, Clone, Copy)]
struct PendingAutoStart {
    mode: TimerMode,
    due: Instant,
    sequence: u64,
}

#[derive(Debug)]
pub struct CompletionCoordinator {
    /// Set once the current Completed period has been picked up.
    latched: bool,
    last_handled: Option<u64>,
    auto_start: Option<PendingAutoStart>,
    auto_start_delay: Duration,
}

/// Notification text for a finished session.
pub fn notification_text(completion: &Completion) -> (&'static str, &'static str) {
    match (completion.completed_mode, completion.next_mode) {
        (TimerMode::Focus, TimerMode::LongBreak) => (
            "Focus session complete",
            "Great work! Time for a long break.",
        ),
        (TimerMode::Focus, _) => ("Focus session complete", "Time for a short break."),
        _ => ("Break is over", "Ready to focus again?"),
    }
}

impl CompletionCoordinator {
    pub fn new(auto_start_delay: Duration) -> Self {
        Self {
            latched: false,
            last_handled: None,
            auto_start: None,
            auto_start_delay,
        }
    }

    /// Pick up the engine's pending completion, once per Completed period.
    ///
    /// Call this as often as you like; the latch clears only after the
    /// engine leaves `Completed`.
    pub fn observe(&mut self, engine: &TimerEngine) -> Option<Completion> {
        if engine.state() != TimerState::Completed {
            self.latched = false;
            return None;
        }
        if self.latched {
            return None;
        }
        let completion = engine.pending_completion()?.clone();
        self.latched = true;
        Some(completion)
    }

    /// Run the side effects of `completion`.
    ///
    /// Returns `None` if this completion, or a later one, was already
    /// handled; engine sequence numbers only grow. Skips only
    /// cancel a pending auto-start.
    pub fn handle(
        &mut self,
        completion: &Completion,
        ctx: CompletionContext<'_>,
        now: Instant,
    ) -> Option<CompletionReport> {
        if self.last_handled.is_some_and(|last| completion.sequence <= last) {
            tracing::debug!(sequence = completion.sequence, "completion already handled");
            return None;
        }
        self.last_handled = Some(completion.sequence);

        let mut report = CompletionReport {
            sequence: completion.sequence,
            ..Default::default()
        };

        if completion.kind == CompletionKind::Skipped {
            self.cancel_auto_start();
            return Some(report);
        }

        let CompletionContext {
            settings,
            tasks,
            stats,
            adapters,
            achievements,
        } = ctx;

        // 1
        let was_focus = completion.was_focus();

        // 2
        if settings.sound_enabled {
            let sound = if was_focus {
                SoundId::FocusComplete
            } else {
                SoundId::BreakComplete
            };
            match adapters.sound.play(sound, settings.sound_volume) {
                Ok(()) => report.sound_played = true,
                Err(e) => tracing::warn!(error = %e, "sound playback failed"),
            }
        }

        // 3
        if settings.notifications_enabled
            && adapters.notifier.permission() == NotificationPermission::Granted
        {
            let (title, body) = notification_text(completion);
            match adapters.notifier.show(title, body) {
                Ok(()) => report.notified = true,
                Err(e) => tracing::warn!(error = %e, "notification failed"),
            }
        }

        // 4
        let mut first_today = false;
        if was_focus {
            let count = stats.increment_pomodoros();
            stats.add_focus_minutes(completion.focus_minutes());
            report.pomodoro_counted = true;
            first_today = count == 1;

            if let Some(task_id) = completion.task_id.as_deref() {
                match tasks.increment_pomodoro(task_id) {
                    Ok(n) => report.task_progress = Some((task_id.to_string(), n)),
                    Err(e) => tracing::warn!(task_id, error = %e, "could not credit task"),
                }
            }
        }

        // 5
        if settings.auto_start_for(completion.next_mode) {
            self.auto_start = Some(PendingAutoStart {
                mode: completion.next_mode,
                due: now + self.auto_start_delay,
                sequence: completion.sequence,
            });
            report.auto_start = Some(completion.next_mode);
            tracing::info!(mode = ?completion.next_mode, "auto-start scheduled");
        }

        // 6
        let mut triggers = vec![AchievementTrigger::SessionComplete];
        if first_today {
            triggers.push(AchievementTrigger::StreakUpdate);
        }
        for trigger in triggers {
            match adapters.achievements.evaluate(trigger) {
                Ok(unlocked) => {
                    report.achievements_unlocked += unlocked.len();
                    achievements.enqueue(unlocked);
                }
                Err(e) => tracing::warn!(trigger = trigger.as_str(), error = %e, "achievement evaluation failed"),
            }
        }

        Some(report)
    }

    pub fn auto_start_delay(&self) -> Duration {
        self.auto_start_delay
    }

    /// Mode and due time of the scheduled auto-start, if any.
    pub fn pending_auto_start(&self) -> Option<(TimerMode, Instant)> {
        self.auto_start.map(|p| (p.mode, p.due))
    }

    /// Drop any scheduled auto-start. Returns whether one was pending.
    pub fn cancel_auto_start(&mut self) -> bool {
        match self.auto_start.take() {
            Some(p) => {
                tracing::debug!(sequence = p.sequence, "auto-start cancelled");
                true
            }
            None => false,
        }
    }

    /// Fire a due auto-start if the engine is still idle in the scheduled
    /// mode; otherwise the schedule is discarded.
    pub fn poll_auto_start(&mut self, engine: &mut TimerEngine, now: Instant) -> Option<Event> {
        if now < self.auto_start.as_ref()?.due {
            return None;
        }
        let pending = self.auto_start.take()?;
        if engine.state() == TimerState::Idle && engine.mode() == pending.mode {
            tracing::info!(mode = ?pending.mode, "auto-starting");
            engine.start()
        } else {
            tracing::debug!(
                state = ?engine.state(),
                mode = ?engine.mode(),
                "auto-start condition no longer holds"
            );
            None
        }
    }
}

impl Default for CompletionCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::Achievement;
    use crate::adapters::{AchievementEvaluator, Notifier, SoundPlayer};
    use crate::error::DispatchError;
    use crate::timer::Durations;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        sounds: Vec<SoundId>,
        notes: Vec<String>,
        triggers: Vec<AchievementTrigger>,
    }

    struct Recorder(Rc<RefCell<Calls>>, bool);

    impl SoundPlayer for Recorder {
        fn play(&self, sound: SoundId, _volume: u32) -> Result<(), DispatchError> {
            if self.1 {
                return Err(DispatchError::Failed("no device".into()));
            }
            self.0.borrow_mut().sounds.push(sound);
            Ok(())
        }
    }

    impl Notifier for Recorder {
        fn permission(&self) -> NotificationPermission {
            NotificationPermission::Granted
        }
        fn request_permission(&mut self) -> NotificationPermission {
            NotificationPermission::Granted
        }
        fn show(&self, title: &str, _body: &str) -> Result<(), DispatchError> {
            self.0.borrow_mut().notes.push(title.to_string());
            Ok(())
        }
    }

    impl AchievementEvaluator for Recorder {
        fn evaluate(&self, trigger: AchievementTrigger) -> Result<Vec<Achievement>, DispatchError> {
            self.0.borrow_mut().triggers.push(trigger);
            Ok(vec![Achievement {
                id: format!("{}-badge", trigger.as_str()),
                name: "Badge".into(),
                description: String::new(),
            }])
        }
    }

    struct Fixture {
        calls: Rc<RefCell<Calls>>,
        adapters: Adapters,
        settings: Settings,
        tasks: TaskStore,
        stats: StatsStore,
        queue: AchievementQueue,
        engine: TimerEngine,
        coordinator: CompletionCoordinator,
    }

    impl Fixture {
        fn new(sound_fails: bool) -> Self {
            let calls = Rc::new(RefCell::new(Calls::default()));
            let adapters = Adapters {
                notifier: Box::new(Recorder(calls.clone(), false)),
                sound: Box::new(Recorder(calls.clone(), sound_fails)),
                achievements: Box::new(Recorder(calls.clone(), false)),
            };
            Self {
                calls,
                adapters,
                settings: Settings::default(),
                tasks: TaskStore::new(),
                stats: StatsStore::new(NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()),
                queue: AchievementQueue::default(),
                engine: TimerEngine::new(Durations {
                    focus_secs: 2,
                    short_break_secs: 1,
                    long_break_secs: 3,
                    long_break_after: 4,
                }),
                coordinator: CompletionCoordinator::new(Duration::from_millis(1500)),
            }
        }

        fn finish_session(&mut self) {
            self.engine.start();
            while self.engine.state() == TimerState::Running {
                self.engine.tick();
            }
        }

        fn handle(&mut self, c: &Completion, now: Instant) -> Option<CompletionReport> {
            self.coordinator.handle(
                c,
                CompletionContext {
                    settings: &self.settings,
                    tasks: &mut self.tasks,
                    stats: &mut self.stats,
                    adapters: &self.adapters,
                    achievements: &mut self.queue,
                },
                now,
            )
        }
    }

    #[test]
    fn focus_completion_runs_every_step() {
        let mut f = Fixture::new(false);
        let task_id = f.tasks.add("write", 1).unwrap().id.clone();
        f.engine.set_selected_task(Some(task_id.clone()));
        f.finish_session();

        let c = f.coordinator.observe(&f.engine).unwrap();
        let report = f.handle(&c, Instant::now()).unwrap();

        assert!(report.sound_played);
        assert!(report.notified);
        assert!(report.pomodoro_counted);
        assert_eq!(report.task_progress, Some((task_id.clone(), 1)));
        assert_eq!(report.auto_start, None);
        assert_eq!(f.stats.today().pomodoros_completed, 1);
        assert_eq!(f.stats.today().total_focus_time_minutes, 1);

        let calls = f.calls.borrow();
        assert_eq!(calls.sounds, vec![SoundId::FocusComplete]);
        assert_eq!(calls.notes, vec!["Focus session complete".to_string()]);
        assert_eq!(
            calls.triggers,
            vec![AchievementTrigger::SessionComplete, AchievementTrigger::StreakUpdate]
        );
        assert_eq!(f.queue.len(), 2);
    }

    #[test]
    fn repeated_observation_handles_once() {
        let mut f = Fixture::new(false);
        f.finish_session();

        let first = f.coordinator.observe(&f.engine);
        assert!(first.is_some());
        assert!(f.coordinator.observe(&f.engine).is_none());
        assert!(f.coordinator.observe(&f.engine).is_none());

        let c = first.unwrap();
        assert!(f.handle(&c, Instant::now()).is_some());
        assert!(f.handle(&c, Instant::now()).is_none());
        assert_eq!(f.stats.today().pomodoros_completed, 1);
        assert_eq!(f.calls.borrow().sounds.len(), 1);

        // Leaving Completed clears the latch for the next session.
        f.engine.acknowledge_completion();
        assert!(f.coordinator.observe(&f.engine).is_none());
        f.finish_session();
        let next = f.coordinator.observe(&f.engine).unwrap();
        assert_eq!(next.completed_mode, TimerMode::ShortBreak);
        assert!(f.handle(&next, Instant::now()).is_some());
    }

    #[test]
    fn stale_completion_is_not_replayed() {
        let mut f = Fixture::new(false);
        f.finish_session();
        let first = f.coordinator.observe(&f.engine).unwrap();
        assert!(f.handle(&first, Instant::now()).is_some());
        f.engine.acknowledge_completion();

        f.engine.start();
        let skipped = f.engine.skip().unwrap().completion().unwrap().clone();
        assert!(skipped.sequence > first.sequence);
        assert!(f.handle(&skipped, Instant::now()).is_some());

        assert!(f.handle(&first, Instant::now()).is_none());
        assert_eq!(f.stats.today().pomodoros_completed, 1);
        assert_eq!(f.calls.borrow().sounds.len(), 1);
    }

    #[test]
    fn break_completion_does_not_count() {
        let mut f = Fixture::new(false);
        f.engine.set_mode(TimerMode::ShortBreak);
        f.finish_session();
        let c = f.coordinator.observe(&f.engine).unwrap();
        let report = f.handle(&c, Instant::now()).unwrap();
        assert!(!report.pomodoro_counted);
        assert_eq!(f.stats.today().pomodoros_completed, 0);
        assert_eq!(f.calls.borrow().sounds, vec![SoundId::BreakComplete]);
        assert_eq!(f.calls.borrow().notes, vec!["Break is over".to_string()]);
    }

    #[test]
    fn skip_counts_nothing() {
        let mut f = Fixture::new(false);
        let task_id = f.tasks.add("write", 1).unwrap().id.clone();
        f.engine.set_selected_task(Some(task_id.clone()));
        f.engine.start();
        let event = f.engine.skip().unwrap();
        let c = event.completion().unwrap().clone();

        let report = f.handle(&c, Instant::now()).unwrap();
        assert!(!report.pomodoro_counted);
        assert!(report.task_progress.is_none());
        assert_eq!(f.stats.today().pomodoros_completed, 0);
        assert_eq!(f.tasks.get(&task_id).unwrap().completed_pomodoros, 0);
        assert!(f.calls.borrow().sounds.is_empty());
        assert!(f.calls.borrow().triggers.is_empty());
    }

    #[test]
    fn failing_sound_does_not_block_later_steps() {
        let mut f = Fixture::new(true);
        f.finish_session();
        let c = f.coordinator.observe(&f.engine).unwrap();
        let report = f.handle(&c, Instant::now()).unwrap();
        assert!(!report.sound_played);
        assert!(report.notified);
        assert!(report.pomodoro_counted);
    }

    #[test]
    fn disabled_sound_and_notifications_are_skipped() {
        let mut f = Fixture::new(false);
        f.settings.sound_enabled = false;
        f.settings.notifications_enabled = false;
        f.finish_session();
        let c = f.coordinator.observe(&f.engine).unwrap();
        let report = f.handle(&c, Instant::now()).unwrap();
        assert!(!report.sound_played && !report.notified);
        assert!(report.pomodoro_counted);
        assert!(f.calls.borrow().sounds.is_empty());
    }

    #[test]
    fn removed_task_is_logged_not_fatal() {
        let mut f = Fixture::new(false);
        f.engine.set_selected_task(Some("gone".into()));
        f.finish_session();
        let c = f.coordinator.observe(&f.engine).unwrap();
        let report = f.handle(&c, Instant::now()).unwrap();
        assert!(report.pomodoro_counted);
        assert!(report.task_progress.is_none());
    }

    #[test]
    fn auto_start_fires_after_delay() {
        let mut f = Fixture::new(false);
        f.settings.auto_start_break = true;
        f.finish_session();
        let c = f.coordinator.observe(&f.engine).unwrap();
        let t0 = Instant::now();
        let report = f.handle(&c, t0).unwrap();
        assert_eq!(report.auto_start, Some(TimerMode::ShortBreak));
        f.engine.acknowledge_completion();

        assert!(f
            .coordinator
            .poll_auto_start(&mut f.engine, t0 + Duration::from_millis(500))
            .is_none());
        assert_eq!(f.engine.state(), TimerState::Idle);

        let event = f
            .coordinator
            .poll_auto_start(&mut f.engine, t0 + Duration::from_millis(1500));
        assert!(matches!(event, Some(Event::TimerStarted { mode: TimerMode::ShortBreak, .. })));
        assert_eq!(f.engine.state(), TimerState::Running);
        assert!(f.coordinator.pending_auto_start().is_none());
    }

    #[test]
    fn auto_start_dropped_when_user_intervenes() {
        let mut f = Fixture::new(false);
        f.settings.auto_start_break = true;
        f.finish_session();
        let c = f.coordinator.observe(&f.engine).unwrap();
        let t0 = Instant::now();
        f.handle(&c, t0).unwrap();
        f.engine.acknowledge_completion();

        // User switches mode by hand before the delay passes.
        f.engine.set_mode(TimerMode::Focus);
        assert!(f
            .coordinator
            .poll_auto_start(&mut f.engine, t0 + Duration::from_secs(5))
            .is_none());
        assert_eq!(f.engine.state(), TimerState::Idle);
        assert!(f.coordinator.pending_auto_start().is_none());
    }

    #[test]
    fn auto_start_next_session_applies_to_focus() {
        let mut f = Fixture::new(false);
        f.settings.auto_start_next_session = true;
        f.engine.set_mode(TimerMode::ShortBreak);
        f.finish_session();
        let c = f.coordinator.observe(&f.engine).unwrap();
        let report = f.handle(&c, Instant::now()).unwrap();
        assert_eq!(report.auto_start, Some(TimerMode::Focus));
        assert!(f.coordinator.cancel_auto_start());
        assert!(!f.coordinator.cancel_auto_start());
    }

    #[test]
    fn notification_text_varies() {
        let mut f = Fixture::new(false);
        for _ in 0..3 {
            f.finish_session();
            f.engine.acknowledge_completion();
            f.finish_session();
            f.engine.acknowledge_completion();
        }
        f.finish_session();
        let c = f.engine.pending_completion().unwrap();
        assert_eq!(c.next_mode, TimerMode::LongBreak);
        assert_eq!(notification_text(c).1, "Great work! Time for a long break.");
    }
}
