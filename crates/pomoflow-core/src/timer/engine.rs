//! Session timer engine.
//!
//! A tick-driven state machine. It does not use internal threads - the
//! caller invokes `tick()` once per elapsed second while the timer runs.
//!
//! ## State Transitions
//!
//! ```text
//! Idle <-> Running <-> Paused
//!            |
//!            v  (countdown hits zero)
//!        Completed --acknowledge--> Idle (next mode staged)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Durations::default());
//! engine.start();
//! // Once per second:
//! if let Some(Event::TimerCompleted { completion }) = engine.tick() {
//!     // hand `completion` to the coordinator, then:
//!     engine.acknowledge_completion();
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::display;
use super::mode::{Durations, TimerMode};
use crate::events::{Completion, CompletionKind, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Countdown reached zero and the completion has not been consumed yet.
    Completed,
}

/// Core timer engine.
///
/// Owns the session exclusively. Countdown progress is process-lifetime
/// state and is never persisted.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    /// Snapshot applied at the next mode load.
    durations: Durations,
    mode: TimerMode,
    state: TimerState,
    remaining_secs: u64,
    /// Duration loaded for the current mode; upper bound of `remaining_secs`.
    total_secs: u64,
    pomodoros_in_cycle: u32,
    selected_task_id: Option<String>,
    last_completed_mode: Option<TimerMode>,
    sequence: u64,
    pending: Option<Completion>,
}

impl TimerEngine {
    /// Create an idle engine in Focus mode with the full focus duration loaded.
    pub fn new(durations: Durations) -> Self {
        let total_secs = durations.duration_for(TimerMode::Focus);
        Self {
            durations,
            mode: TimerMode::Focus,
            state: TimerState::Idle,
            remaining_secs: total_secs,
            total_secs,
            pomodoros_in_cycle: 0,
            selected_task_id: None,
            last_completed_mode: None,
            sequence: 0,
            pending: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn pomodoros_in_cycle(&self) -> u32 {
        self.pomodoros_in_cycle
    }

    pub fn selected_task_id(&self) -> Option<&str> {
        self.selected_task_id.as_deref()
    }

    pub fn last_completed_mode(&self) -> Option<TimerMode> {
        self.last_completed_mode
    }

    pub fn durations(&self) -> &Durations {
        &self.durations
    }

    /// The unconsumed natural completion, visible only while `Completed`.
    pub fn pending_completion(&self) -> Option<&Completion> {
        if self.state == TimerState::Completed {
            self.pending.as_ref()
        } else {
            None
        }
    }

    pub fn display_time(&self) -> String {
        display::format_mm_ss(self.remaining_secs)
    }

    /// 0.0 .. 100.0 elapsed share of the current session.
    pub fn progress(&self) -> f64 {
        display::progress_pct(self.remaining_secs, self.total_secs)
    }

    pub fn mode_label(&self) -> &'static str {
        self.mode.label()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            mode: self.mode,
            mode_label: self.mode_label().to_string(),
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            display_time: self.display_time(),
            progress_pct: self.progress(),
            pomodoros_in_cycle: self.pomodoros_in_cycle,
            selected_task_id: self.selected_task_id.clone(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Running => None,
            TimerState::Paused => {
                self.state = TimerState::Running;
                tracing::debug!(remaining_secs = self.remaining_secs, "timer resumed");
                Some(Event::TimerResumed {
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            TimerState::Idle | TimerState::Completed => {
                // Starting straight out of Completed consumes the completion.
                self.pending = None;
                self.state = TimerState::Running;
                tracing::debug!(mode = ?self.mode, remaining_secs = self.remaining_secs, "timer started");
                Some(Event::TimerStarted {
                    mode: self.mode,
                    duration_secs: self.total_secs,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.state = TimerState::Paused;
        tracing::debug!(remaining_secs = self.remaining_secs, "timer paused");
        Some(Event::TimerPaused {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Back to Idle with the current mode's full duration. Mode is unchanged.
    pub fn reset(&mut self) -> Option<Event> {
        self.state = TimerState::Idle;
        self.pending = None;
        self.load_mode(self.mode);
        Some(Event::TimerReset {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Jump to the next mode using the normal cadence rule.
    ///
    /// The returned completion is tagged `Skipped` and must never be
    /// counted as a finished pomodoro.
    ///
    /// In `Completed` the next mode is already staged, so skip only
    /// acknowledges the pending completion and returns `None`.
    pub fn skip(&mut self) -> Option<Event> {
        if self.state == TimerState::Completed {
            self.acknowledge_completion();
            return None;
        }
        let from = self.mode;
        let duration_secs = self.total_secs;
        self.pending = None;
        self.advance();
        self.state = TimerState::Idle;
        self.sequence += 1;
        tracing::debug!(from = ?from, to = ?self.mode, "session skipped");
        Some(Event::TimerSkipped {
            completion: Completion {
                sequence: self.sequence,
                kind: CompletionKind::Skipped,
                completed_mode: from,
                next_mode: self.mode,
                task_id: self.selected_task_id.clone(),
                duration_secs,
                at: Utc::now(),
            },
        })
    }

    /// Manual override: load `mode` with its full duration, Idle.
    pub fn set_mode(&mut self, mode: TimerMode) -> Option<Event> {
        self.state = TimerState::Idle;
        self.pending = None;
        self.load_mode(mode);
        Some(Event::ModeChanged {
            mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Call once per elapsed second. Returns `Some(Event::TimerCompleted)`
    /// when the countdown reaches zero; the next mode is already loaded.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return None;
        }

        let finished = self.mode;
        let duration_secs = self.total_secs;
        self.last_completed_mode = Some(finished);
        self.advance();
        self.state = TimerState::Completed;
        self.sequence += 1;

        let completion = Completion {
            sequence: self.sequence,
            kind: CompletionKind::Natural,
            completed_mode: finished,
            next_mode: self.mode,
            task_id: self.selected_task_id.clone(),
            duration_secs,
            at: Utc::now(),
        };
        tracing::info!(
            completed = ?finished,
            next = ?self.mode,
            cycle = self.pomodoros_in_cycle,
            "session completed"
        );
        self.pending = Some(completion.clone());
        Some(Event::TimerCompleted { completion })
    }

    /// Mark the pending completion as consumed: Completed -> Idle.
    ///
    /// Returns `false` if there was nothing to acknowledge.
    pub fn acknowledge_completion(&mut self) -> bool {
        if self.state != TimerState::Completed {
            return false;
        }
        self.state = TimerState::Idle;
        self.pending = None;
        true
    }

    /// Store a new duration snapshot for the next mode load.
    ///
    /// The running countdown is never resized. An untouched idle session
    /// picks up the new duration right away.
    pub fn set_durations(&mut self, durations: Durations) {
        self.durations = durations;
        if self.state == TimerState::Idle && self.remaining_secs == self.total_secs {
            self.load_mode(self.mode);
        }
    }

    pub fn set_selected_task(&mut self, task_id: Option<String>) {
        self.selected_task_id = task_id;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn load_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.total_secs = self.durations.duration_for(mode);
        self.remaining_secs = self.total_secs;
    }

    fn advance(&mut self) {
        let next = match self.mode {
            TimerMode::Focus => {
                self.pomodoros_in_cycle += 1;
                let next = self.durations.next_mode(TimerMode::Focus, self.pomodoros_in_cycle);
                if next == TimerMode::LongBreak {
                    self.pomodoros_in_cycle = 0;
                }
                next
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };
        self.load_mode(next);
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(Durations::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn short() -> Durations {
        Durations {
            focus_secs: 3,
            short_break_secs: 2,
            long_break_secs: 4,
            long_break_after: 4,
        }
    }

    fn run_to_completion(engine: &mut TimerEngine) -> Completion {
        engine.start();
        loop {
            if let Some(Event::TimerCompleted { completion }) = engine.tick() {
                engine.acknowledge_completion();
                return completion;
            }
        }
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::default();
        assert_eq!(engine.state(), TimerState::Idle);

        assert!(matches!(engine.start(), Some(Event::TimerStarted { .. })));
        assert_eq!(engine.state(), TimerState::Running);
        assert!(engine.start().is_none());

        assert!(engine.pause().is_some());
        assert_eq!(engine.state(), TimerState::Paused);
        assert!(engine.pause().is_none());

        assert!(matches!(engine.start(), Some(Event::TimerResumed { .. })));
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn pause_then_start_keeps_remaining() {
        let mut engine = TimerEngine::default();
        engine.start();
        for _ in 0..10 {
            engine.tick();
        }
        engine.pause();
        let before = engine.remaining_secs();
        // Ticks while paused are ignored.
        for _ in 0..5 {
            assert!(engine.tick().is_none());
        }
        engine.start();
        assert_eq!(engine.remaining_secs(), before);
        assert_eq!(before, 25 * 60 - 10);
    }

    #[test]
    fn tick_while_idle_is_noop() {
        let mut engine = TimerEngine::default();
        assert!(engine.tick().is_none());
        assert_eq!(engine.remaining_secs(), 25 * 60);
        assert_eq!(engine.state(), TimerState::Idle);
    }

    #[test]
    fn completion_stages_next_mode_atomically() {
        let mut engine = TimerEngine::new(short());
        engine.start();
        engine.tick();
        engine.tick();
        let event = engine.tick();
        let completion = event.and_then(|e| e.completion().cloned()).unwrap();

        assert_eq!(engine.state(), TimerState::Completed);
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.remaining_secs(), 2);
        assert_eq!(engine.last_completed_mode(), Some(TimerMode::Focus));
        assert_eq!(completion.completed_mode, TimerMode::Focus);
        assert_eq!(completion.next_mode, TimerMode::ShortBreak);
        assert!(completion.is_natural());
        assert_eq!(engine.pending_completion(), Some(&completion));

        assert!(engine.acknowledge_completion());
        assert_eq!(engine.state(), TimerState::Idle);
        assert!(engine.pending_completion().is_none());
        assert!(!engine.acknowledge_completion());
    }

    #[test]
    fn fourth_focus_goes_to_long_break() {
        let mut engine = TimerEngine::new(short());
        for round in 1..=3 {
            let c = run_to_completion(&mut engine);
            assert_eq!(c.next_mode, TimerMode::ShortBreak, "round {round}");
            let c = run_to_completion(&mut engine);
            assert_eq!(c.next_mode, TimerMode::Focus);
        }
        assert_eq!(engine.pomodoros_in_cycle(), 3);

        let c = run_to_completion(&mut engine);
        assert_eq!(c.next_mode, TimerMode::LongBreak);
        assert_eq!(engine.mode(), TimerMode::LongBreak);
        assert_eq!(engine.pomodoros_in_cycle(), 0);

        let c = run_to_completion(&mut engine);
        assert_eq!(c.completed_mode, TimerMode::LongBreak);
        assert_eq!(engine.mode(), TimerMode::Focus);
    }

    #[test]
    fn skip_advances_without_completing() {
        let mut engine = TimerEngine::new(short());
        engine.start();
        engine.tick();
        let event = engine.skip().unwrap();
        let completion = event.completion().unwrap();
        assert_eq!(completion.kind, CompletionKind::Skipped);
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.remaining_secs(), 2);
        assert_eq!(engine.pomodoros_in_cycle(), 1);
        assert!(engine.last_completed_mode().is_none());
        assert!(engine.pending_completion().is_none());
    }

    #[test]
    fn reset_keeps_mode_and_reloads_duration() {
        let mut engine = TimerEngine::new(short());
        engine.skip();
        engine.start();
        engine.tick();
        engine.reset();
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.remaining_secs(), 2);
        assert_eq!(engine.state(), TimerState::Idle);
    }

    #[test]
    fn set_mode_cancels_countdown() {
        let mut engine = TimerEngine::default();
        engine.start();
        engine.tick();
        engine.set_mode(TimerMode::LongBreak);
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.mode(), TimerMode::LongBreak);
        assert_eq!(engine.remaining_secs(), 15 * 60);
        assert!(engine.tick().is_none());
    }

    #[test]
    fn durations_do_not_resize_running_session() {
        let mut engine = TimerEngine::default();
        engine.start();
        engine.tick();
        engine.set_durations(Durations::from_minutes(50, 10, 20, 4));
        assert_eq!(engine.remaining_secs(), 25 * 60 - 1);
        assert_eq!(engine.total_secs(), 25 * 60);
        engine.reset();
        assert_eq!(engine.remaining_secs(), 50 * 60);
    }

    #[test]
    fn untouched_idle_session_picks_up_new_durations() {
        let mut engine = TimerEngine::default();
        engine.set_durations(Durations::from_minutes(30, 5, 15, 4));
        assert_eq!(engine.remaining_secs(), 30 * 60);
    }

    #[test]
    fn display_surface() {
        let mut engine = TimerEngine::default();
        assert_eq!(engine.display_time(), "25:00");
        assert_eq!(engine.progress(), 0.0);
        assert_eq!(engine.mode_label(), "Focus");
        engine.start();
        for _ in 0..(5 * 60) {
            engine.tick();
        }
        assert_eq!(engine.display_time(), "20:00");
        assert!((engine.progress() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = TimerEngine::default();
        match engine.snapshot() {
            Event::StateSnapshot {
                state,
                mode,
                remaining_secs,
                display_time,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(mode, TimerMode::Focus);
                assert_eq!(remaining_secs, 25 * 60);
                assert_eq!(display_time, "25:00");
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }

    #[test]
    fn skip_while_completed_only_acknowledges() {
        let mut engine = TimerEngine::new(short());
        engine.start();
        while engine.state() == TimerState::Running {
            engine.tick();
        }
        assert_eq!(engine.state(), TimerState::Completed);

        assert!(engine.skip().is_none());
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.pomodoros_in_cycle(), 1);
        assert!(engine.pending_completion().is_none());
    }

    #[test]
    fn every_focus_is_long_break_when_cycle_is_one() {
        let mut engine = TimerEngine::new(Durations {
            long_break_after: 1,
            ..short()
        });
        for _ in 0..3 {
            let c = run_to_completion(&mut engine);
            assert_eq!(c.next_mode, TimerMode::LongBreak);
            assert_eq!(engine.pomodoros_in_cycle(), 0);
            run_to_completion(&mut engine);
            assert_eq!(engine.mode(), TimerMode::Focus);
        }
    }

    proptest! {
        #[test]
        fn focus_completion_follows_cadence(lba in 1u32..=10, sessions in 1usize..25) {
            let mut engine = TimerEngine::new(Durations {
                long_break_after: lba,
                ..short()
            });
            for _ in 0..sessions {
                prop_assert_eq!(engine.mode(), TimerMode::Focus);
                let before = engine.pomodoros_in_cycle();
                let c = run_to_completion(&mut engine);
                if (before + 1) % lba == 0 {
                    prop_assert_eq!(c.next_mode, TimerMode::LongBreak);
                    prop_assert_eq!(engine.pomodoros_in_cycle(), 0);
                } else {
                    prop_assert_eq!(c.next_mode, TimerMode::ShortBreak);
                    prop_assert_eq!(engine.pomodoros_in_cycle(), before + 1);
                }
                let after_break = run_to_completion(&mut engine);
                prop_assert_eq!(after_break.next_mode, TimerMode::Focus);
            }
        }

        #[test]
        fn n_ticks_count_down_exactly(d in 2u64..600, frac in 0.0f64..1.0) {
            let n = ((d - 1) as f64 * frac) as u64;
            let mut engine = TimerEngine::new(Durations {
                focus_secs: d,
                short_break_secs: 60,
                long_break_secs: 60,
                long_break_after: 4,
            });
            engine.start();
            for _ in 0..n {
                prop_assert!(engine.tick().is_none());
            }
            prop_assert_eq!(engine.remaining_secs(), d - n);
            prop_assert_eq!(engine.state(), TimerState::Running);
        }

        #[test]
        fn remaining_never_exceeds_loaded_duration(ops in proptest::collection::vec(0u8..6, 0..200)) {
            let mut engine = TimerEngine::new(short());
            for op in ops {
                match op {
                    0 => { engine.start(); }
                    1 => { engine.pause(); }
                    2 => { engine.reset(); }
                    3 => { engine.skip(); }
                    4 => { engine.acknowledge_completion(); }
                    _ => { engine.tick(); }
                }
                prop_assert!(engine.remaining_secs() <= engine.total_secs());
                prop_assert_eq!(engine.total_secs(), engine.durations().duration_for(engine.mode()));
            }
        }
    }
}
