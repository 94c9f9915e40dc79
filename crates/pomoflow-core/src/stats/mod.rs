//! Daily statistics with a rolling history.
//!
//! "Today" is held hot and mutated by the coordinator; earlier days live in
//! a capped history, newest first. Weekly, monthly and streak views are
//! derived on demand from `[today, ...history]`.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::storage::{keys, Persistence};

/// Maximum number of archived days.
pub const HISTORY_CAP: usize = 30;

/// Aggregate counters for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub pomodoros_completed: u32,
    pub total_focus_time_minutes: u32,
    pub tasks_completed: u32,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            pomodoros_completed: 0,
            total_focus_time_minutes: 0,
            tasks_completed: 0,
        }
    }

    pub fn has_activity(&self) -> bool {
        self.pomodoros_completed > 0 || self.tasks_completed > 0
    }
}

/// Totals over a date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub pomodoros_completed: u32,
    pub total_focus_time_minutes: u32,
    pub tasks_completed: u32,
    pub active_days: u32,
    /// Matching records, newest first.
    pub days: Vec<DailyStats>,
}

/// Current local calendar day.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsStore {
    today: DailyStats,
    #[serde(default)]
    history: Vec<DailyStats>,
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new(local_today())
    }
}

impl StatsStore {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: DailyStats::empty(today),
            history: Vec::new(),
        }
    }

    pub fn load(persistence: &Persistence) -> Self {
        let mut store: StatsStore = persistence.load(keys::STATISTICS);
        if store.history.len() > HISTORY_CAP {
            store.history.truncate(HISTORY_CAP);
        }
        store
    }

    pub fn save(&self, persistence: &Persistence) -> bool {
        persistence.save(keys::STATISTICS, self)
    }

    // ── Counters ─────────────────────────────────────────────────────

    pub fn today(&self) -> &DailyStats {
        &self.today
    }

    /// Archived days, newest first.
    pub fn history(&self) -> &[DailyStats] {
        &self.history
    }

    /// Returns the new count for today.
    pub fn increment_pomodoros(&mut self) -> u32 {
        self.today.pomodoros_completed = self.today.pomodoros_completed.saturating_add(1);
        self.today.pomodoros_completed
    }

    pub fn add_focus_minutes(&mut self, minutes: u32) {
        self.today.total_focus_time_minutes =
            self.today.total_focus_time_minutes.saturating_add(minutes);
    }

    pub fn increment_tasks_completed(&mut self) {
        self.today.tasks_completed = self.today.tasks_completed.saturating_add(1);
    }

    // ── Day rollover ─────────────────────────────────────────────────

    /// Archive today and start a fresh record for `next_day`.
    ///
    /// Does nothing (and returns `false`) when today has no activity.
    pub fn add_day_to_history(&mut self, next_day: NaiveDate) -> bool {
        if !self.today.has_activity() {
            return false;
        }
        let finished = std::mem::replace(&mut self.today, DailyStats::empty(next_day));
        tracing::info!(
            date = %finished.date,
            pomodoros = finished.pomodoros_completed,
            "archiving day"
        );
        self.history.insert(0, finished);
        self.history.truncate(HISTORY_CAP);
        true
    }

    /// Bring the hot record up to `today` if the calendar moved on.
    ///
    /// An idle stale record is re-dated instead of archived.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.today.date == today {
            return false;
        }
        if !self.add_day_to_history(today) {
            self.today.date = today;
        }
        true
    }

    // ── Derived views ────────────────────────────────────────────────

    fn all_days(&self) -> impl Iterator<Item = &DailyStats> {
        std::iter::once(&self.today).chain(self.history.iter())
    }

    fn summarize(&self, start: NaiveDate, end: NaiveDate) -> PeriodSummary {
        let days: Vec<DailyStats> = self
            .all_days()
            .filter(|d| d.date >= start && d.date <= end)
            .cloned()
            .collect();
        PeriodSummary {
            start,
            end,
            pomodoros_completed: days.iter().map(|d| d.pomodoros_completed).sum(),
            total_focus_time_minutes: days.iter().map(|d| d.total_focus_time_minutes).sum(),
            tasks_completed: days.iter().map(|d| d.tasks_completed).sum(),
            active_days: days.iter().filter(|d| d.pomodoros_completed > 0).count() as u32,
            days,
        }
    }

    /// Monday-based week containing `today`.
    pub fn week(&self, today: NaiveDate) -> PeriodSummary {
        let offset = i64::from(today.weekday().num_days_from_monday());
        self.summarize(today - Duration::days(offset), today)
    }

    /// Calendar month containing `today`.
    pub fn month(&self, today: NaiveDate) -> PeriodSummary {
        let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
        self.summarize(start, today)
    }

    /// Days with at least one pomodoro, walking back from `today` until the
    /// first date with no record. Recorded zero days do not break the run.
    pub fn streak(&self, today: NaiveDate) -> u32 {
        let mut by_date: HashMap<NaiveDate, &DailyStats> = HashMap::new();
        for day in self.all_days() {
            by_date.entry(day.date).or_insert(day);
        }

        let mut streak = 0;
        let mut cursor = today;
        loop {
            match by_date.get(&cursor) {
                Some(day) => {
                    if day.pomodoros_completed > 0 {
                        streak += 1;
                    }
                }
                // Today is never a gap: the app is open.
                None if cursor == today => {}
                None => break,
            }
            match cursor.pred_opt() {
                Some(prev) => cursor = prev,
                None => break,
            }
        }
        streak
    }
}
