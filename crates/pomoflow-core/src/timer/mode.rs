use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, TimerMode::Focus)
    }

    /// Parse the short names used on the command line.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "focus" | "work" => Some(TimerMode::Focus),
            "short" | "short_break" | "shortbreak" => Some(TimerMode::ShortBreak),
            "long" | "long_break" | "longbreak" => Some(TimerMode::LongBreak),
            _ => None,
        }
    }
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::Focus
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Duration snapshot the engine reads whenever it loads a new mode.
///
/// Values are assumed to be validated by the settings layer; the engine
/// never rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    /// Focus sessions per cycle before a long break.
    pub long_break_after: u32,
}

impl Durations {
    pub fn from_minutes(focus: u32, short_break: u32, long_break: u32, long_break_after: u32) -> Self {
        Self {
            focus_secs: u64::from(focus).saturating_mul(60),
            short_break_secs: u64::from(short_break).saturating_mul(60),
            long_break_secs: u64::from(long_break).saturating_mul(60),
            long_break_after,
        }
    }

    pub fn duration_for(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => self.focus_secs,
            TimerMode::ShortBreak => self.short_break_secs,
            TimerMode::LongBreak => self.long_break_secs,
        }
    }

    /// Mode that follows `mode` when `cycle_count` focus sessions (including
    /// the one just finished, if any) have been counted in the current cycle.
    pub fn next_mode(&self, mode: TimerMode, cycle_count: u32) -> TimerMode {
        match mode {
            TimerMode::Focus => {
                if cycle_count % self.long_break_after.max(1) == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15, 4)
    }
}
