//! Boundaries to the environment: notifications, sound and achievement
//! evaluation. The core owns none of the implementations; front ends inject
//! them through [`Adapters`].

use serde::{Deserialize, Serialize};

use crate::achievements::{Achievement, AchievementTrigger};
use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Not asked yet, or the environment cannot show notifications.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundId {
    FocusComplete,
    BreakComplete,
}

/// System notification dispatch.
pub trait Notifier {
    fn permission(&self) -> NotificationPermission;

    /// Ask the user for permission. Environments without support answer
    /// `Denied`.
    fn request_permission(&mut self) -> NotificationPermission;

    fn show(&self, title: &str, body: &str) -> Result<(), DispatchError>;
}

/// Sound dispatch. Best effort.
pub trait SoundPlayer {
    fn play(&self, sound: SoundId, volume: u32) -> Result<(), DispatchError>;
}

/// Remote achievement evaluation. Returns achievements newly unlocked by
/// the trigger; display is the caller's concern.
pub trait AchievementEvaluator {
    fn evaluate(&self, trigger: AchievementTrigger) -> Result<Vec<Achievement>, DispatchError>;
}

/// Notifier for environments without notification support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNotifications;

impl Notifier for NoNotifications {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn request_permission(&mut self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn show(&self, _title: &str, _body: &str) -> Result<(), DispatchError> {
        Err(DispatchError::Unsupported)
    }
}

/// Sound player for environments without audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl SoundPlayer for Silence {
    fn play(&self, _sound: SoundId, _volume: u32) -> Result<(), DispatchError> {
        Err(DispatchError::Unsupported)
    }
}

/// Evaluator that never unlocks anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAchievements;

impl AchievementEvaluator for NoAchievements {
    fn evaluate(&self, _trigger: AchievementTrigger) -> Result<Vec<Achievement>, DispatchError> {
        Ok(Vec::new())
    }
}

/// Injected environment adapters.
pub struct Adapters {
    pub notifier: Box<dyn Notifier>,
    pub sound: Box<dyn SoundPlayer>,
    pub achievements: Box<dyn AchievementEvaluator>,
}

impl Adapters {
    /// Adapters that do nothing.
    pub fn headless() -> Self {
        Self {
            notifier: Box::new(NoNotifications),
            sound: Box::new(Silence),
            achievements: Box::new(NoAchievements),
        }
    }
}

impl std::fmt::Debug for Adapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapters").finish_non_exhaustive()
    }
}
