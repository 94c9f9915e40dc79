//! Terminal implementations of the core adapters.

use std::io::Write;

use pomoflow_core::adapters::NoAchievements;
use pomoflow_core::{
    Adapters, DispatchError, NotificationPermission, Notifier, SoundId, SoundPlayer,
};

/// Rings the terminal bell. Volume 0 mutes it.
#[derive(Debug, Default)]
pub struct Bell;

impl SoundPlayer for Bell {
    fn play(&self, sound: SoundId, volume: u32) -> Result<(), DispatchError> {
        if volume == 0 {
            return Ok(());
        }
        // Two rings at the end of a focus session, one after a break.
        let rings = match sound {
            SoundId::FocusComplete => "\x07\x07",
            SoundId::BreakComplete => "\x07",
        };
        let mut err = std::io::stderr();
        err.write_all(rings.as_bytes())
            .and_then(|()| err.flush())
            .map_err(|e| DispatchError::Failed(e.to_string()))
    }
}

/// Prints notifications as a banner on stderr.
#[derive(Debug)]
pub struct Banner {
    permission: NotificationPermission,
}

impl Default for Banner {
    fn default() -> Self {
        Self {
            permission: NotificationPermission::Unknown,
        }
    }
}

impl Notifier for Banner {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) -> NotificationPermission {
        self.permission = NotificationPermission::Granted;
        self.permission
    }

    fn show(&self, title: &str, body: &str) -> Result<(), DispatchError> {
        if self.permission != NotificationPermission::Granted {
            return Err(DispatchError::PermissionDenied);
        }
        eprintln!("==> {title}: {body}");
        Ok(())
    }
}

pub fn adapters() -> Adapters {
    Adapters {
        notifier: Box::new(Banner::default()),
        sound: Box::new(Bell),
        achievements: Box::new(NoAchievements),
    }
}
