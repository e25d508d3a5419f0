//! Alert actions: side effects attached to rules.
//!
//! Built-ins swallow their own failures; the alert engine additionally logs
//! any action error without letting it block sibling actions.

use log::info;
use notify_rust::Notification;

use crate::error::{Result, WorkpulseError};

use super::alerts::AlertEvent;

pub trait AlertAction: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, event: &AlertEvent) -> Result<()>;
}

/// Writes the alert to the application log.
pub struct LogAction;

impl AlertAction for LogAction {
    fn name(&self) -> &'static str {
        "log"
    }

    fn run(&self, event: &AlertEvent) -> Result<()> {
        info!("Alert triggered: {} - {}", event.rule_name, event.description);
        Ok(())
    }
}

/// Shows a best-effort desktop notification.
pub struct DesktopNotificationAction;

impl AlertAction for DesktopNotificationAction {
    fn name(&self) -> &'static str {
        "desktop-notification"
    }

    fn run(&self, event: &AlertEvent) -> Result<()> {
        Notification::new()
            .summary(&format!("Workpulse - {}", event.rule_name))
            .body(&event.description)
            .appname("workpulse")
            .show()
            .map_err(|err| WorkpulseError::other(format!("notification failed: {err}")))?;
        Ok(())
    }
}

/// Plays a best-effort audible alert.
pub struct SoundAction;

impl AlertAction for SoundAction {
    fn name(&self) -> &'static str {
        "sound"
    }

    fn run(&self, _event: &AlertEvent) -> Result<()> {
        #[cfg(target_os = "linux")]
        {
            std::process::Command::new("paplay")
                .arg("/usr/share/sounds/freedesktop/stereo/bell.oga")
                .spawn()
                .map(|_| ())
                .map_err(|err| WorkpulseError::other(format!("sound playback failed: {err}")))
        }

        #[cfg(target_os = "macos")]
        {
            std::process::Command::new("afplay")
                .arg("/System/Library/Sounds/Ping.aiff")
                .spawn()
                .map(|_| ())
                .map_err(|err| WorkpulseError::other(format!("sound playback failed: {err}")))
        }

        // No portable bell elsewhere; the notification action remains the
        // audible/visible channel.
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            Ok(())
        }
    }
}

/// The action set attached to every rule unless the embedder overrides it.
pub fn default_actions() -> Vec<Box<dyn AlertAction>> {
    vec![Box::new(LogAction), Box::new(DesktopNotificationAction)]
}
