//! Platform idle-time probes.
//!
//! Each probe answers "seconds since last user input" through one OS
//! mechanism. The oracle walks them in order and falls back to time-based
//! tracking when none is available.

use crate::core::monitor::IdleProbe;
use crate::error::{Result, WorkpulseError};

/// Build the ordered probe chain for the current platform.
pub fn idle_probes() -> Vec<Box<dyn IdleProbe>> {
    #[cfg(target_os = "linux")]
    {
        vec![
            Box::new(XprintidleProbe),
            Box::new(DbusScreenSaverProbe::freedesktop()),
            Box::new(DbusScreenSaverProbe::gnome()),
        ]
    }

    #[cfg(target_os = "macos")]
    {
        vec![Box::new(IoregProbe)]
    }

    #[cfg(windows)]
    {
        vec![Box::new(LastInputProbe)]
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    {
        Vec::new()
    }
}

#[cfg(target_os = "linux")]
pub use linux::{DbusScreenSaverProbe, XprintidleProbe};

#[cfg(target_os = "linux")]
mod linux {
    use std::process::Command;

    use super::{IdleProbe, Result, WorkpulseError};

    /// Queries the X11 idle counter through the `xprintidle` utility.
    pub struct XprintidleProbe;

    impl IdleProbe for XprintidleProbe {
        fn name(&self) -> &'static str {
            "xprintidle"
        }

        fn poll(&mut self) -> Result<u64> {
            let output = Command::new("xprintidle")
                .output()
                .map_err(|err| WorkpulseError::idle_unavailable(format!("xprintidle: {err}")))?;

            if !output.status.success() {
                return Err(WorkpulseError::idle_unavailable(format!(
                    "xprintidle exited with {}",
                    output.status
                )));
            }

            let millis: u64 = String::from_utf8_lossy(&output.stdout)
                .trim()
                .parse()
                .map_err(|err| {
                    WorkpulseError::idle_unavailable(format!("xprintidle output: {err}"))
                })?;

            Ok(millis / 1000)
        }
    }

    /// Queries a session screensaver service over D-Bus via `dbus-send`.
    pub struct DbusScreenSaverProbe {
        name: &'static str,
        dest: &'static str,
        path: &'static str,
        method: &'static str,
    }

    impl DbusScreenSaverProbe {
        pub fn freedesktop() -> Self {
            Self {
                name: "dbus-screensaver",
                dest: "org.freedesktop.ScreenSaver",
                path: "/org/freedesktop/ScreenSaver",
                method: "org.freedesktop.ScreenSaver.GetSessionIdleTime",
            }
        }

        pub fn gnome() -> Self {
            Self {
                name: "dbus-gnome-screensaver",
                dest: "org.gnome.ScreenSaver",
                path: "/org/gnome/ScreenSaver",
                method: "org.gnome.ScreenSaver.GetSessionIdleTime",
            }
        }
    }

    impl IdleProbe for DbusScreenSaverProbe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn poll(&mut self) -> Result<u64> {
            let dest_arg = format!("--dest={}", self.dest);
            let output = Command::new("dbus-send")
                .args([
                    "--session",
                    dest_arg.as_str(),
                    "--type=method_call",
                    "--print-reply",
                    self.path,
                    self.method,
                ])
                .output()
                .map_err(|err| WorkpulseError::idle_unavailable(format!("dbus-send: {err}")))?;

            if !output.status.success() {
                return Err(WorkpulseError::idle_unavailable(format!(
                    "{} exited with {}",
                    self.dest, output.status
                )));
            }

            // Reply contains a line like "   uint32 128".
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("uint32") {
                    if let Some(value) = line.split_whitespace().last() {
                        return value.parse().map_err(|err| {
                            WorkpulseError::idle_unavailable(format!("dbus reply: {err}"))
                        });
                    }
                }
            }

            Err(WorkpulseError::idle_unavailable(
                "no uint32 value in dbus reply",
            ))
        }
    }
}

#[cfg(target_os = "macos")]
pub use macos::IoregProbe;

#[cfg(target_os = "macos")]
mod macos {
    use std::process::Command;

    use super::{IdleProbe, Result, WorkpulseError};

    /// Reads HIDIdleTime from the IOKit registry.
    pub struct IoregProbe;

    impl IdleProbe for IoregProbe {
        fn name(&self) -> &'static str {
            "ioreg"
        }

        fn poll(&mut self) -> Result<u64> {
            let output = Command::new("ioreg")
                .args(["-c", "IOHIDSystem"])
                .output()
                .map_err(|err| WorkpulseError::idle_unavailable(format!("ioreg: {err}")))?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("HIDIdleTime") {
                    let nanos: u64 = line
                        .split('=')
                        .next_back()
                        .unwrap_or_default()
                        .trim()
                        .trim_matches('"')
                        .parse()
                        .map_err(|err| {
                            WorkpulseError::idle_unavailable(format!("HIDIdleTime: {err}"))
                        })?;
                    return Ok(nanos / 1_000_000_000);
                }
            }

            Err(WorkpulseError::idle_unavailable(
                "HIDIdleTime not present in ioreg output",
            ))
        }
    }
}

#[cfg(windows)]
pub use windows::LastInputProbe;

#[cfg(windows)]
mod windows {
    use super::{IdleProbe, Result, WorkpulseError};

    /// Uses GetLastInputInfo to measure time since the last input event.
    pub struct LastInputProbe;

    impl IdleProbe for LastInputProbe {
        fn name(&self) -> &'static str {
            "last-input-info"
        }

        fn poll(&mut self) -> Result<u64> {
            use windows_sys::Win32::System::SystemInformation::GetTickCount;
            use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
                GetLastInputInfo, LASTINPUTINFO,
            };

            let mut info = LASTINPUTINFO {
                cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
                dwTime: 0,
            };

            // SAFETY: info is a properly sized, writable LASTINPUTINFO.
            let ok = unsafe { GetLastInputInfo(&mut info) };
            if ok == 0 {
                return Err(WorkpulseError::idle_unavailable("GetLastInputInfo failed"));
            }

            let ticks = unsafe { GetTickCount() };
            Ok((ticks.wrapping_sub(info.dwTime) / 1000) as u64)
        }
    }
}
