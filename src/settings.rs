use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::broadcast::FormatBus;
use crate::schedule::time::TimeFormat;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    time_format: TimeFormat,
}

/// Key-value settings persisted as JSON next to the schedule.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<UserSettings>,
}

impl SettingsStore {
    /// Missing or unreadable files fall back to defaults.
    pub fn open(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "ignoring unreadable settings in {}: {err}",
                    path.display()
                );
                UserSettings::default()
            }),
            Err(_) => {
                info!("no settings at {}, using defaults", path.display());
                UserSettings::default()
            }
        };

        Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        }
    }

    pub fn time_format(&self) -> TimeFormat {
        self.data
            .lock()
            .map(|guard| guard.time_format)
            .unwrap_or_default()
    }

    pub fn set_time_format(&self, format: TimeFormat) -> Result<()> {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| anyhow!("failed to lock settings state"))?;
        guard.time_format = format;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, format!("{serialized}\n"))
            .with_context(|| format!("failed to write settings to {}", self.path.display()))
    }
}

/// The settings-side half of the format switch: stores the new value and
/// announces it on the bus.
pub struct FormatToggle {
    store: Option<SettingsStore>,
    bus: FormatBus,
    current: Mutex<TimeFormat>,
}

impl FormatToggle {
    pub fn new(store: Option<SettingsStore>, bus: FormatBus, initial: TimeFormat) -> Self {
        Self {
            store,
            bus,
            current: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> TimeFormat {
        self.current
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default()
    }

    pub fn set(&self, format: TimeFormat) -> TimeFormat {
        if let Ok(mut guard) = self.current.lock() {
            *guard = format;
        }
        if let Some(store) = &self.store
            && let Err(err) = store.set_time_format(format)
        {
            warn!("time format not persisted: {err:#}");
        }
        let delivered = self.bus.publish(format);
        info!("time format set to {format}h ({delivered} listener(s))");
        format
    }

    pub fn toggle(&self) -> TimeFormat {
        self.set(self.current().toggled())
    }
}
