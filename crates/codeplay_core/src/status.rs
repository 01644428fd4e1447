//! Transient status text
//!
//! Both reporters show a message for a fixed time and then fall back to
//! their idle text. A newer message replaces the older one and restarts the
//! revert timer.

use std::time::Duration;

use crate::time::Timestamp;
use crate::timer::Debouncer;

pub const READY: &str = "Ready - CodePlay Live Editor v2.0";
pub const RENDERED: &str = "Code executed successfully";
pub const REFRESHED: &str = "Editor completely refreshed";
pub const LOADED_FROM_URL: &str = "Loaded from URL";
pub const INVALID_SHARE: &str = "Invalid shared code";
pub const SHARE_READY: &str = "Share your code with others!";
pub const SHARE_FAILED: &str = "Error generating share URL";
pub const EXPORTED: &str = "Saved as ZIP";
pub const EXPORT_FAILED: &str = "Failed to save ZIP";

pub const AUTO_SAVED: &str = "Auto-saved";
pub const UNSAVED: &str = "Unsaved changes";
pub const ALL_SAVED: &str = "All changes saved";

pub const STATUS_REVERT: Duration = Duration::from_millis(1000);
pub const SAVE_STATUS_REVERT: Duration = Duration::from_millis(500);

/// Command feedback line.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    current: Option<String>,
    revert: Debouncer,
}

impl StatusReporter {
    pub fn new(revert_after: Duration) -> Self {
        Self {
            current: None,
            revert: Debouncer::new(revert_after),
        }
    }

    pub fn show(&mut self, now: Timestamp, message: impl Into<String>) {
        self.current = Some(message.into());
        self.revert.trigger(now);
    }

    /// Reverts to idle once the message has expired. Returns `true` on revert.
    pub fn tick(&mut self, now: Timestamp) -> bool {
        if self.revert.fire_if_due(now) {
            self.current = None;
            return true;
        }
        false
    }

    pub fn text(&self) -> &str {
        self.current.as_deref().unwrap_or(READY)
    }

    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.revert.deadline()
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new(STATUS_REVERT)
    }
}

/// Save-state line. Idle text depends on whether there are unsaved edits.
#[derive(Debug, Clone)]
pub struct SaveStatus {
    transient: Option<String>,
    revert: Debouncer,
}

impl SaveStatus {
    pub fn new(revert_after: Duration) -> Self {
        Self {
            transient: None,
            revert: Debouncer::new(revert_after),
        }
    }

    pub fn show(&mut self, now: Timestamp, message: impl Into<String>) {
        self.transient = Some(message.into());
        self.revert.trigger(now);
    }

    pub fn tick(&mut self, now: Timestamp) -> bool {
        if self.revert.fire_if_due(now) {
            self.transient = None;
            return true;
        }
        false
    }

    pub fn text(&self, unsaved: bool) -> &str {
        match (&self.transient, unsaved) {
            (Some(message), _) => message.as_str(),
            (None, true) => UNSAVED,
            (None, false) => ALL_SAVED,
        }
    }

    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.revert.deadline()
    }
}

impl Default for SaveStatus {
    fn default() -> Self {
        Self::new(SAVE_STATUS_REVERT)
    }
}
