//! Autosave decision policy: dirty tracking, interval, and debounce.
//!
//! The policy is pure decision logic over injected clock readings; the
//! embedding application owns the actual timer and calls
//! [`AutoSavePolicy::should_save`] on its ticks, saving through the manager
//! when it returns `true`.

use std::time::{Duration, Instant};

use crate::config::AutosaveConfig;

/// Tracks unsaved-change state and decides when an automatic save is due.
#[derive(Debug, Clone)]
pub struct AutoSavePolicy {
    enabled: bool,
    interval: Duration,
    debounce: Duration,
    last_save: Option<Instant>,
    last_change: Option<Instant>,
    dirty: bool,
}

impl AutoSavePolicy {
    #[must_use]
    pub const fn new(enabled: bool, interval: Duration, debounce: Duration) -> Self {
        Self {
            enabled,
            interval,
            debounce,
            last_save: None,
            last_change: None,
            dirty: false,
        }
    }

    #[must_use]
    pub const fn from_config(config: &AutosaveConfig) -> Self {
        Self::new(
            config.enabled,
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.debounce_secs),
        )
    }

    /// Record an edit to the working buffer.
    pub fn mark_changed(&mut self, now: Instant) {
        self.dirty = true;
        self.last_change = Some(now);
    }

    /// Record a completed save (manual or automatic).
    pub fn mark_saved(&mut self, now: Instant) {
        self.dirty = false;
        self.last_save = Some(now);
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether an automatic save is due at `now`.
    ///
    /// A save is due when there are unsaved changes and either the debounce
    /// window since the last edit has elapsed, or the save interval since
    /// the last save (or the first edit) has elapsed.
    #[must_use]
    pub fn should_save(&self, now: Instant) -> bool {
        if !self.enabled || !self.dirty {
            return false;
        }

        let debounced = self
            .last_change
            .is_some_and(|at| now.duration_since(at) >= self.debounce);

        let interval_anchor = self.last_save.or(self.last_change);
        let interval_due = interval_anchor
            .is_some_and(|at| now.duration_since(at) >= self.interval);

        debounced || interval_due
    }
}
