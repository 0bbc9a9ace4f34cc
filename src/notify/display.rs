use std::time::{Duration, Instant};

use crate::types::NotificationEvent;

/// How long a notification stays visible.
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_secs(6);

#[derive(Debug, Clone)]
struct Shown {
    text: String,
    at: Instant,
}

/// State behind the notification widget: the latest event's text, visible
/// for a fixed duration or until dismissed.
#[derive(Debug, Clone)]
pub struct NotificationDisplay {
    current: Option<Shown>,
    duration: Duration,
}

impl Default for NotificationDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: None,
            duration: DEFAULT_DISPLAY_DURATION,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Show an event, replacing whatever was visible.
    pub fn show(&mut self, event: &NotificationEvent) {
        self.show_at(event, Instant::now());
    }

    pub fn show_at(&mut self, event: &NotificationEvent, now: Instant) {
        self.current = Some(Shown {
            text: event.display_text(),
            at: now,
        });
    }

    #[must_use]
    pub fn visible_text(&self) -> Option<&str> {
        self.visible_text_at(Instant::now())
    }

    #[must_use]
    pub fn visible_text_at(&self, now: Instant) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|shown| now.saturating_duration_since(shown.at) < self.duration)
            .map(|shown| shown.text.as_str())
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
