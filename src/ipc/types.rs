use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::error;

use crate::tracker::Tracker;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub tracker: Option<Tracker>,
}

impl AppState {
    /// How long the main loop may block before the pending autosave is due.
    pub fn autosave_wait(&self, now: Instant) -> Option<Duration> {
        self.tracker.as_ref().and_then(|t| t.autosave_remaining(now))
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.tick(now);
        }
    }

    /// Save whatever is pending before the process (or workspace) goes away.
    pub fn flush(&mut self) {
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        if let Err(e) = tracker.flush() {
            let msg = format!("{e:#}");
            error!(target: "gradebookd", error = %msg, "flush failed");
        }
    }
}
