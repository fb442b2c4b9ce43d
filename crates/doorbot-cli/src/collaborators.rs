//! Log-only collaborators.
//!
//! The binary ships without chat, audit, display or speaker integrations.
//! [`LogOnly`] stands in for all four and writes each call to the log, so a
//! bench setup shows exactly what a deployed controller would send.

use chrono::{DateTime, Utc};
use doorbot_core::Result;
use doorbot_engine::{
    ActivitySink, AudioCue, AudioPlayer, Collaborators, DisplayMessage, DisplayPanel, Notifier,
};
use tracing::info;

/// Collaborator that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnly;

/// Collaborator set used by the binary.
pub type LogCollaborators = Collaborators<LogOnly, LogOnly, LogOnly, LogOnly>;

impl Notifier for LogOnly {
    async fn announce_entry(&self, name: &str) -> Result<()> {
        info!(collaborator = "notifier", "{} entered", name);
        Ok(())
    }

    async fn announce_doorbell(&self) -> Result<()> {
        info!(collaborator = "notifier", "doorbell rang");
        Ok(())
    }

    async fn announce_error(&self, kind: &str, details: &str) -> Result<()> {
        info!(collaborator = "notifier", kind, "error: {}", details);
        Ok(())
    }

    async fn announce_startup(&self) -> Result<()> {
        info!(collaborator = "notifier", "controller started");
        Ok(())
    }
}

impl ActivitySink for LogOnly {
    async fn post_activity(
        &self,
        code_id: &str,
        device: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        info!(
            collaborator = "activity",
            code_id,
            device,
            timestamp = %timestamp.to_rfc3339(),
            "activity recorded"
        );
        Ok(())
    }
}

impl DisplayPanel for LogOnly {
    async fn show(&self, message: &DisplayMessage) -> Result<()> {
        info!(collaborator = "display", "{}", message);
        Ok(())
    }
}

impl AudioPlayer for LogOnly {
    async fn play(&self, cue: &AudioCue) -> Result<()> {
        info!(collaborator = "audio", ?cue, "playing");
        Ok(())
    }
}
