//! Recording collaborators for tests.
//!
//! [`Recorder`] implements every outbound port and remembers each call,
//! failed or not, in arrival order.

use crate::ports::{
    ActivitySink, AudioCue, AudioPlayer, Collaborators, DisplayMessage, DisplayPanel, Notifier,
};
use chrono::{DateTime, Utc};
use doorbot_core::{Error, Result};
use std::sync::{Arc, Mutex};

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Startup,
    Entry(String),
    Doorbell,
    Error { kind: String, details: String },
    Activity { code_id: String, device: String },
    Show(DisplayMessage),
    Play(AudioCue),
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<Call>,
    fail: bool,
}

/// Shared call log. Clones record into the same log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<RecorderState>>,
}

pub type RecordingCollaborators = Collaborators<Recorder, Recorder, Recorder, Recorder>;

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All four ports backed by this recorder.
    pub fn collaborators(&self) -> RecordingCollaborators {
        Collaborators {
            notifier: self.clone(),
            activity: self.clone(),
            display: self.clone(),
            audio: self.clone(),
        }
    }

    /// Make every following call fail (still recorded).
    pub fn fail_all(&self, fail: bool) {
        self.lock().fail = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Recorded `announce_error` calls.
    pub fn errors(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Error { .. }))
            .collect()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.fail {
            Err(Error::NotificationDelivery("recorder set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Notifier for Recorder {
    async fn announce_entry(&self, name: &str) -> Result<()> {
        self.record(Call::Entry(name.to_string()))
    }

    async fn announce_doorbell(&self) -> Result<()> {
        self.record(Call::Doorbell)
    }

    async fn announce_error(&self, kind: &str, details: &str) -> Result<()> {
        self.record(Call::Error {
            kind: kind.to_string(),
            details: details.to_string(),
        })
    }

    async fn announce_startup(&self) -> Result<()> {
        self.record(Call::Startup)
    }
}

impl ActivitySink for Recorder {
    async fn post_activity(
        &self,
        code_id: &str,
        device: &str,
        _timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.record(Call::Activity {
            code_id: code_id.to_string(),
            device: device.to_string(),
        })
    }
}

impl DisplayPanel for Recorder {
    async fn show(&self, message: &DisplayMessage) -> Result<()> {
        self.record(Call::Show(message.clone()))
    }
}

impl AudioPlayer for Recorder {
    async fn play(&self, cue: &AudioCue) -> Result<()> {
        self.record(Call::Play(cue.clone()))
    }
}
