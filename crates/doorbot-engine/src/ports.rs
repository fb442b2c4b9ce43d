//! Outbound collaborator contracts.
//!
//! Everything the controller tells the outside world goes through these
//! traits. Each call is best effort: the implementation owns its retry policy
//! and the controller only logs a failure.

#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use doorbot_core::Result;
use std::fmt;

/// Chat or push notifications.
pub trait Notifier: Send + Sync {
    /// A member was let in.
    async fn announce_entry(&self, name: &str) -> Result<()>;

    /// Someone rang the doorbell.
    async fn announce_doorbell(&self) -> Result<()>;

    /// A health condition became active.
    async fn announce_error(&self, kind: &str, details: &str) -> Result<()>;

    /// The controller (re)started.
    async fn announce_startup(&self) -> Result<()>;
}

/// Remote audit log.
pub trait ActivitySink: Send + Sync {
    async fn post_activity(
        &self,
        code_id: &str,
        device: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
}

/// Text display next to the door.
pub trait DisplayPanel: Send + Sync {
    async fn show(&self, message: &DisplayMessage) -> Result<()>;
}

/// Speaker next to the door.
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, cue: &AudioCue) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMessage {
    Welcome(String),
    /// Code that matched no record, shown so a member can report it.
    Unrecognized(String),
    Doorbell,
}

impl fmt::Display for DisplayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMessage::Welcome(name) => write!(f, "Welcome {name}"),
            DisplayMessage::Unrecognized(code) => write!(f, "Unknown code {code}"),
            DisplayMessage::Doorbell => write!(f, "Ding dong"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCue {
    /// Greeting with the member's name.
    Welcome(String),
    Doorbell,
}

/// The four collaborators, owned together by the delivery worker.
#[derive(Debug, Clone, Default)]
pub struct Collaborators<N, A, D, U> {
    pub notifier: N,
    pub activity: A,
    pub display: D,
    pub audio: U,
}
