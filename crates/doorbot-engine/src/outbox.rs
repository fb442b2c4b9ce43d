//! Fire-and-forget delivery to collaborators.
//!
//! The dispatch loop never waits on a notifier or the audit sink. It posts an
//! [`AccessEvent`] to the [`Outbox`] and moves on; [`deliver`] runs next to
//! the loop and fans each event out to the collaborators in posting order.
//!
//! ```text
//! Controller ──post──► Outbox (mpsc) ──► deliver ──┬──► Notifier
//!                                                  ├──► ActivitySink
//!                                                  ├──► DisplayPanel
//!                                                  └──► AudioPlayer
//! ```

use crate::ports::{
    ActivitySink, AudioCue, AudioPlayer, Collaborators, DisplayMessage, DisplayPanel, Notifier,
};
use chrono::{DateTime, Utc};
use doorbot_core::{Result, announce_name};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Something the outside world should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessEvent {
    Startup,
    /// A member was let in.
    Granted {
        display_name: Option<String>,
        member_id: Option<String>,
    },
    /// Audit record for a grant.
    Activity {
        code_id: String,
        device: String,
        timestamp: DateTime<Utc>,
    },
    /// A code matched nothing and should be shown.
    Unrecognized { code: String },
    Doorbell,
}

/// Sending half, held by the decision engine.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<AccessEvent>,
}

/// Receiving half, handed to [`deliver`].
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::UnboundedReceiver<AccessEvent>,
}

impl Outbox {
    #[must_use]
    pub fn channel() -> (Outbox, OutboxReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Outbox { tx }, OutboxReceiver { rx })
    }

    /// Queue an event. Never blocks; a stopped worker only costs the event.
    pub fn post(&self, event: AccessEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(event = ?e.0, "delivery worker stopped, event dropped");
        }
    }
}

impl OutboxReceiver {
    pub async fn recv(&mut self) -> Option<AccessEvent> {
        self.rx.recv().await
    }
}

/// Deliver queued events until every [`Outbox`] is dropped.
///
/// Collaborator failures are logged and swallowed. They can never reach the
/// decision that produced the event, which has already been actuated.
pub async fn deliver<N, A, D, U>(
    mut events: OutboxReceiver,
    collaborators: &Collaborators<N, A, D, U>,
) where
    N: Notifier,
    A: ActivitySink,
    D: DisplayPanel,
    U: AudioPlayer,
{
    while let Some(event) = events.recv().await {
        for (collaborator, result) in dispatch(&event, collaborators).await {
            if let Err(e) = result {
                warn!(collaborator, ?event, "delivery failed: {}", e);
            }
        }
    }
    debug!("outbox closed, delivery worker exiting");
}

async fn dispatch<N, A, D, U>(
    event: &AccessEvent,
    c: &Collaborators<N, A, D, U>,
) -> Vec<(&'static str, Result<()>)>
where
    N: Notifier,
    A: ActivitySink,
    D: DisplayPanel,
    U: AudioPlayer,
{
    match event {
        AccessEvent::Startup => vec![("notifier", c.notifier.announce_startup().await)],
        AccessEvent::Granted {
            display_name,
            member_id,
        } => {
            let name = announce_name(display_name.as_deref(), member_id.as_deref());
            vec![
                (
                    "display",
                    c.display
                        .show(&DisplayMessage::Welcome(name.to_string()))
                        .await,
                ),
                (
                    "audio",
                    c.audio.play(&AudioCue::Welcome(name.to_string())).await,
                ),
                ("notifier", c.notifier.announce_entry(name).await),
            ]
        }
        AccessEvent::Activity {
            code_id,
            device,
            timestamp,
        } => vec![(
            "activity",
            c.activity.post_activity(code_id, device, *timestamp).await,
        )],
        AccessEvent::Unrecognized { code } => vec![(
            "display",
            c.display
                .show(&DisplayMessage::Unrecognized(code.clone()))
                .await,
        )],
        AccessEvent::Doorbell => vec![
            ("display", c.display.show(&DisplayMessage::Doorbell).await),
            ("audio", c.audio.play(&AudioCue::Doorbell).await),
            ("notifier", c.notifier.announce_doorbell().await),
        ],
    }
}
