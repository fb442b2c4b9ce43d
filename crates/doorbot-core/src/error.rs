use thiserror::Error;

/// Faults raised by the entry-decision core.
///
/// None of these ever change a decision that has already been actuated.
/// Decode and record store failures resolve to a denial at the call site,
/// notification failures are swallowed after being logged.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Input decode error: {0}")]
    InputDecode(String),

    // Record store errors
    #[error("Record store unavailable: {0}")]
    RecordStoreUnavailable(String),

    // Collaborator errors
    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(String),

    #[error("Activity post failed: {0}")]
    ActivityPost(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
