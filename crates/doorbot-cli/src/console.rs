//! Console hardware.
//!
//! Stands in for the GPIO board on a development machine: output writes are
//! logged instead of driven, and hardware input is typed on stdin.
//!
//! ```text
//! key 135790#      keypad presses
//! card 1A2B3C4D    reader value (hex)
//! frame 0110...    raw Wiegand frame
//! bell             doorbell button
//! rex              request-to-exit button
//! quit             stop the controller
//! ```

use doorbot_hardware::{
    EventSender, HardwareEvent, KeypadInput, Level, LineDriver, LineId, LineWatch,
};
use std::collections::HashSet;
use std::io::BufRead;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lines buffered between the stdin thread and [`ConsoleInput`].
const LINE_CAPACITY: usize = 16;

/// Line driver that logs every write.
///
/// Lines listed as active-low are inverted before logging, so the log shows
/// the electrical level a real board would see.
#[derive(Debug, Clone, Default)]
pub struct ConsoleDriver {
    active_low: HashSet<LineId>,
}

impl ConsoleDriver {
    #[must_use]
    pub fn new(active_low: HashSet<LineId>) -> Self {
        Self { active_low }
    }

    /// Electrical level for a logical one.
    #[must_use]
    pub fn physical(&self, line: LineId, level: Level) -> bool {
        level.is_active() != self.active_low.contains(&line)
    }
}

impl LineDriver for ConsoleDriver {
    fn set_line(&mut self, line: LineId, level: Level) -> doorbot_hardware::Result<()> {
        let high = self.physical(line, level);
        debug!(%line, ?level, high, "line write");
        Ok(())
    }
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Keys(Vec<KeypadInput>),
    Card(u64),
    Frame(Vec<bool>),
    Doorbell,
    RequestToExit,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("{command} needs an argument")]
    MissingArgument { command: &'static str },
    #[error("invalid {command} argument '{value}'")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
}

/// Parse one console line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns an error for unknown commands and malformed arguments.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(None);
    };
    let argument = parts.next();

    let parsed = match command {
        "key" | "keys" => {
            let value = argument.ok_or(CommandError::MissingArgument { command: "key" })?;
            let keys = value
                .chars()
                .map(KeypadInput::from_key)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| CommandError::InvalidArgument {
                    command: "key",
                    value: value.to_string(),
                })?;
            Command::Keys(keys)
        }
        "card" => {
            let value = argument.ok_or(CommandError::MissingArgument { command: "card" })?;
            let digits = value.trim_start_matches("0x").trim_start_matches("0X");
            let raw = u64::from_str_radix(digits, 16).map_err(|_| {
                CommandError::InvalidArgument {
                    command: "card",
                    value: value.to_string(),
                }
            })?;
            Command::Card(raw)
        }
        "frame" => {
            let value = argument.ok_or(CommandError::MissingArgument { command: "frame" })?;
            let bits = value
                .chars()
                .map(|c| match c {
                    '0' => Some(false),
                    '1' => Some(true),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| CommandError::InvalidArgument {
                    command: "frame",
                    value: value.to_string(),
                })?;
            Command::Frame(bits)
        }
        "bell" | "doorbell" => Command::Doorbell,
        "rex" | "exit" => Command::RequestToExit,
        "quit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(parsed))
}

/// Read stdin on a dedicated thread.
///
/// A blocked stdin read cannot be cancelled, so it must not run on the
/// runtime: the thread is left behind at exit instead of holding up shutdown.
/// The receiver closes at end of input.
///
/// # Errors
///
/// Returns an error if the thread cannot be started.
pub fn stdin_lines() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(LINE_CAPACITY);
    std::thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || forward_lines(std::io::stdin().lock(), &tx))?;
    Ok(rx)
}

/// Forward lines from a blocking reader until it ends or the receiver goes.
fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::Sender<String>) {
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("console read failed: {}", e);
                break;
            }
        }
    }
}

/// Typed input source.
///
/// Button commands go through the same [`LineWatch`] a GPIO input would, so
/// debounce applies to them too.
pub struct ConsoleInput {
    sender: EventSender,
    doorbell: LineWatch,
    request_to_exit: LineWatch,
}

impl ConsoleInput {
    #[must_use]
    pub fn new(sender: EventSender, doorbell: LineWatch, request_to_exit: LineWatch) -> Self {
        Self {
            sender,
            doorbell,
            request_to_exit,
        }
    }

    /// Apply commands until the lines end or `quit`.
    ///
    /// Dropping the sender on return stops the controller.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller has stopped.
    pub async fn run(mut self, mut lines: mpsc::Receiver<String>) -> anyhow::Result<()> {
        while let Some(line) = lines.recv().await {
            match parse_command(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.apply(command).await?,
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
        info!("console input closed");
        Ok(())
    }

    async fn apply(&mut self, command: Command) -> doorbot_hardware::Result<()> {
        match command {
            Command::Keys(keys) => {
                for key in keys {
                    self.sender.send(HardwareEvent::Key(key)).await?;
                }
            }
            Command::Card(raw) => self.sender.send(HardwareEvent::ReaderValue(raw)).await?,
            Command::Frame(bits) => self.sender.send(HardwareEvent::ReaderFrame(bits)).await?,
            Command::Doorbell => press(&mut self.doorbell, &self.sender).await?,
            Command::RequestToExit => press(&mut self.request_to_exit, &self.sender).await?,
            Command::Quit => {}
        }
        Ok(())
    }
}

/// Simulate a press and release on a watched line.
async fn press(watch: &mut LineWatch, sender: &EventSender) -> doorbot_hardware::Result<()> {
    let now = Instant::now();
    let pressed = watch.sample(Level::Active, now);
    watch.sample(Level::Idle, now);
    match pressed {
        Some(event) => sender.send(event).await,
        None => {
            debug!(line = %watch.line(), "press within debounce window ignored");
            Ok(())
        }
    }
}
