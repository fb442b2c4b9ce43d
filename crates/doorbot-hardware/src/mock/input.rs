//! Mock input source.

use crate::error::Result;
use crate::events::{EventSender, HardwareEvent};
use crate::traits::KeypadInput;

/// Simulated keypad, reader and buttons feeding the hardware event channel.
///
/// # Examples
///
/// ```
/// use doorbot_hardware::events::{self, HardwareEvent};
/// use doorbot_hardware::mock::MockInput;
/// use doorbot_hardware::KeypadInput;
///
/// #[tokio::main]
/// async fn main() -> doorbot_hardware::Result<()> {
///     let (sender, mut events) = events::channel(16);
///     let input = MockInput::new(sender);
///
///     input.press_keys("12#").await?;
///     assert_eq!(events.recv().await, Some(HardwareEvent::Key(KeypadInput::Digit(1))));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockInput {
    sender: EventSender,
}

impl MockInput {
    pub fn new(sender: EventSender) -> Self {
        Self { sender }
    }

    /// Press a sequence of keypad labels (`0-9`, `*`, `#`).
    ///
    /// # Errors
    ///
    /// Returns an error on an unknown label or a closed channel.
    pub async fn press_keys(&self, keys: &str) -> Result<()> {
        for key in keys.chars() {
            self.press(KeypadInput::from_key(key)?).await?;
        }
        Ok(())
    }

    /// Press one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed.
    pub async fn press(&self, input: KeypadInput) -> Result<()> {
        self.sender.send(HardwareEvent::Key(input)).await
    }

    /// Present a credential whose value the reader already assembled.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed.
    pub async fn present_value(&self, value: u64) -> Result<()> {
        self.sender.send(HardwareEvent::ReaderValue(value)).await
    }

    /// Deliver a raw Wiegand frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed.
    pub async fn present_frame(&self, bits: Vec<bool>) -> Result<()> {
        self.sender.send(HardwareEvent::ReaderFrame(bits)).await
    }

    /// Press the doorbell.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed.
    pub async fn ring_doorbell(&self) -> Result<()> {
        self.sender.send(HardwareEvent::Doorbell).await
    }

    /// Press the request-to-exit button.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed.
    pub async fn request_exit(&self) -> Result<()> {
        self.sender.send(HardwareEvent::RequestToExit).await
    }
}
