//! Lock-free input buffer between input sources and the game loop
//!
//! Uses crossbeam-channel so a joystick poller, a UI button or a script can
//! submit commands from any thread; the loop drains them at the start of each
//! tick.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use thiserror::Error;

use crate::util::vec2::Vec2;

/// A player command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputCommand {
    /// Raw joystick vector
    Move(Vec2),
    /// Manual dash toward the nearest enemy
    Dash,
    SetAutomaticDash(bool),
}

/// Commands collected during one drain. Only the last move counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainedInput {
    pub movement: Option<Vec2>,
    pub dash_requests: u32,
    pub automatic_dash: Option<bool>,
}

impl DrainedInput {
    pub fn is_empty(&self) -> bool {
        self.movement.is_none() && self.dash_requests == 0 && self.automatic_dash.is_none()
    }
}

/// Bounded command buffer
pub struct InputBuffer {
    sender: Sender<InputCommand>,
    receiver: Receiver<InputCommand>,
    capacity: usize,
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Create a sender handle for an input source
    pub fn sender(&self) -> InputSender {
        InputSender {
            sender: self.sender.clone(),
        }
    }

    /// Submit without blocking; false when the buffer is full
    #[inline]
    pub fn try_submit(&self, command: InputCommand) -> bool {
        self.sender.try_send(command).is_ok()
    }

    /// Drain everything pending, folding repeated moves into the latest one
    pub fn drain(&self) -> DrainedInput {
        let mut drained = DrainedInput::default();
        for command in self.receiver.try_iter() {
            match command {
                InputCommand::Move(v) => drained.movement = Some(v),
                InputCommand::Dash => drained.dash_requests += 1,
                InputCommand::SetAutomaticDash(enabled) => drained.automatic_dash = Some(enabled),
            }
        }
        drained
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        // A few seconds of 60 Hz joystick samples
        Self::new(256)
    }
}

/// Clonable sender handle
#[derive(Clone)]
pub struct InputSender {
    sender: Sender<InputCommand>,
}

impl InputSender {
    #[inline]
    pub fn try_send(&self, command: InputCommand) -> Result<(), InputBufferError> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => InputBufferError::Full,
            TrySendError::Disconnected(_) => InputBufferError::Disconnected,
        })
    }
}

/// Input buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputBufferError {
    /// Buffer is full (backpressure)
    #[error("input buffer is full")]
    Full,
    /// The game loop was dropped
    #[error("input buffer disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_keeps_last_move() {
        let buffer = InputBuffer::new(10);
        assert!(buffer.try_submit(InputCommand::Move(Vec2::new(1.0, 0.0))));
        assert!(buffer.try_submit(InputCommand::Dash));
        assert!(buffer.try_submit(InputCommand::Move(Vec2::new(0.0, 1.0))));
        assert!(buffer.try_submit(InputCommand::SetAutomaticDash(false)));
        assert_eq!(buffer.pending_count(), 4);

        let drained = buffer.drain();
        assert_eq!(drained.movement, Some(Vec2::new(0.0, 1.0)));
        assert_eq!(drained.dash_requests, 1);
        assert_eq!(drained.automatic_dash, Some(false));
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_backpressure() {
        let buffer = InputBuffer::new(2);
        assert!(buffer.try_submit(InputCommand::Dash));
        assert!(buffer.try_submit(InputCommand::Dash));
        assert!(!buffer.try_submit(InputCommand::Dash));
        assert_eq!(
            buffer.sender().try_send(InputCommand::Dash),
            Err(InputBufferError::Full)
        );

        buffer.drain();
        assert!(buffer.try_submit(InputCommand::Dash));
    }

    #[test]
    fn test_sender_from_another_thread() {
        let buffer = InputBuffer::new(64);
        let sender = buffer.sender();
        let handle = std::thread::spawn(move || {
            for i in 0..10 {
                sender
                    .try_send(InputCommand::Move(Vec2::new(i as f32, 0.0)))
                    .unwrap();
            }
        });
        handle.join().unwrap();
        assert_eq!(buffer.drain().movement, Some(Vec2::new(9.0, 0.0)));
    }

    #[test]
    fn test_disconnected_after_drop() {
        let buffer = InputBuffer::new(4);
        let sender = buffer.sender();
        drop(buffer);
        assert_eq!(
            sender.try_send(InputCommand::Dash),
            Err(InputBufferError::Disconnected)
        );
    }
}
