//! Reverse control channel to the connected producer.
//!
//! Commands are short UTF-8 strings such as `ZOOM:2.50` or `EXPOSURE:-3`,
//! written newline-terminated onto the same socket the frames arrive on. The
//! channel is deliberately best-effort: with no producer connected, `send`
//! is a silent no-op, and write failures never reach the caller; the receive
//! loop's read side is the sole detector of a dead connection.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Hand-off point for control commands to the active producer.
///
/// Internally a guarded `Option` of the current connection's command queue,
/// installed on connect and cleared on disconnect. Queued commands are
/// written by the connection's writer task; nothing is buffered across
/// connections.
#[derive(Debug, Clone, Default)]
pub struct ControlChannel {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

impl ControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command for the connected producer.
    ///
    /// Silently does nothing when no producer is connected. Commands must not
    /// contain newlines (the wire delimiter); offending commands are dropped
    /// with a warning.
    pub fn send(&self, command: &str) {
        if command.contains('\n') {
            warn!(command, "control command contains newline, dropping");
            return;
        }
        let Ok(guard) = self.sender.lock() else {
            return;
        };
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(command.to_string()).is_err() {
                    debug!(command, "producer writer gone, control command dropped");
                }
            }
            None => {
                debug!(command, "no producer connected, control command dropped");
            }
        }
    }

    /// Whether a producer connection currently accepts commands.
    pub fn is_connected(&self) -> bool {
        self.sender.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Install a fresh command queue for a new connection, returning the
    /// receiving end for the connection's writer task. Any previous queue is
    /// discarded along with its undelivered commands.
    pub(crate) fn attach(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.sender.lock() {
            *guard = Some(tx);
        }
        rx
    }

    /// Clear the command queue when the connection ends.
    pub(crate) fn detach(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            *guard = None;
        }
    }
}
