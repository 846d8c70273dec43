use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dbgp::{Message, WireCommand};

/// Runtime switch for logging raw engine traffic at `info`.
///
/// Clones share the switch, so a front-end can flip it while the engine
/// loops are running.
#[derive(Debug, Clone, Default)]
pub struct Verbosity(Arc<AtomicBool>);

impl Verbosity {
    pub fn new(verbose: bool) -> Self {
        Self(Arc::new(AtomicBool::new(verbose)))
    }

    pub fn set(&self, verbose: bool) {
        self.0.store(verbose, Ordering::Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn log_command(&self, command: &WireCommand) {
        if self.is_verbose() {
            tracing::info!(transaction_id = command.transaction_id(), "-> {command}");
        } else {
            tracing::debug!(transaction_id = command.transaction_id(), "-> {command}");
        }
    }

    pub(crate) fn log_exchange(&self, message: &Message) {
        if self.is_verbose() {
            tracing::info!(
                command = message.command(),
                transaction_id = message.properties.transaction_id,
                state = ?message.state,
                "<- {message:?}"
            );
        } else {
            tracing::debug!(
                command = message.command(),
                transaction_id = message.properties.transaction_id,
                state = ?message.state,
                "<- engine message"
            );
        }
    }
}
