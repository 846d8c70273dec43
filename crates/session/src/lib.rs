//! A DBGp debugging session, IDE side.
//!
//! [`Session::start`] spawns three tasks sharing one [`Connection`]:
//!
//! - the receive loop accepts engines and decodes what they send
//! - the send loop writes commands to whichever engine is attached
//! - the orchestrator turns front-end commands into engine commands or
//!   breakpoint bookkeeping, reacts to engine messages, and fans every
//!   message out to the front-ends
//!
//! Front-ends submit commands through a [`SessionHandle`] and receive
//! [`Message`]s on the channels they registered at start.
mod breakpoint;
mod connection;
mod current_state;
mod directive;
mod engine;
mod handle;
pub mod paths;
mod router;
mod verbosity;

use config::Config;
use dbgp::{Message, WireCommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use breakpoint::Registry;
pub use connection::{Connection, EngineLink};
pub use directive::DirectiveError;
pub use handle::{SessionHandle, SubmitError};
pub use verbosity::Verbosity;

const REQUEST_BUFFER: usize = 16;
const MESSAGE_BUFFER: usize = 16;
const WIRE_BUFFER: usize = 32;

/// A running session and the tasks that drive it.
pub struct Session {
    handle: SessionHandle,
    connection: Connection,
    verbosity: Verbosity,
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Spawn the session tasks. Every message is delivered to each of
    /// `outputs`, in order.
    ///
    /// The session starts asleep; submit `on` to start listening. It stops
    /// when `cancel` is cancelled or [`shutdown`](Self::shutdown) is called.
    pub fn start(
        config: Config,
        outputs: Vec<mpsc::Sender<Message>>,
        cancel: &CancellationToken,
    ) -> Self {
        let cancel_token = cancel.child_token();
        let connection = Connection::new(config.dbgp_port);
        let verbosity = Verbosity::new(config.verbose);

        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER);
        let (message_tx, message_rx) = mpsc::channel(MESSAGE_BUFFER);
        let (wire_tx, wire_rx) = mpsc::channel::<WireCommand>(WIRE_BUFFER);

        let orchestrator = router::Orchestrator::new(
            config,
            connection.clone(),
            outputs,
            wire_tx,
            cancel_token.clone(),
        );

        let tasks = vec![
            tokio::spawn(engine::receive_loop(
                connection.clone(),
                message_tx,
                verbosity.clone(),
                cancel_token.clone(),
            )),
            tokio::spawn(engine::send_loop(
                connection.clone(),
                wire_rx,
                verbosity.clone(),
                cancel_token.clone(),
            )),
            tokio::spawn(orchestrator.run(request_rx, message_rx)),
        ];

        Self {
            handle: SessionHandle::new(request_tx),
            connection,
            verbosity,
            cancel_token,
            tasks,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Switch for raw traffic logging.
    pub fn verbosity(&self) -> &Verbosity {
        &self.verbosity
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Stop all session tasks and close the sockets.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "session task failed");
            }
        }
        self.connection.deactivate().await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
