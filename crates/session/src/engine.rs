//! Tasks moving bytes between the engine socket and the orchestrator.

use dbgp::{Message, WireCommand};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::connection::{Connection, EngineLink};
use crate::verbosity::Verbosity;

/// Accept engines one after another for as long as the session runs,
/// forwarding every decoded message to `messages`.
#[tracing::instrument(skip_all)]
pub(crate) async fn receive_loop(
    connection: Connection,
    messages: mpsc::Sender<Message>,
    verbosity: Verbosity,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = connection.wait_until_active() => {}
        }

        let link = tokio::select! {
            _ = cancel.cancelled() => break,
            link = connection.connect() => link,
        };
        let link = match link {
            Ok(Some(link)) => link,
            // listener closed while waiting
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(error = ?e, "engine connection failed");
                tokio::task::yield_now().await;
                continue;
            }
        };

        let keep_going = tokio::select! {
            _ = cancel.cancelled() => false,
            keep_going = forward(link, &messages, &verbosity) => keep_going,
        };
        connection.disconnect().await;
        if !keep_going {
            break;
        }
    }
    tracing::debug!("receive loop finished");
}

/// Pump one engine connection. Returns false once nobody is listening for
/// messages any more.
#[tracing::instrument(skip_all, fields(peer = %link.peer))]
async fn forward(
    mut link: EngineLink,
    messages: &mpsc::Sender<Message>,
    verbosity: &Verbosity,
) -> bool {
    loop {
        let frame = tokio::select! {
            _ = link.hangup.cancelled() => return true,
            frame = link.reader.next() => frame,
        };

        match frame {
            Some(Ok(payload)) => match dbgp::message::decode_bytes(&payload) {
                Ok(message) => {
                    verbosity.log_exchange(&message);
                    if messages.send(message).await.is_err() {
                        tracing::debug!("message channel closed");
                        return false;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "dropping engine message"),
            },
            Some(Err(e)) => {
                tracing::warn!(error = %e, "engine framing error");
                return true;
            }
            None => {
                tracing::debug!("engine closed the connection");
                return true;
            }
        }
    }
}

/// Write commands to the engine in the order they were issued.
#[tracing::instrument(skip_all)]
pub(crate) async fn send_loop(
    connection: Connection,
    mut commands: mpsc::Receiver<WireCommand>,
    verbosity: Verbosity,
    cancel: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        if !connection.is_on_air().await {
            tracing::warn!(command = %command, "inactive connection");
            continue;
        }

        verbosity.log_command(&command);
        if let Err(e) = connection.send(&command).await {
            tracing::error!(error = ?e, "dropping engine after failed write");
            connection.disconnect().await;
        }
    }
    tracing::debug!("send loop finished");
}
