//! The listening socket and the single engine connection.
//!
//! ```text
//! inactive --activate--> listening --connect--> attached
//!    ^                     ^  |                    |
//!    |                     |  +----disconnect------+
//!    +-----deactivate------+-----------------------+
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use eyre::WrapErr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use transport::{DbgpReader, DbgpWriter};

use dbgp::WireCommand;

/// Cloneable handle on the process-wide connection state.
///
/// Construct one per process and pass clones to whoever needs it. State only
/// changes through [`activate`](Self::activate),
/// [`connect`](Self::connect), [`disconnect`](Self::disconnect) and
/// [`deactivate`](Self::deactivate).
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    port: u16,
    active: watch::Sender<bool>,
    listening: Mutex<Option<Listening>>,
    engine: Mutex<Option<Engine>>,
}

#[derive(Debug)]
struct Listening {
    listener: Arc<TcpListener>,
    local_addr: SocketAddr,
    /// Aborts an accept in progress when the listener goes away.
    closed: CancellationToken,
}

#[derive(Debug)]
struct Engine {
    writer: DbgpWriter<OwnedWriteHalf>,
    hangup: CancellationToken,
}

/// The read side of a freshly accepted engine.
#[derive(Debug)]
pub struct EngineLink {
    pub reader: DbgpReader<OwnedReadHalf>,
    /// Cancelled when the engine is disconnected from our side.
    pub hangup: CancellationToken,
    pub peer: SocketAddr,
}

impl Connection {
    /// A connection that will listen on `port` once activated. Port 0 picks
    /// a free port.
    pub fn new(port: u16) -> Self {
        let (active, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                port,
                active,
                listening: Mutex::new(None),
                engine: Mutex::new(None),
            }),
        }
    }

    /// Start listening for engines. Does nothing when already listening.
    pub async fn activate(&self) -> eyre::Result<SocketAddr> {
        let mut listening = self.inner.listening.lock().await;
        if let Some(listening) = listening.as_ref() {
            return Ok(listening.local_addr);
        }

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, self.inner.port))
            .await
            .wrap_err_with(|| format!("binding DBGp port {}", self.inner.port))?;
        let local_addr = listener.local_addr().wrap_err("reading listener address")?;
        *listening = Some(Listening {
            listener: Arc::new(listener),
            local_addr,
            closed: CancellationToken::new(),
        });
        self.inner.active.send_replace(true);

        tracing::info!(%local_addr, "listening for DBGp engines");
        Ok(local_addr)
    }

    /// Resolve once the connection is listening.
    pub async fn wait_until_active(&self) {
        let mut active = self.inner.active.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = active.wait_for(|active| *active).await;
    }

    pub fn is_active(&self) -> bool {
        *self.inner.active.borrow()
    }

    /// Accept one engine.
    ///
    /// Returns `None` when not listening, or when the listener is closed
    /// while waiting. Any previously attached engine is dropped.
    pub async fn connect(&self) -> eyre::Result<Option<EngineLink>> {
        let (listener, closed) = match self.inner.listening.lock().await.as_ref() {
            Some(listening) => (listening.listener.clone(), listening.closed.clone()),
            None => return Ok(None),
        };

        let (stream, peer) = tokio::select! {
            _ = closed.cancelled() => return Ok(None),
            accepted = listener.accept() => accepted.wrap_err("accepting DBGp engine")?,
        };
        let (reader, writer) = transport::split(stream);
        let hangup = CancellationToken::new();

        let previous = self.inner.engine.lock().await.replace(Engine {
            writer,
            hangup: hangup.clone(),
        });
        if let Some(previous) = previous {
            tracing::warn!("replacing attached engine");
            previous.hangup.cancel();
        }

        tracing::info!(%peer, "engine attached");
        Ok(Some(EngineLink {
            reader,
            hangup,
            peer,
        }))
    }

    /// Drop the attached engine, keeping the listener.
    pub async fn disconnect(&self) {
        let Some(mut engine) = self.inner.engine.lock().await.take() else {
            return;
        };
        engine.hangup.cancel();
        if let Err(e) = engine.writer.get_mut().shutdown().await {
            tracing::debug!(error = %e, "shutting down engine socket");
        }
        tracing::info!("engine detached");
    }

    /// Drop the attached engine and stop listening.
    pub async fn deactivate(&self) {
        self.disconnect().await;
        if let Some(listening) = self.inner.listening.lock().await.take() {
            listening.closed.cancel();
            tracing::info!(local_addr = %listening.local_addr, "stopped listening");
        }
        self.inner.active.send_replace(false);
    }

    /// Whether an engine is attached and its socket still accepts writes.
    pub async fn is_on_air(&self) -> bool {
        let engine = self.inner.engine.lock().await;
        let Some(engine) = engine.as_ref() else {
            return false;
        };
        if engine.hangup.is_cancelled() {
            return false;
        }
        match engine.writer.get_ref().try_write(&[]) {
            Ok(_) => true,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(e) => {
                tracing::debug!(error = %e, "engine socket is not writable");
                false
            }
        }
    }

    /// Write one command to the attached engine.
    pub async fn send(&self, command: &WireCommand) -> eyre::Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let engine = engine
            .as_mut()
            .ok_or_else(|| eyre::eyre!("no engine attached"))?;
        engine
            .writer
            .send(command)
            .await
            .wrap_err_with(|| format!("writing {:?} to engine", command.name()))
    }

    /// Address of the listening socket, if any.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner
            .listening
            .lock()
            .await
            .as_ref()
            .map(|listening| listening.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    async fn engine_for(connection: &Connection) -> TcpStream {
        let addr = connection.local_addr().await.unwrap();
        TcpStream::connect((Ipv4Addr::LOCALHOST, addr.port()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn activate_is_idempotent() {
        let connection = Connection::new(0);

        let first = connection.activate().await.unwrap();
        let second = connection.activate().await.unwrap();

        assert_eq!(first, second);
        assert!(connection.is_active());
    }

    #[tokio::test]
    async fn wait_until_active_is_released() {
        let connection = Connection::new(0);
        let waiter = tokio::spawn({
            let connection = connection.clone();
            async move { connection.wait_until_active().await }
        });

        connection.activate().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn not_on_air_without_engine() {
        let connection = Connection::new(0);
        assert!(!connection.is_on_air().await);

        connection.activate().await.unwrap();
        assert!(!connection.is_on_air().await);
    }

    #[tokio::test]
    async fn connect_send_disconnect() {
        let connection = Connection::new(0);
        connection.activate().await.unwrap();

        let (link, mut engine) = tokio::join!(connection.connect(), engine_for(&connection));
        let link = link.unwrap().unwrap();
        assert!(connection.is_on_air().await);

        let command = dbgp::Translator::new().prepare("run", &[]).unwrap();
        connection.send(&command).await.unwrap();
        let mut buf = [0u8; 9];
        engine.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"run -i 1\0");

        connection.disconnect().await;
        assert!(link.hangup.is_cancelled());
        assert!(!connection.is_on_air().await);
        assert!(connection.is_active());
    }

    #[tokio::test]
    async fn deactivate_aborts_accept() {
        let connection = Connection::new(0);
        connection.activate().await.unwrap();
        let accepting = tokio::spawn({
            let connection = connection.clone();
            async move { connection.connect().await }
        });
        tokio::task::yield_now().await;

        connection.deactivate().await;

        let link = tokio::time::timeout(Duration::from_secs(5), accepting)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(link.is_none());
        assert!(!connection.is_active());
        assert!(connection.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn reactivate_after_deactivate() {
        let connection = Connection::new(0);
        connection.activate().await.unwrap();
        connection.deactivate().await;

        connection.activate().await.unwrap();

        assert!(connection.is_active());
        let (link, _engine) = tokio::join!(connection.connect(), engine_for(&connection));
        assert!(link.unwrap().is_some());
    }

    #[tokio::test]
    async fn send_without_engine_fails() {
        let connection = Connection::new(0);
        let command = dbgp::Translator::new().prepare("run", &[]).unwrap();

        assert!(connection.send(&command).await.is_err());
    }
}
