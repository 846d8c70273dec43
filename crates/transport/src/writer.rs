//! Outgoing side of an engine connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Sink;
use pin_project_lite::pin_project;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;

use crate::codec::DbgpCodec;
use crate::error::CodecError;

pin_project! {
    /// Writes rendered commands such as `run -i 7\0` to the engine.
    ///
    /// IDE-to-engine traffic has no length prefix, so each command goes out
    /// byte for byte. A command without its trailing NUL is refused with
    /// [`CodecError::Unterminated`] rather than left for the engine to
    /// run together with the next one.
    #[derive(Debug)]
    pub struct DbgpWriter<W> {
        #[pin]
        inner: FramedWrite<W, DbgpCodec>,
    }
}

impl<W> DbgpWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, DbgpCodec::new()),
        }
    }

    /// Write one command and flush it.
    pub async fn send(&mut self, command: impl AsRef<[u8]>) -> Result<(), CodecError> {
        use futures::SinkExt;
        SinkExt::send(&mut self.inner, command.as_ref()).await
    }

    /// The socket, for liveness probes that bypass the codec.
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// The socket, for shutting it down.
    pub fn get_mut(&mut self) -> &mut W {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W, T> Sink<T> for DbgpWriter<W>
where
    W: AsyncWrite + Unpin,
    T: AsRef<[u8]>,
{
    type Error = CodecError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Sink::<T>::poll_ready(self.project().inner, cx)
    }

    fn start_send(self: Pin<&mut Self>, item: T) -> Result<(), Self::Error> {
        self.project().inner.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Sink::<T>::poll_flush(self.project().inner, cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Sink::<T>::poll_close(self.project().inner, cx)
    }
}
