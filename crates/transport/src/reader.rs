//! Incoming side of an engine connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::DbgpCodec;
use crate::error::CodecError;

pin_project! {
    /// Yields the XML payload of each `len\0xml\0` frame the engine sends,
    /// with the length prefix and both NULs removed.
    ///
    /// `None` means the engine hung up between frames. Hanging up inside a
    /// frame is [`CodecError::Truncated`]; half a payload is never yielded.
    ///
    /// ```ignore
    /// let mut reader = DbgpReader::new(read_half);
    /// while let Some(xml) = reader.next().await.transpose()? {
    ///     let message = dbgp::decode_bytes(&xml)?;
    /// }
    /// ```
    #[derive(Debug)]
    pub struct DbgpReader<R> {
        #[pin]
        inner: FramedRead<R, DbgpCodec>,
    }
}

impl<R> DbgpReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_codec(reader, DbgpCodec::new())
    }

    /// Read with a codec other than the default, e.g. a lower size cap.
    pub fn with_codec(reader: R, codec: DbgpCodec) -> Self {
        Self {
            inner: FramedRead::new(reader, codec),
        }
    }
}

impl<R> Stream for DbgpReader<R>
where
    R: AsyncRead + Unpin,
{
    type Item = Result<Bytes, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}
