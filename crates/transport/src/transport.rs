//! Splitting a connection into its reading and writing halves.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::reader::DbgpReader;
use crate::writer::DbgpWriter;

/// A byte stream an engine can talk DBGp over.
///
/// Engines attach over TCP. [`crate::testing::MemoryTransport`] plays the
/// same role in tests.
pub trait DbgpTransport: Send + 'static {
    type Read: AsyncRead + Unpin + Send + 'static;
    type Write: AsyncWrite + Unpin + Send + 'static;

    fn into_split(self) -> (Self::Read, Self::Write);
}

impl DbgpTransport for TcpStream {
    type Read = OwnedReadHalf;
    type Write = OwnedWriteHalf;

    fn into_split(self) -> (Self::Read, Self::Write) {
        TcpStream::into_split(self)
    }
}

/// Wrap the halves of an accepted engine connection.
///
/// The receive loop owns the reader and may sit in a read for as long as
/// the engine is running; commands go out through the writer meanwhile.
pub fn split<T: DbgpTransport>(transport: T) -> (DbgpReader<T::Read>, DbgpWriter<T::Write>) {
    let (read, write) = transport.into_split();
    (DbgpReader::new(read), DbgpWriter::new(write))
}
