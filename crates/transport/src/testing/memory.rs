//! Engine connections without sockets.

use tokio::io::{DuplexStream, duplex};

use crate::transport::DbgpTransport;

/// Two ends of an in-process connection, one for the IDE and one for the
/// engine, built from a pair of tokio [`duplex`] pipes.
///
/// ```
/// use transport::testing::MemoryTransport;
/// use transport::split;
///
/// let (ide_side, engine_side) = MemoryTransport::pair();
///
/// let (ide_reader, ide_writer) = split(ide_side);
/// let (engine_reader, engine_writer) = split(engine_side);
/// ```
pub struct MemoryTransport {
    read: DuplexStream,
    write: DuplexStream,
}

const PIPE_CAPACITY: usize = 64 * 1024;

impl MemoryTransport {
    /// `(ide, engine)`; bytes written on one end are read on the other.
    pub fn pair() -> (Self, Self) {
        let (ide_write, engine_read) = duplex(PIPE_CAPACITY);
        let (engine_write, ide_read) = duplex(PIPE_CAPACITY);

        let ide = MemoryTransport {
            read: ide_read,
            write: ide_write,
        };
        let engine = MemoryTransport {
            read: engine_read,
            write: engine_write,
        };
        (ide, engine)
    }

    /// Split into the raw halves, for tests that play the engine and need
    /// to write unframed bytes.
    pub fn into_raw(self) -> (DuplexStream, DuplexStream) {
        (self.read, self.write)
    }
}

impl DbgpTransport for MemoryTransport {
    type Read = DuplexStream;
    type Write = DuplexStream;

    fn into_split(self) -> (Self::Read, Self::Write) {
        (self.read, self.write)
    }
}
