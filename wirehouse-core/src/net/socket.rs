use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Error;
use crate::io::ProtocolEncode;

// Tokio and std both use this as the default capacity for their buffered I/O.
const DEFAULT_BUF_SIZE: usize = 8192;

/// Any duplex byte stream a connection can be served over.
pub trait Socket: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<S> Socket for S where S: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// A socket with a read buffer for framing and a write buffer that is only
/// handed to the socket on [`flush`](Self::flush).
pub struct BufferedSocket<S> {
    socket: S,
    write_buf: WriteBuffer,
    read_buf: BytesMut,
}

pub struct WriteBuffer {
    buf: Vec<u8>,
    bytes_flushed: usize,
}

impl<S: Socket> BufferedSocket<S> {
    pub fn new(socket: S) -> Self {
        BufferedSocket {
            socket,
            write_buf: WriteBuffer {
                buf: Vec::with_capacity(DEFAULT_BUF_SIZE),
                bytes_flushed: 0,
            },
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_SIZE),
        }
    }

    /// Read exactly `len` bytes.
    ///
    /// Fails with [`Error::Truncated`] when the peer closes the stream first; `remaining`
    /// is the number of bytes that did arrive.
    pub async fn read_buffered(&mut self, len: usize) -> Result<BytesMut, Error> {
        while self.read_buf.len() < len {
            self.read_buf.reserve(len - self.read_buf.len());

            let read = self.socket.read_buf(&mut self.read_buf).await?;

            if read == 0 {
                return Err(Error::Truncated {
                    needed: len,
                    remaining: self.read_buf.len(),
                });
            }
        }

        Ok(self.read_buf.split_to(len))
    }

    /// Read whatever the peer sends next into the read buffer.
    ///
    /// Returns the number of bytes read; `0` means the peer closed the stream. Buffered
    /// bytes are kept for the following [`read_buffered`](Self::read_buffered).
    pub async fn fill_buf(&mut self) -> io::Result<usize> {
        self.read_buf.reserve(DEFAULT_BUF_SIZE);
        self.socket.read_buf(&mut self.read_buf).await
    }

    /// Bytes read from the socket but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.read_buf.len()
    }

    pub fn write_buffer(&self) -> &WriteBuffer {
        &self.write_buf
    }

    pub fn write<'en, T>(&mut self, value: T) -> Result<(), Error>
    where
        T: ProtocolEncode<'en, ()>,
    {
        self.write_with(value, ())
    }

    /// Encode `value` into the write buffer.
    ///
    /// On failure the buffer is rolled back so no partial packet is ever flushed.
    pub fn write_with<'en, T, C>(&mut self, value: T, context: C) -> Result<(), Error>
    where
        T: ProtocolEncode<'en, C>,
    {
        let mark = self.write_buf.buf.len();

        value
            .encode_with(self.write_buf.buf_mut(), context)
            .inspect_err(|_| self.write_buf.buf.truncate(mark))
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        while !self.write_buf.is_empty() {
            let written = self.socket.write(self.write_buf.get()).await?;

            if written == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }

            self.write_buf.consume(written);
        }

        self.socket.flush().await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.flush().await?;
        self.socket.shutdown().await
    }
}

impl WriteBuffer {
    pub fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_flushed >= self.buf.len()
    }

    /// Bytes encoded but not yet handed to the socket.
    pub fn get(&self) -> &[u8] {
        &self.buf[self.bytes_flushed..]
    }

    fn consume(&mut self, amt: usize) {
        self.bytes_flushed = (self.bytes_flushed + amt).min(self.buf.len());

        if self.bytes_flushed == self.buf.len() {
            // reset cursors to zero once the whole buffer is consumed
            self.buf.clear();
            self.bytes_flushed = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use super::BufferedSocket;
    use crate::error::Error;

    #[tokio::test]
    async fn it_reads_exact_lengths() -> Result<(), Error> {
        let (client, server) = duplex(64);
        let mut socket = BufferedSocket::new(server);

        let mut client = client;
        client.write_all(b"\x03\x00\x00\x00abc").await?;

        let header = socket.read_buffered(4).await?;
        let payload = socket.read_buffered(3).await?;

        assert_eq!(&header[..], b"\x03\x00\x00\x00");
        assert_eq!(&payload[..], b"abc");

        Ok(())
    }

    #[tokio::test]
    async fn it_reports_short_reads_as_truncated() -> Result<(), Error> {
        let (mut client, server) = duplex(64);
        let mut socket = BufferedSocket::new(server);

        client.write_all(b"\x05\x00").await?;
        drop(client);

        let err = socket.read_buffered(4).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Truncated {
                needed: 4,
                remaining: 2
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn it_keeps_filled_bytes_for_the_next_read() -> Result<(), Error> {
        let (mut client, server) = duplex(64);
        let mut socket = BufferedSocket::new(server);

        client.write_all(b"abc").await?;
        drop(client);

        assert_eq!(socket.fill_buf().await?, 3);
        assert_eq!(socket.buffered(), 3);
        assert_eq!(socket.fill_buf().await?, 0);

        let read = socket.read_buffered(3).await?;
        assert_eq!(&read[..], b"abc");
        assert_eq!(socket.buffered(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn it_buffers_writes_until_flush() -> Result<(), Error> {
        let (mut client, server) = duplex(64);
        let mut socket = BufferedSocket::new(server);

        socket.write(&b"ping"[..])?;
        assert_eq!(socket.write_buffer().get(), b"ping");

        socket.flush().await?;
        assert!(socket.write_buffer().is_empty());

        let mut received = [0u8; 4];
        client.read_exact(&mut received).await?;

        assert_eq!(&received, b"ping");

        Ok(())
    }
}
