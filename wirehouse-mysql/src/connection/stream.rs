//! Reads and writes packets to and from a MySQL client.
//!
//! Packets are prefixed by 4 bytes: 3 for the payload length (LE) and a sequence id.
//! A payload of `2 ** 24 - 1` bytes or more is sent as completely "full" packets, one
//! after the other with an increasing sequence id, ended by a shorter (possibly empty)
//! packet.
//!
//! <https://dev.mysql.com/doc/internals/en/mysql-packet.html>

use bytes::{Buf, Bytes, BytesMut};
use log::Level;
use wirehouse_core::net::{BufferedSocket, Socket};

use crate::error::{codes, Error, MySqlDatabaseError};
use crate::io::ProtocolEncode;
use crate::protocol::{Capabilities, Packet, MAX_PAYLOAD_LEN};

pub(crate) struct MySqlStream<S> {
    socket: BufferedSocket<S>,
    pub(crate) capabilities: Capabilities,

    /// Sequence id of the next packet written; one past the last packet seen.
    pub(crate) sequence_id: u8,

    max_packet_size: usize,
}

impl<S: Socket> MySqlStream<S> {
    pub(crate) fn new(socket: S, capabilities: Capabilities, max_packet_size: usize) -> Self {
        Self {
            socket: BufferedSocket::new(socket),
            capabilities,
            sequence_id: 0,
            max_packet_size,
        }
    }

    /// Read one logical payload, joining the physical packets it was split into.
    ///
    /// A stream that ends cleanly before the first header byte is
    /// [`Error::ConnectionClosed`]; one that ends anywhere else is [`Error::Truncated`].
    /// A payload over the configured maximum is read and dropped, leaving the stream on a
    /// packet boundary.
    pub(crate) async fn recv_packet(&mut self) -> Result<Packet<Bytes>, Error> {
        let mut payload = BytesMut::new();
        let mut total = 0_usize;
        let mut first = true;

        loop {
            let mut header = match self.socket.read_buffered(4).await {
                Ok(header) => header,

                Err(Error::Truncated { remaining: 0, .. }) if first => {
                    return Err(Error::ConnectionClosed);
                }

                Err(error) => return Err(error),
            };

            first = false;

            // the max this len will be is 16M
            #[allow(clippy::cast_possible_truncation)]
            let len = header.get_uint_le(3) as usize;
            let sequence_id = header.get_u8();

            // replies continue the client's sequence
            self.sequence_id = sequence_id.wrapping_add(1);

            let chunk = self.socket.read_buffered(len).await?;
            total = total.saturating_add(len);

            tracing::trace!(len, sequence_id, "read packet");

            if total <= self.max_packet_size {
                payload.unsplit(chunk);
            }

            if len < MAX_PAYLOAD_LEN {
                break;
            }
        }

        if total > self.max_packet_size {
            tracing::warn!(
                len = total,
                max = self.max_packet_size,
                "dropping oversized packet"
            );

            return Err(MySqlDatabaseError::new(
                codes::ER_NET_PACKET_TOO_LARGE,
                "08S01",
                "Got a packet bigger than 'max_allowed_packet' bytes",
            )
            .into());
        }

        let payload = payload.freeze();

        if log::log_enabled!(target: "wirehouse::wire", Level::Trace) {
            log::trace!(target: "wirehouse::wire", "< {}", hex::encode(&payload));
        }

        Ok(Packet(payload))
    }

    /// Resolve once the client closes its end of the stream.
    ///
    /// Anything the client sends meanwhile stays buffered for the next
    /// [`recv_packet`](Self::recv_packet). Once more than a whole packet is buffered the
    /// stream is no longer watched and this never resolves.
    pub(crate) async fn closed(&mut self) {
        let limit = self.max_packet_size.saturating_add(4);

        loop {
            if self.socket.buffered() > limit {
                std::future::pending::<()>().await;
            }

            match self.socket.fill_buf().await {
                Ok(0) => return,

                Ok(_) => {}

                Err(error) => {
                    tracing::debug!(%error, "client stream failed");
                    return;
                }
            }
        }
    }

    /// Frame `payload` as the next packet in the sequence.
    pub(crate) fn write_packet<'en, T>(&mut self, payload: T) -> Result<(), Error>
    where
        T: ProtocolEncode<'en, Capabilities>,
    {
        let sequence_id = self.sequence_id;

        self.socket
            .write_with(Packet(payload), (self.capabilities, &mut self.sequence_id))
            .inspect_err(|_| self.sequence_id = sequence_id)
    }

    /// Write a response that frames its own packets, such as a result set.
    pub(crate) fn write_packets<T>(&mut self, response: T) -> Result<(), Error>
    where
        T: for<'s> ProtocolEncode<'s, (Capabilities, &'s mut u8)>,
    {
        let sequence_id = self.sequence_id;

        self.socket
            .write_with(response, (self.capabilities, &mut self.sequence_id))
            .inspect_err(|_| self.sequence_id = sequence_id)
    }

    pub(crate) async fn flush(&mut self) -> Result<(), Error> {
        if log::log_enabled!(target: "wirehouse::wire", Level::Trace) {
            log::trace!(
                target: "wirehouse::wire",
                "> {}",
                hex::encode(self.socket.write_buffer().get())
            );
        }

        self.socket.flush().await?;

        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) -> Result<(), Error> {
        self.socket.shutdown().await?;

        Ok(())
    }
}
