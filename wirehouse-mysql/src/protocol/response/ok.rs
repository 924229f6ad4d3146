use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, MySqlBufExt, MySqlBufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, Status};

/// Indicates successful completion of a previous command sent by the client.
///
/// With `DEPRECATE_EOF` negotiated the same packet, with header `0xfe`, also ends a
/// result set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OkPacket {
    pub header: u8,
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: Status,
    pub warnings: u16,
    pub info: String,
}

impl OkPacket {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// The `0xfe`-headed variant that terminates a result set.
    pub fn eof(status: Status, warnings: u16) -> Self {
        Self {
            header: 0xfe,
            status,
            warnings,
            ..Self::default()
        }
    }
}

impl ProtocolEncode<'_, Capabilities> for OkPacket {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) -> Result<(), Error> {
        buf.push(self.header);
        buf.put_uint_lenenc(self.affected_rows);
        buf.put_uint_lenenc(self.last_insert_id);

        if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.extend_from_slice(&self.status.bits().to_le_bytes());
            buf.extend_from_slice(&self.warnings.to_le_bytes());
        } else if capabilities.contains(Capabilities::TRANSACTIONS) {
            buf.extend_from_slice(&self.status.bits().to_le_bytes());
        }

        if capabilities.contains(Capabilities::SESSION_TRACK) {
            buf.put_str_lenenc(&self.info);
        } else {
            buf.extend_from_slice(self.info.as_bytes());
        }

        Ok(())
    }
}

impl ProtocolDecode<'_, Capabilities> for OkPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let header = buf.try_get_u8()?;
        if header != 0 && header != 0xfe {
            return Err(err_protocol!(
                "expected 0x00 or 0xfe (OK_Packet) but found 0x{header:02x}"
            ));
        }

        let affected_rows = buf.get_uint_lenenc()?;
        let last_insert_id = buf.get_uint_lenenc()?;

        let (status, warnings) = if capabilities.contains(Capabilities::PROTOCOL_41) {
            (
                Status::from_bits_truncate(buf.try_get_u16_le()?),
                buf.try_get_u16_le()?,
            )
        } else if capabilities.contains(Capabilities::TRANSACTIONS) {
            (Status::from_bits_truncate(buf.try_get_u16_le()?), 0)
        } else {
            (Status::empty(), 0)
        };

        let info = if capabilities.contains(Capabilities::SESSION_TRACK) && buf.has_remaining() {
            buf.get_str_lenenc()?
        } else {
            buf.get_str_eof()?
        };

        Ok(Self {
            header,
            affected_rows,
            last_insert_id,
            status,
            warnings,
            info,
        })
    }
}
