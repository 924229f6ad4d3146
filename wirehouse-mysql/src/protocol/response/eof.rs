use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, Status};

/// Marks the end of a column definition list or a result set, returning status and
/// warnings.
///
/// # Note
///
/// The EOF packet is deprecated as of MySQL 5.7.5. It is only sent to clients that did
/// not negotiate `DEPRECATE_EOF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EofPacket {
    pub warnings: u16,
    pub status: Status,
}

impl ProtocolEncode<'_, Capabilities> for EofPacket {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) -> Result<(), Error> {
        buf.push(0xfe);

        if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.extend_from_slice(&self.warnings.to_le_bytes());
            buf.extend_from_slice(&self.status.bits().to_le_bytes());
        }

        Ok(())
    }
}

impl ProtocolDecode<'_, Capabilities> for EofPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let header = buf.try_get_u8()?;
        if header != 0xfe {
            return Err(err_protocol!(
                "expected 0xfe (EOF_Packet) but found 0x{header:02x}"
            ));
        }

        if !capabilities.contains(Capabilities::PROTOCOL_41) {
            return Ok(Self {
                warnings: 0,
                status: Status::empty(),
            });
        }

        let warnings = buf.try_get_u16_le()?;
        let status = Status::from_bits_truncate(buf.try_get_u16_le()?);

        Ok(Self { status, warnings })
    }
}
