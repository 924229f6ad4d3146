use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::ProtocolDecode;
use crate::protocol::CommandByte;

// https://dev.mysql.com/doc/internals/en/com-process-kill.html

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessKill {
    pub connection_id: u32,
}

impl ProtocolDecode<'_> for ProcessKill {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::ProcessKill.expect(&mut buf)?;

        Ok(Self {
            connection_id: buf.try_get_u32_le()?,
        })
    }
}
