use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, CommandByte};

// https://dev.mysql.com/doc/internals/en/com-stmt-close.html

/// Deallocate a prepared statement. The server never responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StmtClose {
    pub statement_id: u32,
}

impl ProtocolEncode<'_, Capabilities> for StmtClose {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::StmtClose as u8);
        buf.extend(&self.statement_id.to_le_bytes());

        Ok(())
    }
}

impl ProtocolDecode<'_> for StmtClose {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::StmtClose.expect(&mut buf)?;

        Ok(Self {
            statement_id: buf.try_get_u32_le()?,
        })
    }
}
