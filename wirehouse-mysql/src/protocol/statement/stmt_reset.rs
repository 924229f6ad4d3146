use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, CommandByte};

// https://dev.mysql.com/doc/internals/en/com-stmt-reset.html

/// Discard the long data sent for a prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StmtReset {
    pub statement_id: u32,
}

impl ProtocolEncode<'_, Capabilities> for StmtReset {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::StmtReset as u8);
        buf.extend(&self.statement_id.to_le_bytes());

        Ok(())
    }
}

impl ProtocolDecode<'_> for StmtReset {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::StmtReset.expect(&mut buf)?;

        Ok(Self {
            statement_id: buf.try_get_u32_le()?,
        })
    }
}

#[test]
fn test_decode_stmt_reset() -> Result<(), Error> {
    const DATA: &[u8] = b"\x1a\x01\x00\x00\x00";

    assert_eq!(StmtReset::decode(DATA.into())?.statement_id, 1);

    Ok(())
}
