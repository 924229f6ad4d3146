use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, CommandByte};

// https://dev.mysql.com/doc/internals/en/com-stmt-prepare.html#packet-COM_STMT_PREPARE

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmtPrepare {
    pub query: String,
}

impl ProtocolEncode<'_, Capabilities> for StmtPrepare {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::StmtPrepare as u8);
        buf.extend(self.query.as_bytes());

        Ok(())
    }
}

impl ProtocolDecode<'_> for StmtPrepare {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::StmtPrepare.expect(&mut buf)?;

        Ok(Self {
            query: buf.get_str_eof()?,
        })
    }
}

#[test]
fn test_decode_stmt_prepare() -> Result<(), Error> {
    const DATA: &[u8] = b"\x16SELECT * FROM users WHERE id = ? AND name = ?";

    let p = StmtPrepare::decode(DATA.into())?;

    assert_eq!(p.query, "SELECT * FROM users WHERE id = ? AND name = ?");

    Ok(())
}
