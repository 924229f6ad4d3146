use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, CommandByte};

// https://dev.mysql.com/doc/internals/en/com-stmt-send-long-data.html

/// A chunk of a parameter value sent ahead of `COM_STMT_EXECUTE`. The server never
/// responds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmtSendLongData {
    pub statement_id: u32,
    pub param_id: u16,
    pub data: Bytes,
}

impl ProtocolEncode<'_, Capabilities> for StmtSendLongData {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::StmtSendLongData as u8);
        buf.extend(&self.statement_id.to_le_bytes());
        buf.extend(&self.param_id.to_le_bytes());
        buf.extend_from_slice(&self.data);

        Ok(())
    }
}

impl ProtocolDecode<'_> for StmtSendLongData {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::StmtSendLongData.expect(&mut buf)?;

        let statement_id = buf.try_get_u32_le()?;
        let param_id = buf.try_get_u16_le()?;

        Ok(Self {
            statement_id,
            param_id,
            data: buf,
        })
    }
}

#[test]
fn test_decode_send_long_data() -> Result<(), Error> {
    const DATA: &[u8] = b"\x18\x02\x00\x00\x00\x01\x00chunk";

    let p = StmtSendLongData::decode(DATA.into())?;

    assert_eq!(p.statement_id, 2);
    assert_eq!(p.param_id, 1);
    assert_eq!(&p.data[..], b"chunk");

    Ok(())
}
