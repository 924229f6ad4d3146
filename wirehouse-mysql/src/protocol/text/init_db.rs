use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, CommandByte};

// https://dev.mysql.com/doc/internals/en/com-init-db.html

/// Change the default schema of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitDb(pub String);

impl ProtocolEncode<'_, Capabilities> for InitDb {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::InitDb as u8);
        buf.extend(self.0.as_bytes());

        Ok(())
    }
}

impl ProtocolDecode<'_> for InitDb {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::InitDb.expect(&mut buf)?;

        Ok(Self(buf.get_str_eof()?))
    }
}
