use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, CommandByte};

// https://dev.mysql.com/doc/internals/en/com-query.html

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(pub String);

impl ProtocolEncode<'_, Capabilities> for Query {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::Query as u8);
        buf.extend(self.0.as_bytes());

        Ok(())
    }
}

impl ProtocolDecode<'_> for Query {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::Query.expect(&mut buf)?;

        Ok(Self(buf.get_str_eof()?))
    }
}

#[test]
fn test_decode_query() -> Result<(), Error> {
    const DATA: &[u8] = b"\x03SELECT @@version";

    assert_eq!(Query::decode(DATA.into())?.0, "SELECT @@version");

    Ok(())
}
