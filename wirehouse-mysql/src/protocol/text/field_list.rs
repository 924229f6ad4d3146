use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::CommandByte;

// https://dev.mysql.com/doc/internals/en/com-field-list.html

/// List the columns of a table. Deprecated since MySQL 5.7.11 but still sent by
/// older clients for tab completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList {
    pub table: String,
    pub wildcard: String,
}

impl ProtocolDecode<'_> for FieldList {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::FieldList.expect(&mut buf)?;

        let table = buf.get_str_nul()?;
        let wildcard = buf.get_str_eof()?;

        Ok(Self { table, wildcard })
    }
}

#[test]
fn test_decode_field_list() -> Result<(), Error> {
    const DATA: &[u8] = b"\x04users\x00na%";

    let p = FieldList::decode(DATA.into())?;

    assert_eq!(p.table, "users");
    assert_eq!(p.wildcard, "na%");

    Ok(())
}
