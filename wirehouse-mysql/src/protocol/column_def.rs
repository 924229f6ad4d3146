use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{MySqlBufExt, MySqlBufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, ColumnFlags, ColumnType};

/// Describes a column in a result set or a parameter of a prepared statement.
///
/// <https://mariadb.com/kb/en/result-set-packets/#column-definition-packet>
/// <https://dev.mysql.com/doc/internals/en/com-query-response.html#packet-Protocol::ColumnDefinition>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub schema: String,
    pub table_alias: String,
    pub table: String,
    pub alias: String,
    pub name: String,
    pub charset: u16,
    pub max_size: u32,
    pub ty: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl ColumnDefinition {
    /// A parameter placeholder as MySQL describes `?` in a prepare response.
    pub fn parameter() -> Self {
        Self {
            schema: String::new(),
            table_alias: String::new(),
            table: String::new(),
            alias: "?".into(),
            name: "?".into(),
            charset: BINARY_CHARSET,
            max_size: 0,
            ty: ColumnType::VarString,
            flags: ColumnFlags::BINARY_COLLATION,
            decimals: 0,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED)
    }
}

/// Collation id of the `binary` character set.
pub(crate) const BINARY_CHARSET: u16 = 63;

impl ProtocolEncode<'_, Capabilities> for ColumnDefinition {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.put_str_lenenc("def");
        buf.put_str_lenenc(&self.schema);
        buf.put_str_lenenc(&self.table_alias);
        buf.put_str_lenenc(&self.table);
        buf.put_str_lenenc(&self.alias);
        buf.put_str_lenenc(&self.name);

        // length of the fixed-length fields that follow; always 0x0c
        buf.put_uint_lenenc(0x0c);

        buf.extend_from_slice(&self.charset.to_le_bytes());
        buf.extend_from_slice(&self.max_size.to_le_bytes());
        buf.push(self.ty as u8);
        buf.extend_from_slice(&self.flags.bits().to_le_bytes());
        buf.push(self.decimals);

        // filler
        buf.extend_from_slice(&[0, 0]);

        Ok(())
    }
}

impl ProtocolDecode<'_> for ColumnDefinition {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let catalog = buf.get_str_lenenc()?;

        if catalog != "def" {
            return Err(err_protocol!(
                "expected catalog \"def\" in column definition but found {catalog:?}"
            ));
        }

        let schema = buf.get_str_lenenc()?;
        let table_alias = buf.get_str_lenenc()?;
        let table = buf.get_str_lenenc()?;
        let alias = buf.get_str_lenenc()?;
        let name = buf.get_str_lenenc()?;

        let fixed_len_fields_len = buf.get_uint_lenenc()?;

        if fixed_len_fields_len != 0x0c {
            return Err(err_protocol!(
                "expected 0x0c fixed-length field bytes but found {fixed_len_fields_len}"
            ));
        }

        let charset = buf.try_get_u16_le()?;
        let max_size = buf.try_get_u32_le()?;
        let ty = ColumnType::try_from(buf.try_get_u8()?)?;
        let flags = ColumnFlags::from_bits_truncate(buf.try_get_u16_le()?);
        let decimals = buf.try_get_u8()?;

        Ok(Self {
            schema,
            table_alias,
            table,
            alias,
            name,
            charset,
            max_size,
            ty,
            flags,
            decimals,
        })
    }
}
