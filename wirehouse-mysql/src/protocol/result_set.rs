//! Result set responses to `COM_QUERY`, `COM_STMT_EXECUTE` and `COM_FIELD_LIST`.
//!
//! <https://dev.mysql.com/doc/internals/en/com-query-response.html>
//! <https://dev.mysql.com/doc/internals/en/binary-protocol-resultset.html>

use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{MySqlBufExt, MySqlBufMutExt, ProtocolEncode};
use crate::protocol::response::{EofPacket, OkPacket};
use crate::protocol::{
    Capabilities, ColumnDefinition, NullBitmap, Packet, Status, RESULT_ROW_OFFSET,
};
use crate::result::ResultSet;
use crate::value::Value;

/// Sent in place of a value in a text row, and after a `COM_FIELD_LIST` definition.
const NULL: u8 = 0xfb;

/// Number of columns that follow; the first packet of a result set.
#[derive(Debug, Clone, Copy)]
pub struct ColumnCount(pub u64);

impl ProtocolEncode<'_, Capabilities> for ColumnCount {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.put_uint_lenenc(self.0);
        Ok(())
    }
}

/// A row of the text protocol: one lenenc string per value, `0xfb` for `NULL`.
#[derive(Debug)]
pub struct TextRow<'a>(pub &'a [Value]);

impl ProtocolEncode<'_, Capabilities> for TextRow<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        let mut text = Vec::new();

        for value in self.0 {
            if value.is_null() {
                buf.push(NULL);
                continue;
            }

            text.clear();
            value.encode_text(&mut text);
            buf.put_bytes_lenenc(&text);
        }

        Ok(())
    }
}

impl TextRow<'_> {
    /// Decode `count` text values; non-null values come back as [`Value::Bytes`].
    pub fn decode(mut buf: Bytes, count: usize) -> Result<Vec<Value>, Error> {
        let mut values = Vec::with_capacity(count);

        for _ in 0..count {
            if buf.first() == Some(&NULL) {
                buf.advance(1);
                values.push(Value::Null);
            } else {
                values.push(Value::Bytes(buf.get_bytes_lenenc()?));
            }
        }

        Ok(values)
    }
}

/// A row of the binary protocol: `0x00`, a NULL bitmap offset by 2, then every non-null
/// value encoded as its column's type.
#[derive(Debug)]
pub struct BinaryRow<'a> {
    pub columns: &'a [ColumnDefinition],
    pub values: &'a [Value],
}

impl ProtocolEncode<'_, Capabilities> for BinaryRow<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        if self.columns.len() != self.values.len() {
            return Err(err_protocol!(
                "row has {} values but the result set has {} columns",
                self.values.len(),
                self.columns.len()
            ));
        }

        buf.push(0x00);

        let mut bitmap = NullBitmap::for_result_row(self.values.len());
        for (index, value) in self.values.iter().enumerate() {
            if value.is_null() {
                bitmap.set_null(index);
            }
        }

        buf.extend_from_slice(bitmap.as_bytes());

        for (column, value) in self.columns.iter().zip(self.values) {
            if !value.is_null() {
                value.encode_binary(buf, column.ty, column.is_unsigned())?;
            }
        }

        Ok(())
    }
}

impl BinaryRow<'_> {
    pub fn decode(mut buf: Bytes, columns: &[ColumnDefinition]) -> Result<Vec<Value>, Error> {
        let header = buf.try_get_u8()?;
        if header != 0x00 {
            return Err(err_protocol!(
                "expected 0x00 (binary row) but found 0x{header:02x}"
            ));
        }

        let bitmap = NullBitmap::decode(&mut buf, columns.len(), RESULT_ROW_OFFSET)?;

        columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                if bitmap.is_null(index) {
                    Ok(Value::Null)
                } else {
                    Value::decode_binary(&mut buf, column.ty, column.is_unsigned())
                }
            })
            .collect()
    }
}

/// A column definition as listed by `COM_FIELD_LIST`, followed by its (always `NULL`)
/// default value.
#[derive(Debug)]
pub struct FieldDefinition<'a>(pub &'a ColumnDefinition);

impl ProtocolEncode<'_, Capabilities> for FieldDefinition<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) -> Result<(), Error> {
        self.0.encode_with(buf, capabilities)?;
        buf.push(NULL);

        Ok(())
    }
}

/// The packet that ends a column list or a result set: an EOF, or with `DEPRECATE_EOF`
/// an OK packet headed `0xfe`.
#[derive(Debug, Clone, Copy)]
pub struct EndOfRows {
    pub status: Status,
    pub warnings: u16,
}

impl ProtocolEncode<'_, Capabilities> for EndOfRows {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) -> Result<(), Error> {
        if capabilities.contains(Capabilities::DEPRECATE_EOF) {
            OkPacket::eof(self.status, self.warnings).encode_with(buf, capabilities)
        } else {
            EofPacket {
                warnings: self.warnings,
                status: self.status,
            }
            .encode_with(buf, capabilities)
        }
    }
}

/// A complete result set response, framed.
///
/// A result set without columns is sent as a single OK packet.
#[derive(Debug)]
pub struct ResultSetResponse<'a> {
    pub result: &'a ResultSet,
    pub binary: bool,
    pub status: Status,
    pub warnings: u16,
}

impl<'s> ProtocolEncode<'s, (Capabilities, &'s mut u8)> for ResultSetResponse<'_> {
    fn encode_with(
        &self,
        buf: &mut Vec<u8>,
        (capabilities, sequence_id): (Capabilities, &'s mut u8),
    ) -> Result<(), Error> {
        let columns = &self.result.columns;

        if columns.is_empty() {
            let ok = OkPacket {
                warnings: self.warnings,
                ..OkPacket::new(self.status)
            };

            return Packet(ok).encode_with(buf, (capabilities, sequence_id));
        }

        Packet(ColumnCount(columns.len() as u64))
            .encode_with(buf, (capabilities, &mut *sequence_id))?;

        for column in columns {
            Packet(column.definition()).encode_with(buf, (capabilities, &mut *sequence_id))?;
        }

        // the intermediate EOF is dropped entirely with DEPRECATE_EOF
        if !capabilities.contains(Capabilities::DEPRECATE_EOF) {
            let eof = EofPacket {
                warnings: 0,
                status: self.status,
            };

            Packet(eof).encode_with(buf, (capabilities, &mut *sequence_id))?;
        }

        if self.binary {
            let definitions: Vec<ColumnDefinition> = columns
                .iter()
                .map(|column| column.definition().clone())
                .collect();

            for row in &self.result.rows {
                let row = BinaryRow {
                    columns: &definitions,
                    values: row,
                };

                Packet(row).encode_with(buf, (capabilities, &mut *sequence_id))?;
            }
        } else {
            for row in &self.result.rows {
                if row.len() != columns.len() {
                    return Err(err_protocol!(
                        "row has {} values but the result set has {} columns",
                        row.len(),
                        columns.len()
                    ));
                }

                Packet(TextRow(row)).encode_with(buf, (capabilities, &mut *sequence_id))?;
            }
        }

        let end = EndOfRows {
            status: self.status,
            warnings: self.warnings,
        };

        Packet(end).encode_with(buf, (capabilities, sequence_id))
    }
}

/// The response to `COM_FIELD_LIST`: one definition per column, then a terminator.
#[derive(Debug)]
pub struct FieldListResponse<'a> {
    pub columns: &'a [ColumnDefinition],
    pub status: Status,
}

impl<'s> ProtocolEncode<'s, (Capabilities, &'s mut u8)> for FieldListResponse<'_> {
    fn encode_with(
        &self,
        buf: &mut Vec<u8>,
        (capabilities, sequence_id): (Capabilities, &'s mut u8),
    ) -> Result<(), Error> {
        for column in self.columns {
            Packet(FieldDefinition(column))
                .encode_with(buf, (capabilities, &mut *sequence_id))?;
        }

        let end = EndOfRows {
            status: self.status,
            warnings: 0,
        };

        Packet(end).encode_with(buf, (capabilities, sequence_id))
    }
}
