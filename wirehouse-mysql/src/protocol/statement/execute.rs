use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{ProtocolDecode, ProtocolEncode};
use crate::protocol::statement::{Statements, UNSIGNED_FLAG};
use crate::protocol::{Capabilities, ColumnType, CommandByte, NullBitmap, NullBitmapLayout};
use crate::value::Value;

/// Asks the server to execute a prepared statement as identified.
///
/// <https://dev.mysql.com/doc/internals/en/com-stmt-execute.html>
/// <https://mariadb.com/kb/en/com_stmt_execute/>
///
/// Decoding needs the connection's prepared statements: the parameter count sizes the NULL
/// bitmap and the cached parameter types are reused when the client does not rebind them.
#[derive(Debug, Clone, PartialEq)]
pub struct Execute {
    pub statement_id: u32,
    pub flags: u8,
    pub iterations: u32,
    pub params: Vec<Value>,
}

impl<'s> ProtocolDecode<'_, (&'s mut Statements, NullBitmapLayout)> for Execute {
    fn decode_with(
        mut buf: Bytes,
        (statements, layout): (&'s mut Statements, NullBitmapLayout),
    ) -> Result<Self, Error> {
        CommandByte::StmtExecute.expect(&mut buf)?;

        let statement_id = buf.try_get_u32_le()?;
        let flags = buf.try_get_u8()?;
        let iterations = buf.try_get_u32_le()?;

        let metadata = statements
            .get_mut(statement_id)
            .ok_or(Error::UnknownStatement(statement_id))?;

        let count = metadata.param_count();
        let mut params = Vec::with_capacity(count);

        // no parameters: neither a bitmap nor a bind flag follows
        if count > 0 {
            let bitmap = NullBitmap::decode(&mut buf, count, layout.offset())?;

            match buf.try_get_u8()? {
                0 => {}

                1 => {
                    let mut types = Vec::with_capacity(count);

                    for _ in 0..count {
                        let ty = ColumnType::try_from(buf.try_get_u8()?)?;
                        let flag = buf.try_get_u8()?;

                        types.push((ty, flag));
                    }

                    metadata.param_types = types;
                }

                other => {
                    return Err(Error::MalformedBitmap(format!(
                        "new_params_bind_flag must be 0 or 1 but found {other}"
                    )));
                }
            }

            for (index, &(ty, flag)) in metadata.param_types.iter().enumerate() {
                let long_data = u16::try_from(index)
                    .ok()
                    .and_then(|index| metadata.long_data.remove(&index));

                let value = if bitmap.is_null(index) {
                    Value::Null
                } else if let Some(data) = long_data {
                    Value::Bytes(data.into())
                } else {
                    Value::decode_binary(&mut buf, ty, flag & UNSIGNED_FLAG != 0)?
                };

                params.push(value);
            }

            metadata.long_data.clear();
        }

        if buf.has_remaining() {
            tracing::debug!(
                statement_id,
                trailing = buf.remaining(),
                "ignoring trailing bytes after COM_STMT_EXECUTE parameters"
            );
        }

        Ok(Self {
            statement_id,
            flags,
            iterations,
            params,
        })
    }
}

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/mysql__com_8h.html#a3e5e9e744ff6f7b989a604fd669977da
const NO_CURSOR: u8 = 0;

/// The client side of `COM_STMT_EXECUTE`.
///
/// Types are derived from the values themselves and sent only when `bind_types` is set.
#[derive(Debug)]
pub struct ExecuteRequest<'a> {
    pub statement_id: u32,
    pub params: &'a [Value],
    pub layout: NullBitmapLayout,
    pub bind_types: bool,
}

impl ProtocolEncode<'_, Capabilities> for ExecuteRequest<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::StmtExecute as u8);
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        buf.push(NO_CURSOR);

        // number of times to execute the statement; can only be 1
        buf.extend_from_slice(&1_u32.to_le_bytes());

        if self.params.is_empty() {
            return Ok(());
        }

        let mut bitmap = NullBitmap::for_execute(self.layout, self.params.len());
        for (index, param) in self.params.iter().enumerate() {
            if param.is_null() {
                bitmap.set_null(index);
            }
        }

        buf.extend_from_slice(bitmap.as_bytes());
        buf.push(u8::from(self.bind_types));

        if self.bind_types {
            for param in self.params {
                let (ty, unsigned) = param.column_type();

                buf.push(ty as u8);
                buf.push(if unsigned { UNSIGNED_FLAG } else { 0 });
            }
        }

        for param in self.params.iter().filter(|param| !param.is_null()) {
            let (ty, unsigned) = param.column_type();
            param.encode_binary(buf, ty, unsigned)?;
        }

        Ok(())
    }
}
