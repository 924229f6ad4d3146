use std::borrow::Cow;

use bytes::{Buf, Bytes};

use crate::error::{codes, Error, MySqlDatabaseError};
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_err_packet.html
// https://mariadb.com/kb/en/err_packet/

const GENERAL_ERROR: &str = "HY000";

// clients read exactly 5 bytes after the '#' marker
fn is_sql_state(state: &str) -> bool {
    state.len() == 5 && state.is_ascii()
}

/// Indicates that an error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: Option<String>,
    pub error_message: String,
}

impl ErrPacket {
    /// A `sql_state` that is not exactly five ASCII characters is replaced by `HY000`.
    pub fn new(error_code: u16, sql_state: &str, error_message: impl Into<String>) -> Self {
        let sql_state = if is_sql_state(sql_state) {
            sql_state
        } else {
            GENERAL_ERROR
        };

        Self {
            error_code,
            sql_state: Some(sql_state.to_owned()),
            error_message: error_message.into(),
        }
    }

    /// The ERR packet a client is sent for `error`.
    ///
    /// Fatal decode errors all collapse into "Malformed communication packet".
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::UnknownStatement(id) => Self::new(
                codes::ER_UNKNOWN_STMT_HANDLER,
                "HY000",
                format!("Unknown prepared statement handler ({id}) given to mysqld_stmt_execute"),
            ),

            Error::UnknownCommand(_) => {
                Self::new(codes::ER_UNKNOWN_COM_ERROR, "08S01", "Unknown command")
            }

            Error::Database(err) => match err.try_downcast_ref::<MySqlDatabaseError>() {
                Some(err) => err.0.clone(),
                None => {
                    let state = err.code().unwrap_or(Cow::Borrowed(GENERAL_ERROR));

                    Self::new(codes::ER_UNKNOWN_ERROR, &state, err.message())
                }
            },

            Error::Authentication(message) => {
                Self::new(codes::ER_ACCESS_DENIED_ERROR, "28000", message.clone())
            }

            Error::Truncated { .. }
            | Error::InvalidLenencPrefix(_)
            | Error::InvalidType(_)
            | Error::MalformedBitmap(_)
            | Error::Protocol(_) => Self::new(
                codes::ER_MALFORMED_PACKET,
                "HY000",
                "Malformed communication packet.",
            ),

            Error::Cancelled => {
                Self::new(codes::ER_QUERY_INTERRUPTED, "70100", "Query execution was interrupted")
            }

            _ => Self::new(codes::ER_UNKNOWN_ERROR, "HY000", error.to_string()),
        }
    }
}

impl ProtocolEncode<'_, Capabilities> for ErrPacket {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) -> Result<(), Error> {
        buf.push(0xff);
        buf.extend_from_slice(&self.error_code.to_le_bytes());

        if capabilities.contains(Capabilities::PROTOCOL_41) {
            let state = self
                .sql_state
                .as_deref()
                .filter(|state| is_sql_state(state))
                .unwrap_or(GENERAL_ERROR);

            buf.push(b'#');
            buf.extend_from_slice(state.as_bytes());
        }

        buf.extend_from_slice(self.error_message.as_bytes());

        Ok(())
    }
}

impl ProtocolDecode<'_, Capabilities> for ErrPacket {
    fn decode_with(mut buf: Bytes, _: Capabilities) -> Result<Self, Error> {
        let header = buf.try_get_u8()?;
        if header != 0xff {
            return Err(err_protocol!(
                "expected 0xff (ERR_Packet) but found 0x{header:02x}"
            ));
        }

        let error_code = buf.try_get_u16_le()?;

        let sql_state = if buf.first() == Some(&b'#') {
            // if the next byte is '#' then we have the SQL STATE
            buf.advance(1);

            Some(buf.get_str(5)?)
        } else {
            None
        };

        let error_message = buf.get_str_eof()?;

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}
