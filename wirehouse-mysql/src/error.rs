use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};

pub(crate) use wirehouse_core::error::*;

use crate::protocol::response::ErrPacket;

/// Server error numbers sent in ERR packets.
///
/// <https://mariadb.com/kb/en/mariadb-error-codes/>
pub(crate) mod codes {
    pub const ER_ACCESS_DENIED_ERROR: u16 = 1045;
    pub const ER_UNKNOWN_COM_ERROR: u16 = 1047;
    pub const ER_HANDSHAKE_ERROR: u16 = 1043;
    pub const ER_NO_SUCH_THREAD: u16 = 1094;
    pub const ER_UNKNOWN_ERROR: u16 = 1105;
    pub const ER_NOT_SUPPORTED_YET: u16 = 1235;
    pub const ER_UNKNOWN_STMT_HANDLER: u16 = 1243;
    pub const ER_NET_PACKET_TOO_LARGE: u16 = 1153;
    pub const ER_QUERY_INTERRUPTED: u16 = 1317;
    pub const ER_MAX_PREPARED_STMT_COUNT_REACHED: u16 = 1461;
    pub const ER_MALFORMED_PACKET: u16 = 1835;
}

/// An error a [`MySqlBackend`](crate::MySqlBackend) reports to the client as-is.
pub struct MySqlDatabaseError(pub(crate) ErrPacket);

impl MySqlDatabaseError {
    /// An error with the given error number, five-character SQLSTATE and message.
    pub fn new(code: u16, sql_state: &str, message: impl Into<String>) -> Self {
        Self(ErrPacket::new(code, sql_state, message))
    }

    /// The MySQL error number, e.g. `1146` for "table doesn't exist".
    pub fn number(&self) -> u16 {
        self.0.error_code
    }
}

impl Debug for MySqlDatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlDatabaseError")
            .field("code", &self.code())
            .field("number", &self.number())
            .field("message", &self.message())
            .finish()
    }
}

impl Display for MySqlDatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code() {
            write!(f, "{} ({}): {}", self.number(), code, self.message())
        } else {
            write!(f, "{}: {}", self.number(), self.message())
        }
    }
}

impl StdError for MySqlDatabaseError {}

impl DatabaseError for MySqlDatabaseError {
    #[inline]
    fn message(&self) -> &str {
        &self.0.error_message
    }

    #[inline]
    fn code(&self) -> Option<Cow<'_, str>> {
        self.0.sql_state.as_deref().map(Cow::Borrowed)
    }

    #[doc(hidden)]
    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    #[doc(hidden)]
    fn into_error(self: Box<Self>) -> BoxDynError {
        self
    }
}
