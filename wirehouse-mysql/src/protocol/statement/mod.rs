//! Binary protocol: prepared statements.
//!
//! <https://dev.mysql.com/doc/internals/en/prepared-statements.html>
//! <https://mariadb.com/kb/en/com_stmt_execute/>

mod execute;
mod metadata;
mod prepare;
mod prepare_ok;
mod send_long_data;
mod stmt_close;
mod stmt_reset;

pub use execute::{Execute, ExecuteRequest};
pub use metadata::{StatementMetadata, Statements};
pub use prepare::StmtPrepare;
pub use prepare_ok::{PrepareOk, PrepareResponse};
pub use send_long_data::StmtSendLongData;
pub use stmt_close::StmtClose;
pub use stmt_reset::StmtReset;

/// Parameter type flag marking an unsigned integer.
pub const UNSIGNED_FLAG: u8 = 0x80;
