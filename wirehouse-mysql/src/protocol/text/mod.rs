//! Text protocol commands.
//!
//! Each packet decodes from the full command payload, leading command byte included.

mod field_list;
mod init_db;
mod ping;
mod process_kill;
mod query;
mod quit;
mod set_option;
mod statistics;

pub use field_list::FieldList;
pub use init_db::InitDb;
pub use ping::Ping;
pub use process_kill::ProcessKill;
pub use query::Query;
pub use quit::Quit;
pub use set_option::{SetOption, SetOptionValue};
pub use statistics::Statistics;
