//! Generic response packets.
//!
//! <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_response_packets.html>
//! <https://mariadb.com/kb/en/library/4-server-response-packets/>

mod eof;
mod err;
mod ok;

pub use eof::EofPacket;
pub use err::ErrPacket;
pub use ok::OkPacket;
