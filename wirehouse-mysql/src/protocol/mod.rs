//! Packets of the MySQL/MariaDB client-server protocol, as seen from the server.
//!
//! Every packet a server sends can be encoded and every packet a client sends can be
//! decoded; most also implement the opposite direction so a client can be driven in
//! tests.

mod capabilities;
mod column_def;
mod column_flags;
mod column_type;
mod command;
mod null_bitmap;
mod packet;
mod status;

pub mod connect;
pub mod response;
pub mod result_set;
pub mod statement;
pub mod text;

pub use capabilities::Capabilities;
pub use column_def::ColumnDefinition;
pub use column_flags::ColumnFlags;
pub use column_type::ColumnType;
pub use command::{Command, CommandByte};
pub use null_bitmap::{NullBitmap, NullBitmapLayout, RESULT_ROW_OFFSET};
pub use packet::{Packet, MAX_PAYLOAD_LEN};
pub use response::{EofPacket, ErrPacket, OkPacket};
pub use status::Status;
