//! Server side of the [MySQL] / [MariaDB] client-server protocol.
//!
//! Accept connections, authenticate clients and decode their commands, then answer them
//! with results produced by a [`MySqlBackend`].
//!
//! [MySQL]: https://www.mysql.com/
//! [MariaDB]: https://mariadb.org/
#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(future_incompatible)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate wirehouse_core;

mod backend;
mod collation;
mod column;
mod connection;
mod error;
mod io;
mod options;
mod result;
mod server;
mod types;
mod value;

pub mod protocol;

pub use backend::{BackendContext, MySqlBackend, PreparedShape};
pub use collation::Collation;
pub use column::MySqlColumn;
pub use connection::{ConnectionState, MySqlConnection};
pub use error::MySqlDatabaseError;
pub use options::{MySqlServerOptions, NullBitmapLayout};
pub use protocol::{Capabilities, ColumnFlags, ColumnType, Status};
pub use result::{QueryOutcome, ResultSet};
pub use server::MySqlServer;
pub use types::{MySqlDateTime, MySqlTime};
pub use value::Value;

pub use wirehouse_core::error::{Error, Result};
