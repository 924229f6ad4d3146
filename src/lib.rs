#![doc = include_str!("../README.md")]

pub use wirehouse_core::error::{self, BoxDynError, DatabaseError, Error, Result};

#[cfg(feature = "mysql")]
pub use wirehouse_mysql::{
    self as mysql, BackendContext, MySqlBackend, MySqlColumn, MySqlServer, MySqlServerOptions,
    PreparedShape, QueryOutcome, ResultSet, Value,
};
