//! Core of wirehouse, the server-side MySQL/MariaDB wire protocol toolkit.
//!
//! This crate holds the protocol-agnostic pieces: the error type, byte-buffer extension
//! traits, the encode/decode traits every packet implements, and the buffered socket a
//! connection reads packets from. Not intended to be used directly; see `wirehouse`.
#![recursion_limit = "512"]
#![warn(future_incompatible, rust_2018_idioms)]
#![allow(clippy::needless_doctest_main, clippy::type_complexity)]

#[macro_use]
pub mod error;

pub mod io;
pub mod net;

pub use bytes;

pub use error::{BoxDynError, DatabaseError, Error, Result};
