//! Types for working with errors produced by wirehouse.

use std::any::type_name;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::Display;
use std::io;

/// A specialized `Result` type for wirehouse.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Convenience type alias for boxed errors crossing crate boundaries.
pub type BoxDynError = Box<dyn StdError + 'static + Send + Sync>;

/// Represents all the ways a connection can fail while speaking the protocol.
///
/// Whether the connection survives an error is decided by [`Error::is_fatal`]: fatal
/// errors leave the byte stream in an unknown state and the connection must be closed,
/// the rest are answered with an error packet and the command loop carries on.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error communicating with the client.
    #[error("error communicating with the client: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the stream on a packet boundary.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A field, header or payload ended before its declared width.
    #[error("unexpected end of packet: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// `0xfb` and `0xff` are not valid length-encoded integer prefixes.
    #[error("invalid length-encoded integer prefix: 0x{0:02x}")]
    InvalidLenencPrefix(u8),

    /// A column or parameter type code that the binary protocol does not define.
    #[error("invalid column type: 0x{0:02x}")]
    InvalidType(u8),

    /// The NULL bitmap or the new-params-bound flag of an execute request is inconsistent
    /// with the prepared statement it references.
    #[error("malformed NULL bitmap: {0}")]
    MalformedBitmap(String),

    /// A statement command referenced a statement id that was never prepared
    /// (or has been closed).
    #[error("unknown prepared statement handler ({0})")]
    UnknownStatement(u32),

    /// The leading byte of a command packet is not a command this server handles.
    #[error("unknown command: 0x{0:02x}")]
    UnknownCommand(u8),

    /// Unexpected or invalid data encountered while communicating with the client.
    ///
    /// This indicates either a client speaking a different protocol dialect or a
    /// corrupted stream.
    #[error("encountered unexpected or invalid data: {0}")]
    Protocol(String),

    /// Error returned from the query backend, forwarded to the client as-is.
    #[error("error returned from backend: {0}")]
    Database(Box<dyn DatabaseError>),

    /// Error occurred while parsing server options.
    #[error("error occurred while parsing server options: {0}")]
    Configuration(#[source] BoxDynError),

    /// The client failed to authenticate.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The connection was cancelled while a backend call was in flight.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns `true` when the connection can no longer be used after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::UnknownStatement(_)
                | Error::UnknownCommand(_)
                | Error::Database(_)
                | Error::Configuration(_)
        )
    }

    pub fn into_database_error(self) -> Option<Box<dyn DatabaseError + 'static>> {
        match self {
            Error::Database(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_database_error(&self) -> Option<&(dyn DatabaseError + 'static)> {
        match self {
            Error::Database(err) => Some(&**err),
            _ => None,
        }
    }

    #[allow(dead_code)]
    #[inline]
    pub fn protocol(err: impl Display) -> Self {
        Error::Protocol(err.to_string())
    }

    #[doc(hidden)]
    #[inline]
    pub fn config(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::Configuration(err.into())
    }
}

impl From<bytes::TryGetError> for Error {
    #[inline]
    fn from(err: bytes::TryGetError) -> Self {
        Error::Truncated {
            needed: err.requested,
            remaining: err.available,
        }
    }
}

/// An error that was returned from the query backend.
///
/// Backends return these from their hooks; the connection turns them into ERR packets.
pub trait DatabaseError: 'static + Send + Sync + StdError {
    /// The primary, human-readable error message.
    fn message(&self) -> &str;

    /// The (SQLSTATE) code for the error.
    fn code(&self) -> Option<Cow<'_, str>> {
        None
    }

    #[doc(hidden)]
    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static);

    #[doc(hidden)]
    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static>;
}

impl dyn DatabaseError {
    /// Downcast a reference to this generic database error to a specific
    /// database error type.
    ///
    /// Returns `None` if the downcast fails (the types do not match).
    pub fn try_downcast_ref<E: DatabaseError>(&self) -> Option<&E> {
        self.as_error().downcast_ref()
    }

    /// Downcast this generic database error to a specific database error type.
    ///
    /// # Panics
    ///
    /// Panics if the database error type is not `E`.
    pub fn downcast_ref<E: DatabaseError>(&self) -> &E {
        self.try_downcast_ref().unwrap_or_else(|| {
            panic!("downcast to wrong DatabaseError type; original error: {self}")
        })
    }

    /// Downcast this generic database error to a specific database error type.
    pub fn try_downcast<E: DatabaseError>(
        self: Box<Self>,
    ) -> std::result::Result<Box<E>, Box<Self>> {
        if self.as_error().is::<E>() {
            Ok(self
                .into_error()
                .downcast()
                .unwrap_or_else(|_| unreachable!("type checked above: {}", type_name::<E>())))
        } else {
            Err(self)
        }
    }
}

impl<E> From<E> for Error
where
    E: DatabaseError,
{
    #[inline]
    fn from(error: E) -> Self {
        Error::Database(Box::new(error))
    }
}

/// Format an error message as a `Protocol` error.
#[macro_export]
macro_rules! err_protocol {
    ($($fmt_args:tt)*) => {
        $crate::error::Error::Protocol(
            format!(
                "{} ({}:{})",
                // Note: the format string needs to be unmodified (e.g. by `concat!()`)
                // for implicit formatting arguments to work
                format_args!($($fmt_args)*),
                module_path!(),
                line!(),
            )
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_classifies_fatal_errors() {
        assert!(Error::ConnectionClosed.is_fatal());
        assert!(Error::Truncated { needed: 4, remaining: 1 }.is_fatal());
        assert!(Error::InvalidLenencPrefix(0xfb).is_fatal());
        assert!(Error::InvalidType(0x42).is_fatal());
        assert!(Error::MalformedBitmap("bit 9 set".into()).is_fatal());
        assert!(Error::Cancelled.is_fatal());
        assert!(err_protocol!("bad header").is_fatal());

        assert!(!Error::UnknownStatement(7).is_fatal());
        assert!(!Error::UnknownCommand(0x99).is_fatal());
    }

    #[test]
    fn it_maps_try_get_errors_to_truncated() {
        use bytes::Buf;

        let mut buf: &[u8] = b"\x01";
        let err = Error::from(buf.try_get_u32_le().unwrap_err());

        assert!(matches!(
            err,
            Error::Truncated {
                needed: 4,
                remaining: 1
            }
        ));
    }
}
