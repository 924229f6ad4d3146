use std::fmt::Write as _;

use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{MySqlBufExt, MySqlBufMutExt};
use crate::protocol::ColumnType;
use crate::types::{MySqlDateTime, MySqlTime};

/// A single parameter or cell value.
///
/// The wire shape of a value is never derived from the value itself but from the column
/// type (and unsigned flag) it is sent as.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
    Date(MySqlDateTime),
    DateTime(MySqlDateTime),
    Time(MySqlTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Decode one binary-protocol value of type `ty`.
    pub fn decode_binary(buf: &mut Bytes, ty: ColumnType, unsigned: bool) -> Result<Self, Error> {
        Ok(match ty {
            ColumnType::Null => Value::Null,

            ColumnType::Tiny if unsigned => Value::UInt(u64::from(buf.try_get_u8()?)),
            ColumnType::Tiny => Value::Int(i64::from(buf.try_get_i8()?)),

            ColumnType::Short | ColumnType::Year if unsigned => {
                Value::UInt(u64::from(buf.try_get_u16_le()?))
            }
            ColumnType::Short | ColumnType::Year => Value::Int(i64::from(buf.try_get_i16_le()?)),

            ColumnType::Long | ColumnType::Int24 if unsigned => {
                Value::UInt(u64::from(buf.try_get_u32_le()?))
            }
            ColumnType::Long | ColumnType::Int24 => Value::Int(i64::from(buf.try_get_i32_le()?)),

            ColumnType::LongLong if unsigned => Value::UInt(buf.try_get_u64_le()?),
            ColumnType::LongLong => Value::Int(buf.try_get_i64_le()?),

            ColumnType::Float => Value::Float(buf.try_get_f32_le()?),
            ColumnType::Double => Value::Double(buf.try_get_f64_le()?),

            ColumnType::Date => Value::Date(MySqlDateTime::decode_binary(buf)?),
            ColumnType::Datetime | ColumnType::Timestamp => {
                Value::DateTime(MySqlDateTime::decode_binary(buf)?)
            }
            ColumnType::Time => Value::Time(MySqlTime::decode_binary(buf)?),

            ColumnType::Decimal
            | ColumnType::NewDecimal
            | ColumnType::VarChar
            | ColumnType::VarString
            | ColumnType::String
            | ColumnType::TinyBlob
            | ColumnType::MediumBlob
            | ColumnType::LongBlob
            | ColumnType::Blob
            | ColumnType::Enum
            | ColumnType::Set
            | ColumnType::Bit
            | ColumnType::Json
            | ColumnType::Geometry => Value::Bytes(buf.get_bytes_lenenc()?),
        })
    }

    /// Encode this value in the binary protocol as type `ty`.
    ///
    /// Integers are range-checked against the signed or unsigned range of `ty`,
    /// as selected by `unsigned`. `NULL` is never written; it lives in the row's
    /// NULL bitmap.
    pub fn encode_binary(
        &self,
        buf: &mut Vec<u8>,
        ty: ColumnType,
        unsigned: bool,
    ) -> Result<(), Error> {
        match ty {
            ColumnType::Null => {}

            ColumnType::Tiny => buf.push(self.to_bits(1, ty, unsigned)?.to_le_bytes()[0]),
            ColumnType::Short | ColumnType::Year => {
                buf.extend_from_slice(&self.to_bits(2, ty, unsigned)?.to_le_bytes()[..2]);
            }
            ColumnType::Long | ColumnType::Int24 => {
                buf.extend_from_slice(&self.to_bits(4, ty, unsigned)?.to_le_bytes()[..4]);
            }
            ColumnType::LongLong => {
                buf.extend_from_slice(&self.to_bits(8, ty, unsigned)?.to_le_bytes());
            }

            #[allow(clippy::cast_possible_truncation)]
            ColumnType::Float => {
                let v = match *self {
                    Value::Float(v) => v,
                    Value::Double(v) => v as f32,
                    _ => return Err(self.mismatch(ty)),
                };

                buf.extend_from_slice(&v.to_le_bytes());
            }

            ColumnType::Double => {
                let v = match *self {
                    Value::Float(v) => f64::from(v),
                    Value::Double(v) => v,
                    _ => return Err(self.mismatch(ty)),
                };

                buf.extend_from_slice(&v.to_le_bytes());
            }

            ColumnType::Date | ColumnType::Datetime | ColumnType::Timestamp => match self {
                Value::Date(v) | Value::DateTime(v) => {
                    v.encode_binary(buf, ty == ColumnType::Date);
                }
                _ => return Err(self.mismatch(ty)),
            },

            ColumnType::Time => match self {
                Value::Time(v) => v.encode_binary(buf),
                _ => return Err(self.mismatch(ty)),
            },

            _ => match self {
                Value::Bytes(bytes) => buf.put_bytes_lenenc(bytes),
                _ => {
                    let mut text = Vec::new();
                    self.encode_text(&mut text);
                    buf.put_bytes_lenenc(&text);
                }
            },
        }

        Ok(())
    }

    /// Append the text-protocol rendering of this value (without the length prefix).
    pub fn encode_text(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Null => {}
            Value::Int(v) => buf.extend_from_slice(itoa::Buffer::new().format(*v).as_bytes()),
            Value::UInt(v) => buf.extend_from_slice(itoa::Buffer::new().format(*v).as_bytes()),
            Value::Float(v) => buf.extend_from_slice(v.to_string().as_bytes()),
            Value::Double(v) => buf.extend_from_slice(v.to_string().as_bytes()),
            Value::Bytes(v) => buf.extend_from_slice(v),
            Value::Date(v) => {
                let mut s = String::with_capacity(10);
                let _ = v.fmt_date(&mut s);
                buf.extend_from_slice(s.as_bytes());
            }
            Value::DateTime(v) => {
                let mut s = String::with_capacity(26);
                let _ = write!(s, "{v}");
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Time(v) => {
                let mut s = String::with_capacity(17);
                let _ = write!(s, "{v}");
                buf.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// The type and unsigned flag a client would bind this value as.
    pub fn column_type(&self) -> (ColumnType, bool) {
        match self {
            Value::Null => (ColumnType::Null, false),
            Value::Int(_) => (ColumnType::LongLong, false),
            Value::UInt(_) => (ColumnType::LongLong, true),
            Value::Float(_) => (ColumnType::Float, false),
            Value::Double(_) => (ColumnType::Double, false),
            Value::Bytes(_) => (ColumnType::VarString, false),
            Value::Date(_) => (ColumnType::Date, false),
            Value::DateTime(_) => (ColumnType::Datetime, false),
            Value::Time(_) => (ColumnType::Time, false),
        }
    }

    // two's complement bits of an integer value, range-checked against `width` bytes
    fn to_bits(&self, width: u32, ty: ColumnType, unsigned: bool) -> Result<u64, Error> {
        let bits = width * 8;

        let value = match *self {
            Value::Int(v) => i128::from(v),
            Value::UInt(v) => i128::from(v),
            _ => return Err(self.mismatch(ty)),
        };

        let (min, max) = if unsigned {
            (0, (1_i128 << bits) - 1)
        } else {
            (-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
        };

        if value < min || value > max {
            return Err(self.out_of_range(ty));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(value as u64)
    }

    fn mismatch(&self, ty: ColumnType) -> Error {
        err_protocol!("cannot encode {:?} as {:?}", self, ty)
    }

    fn out_of_range(&self, ty: ColumnType) -> Error {
        err_protocol!("{:?} is out of range for {:?}", self, ty)
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from!(
    i8 => Int, i16 => Int, i32 => Int, i64 => Int,
    u8 => UInt, u16 => UInt, u32 => UInt, u64 => UInt,
    f32 => Float, f64 => Double,
    Bytes => Bytes, Vec<u8> => Bytes, String => Bytes,
    MySqlTime => Time,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
