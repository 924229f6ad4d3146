//! Temporal values as the binary protocol carries them.
//!
//! <https://mariadb.com/kb/en/resultset-row/#timestamp-binary-encoding>
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_binary_resultset.html>

use std::fmt::{self, Display, Formatter};

use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::BufExt;

/// A `DATE`, `DATETIME` or `TIMESTAMP` value.
///
/// No calendar validation is done; the fields are carried as the client sent them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MySqlDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

/// A `TIME` value. Unlike a time of day this is an interval and may be negative or
/// span days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MySqlTime {
    pub negative: bool,
    pub days: u32,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub microseconds: u32,
}

impl MySqlDateTime {
    pub const fn date(year: u16, month: u8, day: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
        }
    }

    pub const fn with_time(mut self, hour: u8, minute: u8, second: u8) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    pub const fn with_microsecond(mut self, microsecond: u32) -> Self {
        self.microsecond = microsecond;
        self
    }

    fn has_time(&self) -> bool {
        self.hour != 0 || self.minute != 0 || self.second != 0 || self.microsecond != 0
    }

    pub(crate) fn decode_binary(buf: &mut Bytes) -> Result<Self, Error> {
        let len = buf.try_get_u8()?;

        if !matches!(len, 0 | 4 | 7 | 11) {
            return Err(err_protocol!("invalid DATETIME length byte: {len}"));
        }

        let data = buf.get_bytes(usize::from(len))?;
        let mut value = Self::default();

        if len >= 4 {
            value.year = LittleEndian::read_u16(&data[..2]);
            value.month = data[2];
            value.day = data[3];
        }

        if len >= 7 {
            value.hour = data[4];
            value.minute = data[5];
            value.second = data[6];
        }

        if len == 11 {
            value.microsecond = LittleEndian::read_u32(&data[7..]);
        }

        Ok(value)
    }

    /// Write the shortest encoding that holds every non-zero field.
    /// `date_only` drops the time of day for `DATE` columns.
    pub(crate) fn encode_binary(&self, buf: &mut Vec<u8>, date_only: bool) {
        let len: u8 = if date_only || !self.has_time() {
            if *self == Self::default() {
                0
            } else {
                4
            }
        } else if self.microsecond == 0 {
            7
        } else {
            11
        };

        buf.push(len);

        if len >= 4 {
            let mut year = [0_u8; 2];
            LittleEndian::write_u16(&mut year, self.year);

            buf.extend_from_slice(&year);
            buf.push(self.month);
            buf.push(self.day);
        }

        if len >= 7 {
            buf.push(self.hour);
            buf.push(self.minute);
            buf.push(self.second);
        }

        if len == 11 {
            let mut micros = [0_u8; 4];
            LittleEndian::write_u32(&mut micros, self.microsecond);

            buf.extend_from_slice(&micros);
        }
    }

    /// `YYYY-MM-DD`
    pub(crate) fn fmt_date(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl Display for MySqlDateTime {
    /// `YYYY-MM-DD hh:mm:ss[.ffffff]`
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_date(f)?;
        write!(f, " {:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;

        if self.microsecond != 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }

        Ok(())
    }
}

impl MySqlTime {
    pub(crate) fn decode_binary(buf: &mut Bytes) -> Result<Self, Error> {
        let len = buf.try_get_u8()?;

        if !matches!(len, 0 | 8 | 12) {
            return Err(err_protocol!("invalid TIME length byte: {len}"));
        }

        let mut data = buf.get_bytes(usize::from(len))?;
        let mut value = Self::default();

        if len >= 8 {
            value.negative = data.get_u8() == 1;
            value.days = data.get_u32_le();
            value.hours = data.get_u8();
            value.minutes = data.get_u8();
            value.seconds = data.get_u8();
        }

        if len == 12 {
            value.microseconds = data.get_u32_le();
        }

        Ok(value)
    }

    pub(crate) fn encode_binary(&self, buf: &mut Vec<u8>) {
        if *self == Self::default() {
            buf.push(0);
            return;
        }

        let len: u8 = if self.microseconds == 0 { 8 } else { 12 };

        buf.push(len);
        buf.push(u8::from(self.negative));
        buf.extend_from_slice(&self.days.to_le_bytes());
        buf.push(self.hours);
        buf.push(self.minutes);
        buf.push(self.seconds);

        if len == 12 {
            buf.extend_from_slice(&self.microseconds.to_le_bytes());
        }
    }
}

impl Display for MySqlTime {
    /// `[-]hhh:mm:ss[.ffffff]`, with days folded into the hours.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }

        let hours = u64::from(self.days) * 24 + u64::from(self.hours);

        write!(f, "{hours:02}:{:02}:{:02}", self.minutes, self.seconds)?;

        if self.microseconds != 0 {
            write!(f, ".{:06}", self.microseconds)?;
        }

        Ok(())
    }
}
