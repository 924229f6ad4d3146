use crate::error::Error;

/// Type codes of result columns and statement parameters.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/field__types_8h.html>
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColumnType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0a,
    Time = 0x0b,
    Datetime = 0x0c,
    Year = 0x0d,
    VarChar = 0x0f,
    Bit = 0x10,
    Json = 0xf5,
    NewDecimal = 0xf6,
    Enum = 0xf7,
    Set = 0xf8,
    TinyBlob = 0xf9,
    MediumBlob = 0xfa,
    LongBlob = 0xfb,
    Blob = 0xfc,
    VarString = 0xfd,
    String = 0xfe,
    Geometry = 0xff,
}

impl ColumnType {
    /// Display width reported in column definitions when the backend does not set one.
    pub(crate) const fn default_max_size(self) -> u32 {
        match self {
            ColumnType::Tiny => 4,
            ColumnType::Short | ColumnType::Year => 6,
            ColumnType::Int24 => 9,
            ColumnType::Long => 11,
            ColumnType::LongLong => 20,
            ColumnType::Float => 12,
            ColumnType::Double => 22,
            ColumnType::Date => 10,
            ColumnType::Time => 17,
            ColumnType::Datetime | ColumnType::Timestamp => 26,
            ColumnType::Null => 0,
            ColumnType::TinyBlob => 0xFF,
            ColumnType::Blob => 0xFF_FF,
            ColumnType::MediumBlob => 0xFF_FF_FF,
            ColumnType::LongBlob | ColumnType::Json | ColumnType::Geometry => u32::MAX,
            _ => 1024,
        }
    }
}

impl TryFrom<u8> for ColumnType {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Error> {
        Ok(match id {
            0x00 => ColumnType::Decimal,
            0x01 => ColumnType::Tiny,
            0x02 => ColumnType::Short,
            0x03 => ColumnType::Long,
            0x04 => ColumnType::Float,
            0x05 => ColumnType::Double,
            0x06 => ColumnType::Null,
            0x07 => ColumnType::Timestamp,
            0x08 => ColumnType::LongLong,
            0x09 => ColumnType::Int24,
            0x0a => ColumnType::Date,
            0x0b => ColumnType::Time,
            0x0c => ColumnType::Datetime,
            0x0d => ColumnType::Year,
            0x0f => ColumnType::VarChar,
            0x10 => ColumnType::Bit,
            0xf5 => ColumnType::Json,
            0xf6 => ColumnType::NewDecimal,
            0xf7 => ColumnType::Enum,
            0xf8 => ColumnType::Set,
            0xf9 => ColumnType::TinyBlob,
            0xfa => ColumnType::MediumBlob,
            0xfb => ColumnType::LongBlob,
            0xfc => ColumnType::Blob,
            0xfd => ColumnType::VarString,
            0xfe => ColumnType::String,
            0xff => ColumnType::Geometry,

            ty => return Err(Error::InvalidType(ty)),
        })
    }
}
