use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::ProtocolDecode;
use crate::protocol::CommandByte;

// https://dev.mysql.com/doc/internals/en/com-set-option.html

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOptionValue {
    MultiStatementsOn,
    MultiStatementsOff,
}

/// `COM_SET_OPTION`; `option` is `None` for values outside the two defined ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOption {
    pub raw: u16,
    pub option: Option<SetOptionValue>,
}

impl ProtocolDecode<'_> for SetOption {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        CommandByte::SetOption.expect(&mut buf)?;

        let raw = buf.try_get_u16_le()?;
        let option = match raw {
            0 => Some(SetOptionValue::MultiStatementsOn),
            1 => Some(SetOptionValue::MultiStatementsOff),
            _ => None,
        };

        Ok(Self { raw, option })
    }
}
