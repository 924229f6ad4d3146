use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::ProtocolDecode;
use crate::protocol::statement::{StmtClose, StmtPrepare, StmtReset, StmtSendLongData};
use crate::protocol::text::{FieldList, InitDb, ProcessKill, Query, SetOption};

/// Leading byte of every command packet.
///
/// <https://dev.mysql.com/doc/internals/en/text-protocol.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandByte {
    Sleep = 0x00,
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    FieldList = 0x04,
    Statistics = 0x09,
    ProcessKill = 0x0c,
    Ping = 0x0e,
    ChangeUser = 0x11,
    BinlogDump = 0x12,
    RegisterSlave = 0x15,
    StmtPrepare = 0x16,
    StmtExecute = 0x17,
    StmtSendLongData = 0x18,
    StmtClose = 0x19,
    StmtReset = 0x1a,
    SetOption = 0x1b,
    StmtFetch = 0x1c,
    ResetConnection = 0x1f,
}

impl CommandByte {
    /// Consume the command byte at the front of `buf`, which must be `self`.
    pub(crate) fn expect(self, buf: &mut Bytes) -> Result<(), Error> {
        let byte = buf.try_get_u8()?;

        if byte != self as u8 {
            return Err(err_protocol!(
                "expected command 0x{:02x} ({:?}) but found 0x{byte:02x}",
                self as u8,
                self
            ));
        }

        Ok(())
    }
}

/// A decoded client command.
///
/// `StmtExecute` keeps its payload: decoding it needs the connection's prepared
/// statements.
#[derive(Debug)]
pub enum Command {
    Sleep,
    Quit,
    InitDb(InitDb),
    Query(Query),
    FieldList(FieldList),
    Statistics,
    ProcessKill(ProcessKill),
    Ping,
    ChangeUser,
    BinlogDump,
    RegisterSlave,
    StmtPrepare(StmtPrepare),
    StmtExecute(Bytes),
    StmtSendLongData(StmtSendLongData),
    StmtClose(StmtClose),
    StmtReset(StmtReset),
    SetOption(SetOption),
    StmtFetch,
    ResetConnection,
    Unknown(u8),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Sleep => "COM_SLEEP",
            Command::Quit => "COM_QUIT",
            Command::InitDb(_) => "COM_INIT_DB",
            Command::Query(_) => "COM_QUERY",
            Command::FieldList(_) => "COM_FIELD_LIST",
            Command::Statistics => "COM_STATISTICS",
            Command::ProcessKill(_) => "COM_PROCESS_KILL",
            Command::Ping => "COM_PING",
            Command::ChangeUser => "COM_CHANGE_USER",
            Command::BinlogDump => "COM_BINLOG_DUMP",
            Command::RegisterSlave => "COM_REGISTER_SLAVE",
            Command::StmtPrepare(_) => "COM_STMT_PREPARE",
            Command::StmtExecute(_) => "COM_STMT_EXECUTE",
            Command::StmtSendLongData(_) => "COM_STMT_SEND_LONG_DATA",
            Command::StmtClose(_) => "COM_STMT_CLOSE",
            Command::StmtReset(_) => "COM_STMT_RESET",
            Command::SetOption(_) => "COM_SET_OPTION",
            Command::StmtFetch => "COM_STMT_FETCH",
            Command::ResetConnection => "COM_RESET_CONNECTION",
            Command::Unknown(_) => "COM_UNKNOWN",
        }
    }
}

impl ProtocolDecode<'_> for Command {
    fn decode_with(buf: Bytes, _: ()) -> Result<Self, Error> {
        let byte = *buf.first().ok_or(Error::Truncated {
            needed: 1,
            remaining: 0,
        })?;

        Ok(match byte {
            0x00 => Command::Sleep,
            0x01 => Command::Quit,
            0x02 => Command::InitDb(InitDb::decode(buf)?),
            0x03 => Command::Query(Query::decode(buf)?),
            0x04 => Command::FieldList(FieldList::decode(buf)?),
            0x09 => Command::Statistics,
            0x0c => Command::ProcessKill(ProcessKill::decode(buf)?),
            0x0e => Command::Ping,
            0x11 => Command::ChangeUser,
            0x12 => Command::BinlogDump,
            0x15 => Command::RegisterSlave,
            0x16 => Command::StmtPrepare(StmtPrepare::decode(buf)?),
            0x17 => Command::StmtExecute(buf),
            0x18 => Command::StmtSendLongData(StmtSendLongData::decode(buf)?),
            0x19 => Command::StmtClose(StmtClose::decode(buf)?),
            0x1a => Command::StmtReset(StmtReset::decode(buf)?),
            0x1b => Command::SetOption(SetOption::decode(buf)?),
            0x1c => Command::StmtFetch,
            0x1f => Command::ResetConnection,

            other => Command::Unknown(other),
        })
    }
}
