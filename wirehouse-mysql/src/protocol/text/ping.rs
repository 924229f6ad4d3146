use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::protocol::{Capabilities, CommandByte};

// https://dev.mysql.com/doc/internals/en/com-ping.html

#[derive(Debug)]
pub struct Ping;

impl ProtocolEncode<'_, Capabilities> for Ping {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::Ping as u8);

        Ok(())
    }
}
