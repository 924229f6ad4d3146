use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::protocol::{Capabilities, CommandByte};

// https://dev.mysql.com/doc/internals/en/com-quit.html

#[derive(Debug)]
pub struct Quit;

impl ProtocolEncode<'_, Capabilities> for Quit {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(CommandByte::Quit as u8);

        Ok(())
    }
}
