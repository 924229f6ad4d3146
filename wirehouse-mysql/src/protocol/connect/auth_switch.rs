use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, BufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_auth_switch_request.html

/// Asks the client to redo authentication with another plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSwitchRequest {
    pub plugin: String,
    pub data: Bytes,
}

impl ProtocolEncode<'_, Capabilities> for AuthSwitchRequest {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0xfe);
        buf.put_str_nul(&self.plugin);
        buf.extend_from_slice(&self.data);
        buf.push(0);

        Ok(())
    }
}

impl ProtocolDecode<'_> for AuthSwitchRequest {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let header = buf.try_get_u8()?;
        if header != 0xfe {
            return Err(err_protocol!(
                "expected 0xfe (AUTH_SWITCH) but found 0x{header:x}"
            ));
        }

        let plugin = buf.get_str_nul()?;
        let data = buf.get_bytes_nul()?;

        Ok(Self { plugin, data })
    }
}

/// The client's reply to an [`AuthSwitchRequest`]: the raw plugin response.
#[derive(Debug)]
pub struct AuthSwitchResponse(pub Bytes);

impl ProtocolDecode<'_> for AuthSwitchResponse {
    fn decode_with(buf: Bytes, _: ()) -> Result<Self, Error> {
        Ok(Self(buf))
    }
}

impl ProtocolEncode<'_, Capabilities> for AuthSwitchResponse {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.extend_from_slice(&self.0);
        Ok(())
    }
}

#[test]
fn test_auth_switch_request() -> Result<(), Error> {
    const DATA: &[u8] = b"\xfemysql_native_password\x00abcdefghijabcdefghij\x00";

    let request = AuthSwitchRequest {
        plugin: "mysql_native_password".into(),
        data: Bytes::from_static(b"abcdefghijabcdefghij"),
    };

    let mut buf = Vec::new();
    request.encode_with(&mut buf, Capabilities::empty())?;

    assert_eq!(&buf[..], DATA);
    assert_eq!(AuthSwitchRequest::decode(DATA.into())?, request);

    Ok(())
}
