use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, BufMutExt, MySqlBufExt, MySqlBufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::HandshakeResponse
// https://mariadb.com/kb/en/connection/#client-handshake-response

/// Capability flags, max packet size, collation and the reserved region.
const FIXED_PREFIX_LEN: usize = 32;

/// The client's answer to the greeting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// Capabilities as requested by the client, before intersecting with the server's.
    pub capabilities: Capabilities,

    /// Max size of a command packet that the client wants to send to the server
    pub max_packet_size: u32,

    /// Default collation for the connection
    pub collation: u8,

    /// Extended capabilities of a MariaDB client that cleared `CLIENT_MYSQL`.
    pub mariadb_capabilities: u32,

    /// Name of the SQL account which client wants to log in
    pub username: String,

    /// Opaque authentication response
    pub auth_response: Bytes,

    pub database: Option<String>,

    /// Authentication method used by the client
    pub auth_plugin_name: Option<String>,

    pub attributes: Vec<(String, String)>,
}

impl HandshakeResponse {
    fn decode_attributes(buf: &mut Bytes) -> Result<Vec<(String, String)>, Error> {
        let len = buf.get_uint_lenenc()?;
        let len = usize::try_from(len)
            .map_err(|_| err_protocol!("attribute length overflows usize: {len}"))?;

        // every pair must fit inside the declared length
        let mut attrs = buf.get_bytes(len)?;
        let mut attributes = Vec::new();

        while attrs.has_remaining() {
            let key = attrs.get_str_lenenc()?;
            let value = attrs.get_str_lenenc()?;

            attributes.push((key, value));
        }

        Ok(attributes)
    }
}

/// Decoding needs the server's capabilities: conditional fields follow the
/// intersection with what the client requested, never the client's flags alone.
impl ProtocolDecode<'_, Capabilities> for HandshakeResponse {
    fn decode_with(mut buf: Bytes, server: Capabilities) -> Result<Self, Error> {
        if buf.len() < FIXED_PREFIX_LEN {
            return Err(err_protocol!(
                "handshake response of {} bytes is shorter than its fixed prefix",
                buf.len()
            ));
        }

        let lower = buf.get_u16_le();
        let upper = buf.get_u16_le();
        let capabilities = Capabilities::from_halves(lower, upper);

        if !capabilities.contains(Capabilities::PROTOCOL_41) {
            return Err(err_protocol!("client does not speak the 4.1 protocol"));
        }

        let max_packet_size = buf.get_u32_le();
        let collation = buf.get_u8();

        // reserved
        buf.advance(19);

        let mariadb_capabilities = buf.get_u32_le();

        let effective = capabilities & server;

        let username = buf.get_str_nul()?;

        let auth_response = if effective.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            buf.get_bytes_lenenc()?
        } else if effective.contains(Capabilities::SECURE_CONNECTION) {
            let len = buf.try_get_u8()?;
            buf.get_bytes(usize::from(len))?
        } else {
            buf.get_bytes_nul()?
        };

        let database = if effective.contains(Capabilities::CONNECT_WITH_DB) && buf.has_remaining()
        {
            Some(buf.get_str_nul()?).filter(|db| !db.is_empty())
        } else {
            None
        };

        let auth_plugin_name = if effective.contains(Capabilities::PLUGIN_AUTH) && buf.has_remaining()
        {
            Some(buf.get_str_nul()?).filter(|name| !name.is_empty())
        } else {
            None
        };

        let attributes = if effective.contains(Capabilities::CONNECT_ATTRS) && buf.has_remaining()
        {
            Self::decode_attributes(&mut buf)?
        } else {
            Vec::new()
        };

        // a trailing zstd compression level is ignored; compression is never advertised

        Ok(Self {
            capabilities,
            max_packet_size,
            collation,
            mariadb_capabilities,
            username,
            auth_response,
            database,
            auth_plugin_name,
            attributes,
        })
    }
}

/// Encoding takes the negotiated capabilities; used by clients and tests.
impl ProtocolEncode<'_, Capabilities> for HandshakeResponse {
    fn encode_with(&self, buf: &mut Vec<u8>, context: Capabilities) -> Result<(), Error> {
        let capabilities = self.capabilities;

        buf.extend_from_slice(&capabilities.lower().to_le_bytes());
        buf.extend_from_slice(&capabilities.upper().to_le_bytes());
        buf.extend_from_slice(&self.max_packet_size.to_le_bytes());
        buf.push(self.collation);

        // reserved
        buf.extend_from_slice(&[0_u8; 19]);
        buf.extend_from_slice(&self.mariadb_capabilities.to_le_bytes());

        buf.put_str_nul(&self.username);

        if context.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            buf.put_bytes_lenenc(&self.auth_response);
        } else if context.contains(Capabilities::SECURE_CONNECTION) {
            let response_len = u8::try_from(self.auth_response.len()).map_err(|_| {
                err_protocol!("auth_response.len() too long: {}", self.auth_response.len())
            })?;

            buf.push(response_len);
            buf.extend_from_slice(&self.auth_response);
        } else {
            buf.extend_from_slice(&self.auth_response);
            buf.push(0);
        }

        if context.contains(Capabilities::CONNECT_WITH_DB) {
            buf.put_str_nul(self.database.as_deref().unwrap_or_default());
        }

        if context.contains(Capabilities::PLUGIN_AUTH) {
            buf.put_str_nul(self.auth_plugin_name.as_deref().unwrap_or_default());
        }

        if context.contains(Capabilities::CONNECT_ATTRS) {
            let mut attrs = Vec::new();

            for (key, value) in &self.attributes {
                attrs.put_str_lenenc(key);
                attrs.put_str_lenenc(value);
            }

            buf.put_bytes_lenenc(&attrs);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::HandshakeResponse;
    use crate::error::Error;
    use crate::io::{ProtocolDecode, ProtocolEncode};
    use crate::protocol::Capabilities;

    fn response(capabilities: Capabilities) -> HandshakeResponse {
        HandshakeResponse {
            capabilities,
            max_packet_size: 16_777_216,
            collation: 45,
            username: "root".into(),
            auth_response: Bytes::from_static(&[0x11; 20]),
            database: Some("test".into()),
            auth_plugin_name: Some("mysql_native_password".into()),
            attributes: vec![
                ("_client_name".into(), "libmariadb".into()),
                ("_os".into(), "Linux".into()),
            ],
            ..HandshakeResponse::default()
        }
    }

    fn encode(response: &HandshakeResponse, context: Capabilities) -> Result<Bytes, Error> {
        let mut buf = Vec::new();
        response.encode_with(&mut buf, context)?;

        Ok(buf.into())
    }

    #[test]
    fn it_decodes_each_auth_response_encoding() -> Result<(), Error> {
        let base = Capabilities::PROTOCOL_41
            | Capabilities::CONNECT_WITH_DB
            | Capabilities::PLUGIN_AUTH
            | Capabilities::CONNECT_ATTRS;

        for caps in [
            base | Capabilities::PLUGIN_AUTH_LENENC_DATA | Capabilities::SECURE_CONNECTION,
            base | Capabilities::SECURE_CONNECTION,
            base,
        ] {
            let expected = response(caps);
            let buf = encode(&expected, caps)?;

            let decoded = HandshakeResponse::decode_with(buf, Capabilities::SERVER_DEFAULT)?;

            assert_eq!(decoded, expected, "{caps:?}");
        }

        Ok(())
    }

    #[test]
    fn it_selects_auth_encoding_from_effective_capabilities() -> Result<(), Error> {
        // the client asks for lenenc auth data but the server does not offer it
        let caps = Capabilities::PROTOCOL_41
            | Capabilities::SECURE_CONNECTION
            | Capabilities::PLUGIN_AUTH_LENENC_DATA;

        let mut expected = response(caps);
        expected.database = None;
        expected.auth_plugin_name = None;
        expected.attributes.clear();

        let buf = encode(&expected, Capabilities::PROTOCOL_41 | Capabilities::SECURE_CONNECTION)?;
        let decoded = HandshakeResponse::decode_with(
            buf,
            Capabilities::PROTOCOL_41 | Capabilities::SECURE_CONNECTION,
        )?;

        assert_eq!(decoded.auth_response, expected.auth_response);

        Ok(())
    }

    #[test]
    fn it_bounds_attributes_by_their_declared_length() -> Result<(), Error> {
        let caps = Capabilities::PROTOCOL_41
            | Capabilities::SECURE_CONNECTION
            | Capabilities::CONNECT_ATTRS;

        let mut buf = encode(&response(caps), caps)?.to_vec();

        // attributes are last: "_client_name" (13) + "libmariadb" (11)
        // + "_os" (4) + "Linux" (6) = 34 bytes; declare one byte less than the final pair
        let total = buf.len() - 35;
        assert_eq!(buf[total], 34);
        buf[total] = 33;
        buf.pop();

        assert!(matches!(
            HandshakeResponse::decode_with(buf.into(), Capabilities::SERVER_DEFAULT),
            Err(Error::Truncated { .. })
        ));

        Ok(())
    }

    #[test]
    fn it_rejects_short_packets() {
        const DATA: &[u8] = b"\x85\xa6\x3f\x20\x00\x00\x00\x01\x21";

        assert!(matches!(
            HandshakeResponse::decode_with(DATA.into(), Capabilities::SERVER_DEFAULT),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn it_rejects_pre_41_clients() -> Result<(), Error> {
        let buf = encode(&response(Capabilities::SECURE_CONNECTION), Capabilities::SECURE_CONNECTION)?;

        assert!(matches!(
            HandshakeResponse::decode_with(buf, Capabilities::SERVER_DEFAULT),
            Err(Error::Protocol(_))
        ));

        Ok(())
    }
}
