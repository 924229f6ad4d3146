use bytes::{Buf, Bytes};
use rand::Rng;

use crate::error::Error;
use crate::io::{BufExt, BufMutExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, Status};

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::Handshake
// https://mariadb.com/kb/en/connection/#initial-handshake-packet

/// Length of the nonce the client scrambles its password with.
pub(crate) const SCRAMBLE_LEN: usize = 20;

/// The server greeting, Handshake V10.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub server_capabilities: Capabilities,
    /// MariaDB extended capabilities; only sent when `LONG_PASSWORD` (`CLIENT_MYSQL`)
    /// is clear.
    pub mariadb_capabilities: u32,
    pub server_default_collation: u8,
    pub status: Status,
    pub auth_plugin_name: Option<String>,
    pub auth_plugin_data: Bytes,
}

impl Handshake {
    /// 20 random printable bytes, never NUL.
    pub fn generate_scramble() -> Bytes {
        let mut rng = rand::thread_rng();

        (0..SCRAMBLE_LEN)
            .map(|_| rng.gen_range(0x21_u8..0x7f))
            .collect::<Vec<u8>>()
            .into()
    }
}

impl ProtocolEncode<'_, Capabilities> for Handshake {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        let capabilities = self.server_capabilities;
        let (data_1, data_2) = self
            .auth_plugin_data
            .split_at(self.auth_plugin_data.len().min(8));

        buf.push(self.protocol_version);
        buf.put_str_nul(&self.server_version);
        buf.extend_from_slice(&self.connection_id.to_le_bytes());

        // first 8 bytes of the scramble, NUL filler
        buf.extend_from_slice(data_1);
        buf.resize(buf.len() + (8 - data_1.len()), 0);
        buf.push(0);

        buf.extend_from_slice(&capabilities.lower().to_le_bytes());
        buf.push(self.server_default_collation);
        buf.extend_from_slice(&self.status.bits().to_le_bytes());
        buf.extend_from_slice(&capabilities.upper().to_le_bytes());

        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            let len = u8::try_from(self.auth_plugin_data.len() + 1)
                .map_err(|_| err_protocol!("auth plugin data too long"))?;

            buf.push(len);
        } else {
            buf.push(0);
        }

        // reserved
        buf.extend_from_slice(&[0_u8; 6]);

        if capabilities.contains(Capabilities::LONG_PASSWORD) {
            buf.extend_from_slice(&[0_u8; 4]);
        } else {
            buf.extend_from_slice(&self.mariadb_capabilities.to_le_bytes());
        }

        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            // rest of the scramble, NUL-terminated, at least 13 bytes in total
            buf.extend_from_slice(data_2);
            buf.resize(buf.len() + 12_usize.saturating_sub(data_2.len()), 0);
            buf.push(0);
        }

        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            buf.put_str_nul(self.auth_plugin_name.as_deref().unwrap_or_default());
        }

        Ok(())
    }
}

impl ProtocolDecode<'_> for Handshake {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let protocol_version = buf.try_get_u8()?;
        let server_version = buf.get_str_nul()?;
        let connection_id = buf.try_get_u32_le()?;
        let data_1 = buf.get_bytes(8)?;

        // filler
        buf.try_get_u8()?;

        let lower = buf.try_get_u16_le()?;
        let server_default_collation = buf.try_get_u8()?;
        let status = Status::from_bits_truncate(buf.try_get_u16_le()?);
        let upper = buf.try_get_u16_le()?;
        let server_capabilities = Capabilities::from_halves(lower, upper);

        let auth_plugin_data_len = buf.try_get_u8()?;

        // reserved
        buf.get_bytes(6)?;

        let mariadb_capabilities = buf.try_get_u32_le()?;

        let mut auth_plugin_data = data_1.to_vec();

        if server_capabilities.contains(Capabilities::SECURE_CONNECTION) {
            let len = usize::from(auth_plugin_data_len.saturating_sub(9)).max(12);
            auth_plugin_data.extend_from_slice(&buf.get_bytes(len)?);

            // NUL terminator
            buf.try_get_u8()?;
        }

        let auth_plugin_name = if server_capabilities.contains(Capabilities::PLUGIN_AUTH) {
            Some(buf.get_str_nul()?)
        } else {
            None
        };

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            server_capabilities,
            mariadb_capabilities,
            server_default_collation,
            status,
            auth_plugin_name,
            auth_plugin_data: auth_plugin_data.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::Handshake;
    use crate::error::Error;
    use crate::io::{ProtocolDecode, ProtocolEncode};
    use crate::protocol::{Capabilities, Status};

    const HANDSHAKE_MARIA_DB_10_4_7: &[u8] = b"\n5.5.5-10.4.7-MariaDB-1:10.4.7+maria~bionic\x00\x0b\x00\x00\x00t6L\\j\"dS\x00\xfe\xf7\x08\x02\x00\xff\x81\x15\x00\x00\x00\x00\x00\x00\x07\x00\x00\x00U14Oph9\"<H5n\x00mysql_native_password\x00";

    fn greeting() -> Handshake {
        Handshake {
            protocol_version: 10,
            server_version: "5.5.5-10.3.12-MariaDB".into(),
            connection_id: 7,
            server_capabilities: Capabilities::SERVER_DEFAULT,
            mariadb_capabilities: 0,
            server_default_collation: 45,
            status: Status::AUTOCOMMIT,
            auth_plugin_name: Some("mysql_native_password".into()),
            auth_plugin_data: Bytes::from_static(b"abcdefghijklmnopqrst"),
        }
    }

    #[test]
    fn it_decodes_handshake_mariadb_10_4_7() -> Result<(), Error> {
        let p = Handshake::decode(HANDSHAKE_MARIA_DB_10_4_7.into())?;

        assert_eq!(p.protocol_version, 10);
        assert_eq!(p.server_version, "5.5.5-10.4.7-MariaDB-1:10.4.7+maria~bionic");
        assert_eq!(p.connection_id, 11);
        assert!(p.server_capabilities.contains(Capabilities::PROTOCOL_41));
        assert!(p.server_capabilities.contains(Capabilities::PLUGIN_AUTH));
        assert!(!p.server_capabilities.contains(Capabilities::LONG_PASSWORD));
        assert_eq!(p.mariadb_capabilities, 7);
        assert_eq!(p.server_default_collation, 8);
        assert!(p.status.contains(Status::AUTOCOMMIT));
        assert_eq!(p.auth_plugin_name.as_deref(), Some("mysql_native_password"));
        assert_eq!(&p.auth_plugin_data[..], b"t6L\\j\"dSU14Oph9\"<H5n");

        Ok(())
    }

    #[test]
    fn it_encodes_a_greeting_that_decodes_to_the_same_fields() -> Result<(), Error> {
        let greeting = greeting();

        let mut buf = Vec::new();
        greeting.encode_with(&mut buf, Capabilities::empty())?;

        assert_eq!(Handshake::decode(buf.into())?, greeting);

        Ok(())
    }

    #[test]
    fn it_lays_out_the_fixed_region() -> Result<(), Error> {
        let mut buf = Vec::new();
        greeting().encode_with(&mut buf, Capabilities::empty())?;

        // protocol version, "5.5.5-10.3.12-MariaDB\0", connection id
        let fixed = &buf[1 + 22 + 4..];

        assert_eq!(&fixed[..8], b"abcdefgh");
        assert_eq!(fixed[8], 0);
        assert_eq!(fixed[11], 45);
        assert_eq!(&fixed[12..14], b"\x02\x00");

        // auth-data length, then 10 zero bytes since CLIENT_MYSQL is advertised
        assert_eq!(fixed[16], 21);
        assert_eq!(&fixed[17..27], &[0_u8; 10]);
        assert_eq!(&fixed[27..40], b"ijklmnopqrst\0");
        assert_eq!(&fixed[40..], b"mysql_native_password\0");

        Ok(())
    }

    #[test]
    fn it_generates_printable_scrambles() {
        let scramble = Handshake::generate_scramble();

        assert_eq!(scramble.len(), 20);
        assert!(scramble.iter().all(|b| b.is_ascii_graphic()));
    }
}
