// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/group__group__cs__capabilities__flags.html
// https://mariadb.com/kb/en/library/connection/#capabilities
bitflags::bitflags! {
    /// Capability flags exchanged during the handshake.
    ///
    /// The server advertises a set in its greeting; everything after the handshake
    /// response is gated by the intersection with what the client asked for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        // new-style password hashing; MariaDB reads this bit as CLIENT_MYSQL
        // and only looks at its extended capabilities when it is clear
        const LONG_PASSWORD = 0x0000_0001;

        // report matched rows rather than changed rows
        const FOUND_ROWS = 0x0000_0002;

        // all column flags are sent; implied by PROTOCOL_41
        const LONG_FLAG = 0x0000_0004;

        // handshake response may name an initial schema
        const CONNECT_WITH_DB = 0x0000_0008;

        // reject `db.table.column`
        const NO_SCHEMA = 0x0000_0010;

        // compression protocol; never advertised
        const COMPRESS = 0x0000_0020;

        const ODBC = 0x0000_0040;

        // LOAD DATA LOCAL
        const LOCAL_FILES = 0x0000_0080;

        const IGNORE_SPACE = 0x0000_0100;

        // 4.1 protocol: status and warnings in OK/EOF, SQL state in ERR
        const PROTOCOL_41 = 0x0000_0200;

        const INTERACTIVE = 0x0000_0400;

        // TLS upgrade; never advertised
        const SSL = 0x0000_0800;

        const TRANSACTIONS = 0x0000_2000;

        // auth response is a u8 length followed by the response bytes
        const SECURE_CONNECTION = 0x0000_8000;

        const MULTI_STATEMENTS = 0x0001_0000;
        const MULTI_RESULTS = 0x0002_0000;
        const PS_MULTI_RESULTS = 0x0004_0000;

        // handshake response names the authentication plugin
        const PLUGIN_AUTH = 0x0008_0000;

        // handshake response carries key/value connection attributes
        const CONNECT_ATTRS = 0x0010_0000;

        // auth response is a length-encoded byte string
        const PLUGIN_AUTH_LENENC_DATA = 0x0020_0000;

        const CAN_HANDLE_EXPIRED_PASSWORDS = 0x0040_0000;
        const SESSION_TRACK = 0x0080_0000;

        // result sets end in an OK packet (header 0xfe) instead of EOF
        const DEPRECATE_EOF = 0x0100_0000;
    }
}

impl Capabilities {
    /// What this server supports. [`DEPRECATE_EOF`](Self::DEPRECATE_EOF) is added on top
    /// when the server options enable it.
    pub const SERVER_DEFAULT: Self = Self::LONG_PASSWORD
        .union(Self::FOUND_ROWS)
        .union(Self::LONG_FLAG)
        .union(Self::CONNECT_WITH_DB)
        .union(Self::NO_SCHEMA)
        .union(Self::ODBC)
        .union(Self::IGNORE_SPACE)
        .union(Self::PROTOCOL_41)
        .union(Self::INTERACTIVE)
        .union(Self::TRANSACTIONS)
        .union(Self::SECURE_CONNECTION)
        .union(Self::MULTI_RESULTS)
        .union(Self::PS_MULTI_RESULTS)
        .union(Self::PLUGIN_AUTH)
        .union(Self::CONNECT_ATTRS)
        .union(Self::PLUGIN_AUTH_LENENC_DATA);

    /// Lower 16 bits, as sent in the first capability field of the greeting.
    #[allow(clippy::cast_possible_truncation)]
    pub fn lower(self) -> u16 {
        self.bits() as u16
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn upper(self) -> u16 {
        (self.bits() >> 16) as u16
    }

    pub fn from_halves(lower: u16, upper: u16) -> Self {
        Self::from_bits_retain(u32::from(lower) | (u32::from(upper) << 16))
    }
}
