// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/mysql__com_8h.html#a1d854e841086925be1883e4d7b4e8cad
// https://mariadb.com/kb/en/library/mariadb-connectorc-types-and-definitions/#server-status
bitflags::bitflags! {
    /// Server status flags reported in OK and EOF packets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u16 {
        // a multi-statement transaction is open
        const IN_TRANS = 0x0001;

        const AUTOCOMMIT = 0x0002;

        // another result set follows this one
        const MORE_RESULTS_EXISTS = 0x0008;

        const NO_GOOD_INDEX_USED = 0x0010;
        const NO_INDEX_USED = 0x0020;

        // cursor-only; never set since COM_STMT_FETCH is not served
        const CURSOR_EXISTS = 0x0040;
        const LAST_ROW_SENT = 0x0080;

        const DB_DROPPED = 0x0100;
        const NO_BACKSLASH_ESCAPES = 0x0200;
        const METADATA_CHANGED = 0x0400;
        const QUERY_WAS_SLOW = 0x0800;
        const PS_OUT_PARAMS = 0x1000;
        const IN_TRANS_READONLY = 0x2000;
        const SESSION_STATE_CHANGED = 0x4000;
    }
}
