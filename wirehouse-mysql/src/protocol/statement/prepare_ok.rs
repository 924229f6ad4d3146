use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{ProtocolDecode, ProtocolEncode};
use crate::protocol::response::EofPacket;
use crate::protocol::statement::StatementMetadata;
use crate::protocol::{Capabilities, ColumnDefinition, Packet, Status};

/// Response from a successful `COM_STMT_PREPARE`.
///
/// <https://dev.mysql.com/doc/internals/en/com-stmt-prepare-response.html#packet-COM_STMT_PREPARE_OK>
/// <https://mariadb.com/kb/en/com_stmt_prepare/#com_stmt_prepare_ok>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOk {
    pub statement_id: u32,
    pub columns: u16,
    pub params: u16,
    pub warnings: u16,
}

impl ProtocolEncode<'_, Capabilities> for PrepareOk {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x00);
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        buf.extend_from_slice(&self.columns.to_le_bytes());
        buf.extend_from_slice(&self.params.to_le_bytes());

        // reserved
        buf.push(0x00);

        buf.extend_from_slice(&self.warnings.to_le_bytes());

        Ok(())
    }
}

impl ProtocolDecode<'_, Capabilities> for PrepareOk {
    fn decode_with(mut buf: Bytes, _: Capabilities) -> Result<Self, Error> {
        let status = buf.try_get_u8()?;
        if status != 0x00 {
            return Err(err_protocol!(
                "expected 0x00 (COM_STMT_PREPARE_OK) but found 0x{status:02x}"
            ));
        }

        let statement_id = buf.try_get_u32_le()?;
        let columns = buf.try_get_u16_le()?;
        let params = buf.try_get_u16_le()?;

        // reserved
        buf.try_get_u8()?;

        let warnings = buf.try_get_u16_le()?;

        Ok(Self {
            statement_id,
            columns,
            params,
            warnings,
        })
    }
}

/// The full reply to `COM_STMT_PREPARE`: [`PrepareOk`], the parameter definitions and the
/// column definitions, each list closed by an EOF unless `DEPRECATE_EOF` was negotiated.
///
/// Encodes as a sequence of framed packets.
#[derive(Debug)]
pub struct PrepareResponse<'a> {
    pub metadata: &'a StatementMetadata,
    pub status: Status,
}

impl PrepareResponse<'_> {
    fn ok(&self) -> Result<PrepareOk, Error> {
        Ok(PrepareOk {
            statement_id: self.metadata.statement_id,
            columns: u16::try_from(self.metadata.columns.len())
                .map_err(|_| err_protocol!("too many columns in prepared statement"))?,
            params: u16::try_from(self.metadata.params.len())
                .map_err(|_| err_protocol!("too many parameters in prepared statement"))?,
            warnings: 0,
        })
    }

    /// Rebuild statement metadata from the payloads of a prepare response, in order.
    pub fn decode<I>(payloads: I, capabilities: Capabilities) -> Result<StatementMetadata, Error>
    where
        I: IntoIterator<Item = Bytes>,
    {
        let mut payloads = payloads.into_iter();
        let mut next = || {
            payloads
                .next()
                .ok_or_else(|| err_protocol!("prepare response ended early"))
        };

        let ok = PrepareOk::decode_with(next()?, capabilities)?;
        let deprecate_eof = capabilities.contains(Capabilities::DEPRECATE_EOF);

        let mut definitions = |count: u16| -> Result<Vec<ColumnDefinition>, Error> {
            let defs = (0..count)
                .map(|_| ColumnDefinition::decode(next()?))
                .collect::<Result<Vec<_>, Error>>()?;

            if count > 0 && !deprecate_eof {
                EofPacket::decode_with(next()?, capabilities)?;
            }

            Ok(defs)
        };

        let params = definitions(ok.params)?;
        let columns = definitions(ok.columns)?;

        Ok(StatementMetadata::new(
            ok.statement_id,
            String::new(),
            params,
            columns,
        ))
    }
}

impl<'s> ProtocolEncode<'s, (Capabilities, &'s mut u8)> for PrepareResponse<'_> {
    fn encode_with(
        &self,
        buf: &mut Vec<u8>,
        (capabilities, sequence_id): (Capabilities, &'s mut u8),
    ) -> Result<(), Error> {
        Packet(self.ok()?).encode_with(buf, (capabilities, &mut *sequence_id))?;

        for definitions in [&self.metadata.params, &self.metadata.columns] {
            for def in definitions {
                Packet(def).encode_with(buf, (capabilities, &mut *sequence_id))?;
            }

            if !definitions.is_empty() && !capabilities.contains(Capabilities::DEPRECATE_EOF) {
                let eof = EofPacket {
                    warnings: 0,
                    status: self.status,
                };

                Packet(eof).encode_with(buf, (capabilities, &mut *sequence_id))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Buf, Bytes};

    use super::{PrepareOk, PrepareResponse};
    use crate::error::Error;
    use crate::io::{ProtocolDecode, ProtocolEncode};
    use crate::protocol::statement::StatementMetadata;
    use crate::protocol::{Capabilities, ColumnDefinition, ColumnFlags, ColumnType, Status};

    const DATA: &[u8] = b"\x00\x01\x00\x00\x00\x01\x00\x02\x00\x00\x00\x00";

    fn split_packets(mut buf: Bytes) -> Vec<(u8, Bytes)> {
        let mut packets = Vec::new();

        while buf.has_remaining() {
            let len = buf.get_uint_le(3) as usize;
            let seq = buf.get_u8();
            packets.push((seq, buf.split_to(len)));
        }

        packets
    }

    fn metadata() -> StatementMetadata {
        let id = ColumnDefinition {
            schema: "test".into(),
            table_alias: "users".into(),
            table: "users".into(),
            alias: "id".into(),
            name: "id".into(),
            charset: 63,
            max_size: 11,
            ty: ColumnType::Long,
            flags: ColumnFlags::NOT_NULL | ColumnFlags::UNSIGNED,
            decimals: 0,
        };

        StatementMetadata::new(
            1,
            String::new(),
            vec![ColumnDefinition::parameter(), ColumnDefinition::parameter()],
            vec![id],
        )
    }

    #[test]
    fn it_decodes_prepare_ok() -> Result<(), Error> {
        let ok = PrepareOk::decode_with(DATA.into(), Capabilities::PROTOCOL_41)?;

        assert_eq!(ok.statement_id, 1);
        assert_eq!(ok.columns, 1);
        assert_eq!(ok.params, 2);
        assert_eq!(ok.warnings, 0);

        Ok(())
    }

    #[test]
    fn it_encodes_prepare_ok() -> Result<(), Error> {
        let mut buf = Vec::new();
        PrepareOk {
            statement_id: 1,
            columns: 1,
            params: 2,
            warnings: 0,
        }
        .encode_with(&mut buf, Capabilities::PROTOCOL_41)?;

        assert_eq!(&buf[..], DATA);

        Ok(())
    }

    #[test]
    fn it_encodes_prepare_response_with_eof() -> Result<(), Error> {
        let caps = Capabilities::PROTOCOL_41;
        let metadata = metadata();
        let mut seq = 1;
        let mut buf = Vec::new();

        PrepareResponse {
            metadata: &metadata,
            status: Status::AUTOCOMMIT,
        }
        .encode_with(&mut buf, (caps, &mut seq))?;

        let packets = split_packets(buf.into());

        // ok, 2 params, eof, 1 column, eof
        assert_eq!(packets.len(), 6);
        assert_eq!(seq, 7);
        assert_eq!(packets[3].1[0], 0xfe);
        assert_eq!(packets[5].1[0], 0xfe);

        let decoded = PrepareResponse::decode(packets.into_iter().map(|(_, p)| p), caps)?;

        assert_eq!(decoded, metadata);

        Ok(())
    }

    #[test]
    fn it_omits_eof_when_deprecated() -> Result<(), Error> {
        let caps = Capabilities::PROTOCOL_41 | Capabilities::DEPRECATE_EOF;
        let metadata = metadata();
        let mut seq = 1;
        let mut buf = Vec::new();

        PrepareResponse {
            metadata: &metadata,
            status: Status::AUTOCOMMIT,
        }
        .encode_with(&mut buf, (caps, &mut seq))?;

        let packets = split_packets(buf.into());

        assert_eq!(packets.len(), 4);
        assert!(packets.iter().all(|(_, p)| p[0] != 0xfe));

        let decoded = PrepareResponse::decode(packets.into_iter().map(|(_, p)| p), caps)?;

        assert_eq!(decoded.params.len(), 2);
        assert_eq!(decoded.columns, metadata.columns);

        Ok(())
    }

    #[test]
    fn it_sends_only_ok_without_params_or_columns() -> Result<(), Error> {
        let metadata = StatementMetadata::new(3, "DO 1".into(), vec![], vec![]);
        let mut seq = 1;
        let mut buf = Vec::new();

        PrepareResponse {
            metadata: &metadata,
            status: Status::AUTOCOMMIT,
        }
        .encode_with(&mut buf, (Capabilities::PROTOCOL_41, &mut seq))?;

        assert_eq!(split_packets(buf.into()).len(), 1);
        assert_eq!(seq, 2);

        Ok(())
    }
}
