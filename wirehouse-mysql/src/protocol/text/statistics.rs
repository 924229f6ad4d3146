use crate::error::Error;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-statistics.html

/// The human readable status line answering `COM_STATISTICS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistics {
    pub uptime: u64,
    pub threads: usize,
    pub questions: u64,
}

impl Statistics {
    #[allow(clippy::cast_precision_loss)]
    fn queries_per_second(&self) -> f64 {
        self.questions as f64 / self.uptime.max(1) as f64
    }
}

impl ProtocolEncode<'_, Capabilities> for Statistics {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        let line = format!(
            "Uptime: {}  Threads: {}  Questions: {}  Slow queries: 0  Opens: 0  Flush tables: 1  Open tables: 0  Queries per second avg: {:.3}",
            self.uptime,
            self.threads,
            self.questions,
            self.queries_per_second()
        );

        buf.extend_from_slice(line.as_bytes());

        Ok(())
    }
}

#[test]
fn test_encode_statistics() -> Result<(), Error> {
    use bytes::Bytes;

    use crate::io::BufExt;

    let mut buf = Vec::new();
    Statistics {
        uptime: 10,
        threads: 2,
        questions: 5,
    }
    .encode_with(&mut buf, Capabilities::empty())?;

    let line = Bytes::from(buf).get_str_eof()?;

    assert!(line.starts_with("Uptime: 10  Threads: 2  Questions: 5  "));
    assert!(line.ends_with("Queries per second avg: 0.500"));

    Ok(())
}
