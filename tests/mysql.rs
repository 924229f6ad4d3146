use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use wirehouse::mysql::protocol::connect::Handshake;
use wirehouse::{
    BackendContext, Error, MySqlBackend, MySqlServer, MySqlServerOptions, PreparedShape,
    QueryOutcome, Value,
};
use wirehouse_core::bytes::Bytes;
use wirehouse_core::io::ProtocolDecode;

#[derive(Debug, Clone)]
struct Empty;

impl MySqlBackend for Empty {
    fn prepare<'a>(
        &'a mut self,
        _: &'a BackendContext,
        _: &'a str,
    ) -> BoxFuture<'a, Result<PreparedShape, Error>> {
        async { Ok(PreparedShape::default()) }.boxed()
    }

    fn execute<'a>(
        &'a mut self,
        _: &'a BackendContext,
        _: u32,
        _: &'a [Value],
    ) -> BoxFuture<'a, Result<QueryOutcome, Error>> {
        async { Ok(QueryOutcome::done(0)) }.boxed()
    }

    fn query<'a>(
        &'a mut self,
        _: &'a BackendContext,
        _: &'a str,
    ) -> BoxFuture<'a, Result<QueryOutcome, Error>> {
        async { Ok(QueryOutcome::done(0)) }.boxed()
    }

    fn close_statement(&mut self, _: u32) {}
}

async fn read_packet(stream: &mut TcpStream) -> anyhow::Result<(u8, Bytes)> {
    let mut header = [0_u8; 4];
    stream.read_exact(&mut header).await?;

    let len = usize::from(header[0])
        | (usize::from(header[1]) << 8)
        | (usize::from(header[2]) << 16);

    let mut payload = vec![0_u8; len];
    stream.read_exact(&mut payload).await?;

    Ok((header[3], payload.into()))
}

#[tokio::test]
async fn it_serves_tcp_clients_until_shutdown() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = Arc::new(MySqlServer::new(MySqlServerOptions::new(), Empty));
    let serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.run(listener).await }
    });

    let mut stream = TcpStream::connect(addr).await?;

    let (sequence_id, payload) = read_packet(&mut stream).await?;
    let greeting = Handshake::decode(payload)?;

    assert_eq!(sequence_id, 0);
    assert_eq!(greeting.connection_id, 1);

    // a connection cancelled mid-handshake is closed without a reply
    server.shutdown();
    serving.await??;

    let mut buf = [0_u8; 1];
    assert_eq!(stream.read(&mut buf).await?, 0);

    Ok(())
}
