use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{ensure, Context as _};
use bytes::Bytes;
use futures_core::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wirehouse_core::io::{ProtocolDecode, ProtocolEncode};
use wirehouse_mysql::protocol::connect::{native_password, Handshake, HandshakeResponse};
use wirehouse_mysql::protocol::result_set::{BinaryRow, TextRow};
use wirehouse_mysql::protocol::statement::{
    ExecuteRequest, PrepareOk, PrepareResponse, StatementMetadata, StmtClose, StmtPrepare,
    StmtReset, StmtSendLongData,
};
use wirehouse_mysql::protocol::text::{InitDb, Ping, Query, Quit};
use wirehouse_mysql::protocol::{ColumnDefinition, EofPacket, ErrPacket, OkPacket, Packet};
use wirehouse_mysql::{
    BackendContext, Capabilities, ColumnType, Error, MySqlBackend, MySqlColumn,
    MySqlDatabaseError, MySqlServer, MySqlServerOptions, NullBitmapLayout, PreparedShape,
    QueryOutcome, ResultSet, Value,
};

/// Answers a fixed set of queries and remembers every statement execution.
#[derive(Debug, Clone, Default)]
struct Recorder {
    executed: Arc<Mutex<Vec<(u32, Vec<Value>)>>>,
    closed: Arc<Mutex<Vec<u32>>>,

    /// Token of the connection running `SELECT SLEEP(60)`.
    sleeping: Arc<Mutex<Option<CancellationToken>>>,
    interrupted: Arc<AtomicBool>,
}

/// Flags a backend call that was dropped before it finished.
struct Interrupted(Arc<AtomicBool>);

impl Drop for Interrupted {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl MySqlBackend for Recorder {
    fn init_db<'a>(
        &'a mut self,
        _: &'a BackendContext,
        schema: &'a str,
    ) -> BoxFuture<'a, Result<(), Error>> {
        let result = if schema == "missing" {
            Err(MySqlDatabaseError::new(1049, "42000", "Unknown database 'missing'").into())
        } else {
            Ok(())
        };

        async move { result }.boxed()
    }

    fn field_list<'a>(
        &'a mut self,
        _: &'a BackendContext,
        table: &'a str,
        _: &'a str,
    ) -> BoxFuture<'a, Result<Vec<MySqlColumn>, Error>> {
        let columns = if table == "users" {
            Ok(vec![
                MySqlColumn::new("id", ColumnType::LongLong).table("users"),
                MySqlColumn::new("name", ColumnType::VarString).table("users"),
            ])
        } else {
            Err(MySqlDatabaseError::new(
                1146,
                "42S02",
                format!("Table 'test.{table}' doesn't exist"),
            )
            .into())
        };

        async move { columns }.boxed()
    }

    fn prepare<'a>(
        &'a mut self,
        _: &'a BackendContext,
        query: &'a str,
    ) -> BoxFuture<'a, Result<PreparedShape, Error>> {
        let shape = PreparedShape::with_params(query.matches('?').count());

        let shape = if query.starts_with("SELECT") {
            shape.columns(vec![MySqlColumn::new("id", ColumnType::LongLong)])
        } else {
            shape
        };

        async move { Ok(shape) }.boxed()
    }

    fn execute<'a>(
        &'a mut self,
        _: &'a BackendContext,
        statement_id: u32,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<QueryOutcome, Error>> {
        self.executed
            .lock()
            .unwrap()
            .push((statement_id, params.to_vec()));

        async {
            let result = ResultSet::new(vec![MySqlColumn::new("id", ColumnType::LongLong)])
                .with_row([7_i64]);

            Ok(result.into())
        }
        .boxed()
    }

    fn query<'a>(
        &'a mut self,
        ctx: &'a BackendContext,
        sql: &'a str,
    ) -> BoxFuture<'a, Result<QueryOutcome, Error>> {
        let outcome = match sql {
            "SELECT SLEEP(60)" => {
                *self.sleeping.lock().unwrap() = Some(ctx.token.clone());
                let interrupted = Interrupted(self.interrupted.clone());

                return async move {
                    let _interrupted = interrupted;
                    std::future::pending().await
                }
                .boxed();
            }

            "SELECT DATABASE()" => {
                let result =
                    ResultSet::new(vec![MySqlColumn::new("DATABASE()", ColumnType::VarString)])
                        .with_row([Value::from(ctx.schema.clone())]);

                Ok(result.into())
            }

            "SELECT id, name FROM users" => {
                let result = ResultSet::new(vec![
                    MySqlColumn::new("id", ColumnType::LongLong),
                    MySqlColumn::new("name", ColumnType::VarString),
                ])
                .with_row([Value::Int(1), Value::from("alice")])
                .with_row([Value::Int(2), Value::Null]);

                Ok(result.into())
            }

            "COMMIT" => Ok(QueryOutcome::done(0)),

            _ => Err(MySqlDatabaseError::new(
                1064,
                "42000",
                "You have an error in your SQL syntax",
            )
            .into()),
        };

        async move { outcome }.boxed()
    }

    fn close_statement(&mut self, statement_id: u32) {
        self.closed.lock().unwrap().push(statement_id);
    }
}

/// Just enough of a MySQL client to drive a connection over an in-memory pipe.
struct Client {
    stream: DuplexStream,
    capabilities: Capabilities,
    sequence_id: u8,
}

impl Client {
    async fn send<'en, T>(&mut self, payload: T) -> anyhow::Result<()>
    where
        T: ProtocolEncode<'en, Capabilities>,
    {
        let mut buf = Vec::new();
        Packet(payload).encode_with(&mut buf, (self.capabilities, &mut self.sequence_id))?;

        self.stream.write_all(&buf).await?;

        Ok(())
    }

    async fn command<'en, T>(&mut self, payload: T) -> anyhow::Result<()>
    where
        T: ProtocolEncode<'en, Capabilities>,
    {
        self.sequence_id = 0;
        self.send(payload).await
    }

    async fn recv(&mut self) -> anyhow::Result<Bytes> {
        let mut header = [0_u8; 4];
        self.stream.read_exact(&mut header).await?;

        ensure!(
            header[3] == self.sequence_id,
            "expected sequence id {} but received {}",
            self.sequence_id,
            header[3]
        );

        self.sequence_id = header[3].wrapping_add(1);

        let len = usize::from(header[0])
            | (usize::from(header[1]) << 8)
            | (usize::from(header[2]) << 16);

        let mut payload = vec![0_u8; len];
        self.stream.read_exact(&mut payload).await?;

        Ok(payload.into())
    }

    async fn recv_ok(&mut self) -> anyhow::Result<OkPacket> {
        Ok(OkPacket::decode_with(self.recv().await?, self.capabilities)?)
    }

    async fn recv_err(&mut self) -> anyhow::Result<ErrPacket> {
        Ok(ErrPacket::decode_with(self.recv().await?, self.capabilities)?)
    }

    fn deprecate_eof(&self) -> bool {
        self.capabilities.contains(Capabilities::DEPRECATE_EOF)
    }

    /// Log in as `username`, returning the greeting and the server's final reply.
    async fn login(
        &mut self,
        requested: Capabilities,
        username: &str,
        password: &str,
    ) -> anyhow::Result<(Handshake, Bytes)> {
        let greeting = Handshake::decode(self.recv().await?)?;

        let auth_response = if password.is_empty() {
            Bytes::new()
        } else {
            Bytes::copy_from_slice(&native_password::scramble(
                password,
                &greeting.auth_plugin_data,
            ))
        };

        self.capabilities = requested & greeting.server_capabilities;

        self.send(HandshakeResponse {
            capabilities: requested,
            max_packet_size: 1 << 24,
            collation: 45,
            username: username.to_owned(),
            auth_response,
            auth_plugin_name: Some(native_password::PLUGIN_NAME.to_owned()),
            attributes: vec![("_client_name".into(), "wirehouse-tests".into())],
            ..HandshakeResponse::default()
        })
        .await?;

        let reply = self.recv().await?;

        Ok((greeting, reply))
    }

    /// Read column definitions, rows and the terminator of a result set.
    async fn recv_result_set(
        &mut self,
    ) -> anyhow::Result<(Vec<ColumnDefinition>, Vec<Bytes>, Bytes)> {
        let count = self.recv().await?;
        ensure!(count.len() == 1, "expected a small column count");

        let mut columns = Vec::new();
        for _ in 0..count[0] {
            columns.push(ColumnDefinition::decode(self.recv().await?)?);
        }

        if !self.deprecate_eof() {
            EofPacket::decode_with(self.recv().await?, self.capabilities)?;
        }

        let mut rows = Vec::new();
        loop {
            let packet = self.recv().await?;

            if packet.first() == Some(&0xfe) && packet.len() < 9 {
                return Ok((columns, rows, packet));
            }

            rows.push(packet);
        }
    }

    async fn prepare(&mut self, query: &str) -> anyhow::Result<StatementMetadata> {
        self.command(StmtPrepare {
            query: query.to_owned(),
        })
        .await?;

        let first = self.recv().await?;
        let ok = PrepareOk::decode_with(first.clone(), self.capabilities)?;

        let mut payloads = vec![first];
        for count in [ok.params, ok.columns] {
            let eof = usize::from(count > 0 && !self.deprecate_eof());

            for _ in 0..usize::from(count) + eof {
                payloads.push(self.recv().await?);
            }
        }

        Ok(PrepareResponse::decode(payloads, self.capabilities)?)
    }

    async fn execute(&mut self, request: ExecuteRequest<'_>) -> anyhow::Result<Vec<Value>> {
        self.command(request).await?;

        let (columns, rows, _) = self.recv_result_set().await?;
        ensure!(rows.len() == 1, "expected a single row, got {}", rows.len());

        Ok(BinaryRow::decode(rows[0].clone(), &columns)?)
    }

    async fn closed(&mut self) -> anyhow::Result<bool> {
        let mut buf = [0_u8; 1];

        Ok(self.stream.read(&mut buf).await? == 0)
    }
}

fn start(
    options: MySqlServerOptions,
    backend: Recorder,
) -> (Client, JoinHandle<Result<(), Error>>) {
    let (client, server) = tokio::io::duplex(1 << 16);

    let handle = tokio::spawn(
        MySqlServer::new(options, backend).serve_connection(server, "localhost"),
    );

    let client = Client {
        stream: client,
        capabilities: Capabilities::empty(),
        sequence_id: 0,
    };

    (client, handle)
}

async fn connect(
    options: MySqlServerOptions,
    backend: Recorder,
    requested: Capabilities,
) -> anyhow::Result<(Client, JoinHandle<Result<(), Error>>)> {
    let (mut client, handle) = start(options, backend);

    let (_, reply) = client.login(requested, "root", "").await?;
    ensure!(reply[0] == 0x00, "expected OK after login, got 0x{:02x}", reply[0]);

    Ok((client, handle))
}

fn client_capabilities() -> Capabilities {
    Capabilities::SERVER_DEFAULT | Capabilities::DEPRECATE_EOF
}

#[tokio::test]
async fn it_greets_and_accepts_any_user_without_users() -> anyhow::Result<()> {
    let (mut client, handle) = start(MySqlServerOptions::new(), Recorder::default());

    let (greeting, reply) = client.login(client_capabilities(), "anyone", "").await?;

    assert_eq!(greeting.protocol_version, 10);
    assert_eq!(greeting.server_version, "5.5.5-10.3.12-MariaDB");
    assert_eq!(greeting.connection_id, 1);
    assert_eq!(greeting.server_default_collation, 45);
    assert_eq!(greeting.auth_plugin_data.len(), 20);
    assert_eq!(
        greeting.auth_plugin_name.as_deref(),
        Some(native_password::PLUGIN_NAME)
    );
    assert!(greeting
        .server_capabilities
        .contains(Capabilities::PROTOCOL_41 | Capabilities::DEPRECATE_EOF));

    // handshake is sequence 0, response 1, OK 2
    assert_eq!(client.sequence_id, 3);
    assert_eq!(reply[0], 0x00);

    client.command(Quit).await?;
    assert!(client.closed().await?);

    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_negotiates_a_superset_of_capabilities() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), Capabilities::all()).await?;

    assert!(!client.capabilities.contains(Capabilities::SSL));
    assert!(!client.capabilities.contains(Capabilities::COMPRESS));
    assert!(client.capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA));

    client.command(Ping).await?;
    client.recv_ok().await?;

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_verifies_native_passwords() -> anyhow::Result<()> {
    let options = MySqlServerOptions::new().user("root", "secret");

    let (mut client, handle) = start(options.clone(), Recorder::default());
    let (_, reply) = client.login(client_capabilities(), "root", "secret").await?;
    assert_eq!(reply[0], 0x00);

    client.command(Quit).await?;
    handle.await??;

    let (mut client, handle) = start(options, Recorder::default());
    let (_, reply) = client.login(client_capabilities(), "root", "hunter2").await?;

    let err = ErrPacket::decode_with(reply, client.capabilities)?;
    assert_eq!(err.error_code, 1045);
    assert_eq!(err.sql_state.as_deref(), Some("28000"));
    assert_eq!(
        err.error_message,
        "Access denied for user 'root'@'localhost' (using password: YES)"
    );

    assert!(client.closed().await?);
    assert!(matches!(handle.await?, Err(Error::Authentication(_))));

    Ok(())
}

#[tokio::test]
async fn it_rejects_unknown_users_without_a_password() -> anyhow::Result<()> {
    let options = MySqlServerOptions::new().user("root", "secret");

    let (mut client, handle) = start(options, Recorder::default());
    let (_, reply) = client.login(client_capabilities(), "mallory", "").await?;

    let err = ErrPacket::decode_with(reply, client.capabilities)?;
    assert_eq!(err.error_code, 1045);
    assert!(err.error_message.ends_with("(using password: NO)"));

    assert!(handle.await?.is_err());

    Ok(())
}

#[tokio::test]
async fn it_answers_text_queries() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), client_capabilities()).await?;

    client.command(Query("SELECT id, name FROM users".into())).await?;

    let (columns, rows, terminator) = client.recv_result_set().await?;

    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, "id");
    assert_eq!(columns[1].ty, ColumnType::VarString);

    assert_eq!(
        TextRow::decode(rows[0].clone(), 2)?,
        [Value::from("1"), Value::from("alice")]
    );
    assert_eq!(
        TextRow::decode(rows[1].clone(), 2)?,
        [Value::from("2"), Value::Null]
    );

    // DEPRECATE_EOF ends the rows with an OK packet using the 0xfe header
    let ok = OkPacket::decode_with(terminator, client.capabilities)?;
    assert_eq!(ok.header, 0xfe);

    client.command(Query("COMMIT".into())).await?;
    assert_eq!(client.recv_ok().await?.affected_rows, 0);

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_frames_result_sets_with_eof_packets() -> anyhow::Result<()> {
    let (mut client, handle) = connect(
        MySqlServerOptions::new(),
        Recorder::default(),
        Capabilities::SERVER_DEFAULT,
    )
    .await?;

    assert!(!client.deprecate_eof());

    client.command(Query("SELECT id, name FROM users".into())).await?;

    let (_, rows, terminator) = client.recv_result_set().await?;

    assert_eq!(rows.len(), 2);
    assert_eq!(terminator.len(), 5);
    EofPacket::decode_with(terminator, client.capabilities)?;

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_keeps_the_connection_after_backend_errors() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), client_capabilities()).await?;

    client.command(Query("SELEKT 1".into())).await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1064);
    assert_eq!(err.sql_state.as_deref(), Some("42000"));

    client.command(Ping).await?;
    client.recv_ok().await?;

    // COM_BINLOG_DUMP_GTID (0x1e) is not a command this server knows
    client.command(&[0x1e_u8][..]).await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1047);
    assert_eq!(err.sql_state.as_deref(), Some("08S01"));

    client.command(Ping).await?;
    client.recv_ok().await?;

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_prepares_and_executes_statements() -> anyhow::Result<()> {
    let backend = Recorder::default();

    let (mut client, handle) =
        connect(MySqlServerOptions::new(), backend.clone(), client_capabilities()).await?;

    let metadata = client.prepare("SELECT id FROM users WHERE id = ? AND name = ?").await?;

    assert_eq!(metadata.statement_id, 1);
    assert_eq!(metadata.params.len(), 2);
    assert_eq!(metadata.columns.len(), 1);
    assert_eq!(metadata.columns[0].ty, ColumnType::LongLong);

    let params = [Value::Int(1), Value::from("alice")];
    let row = client
        .execute(ExecuteRequest {
            statement_id: 1,
            params: &params,
            layout: NullBitmapLayout::Standard,
            bind_types: true,
        })
        .await?;

    assert_eq!(row, [Value::Int(7)]);

    // the second execution reuses the types bound by the first
    let params = [Value::Int(2), Value::Null];
    client
        .execute(ExecuteRequest {
            statement_id: 1,
            params: &params,
            layout: NullBitmapLayout::Standard,
            bind_types: false,
        })
        .await?;

    let executed = backend.executed.lock().unwrap().clone();
    assert_eq!(
        executed,
        [
            (1, vec![Value::Int(1), Value::from("alice")]),
            (1, vec![Value::Int(2), Value::Null]),
        ]
    );

    client.command(Quit).await?;
    handle.await??;

    // statements are released when the connection goes away
    assert_eq!(*backend.closed.lock().unwrap(), [1]);

    Ok(())
}

#[tokio::test]
async fn it_reads_mariadb_execute_bitmaps() -> anyhow::Result<()> {
    let backend = Recorder::default();
    let options = MySqlServerOptions::new().null_bitmap(NullBitmapLayout::MariaDbExecute);

    let (mut client, handle) = connect(options, backend.clone(), client_capabilities()).await?;

    let metadata = client.prepare("INSERT INTO t VALUES (?, ?, ?)").await?;
    assert!(metadata.columns.is_empty());

    let params = [Value::Null, Value::Int(5), Value::Null];
    client
        .execute(ExecuteRequest {
            statement_id: metadata.statement_id,
            params: &params,
            layout: NullBitmapLayout::MariaDbExecute,
            bind_types: true,
        })
        .await?;

    assert_eq!(
        backend.executed.lock().unwrap()[0].1,
        [Value::Null, Value::Int(5), Value::Null]
    );

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_reports_unknown_statements() -> anyhow::Result<()> {
    let backend = Recorder::default();

    let (mut client, handle) =
        connect(MySqlServerOptions::new(), backend.clone(), Capabilities::SERVER_DEFAULT)
            .await?;

    client
        .command(ExecuteRequest {
            statement_id: 99,
            params: &[],
            layout: NullBitmapLayout::Standard,
            bind_types: false,
        })
        .await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1243);

    client.command(Ping).await?;
    client.recv_ok().await?;

    // a closed statement is gone; COM_STMT_CLOSE itself has no reply
    let metadata = client.prepare("SELECT 1").await?;
    client
        .command(StmtClose {
            statement_id: metadata.statement_id,
        })
        .await?;

    client
        .command(ExecuteRequest {
            statement_id: metadata.statement_id,
            params: &[],
            layout: NullBitmapLayout::Standard,
            bind_types: false,
        })
        .await?;

    assert_eq!(client.recv_err().await?.error_code, 1243);
    assert_eq!(*backend.closed.lock().unwrap(), [metadata.statement_id]);

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_reports_statistics() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), client_capabilities()).await?;

    // COM_STATISTICS
    client.command(&[0x09_u8][..]).await?;

    let text = client.recv().await?;
    let text = std::str::from_utf8(&text).context("statistics are not UTF-8")?;

    assert!(text.starts_with("Uptime: "));
    assert!(text.contains("Threads: 1"));
    assert!(text.contains("Questions: 1"));

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_numbers_connections_from_one() -> anyhow::Result<()> {
    let server = MySqlServer::new(MySqlServerOptions::new(), Recorder::default());

    let mut ids = Vec::new();

    for _ in 0..2 {
        let (client, socket) = tokio::io::duplex(1 << 16);
        let handle = tokio::spawn(server.serve_connection(socket, "localhost"));

        let mut client = Client {
            stream: client,
            capabilities: Capabilities::empty(),
            sequence_id: 0,
        };

        let (greeting, _) = client.login(client_capabilities(), "root", "").await?;
        ids.push(greeting.connection_id);

        client.command(Quit).await?;
        handle.await??;
    }

    assert_eq!(ids, [1, 2]);

    Ok(())
}

#[tokio::test]
async fn it_substitutes_long_data_for_parameters() -> anyhow::Result<()> {
    let backend = Recorder::default();

    let (mut client, handle) =
        connect(MySqlServerOptions::new(), backend.clone(), client_capabilities()).await?;

    let metadata = client.prepare("INSERT INTO files VALUES (?)").await?;
    let statement_id = metadata.statement_id;

    // COM_STMT_SEND_LONG_DATA is never answered
    for chunk in ["hello ", "world"] {
        client
            .command(StmtSendLongData {
                statement_id,
                param_id: 0,
                data: Bytes::from_static(chunk.as_bytes()),
            })
            .await?;
    }

    // no cursor, one iteration, an empty NULL bitmap and no types: the value comes
    // from the long data
    let mut execute = vec![0x17];
    execute.extend_from_slice(&statement_id.to_le_bytes());
    execute.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);

    client.command(&execute[..]).await?;
    let (_, rows, _) = client.recv_result_set().await?;
    assert_eq!(rows.len(), 1);

    assert_eq!(
        backend.executed.lock().unwrap()[0],
        (statement_id, vec![Value::from("hello world")])
    );

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_resets_statements() -> anyhow::Result<()> {
    let backend = Recorder::default();

    let (mut client, handle) =
        connect(MySqlServerOptions::new(), backend.clone(), client_capabilities()).await?;

    let metadata = client.prepare("INSERT INTO files VALUES (?)").await?;
    let statement_id = metadata.statement_id;

    client
        .command(StmtSendLongData {
            statement_id,
            param_id: 0,
            data: Bytes::from_static(b"stale"),
        })
        .await?;

    client.command(StmtReset { statement_id }).await?;
    client.recv_ok().await?;

    // the long data is gone, so the inline value is read instead
    let mut execute = vec![0x17];
    execute.extend_from_slice(&statement_id.to_le_bytes());
    execute.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, b'x']);

    client.command(&execute[..]).await?;
    client.recv_result_set().await?;

    assert_eq!(
        backend.executed.lock().unwrap()[0],
        (statement_id, vec![Value::from("x")])
    );

    client.command(StmtReset { statement_id: 99 }).await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1243);
    assert_eq!(err.sql_state.as_deref(), Some("HY000"));

    client.command(Ping).await?;
    client.recv_ok().await?;

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_acknowledges_multi_statement_options() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), client_capabilities()).await?;

    // COM_SET_OPTION MYSQL_OPTION_MULTI_STATEMENTS_ON
    client.command(&[0x1b_u8, 0x00, 0x00][..]).await?;
    assert_eq!(client.recv_ok().await?.header, 0xfe);

    // only 0 and 1 are options
    client.command(&[0x1b_u8, 0x05, 0x00][..]).await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1047);
    assert_eq!(err.sql_state.as_deref(), Some("08S01"));

    client.command(Quit).await?;
    handle.await??;

    let (mut client, handle) = connect(
        MySqlServerOptions::new(),
        Recorder::default(),
        Capabilities::SERVER_DEFAULT,
    )
    .await?;

    // MYSQL_OPTION_MULTI_STATEMENTS_OFF, answered with EOF without DEPRECATE_EOF
    client.command(&[0x1b_u8, 0x01, 0x00][..]).await?;

    let eof = client.recv().await?;
    assert_eq!(eof.len(), 5);
    EofPacket::decode_with(eof, client.capabilities)?;

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_switches_schemas() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), client_capabilities()).await?;

    client.command(InitDb("shop".into())).await?;
    client.recv_ok().await?;

    client.command(Query("SELECT DATABASE()".into())).await?;
    let (_, rows, _) = client.recv_result_set().await?;
    assert_eq!(TextRow::decode(rows[0].clone(), 1)?, [Value::from("shop")]);

    client.command(InitDb("missing".into())).await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1049);
    assert_eq!(err.sql_state.as_deref(), Some("42000"));

    // a failed switch keeps the current schema
    client.command(Query("SELECT DATABASE()".into())).await?;
    let (_, rows, _) = client.recv_result_set().await?;
    assert_eq!(TextRow::decode(rows[0].clone(), 1)?, [Value::from("shop")]);

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_lists_fields() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), client_capabilities()).await?;

    // COM_FIELD_LIST "users", no wildcard
    client.command(&b"\x04users\x00"[..]).await?;

    let id = ColumnDefinition::decode(client.recv().await?)?;
    let name = ColumnDefinition::decode(client.recv().await?)?;

    assert_eq!((id.table.as_str(), id.name.as_str()), ("users", "id"));
    assert_eq!(name.ty, ColumnType::VarString);

    let terminator = client.recv().await?;
    assert_eq!(OkPacket::decode_with(terminator, client.capabilities)?.header, 0xfe);

    client.command(&b"\x04orders\x00"[..]).await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1146);
    assert_eq!(err.sql_state.as_deref(), Some("42S02"));

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_knows_no_threads_to_kill_by_default() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), client_capabilities()).await?;

    // COM_PROCESS_KILL 42
    client.command(&[0x0c_u8, 42, 0, 0, 0][..]).await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1094);
    assert_eq!(err.error_message, "Unknown thread id: 42");

    client.command(Ping).await?;
    client.recv_ok().await?;

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_resets_the_connection() -> anyhow::Result<()> {
    let backend = Recorder::default();

    let (mut client, handle) =
        connect(MySqlServerOptions::new(), backend.clone(), client_capabilities()).await?;

    let metadata = client.prepare("SELECT 1").await?;

    // COM_RESET_CONNECTION
    client.command(&[0x1f_u8][..]).await?;
    client.recv_ok().await?;

    assert_eq!(*backend.closed.lock().unwrap(), [metadata.statement_id]);

    client
        .command(ExecuteRequest {
            statement_id: metadata.statement_id,
            params: &[],
            layout: NullBitmapLayout::Standard,
            bind_types: false,
        })
        .await?;

    assert_eq!(client.recv_err().await?.error_code, 1243);

    client.command(Quit).await?;
    handle.await??;

    // nothing is left to close on the way out
    assert_eq!(*backend.closed.lock().unwrap(), [metadata.statement_id]);

    Ok(())
}

#[tokio::test]
async fn it_refuses_to_change_users() -> anyhow::Result<()> {
    let (mut client, handle) =
        connect(MySqlServerOptions::new(), Recorder::default(), client_capabilities()).await?;

    // COM_CHANGE_USER "bob"
    client.command(&b"\x11bob\x00"[..]).await?;

    let err = client.recv_err().await?;
    assert_eq!(err.error_code, 1047);
    assert_eq!(err.sql_state.as_deref(), Some("08S01"));

    client.command(Ping).await?;
    client.recv_ok().await?;

    client.command(Quit).await?;
    handle.await??;

    Ok(())
}

#[tokio::test]
async fn it_abandons_backend_calls_when_the_client_hangs_up() -> anyhow::Result<()> {
    let backend = Recorder::default();

    let (mut client, handle) =
        connect(MySqlServerOptions::new(), backend.clone(), client_capabilities()).await?;

    client.command(Query("SELECT SLEEP(60)".into())).await?;

    tokio::time::timeout(Duration::from_secs(2), async {
        while backend.sleeping.lock().unwrap().is_none() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .context("the query never reached the backend")?;

    drop(client);

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .context("the connection outlived its client")???;

    assert!(backend.interrupted.load(Ordering::SeqCst));
    assert!(backend
        .sleeping
        .lock()
        .unwrap()
        .as_ref()
        .is_some_and(CancellationToken::is_cancelled));

    Ok(())
}
