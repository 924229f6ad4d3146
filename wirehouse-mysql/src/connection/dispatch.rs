use std::sync::atomic::Ordering;

use bytes::Bytes;
use wirehouse_core::net::Socket;

use crate::backend::MySqlBackend;
use crate::connection::executor::{backend_fault, cancellable};
use crate::connection::{ConnectionState, MySqlConnection};
use crate::error::{codes, Error, MySqlDatabaseError};
use crate::io::ProtocolDecode;
use crate::protocol::response::ErrPacket;
use crate::protocol::result_set::FieldListResponse;
use crate::protocol::statement::{
    Execute, PrepareResponse, StatementMetadata, StmtClose, StmtPrepare, StmtReset,
    StmtSendLongData,
};
use crate::protocol::text::{FieldList, InitDb, ProcessKill, Query, SetOption, Statistics};
use crate::protocol::{ColumnDefinition, Command, Status};

/// What the command loop does after a command was answered.
enum Flow {
    Continue,
    Quit,
}

impl<S: Socket, B: MySqlBackend> MySqlConnection<S, B> {
    /// Serve commands until the client quits, the stream ends, a fatal error occurs, or
    /// the connection is cancelled.
    ///
    /// Every statement still prepared is closed with the backend on the way out.
    pub async fn run(mut self) -> Result<(), Error> {
        let result = self.serve().await;

        self.state = ConnectionState::Closed;
        self.context.token.cancel();
        self.close_all_statements();
        let _ = self.stream.shutdown().await;

        match &result {
            Ok(()) => tracing::info!(
                connection_id = self.context.connection_id,
                "connection closed"
            ),

            Err(error) => tracing::warn!(
                connection_id = self.context.connection_id,
                %error,
                "connection closed with error"
            ),
        }

        result
    }

    async fn serve(&mut self) -> Result<(), Error> {
        loop {
            let token = self.context.token.clone();

            let received = tokio::select! {
                biased;

                _ = token.cancelled() => return Ok(()),
                received = self.stream.recv_packet() => received,
            };

            let payload = match received {
                Ok(packet) => packet.0,

                Err(Error::ConnectionClosed) => return Ok(()),

                // the packet was dropped whole; the stream is still on a boundary
                Err(error) if !error.is_fatal() => {
                    self.send_error(&ErrPacket::from_error(&error)).await?;
                    continue;
                }

                // nothing can be framed on a broken stream
                Err(error) => return Err(error),
            };

            self.stats.questions.fetch_add(1, Ordering::Relaxed);
            self.state = ConnectionState::Executing;

            match self.dispatch(payload).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),

                // the client hung up while the backend was busy
                Err(Error::ConnectionClosed) => return Ok(()),

                Err(error) if !error.is_fatal() => {
                    self.send_error(&ErrPacket::from_error(&error)).await?;
                }

                Err(error) => {
                    // the whole command was read, so the client can still be told why
                    let _ = self.send_error(&ErrPacket::from_error(&error)).await;

                    return Err(error);
                }
            }

            self.state = ConnectionState::Ready;
        }
    }

    async fn dispatch(&mut self, payload: Bytes) -> Result<Flow, Error> {
        let command = Command::decode(payload)?;
        let name = command.name();

        tracing::debug!(
            connection_id = self.context.connection_id,
            command = name,
            sequence_id = self.stream.sequence_id.wrapping_sub(1),
            "received command"
        );

        match command {
            Command::Quit => return Ok(Flow::Quit),

            Command::Ping => self.send_ok().await?,

            Command::InitDb(InitDb(schema)) => self.init_db(schema).await?,
            Command::Query(Query(sql)) => self.query(&sql).await?,
            Command::FieldList(list) => self.field_list(list).await?,
            Command::Statistics => self.statistics().await?,
            Command::ProcessKill(kill) => self.kill(kill).await?,

            Command::ChangeUser => {
                let err = ErrPacket::new(
                    codes::ER_UNKNOWN_COM_ERROR,
                    "08S01",
                    "COM_CHANGE_USER is not supported",
                );

                self.send_error(&err).await?;
            }

            Command::BinlogDump | Command::RegisterSlave | Command::StmtFetch => {
                let err = ErrPacket::new(
                    codes::ER_NOT_SUPPORTED_YET,
                    "42000",
                    format!("This server doesn't yet support '{name}'"),
                );

                self.send_error(&err).await?;
            }

            Command::StmtPrepare(prepare) => self.prepare(prepare).await?,
            Command::StmtExecute(payload) => self.execute(payload).await?,
            Command::StmtSendLongData(data) => self.send_long_data(data),
            Command::StmtClose(close) => self.close_statement(close),
            Command::StmtReset(reset) => self.reset_statement(reset).await?,
            Command::SetOption(option) => self.set_option(option).await?,

            Command::ResetConnection => {
                self.close_all_statements();
                self.status = Status::AUTOCOMMIT;
                self.send_ok().await?;
            }

            // COM_SLEEP is internal to the server and never valid from a client
            Command::Sleep => return Err(Error::UnknownCommand(0x00)),
            Command::Unknown(byte) => return Err(Error::UnknownCommand(byte)),
        }

        Ok(Flow::Continue)
    }

    async fn init_db(&mut self, schema: String) -> Result<(), Error> {
        let token = self.context.token.clone();
        cancellable(
            &token,
            &mut self.stream,
            self.backend.init_db(&self.context, &schema),
        )
        .await?;

        self.context.schema = Some(schema);
        self.send_ok().await
    }

    async fn query(&mut self, sql: &str) -> Result<(), Error> {
        let token = self.context.token.clone();
        let outcome = cancellable(
            &token,
            &mut self.stream,
            self.backend.query(&self.context, sql),
        )
        .await?;

        self.send_outcome(outcome, false).await
    }

    async fn field_list(&mut self, list: FieldList) -> Result<(), Error> {
        let token = self.context.token.clone();
        let columns = cancellable(
            &token,
            &mut self.stream,
            self.backend
                .field_list(&self.context, &list.table, &list.wildcard),
        )
        .await?;

        let columns: Vec<ColumnDefinition> = columns.into_iter().map(Into::into).collect();

        self.stream.write_packets(FieldListResponse {
            columns: &columns,
            status: self.status,
        })?;

        self.stream.flush().await
    }

    async fn statistics(&mut self) -> Result<(), Error> {
        let statistics = Statistics {
            uptime: self.stats.started.elapsed().as_secs(),
            threads: self.stats.threads.load(Ordering::Relaxed),
            questions: self.stats.questions.load(Ordering::Relaxed),
        };

        self.stream.write_packet(statistics)?;
        self.stream.flush().await
    }

    async fn kill(&mut self, kill: ProcessKill) -> Result<(), Error> {
        let token = self.context.token.clone();
        cancellable(
            &token,
            &mut self.stream,
            self.backend.kill(&self.context, kill.connection_id),
        )
        .await?;

        self.send_ok().await
    }

    async fn prepare(&mut self, prepare: StmtPrepare) -> Result<(), Error> {
        if self.statements.is_full() {
            return Err(MySqlDatabaseError::new(
                codes::ER_MAX_PREPARED_STMT_COUNT_REACHED,
                "42000",
                format!(
                    "Can't create more than max_prepared_stmt_count statements (current value: {})",
                    self.options.max_statements
                ),
            )
            .into());
        }

        let token = self.context.token.clone();
        let shape = cancellable(
            &token,
            &mut self.stream,
            self.backend.prepare(&self.context, &prepare.query),
        )
        .await?;

        let statement_id = self.statements.next_id();
        let metadata = StatementMetadata::new(
            statement_id,
            prepare.query,
            shape.params.into_iter().map(Into::into).collect(),
            shape.columns.into_iter().map(Into::into).collect(),
        );

        let written = self.stream.write_packets(PrepareResponse {
            metadata: &metadata,
            status: self.status,
        });

        if let Err(error) = written {
            self.backend.close_statement(statement_id);
            return Err(backend_fault(error));
        }

        tracing::debug!(
            connection_id = self.context.connection_id,
            statement_id,
            params = metadata.params.len(),
            columns = metadata.columns.len(),
            "prepared statement"
        );

        self.statements.insert(metadata);
        self.stream.flush().await
    }

    async fn execute(&mut self, payload: Bytes) -> Result<(), Error> {
        let execute =
            Execute::decode_with(payload, (&mut self.statements, self.options.null_bitmap))?;

        let token = self.context.token.clone();
        let outcome = cancellable(
            &token,
            &mut self.stream,
            self.backend
                .execute(&self.context, execute.statement_id, &execute.params),
        )
        .await?;

        self.send_outcome(outcome, true).await
    }

    // never answered, so unknown statements and parameters are dropped silently
    fn send_long_data(&mut self, data: StmtSendLongData) {
        let appended = self
            .statements
            .get_mut(data.statement_id)
            .is_some_and(|statement| statement.append_long_data(data.param_id, &data.data));

        if !appended {
            tracing::debug!(
                connection_id = self.context.connection_id,
                statement_id = data.statement_id,
                param_id = data.param_id,
                "ignoring long data for unknown statement or parameter"
            );
        }
    }

    fn close_statement(&mut self, close: StmtClose) {
        if self.statements.remove(close.statement_id).is_some() {
            self.backend.close_statement(close.statement_id);
        }
    }

    async fn reset_statement(&mut self, reset: StmtReset) -> Result<(), Error> {
        let Some(statement) = self.statements.get_mut(reset.statement_id) else {
            return Err(MySqlDatabaseError::new(
                codes::ER_UNKNOWN_STMT_HANDLER,
                "HY000",
                format!(
                    "Unknown prepared statement handler ({}) given to mysqld_stmt_reset",
                    reset.statement_id
                ),
            )
            .into());
        };

        statement.long_data.clear();

        self.send_ok().await
    }

    async fn set_option(&mut self, option: SetOption) -> Result<(), Error> {
        match option.option {
            Some(_) => self.send_end_of_rows().await,
            None => Err(Error::UnknownCommand(0x1b)),
        }
    }
}
