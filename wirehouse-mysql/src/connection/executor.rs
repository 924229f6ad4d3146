use futures_core::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use wirehouse_core::net::Socket;

use crate::backend::MySqlBackend;
use crate::connection::{MySqlConnection, MySqlStream};
use crate::error::{codes, Error, MySqlDatabaseError};
use crate::protocol::response::{ErrPacket, OkPacket};
use crate::protocol::result_set::{EndOfRows, ResultSetResponse};
use crate::result::QueryOutcome;

/// Await a backend call unless `token` is cancelled or the client hangs up first.
///
/// A hang-up cancels `token` and drops `call`; the result is
/// [`Error::ConnectionClosed`].
pub(super) async fn cancellable<S: Socket, T>(
    token: &CancellationToken,
    stream: &mut MySqlStream<S>,
    call: BoxFuture<'_, Result<T, Error>>,
) -> Result<T, Error> {
    tokio::select! {
        biased;

        _ = token.cancelled() => Err(Error::Cancelled),
        res = call => res,

        () = stream.closed() => {
            token.cancel();
            Err(Error::ConnectionClosed)
        }
    }
}

/// A response the backend produced but that cannot be put on the wire.
///
/// The client did nothing wrong, so this is reported like a backend error and the
/// connection stays open.
pub(super) fn backend_fault(error: Error) -> Error {
    if !error.is_fatal() {
        return error;
    }

    MySqlDatabaseError::new(codes::ER_UNKNOWN_ERROR, "HY000", error.to_string()).into()
}

impl<S: Socket, B: MySqlBackend> MySqlConnection<S, B> {
    pub(super) async fn send_ok(&mut self) -> Result<(), Error> {
        self.stream.write_packet(OkPacket::new(self.status))?;
        self.stream.flush().await
    }

    pub(super) async fn send_error(&mut self, err: &ErrPacket) -> Result<(), Error> {
        tracing::debug!(
            connection_id = self.context.connection_id,
            code = err.error_code,
            message = %err.error_message,
            "sending error"
        );

        self.stream.write_packet(err)?;
        self.stream.flush().await
    }

    pub(super) async fn send_end_of_rows(&mut self) -> Result<(), Error> {
        self.stream.write_packet(EndOfRows {
            status: self.status,
            warnings: 0,
        })?;

        self.stream.flush().await
    }

    /// Answer with an OK packet or a result set, in the binary protocol for
    /// `COM_STMT_EXECUTE`.
    pub(super) async fn send_outcome(
        &mut self,
        outcome: QueryOutcome,
        binary: bool,
    ) -> Result<(), Error> {
        match outcome {
            QueryOutcome::Done {
                affected_rows,
                last_insert_id,
                warnings,
                info,
            } => {
                self.stream.write_packet(OkPacket {
                    header: 0x00,
                    affected_rows,
                    last_insert_id,
                    status: self.status,
                    warnings,
                    info,
                })?;
            }

            QueryOutcome::ResultSet(result) => {
                self.stream
                    .write_packets(ResultSetResponse {
                        result: &result,
                        binary,
                        status: self.status,
                        warnings: 0,
                    })
                    .map_err(backend_fault)?;
            }
        }

        self.stream.flush().await
    }
}
