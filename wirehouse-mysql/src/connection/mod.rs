use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wirehouse_core::net::Socket;

use crate::backend::{BackendContext, MySqlBackend};
use crate::options::MySqlServerOptions;
use crate::protocol::statement::Statements;
use crate::protocol::{Capabilities, Status};
use crate::server::ServerStats;

mod dispatch;
mod establish;
mod executor;
mod stream;

pub(crate) use stream::MySqlStream;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The greeting was sent.
    Greeted,
    Authenticating,
    /// Waiting for the next command.
    Ready,
    Executing,
    Closed,
}

/// The server side of a single client connection.
///
/// Owned by exactly one task, which runs the handshake and then serves commands until
/// the client leaves.
pub struct MySqlConnection<S, B> {
    pub(crate) stream: MySqlStream<S>,
    pub(crate) options: Arc<MySqlServerOptions>,
    pub(crate) stats: Arc<ServerStats>,
    pub(crate) backend: B,
    pub(crate) state: ConnectionState,
    pub(crate) status: Status,
    pub(crate) statements: Statements,
    pub(crate) context: BackendContext,
    pub(crate) peer: String,
    pub(crate) collation: u8,
}

impl<S: Socket, B: MySqlBackend> MySqlConnection<S, B> {
    pub fn connection_id(&self) -> u32 {
        self.context.connection_id
    }

    pub fn user(&self) -> &str {
        &self.context.user
    }

    pub fn schema(&self) -> Option<&str> {
        self.context.schema.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Capabilities both sides agreed on.
    pub fn capabilities(&self) -> Capabilities {
        self.stream.capabilities
    }

    /// Cancelled once this connection is done; backend calls observe it.
    pub fn token(&self) -> &CancellationToken {
        &self.context.token
    }

    /// Drop every prepared statement, telling the backend about each.
    pub(crate) fn close_all_statements(&mut self) {
        for statement_id in self.statements.clear() {
            self.backend.close_statement(statement_id);
        }
    }
}

impl<S, B> Debug for MySqlConnection<S, B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("connection_id", &self.context.connection_id)
            .field("user", &self.context.user)
            .field("peer", &self.peer)
            .field("state", &self.state)
            .finish()
    }
}
