use futures_core::future::BoxFuture;
use futures_util::future::{self, FutureExt};
use tokio_util::sync::CancellationToken;

use crate::column::MySqlColumn;
use crate::error::{codes, Error, MySqlDatabaseError};
use crate::protocol::ColumnDefinition;
use crate::result::QueryOutcome;
use crate::value::Value;

/// Everything a backend may want to know about the connection a request came from.
#[derive(Debug, Clone)]
pub struct BackendContext {
    pub connection_id: u32,
    pub user: String,
    pub schema: Option<String>,

    /// Cancelled when the client goes away, even in the middle of a backend call, and
    /// when the server shuts down.
    pub token: CancellationToken,
}

/// The parameters and columns of a statement, as reported by [`MySqlBackend::prepare`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedShape {
    pub params: Vec<MySqlColumn>,
    pub columns: Vec<MySqlColumn>,
}

impl PreparedShape {
    /// `count` untyped `?` placeholders and no result columns.
    pub fn with_params(count: usize) -> Self {
        Self {
            params: (0..count)
                .map(|_| MySqlColumn::from(ColumnDefinition::parameter()))
                .collect(),
            columns: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: Vec<MySqlColumn>) -> Self {
        self.columns = columns;
        self
    }
}

/// Executes the SQL that clients send.
///
/// One backend value serves one connection. Errors of type [`Error::Database`] are sent
/// to the client as ERR packets and the connection stays open.
pub trait MySqlBackend: Send + 'static {
    /// Describe the parameters and result columns of `query`.
    fn prepare<'a>(
        &'a mut self,
        ctx: &'a BackendContext,
        query: &'a str,
    ) -> BoxFuture<'a, Result<PreparedShape, Error>>;

    /// Run a prepared statement with one value per parameter.
    fn execute<'a>(
        &'a mut self,
        ctx: &'a BackendContext,
        statement_id: u32,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<QueryOutcome, Error>>;

    /// Run a text query.
    fn query<'a>(
        &'a mut self,
        ctx: &'a BackendContext,
        sql: &'a str,
    ) -> BoxFuture<'a, Result<QueryOutcome, Error>>;

    /// A statement was closed or the connection that prepared it went away.
    fn close_statement(&mut self, statement_id: u32);

    /// Switch the default schema. Accepts any schema by default.
    fn init_db<'a>(
        &'a mut self,
        ctx: &'a BackendContext,
        schema: &'a str,
    ) -> BoxFuture<'a, Result<(), Error>> {
        let _ = (ctx, schema);
        future::ok(()).boxed()
    }

    /// List the columns of `table` matching `wildcard`. Lists none by default.
    fn field_list<'a>(
        &'a mut self,
        ctx: &'a BackendContext,
        table: &'a str,
        wildcard: &'a str,
    ) -> BoxFuture<'a, Result<Vec<MySqlColumn>, Error>> {
        let _ = (ctx, table, wildcard);
        future::ok(Vec::new()).boxed()
    }

    /// Kill another connection. Knows no connections by default.
    fn kill<'a>(
        &'a mut self,
        ctx: &'a BackendContext,
        connection_id: u32,
    ) -> BoxFuture<'a, Result<(), Error>> {
        let _ = ctx;
        let error = MySqlDatabaseError::new(
            codes::ER_NO_SUCH_THREAD,
            "HY000",
            format!("Unknown thread id: {connection_id}"),
        );

        future::err(error.into()).boxed()
    }
}
