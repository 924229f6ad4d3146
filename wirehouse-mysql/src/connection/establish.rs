use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use wirehouse_core::net::Socket;

use crate::backend::{BackendContext, MySqlBackend};
use crate::connection::executor::cancellable;
use crate::connection::{ConnectionState, MySqlConnection, MySqlStream};
use crate::error::{codes, Error};
use crate::options::MySqlServerOptions;
use crate::protocol::connect::{
    native_password, AuthSwitchRequest, AuthSwitchResponse, Handshake, HandshakeResponse,
};
use crate::protocol::response::ErrPacket;
use crate::protocol::statement::Statements;
use crate::protocol::Status;
use crate::server::ServerStats;

impl<S: Socket, B: MySqlBackend> MySqlConnection<S, B> {
    /// Greet a freshly accepted client and authenticate it.
    ///
    /// On failure the client has been sent an ERR packet where the protocol allows one
    /// and the socket is shut down.
    pub(crate) async fn establish(
        socket: S,
        peer: String,
        connection_id: u32,
        options: Arc<MySqlServerOptions>,
        stats: Arc<ServerStats>,
        backend: B,
        token: CancellationToken,
    ) -> Result<Self, Error> {
        let stream = MySqlStream::new(socket, options.capabilities(), options.max_packet_size);

        let mut conn = Self {
            stream,
            statements: Statements::new(options.max_statements),
            collation: options.collation.as_u8(),
            options,
            stats,
            backend,
            state: ConnectionState::Greeted,
            status: Status::AUTOCOMMIT,
            context: BackendContext {
                connection_id,
                user: String::new(),
                schema: None,
                token,
            },
            peer,
        };

        let token = conn.context.token.clone();
        let result = tokio::select! {
            biased;

            _ = token.cancelled() => Err(Error::Cancelled),
            result = conn.handshake() => result,
        };

        match result {
            Ok(()) => Ok(conn),

            Err(error) => {
                conn.state = ConnectionState::Closed;
                conn.context.token.cancel();
                let _ = conn.stream.shutdown().await;

                Err(error)
            }
        }
    }

    async fn handshake(&mut self) -> Result<(), Error> {
        let scramble = Handshake::generate_scramble();

        let handshake = Handshake {
            protocol_version: 10,
            server_version: self.options.server_version.clone(),
            connection_id: self.context.connection_id,
            server_capabilities: self.stream.capabilities,
            // the greeting sets CLIENT_MYSQL, so the extended capabilities stay zero
            mariadb_capabilities: 0,
            server_default_collation: self.collation,
            status: self.status,
            auth_plugin_name: Some(native_password::PLUGIN_NAME.to_owned()),
            auth_plugin_data: scramble.clone(),
        };

        self.stream.sequence_id = 0;
        self.stream.write_packet(&handshake)?;
        self.stream.flush().await?;

        self.state = ConnectionState::Authenticating;

        let server = self.stream.capabilities;
        let response: HandshakeResponse = match self.stream.recv_packet().await?.decode_with(server)
        {
            Ok(response) => response,

            Err(error) => {
                tracing::warn!(
                    connection_id = self.context.connection_id,
                    peer = %self.peer,
                    %error,
                    "rejecting malformed handshake response"
                );

                let err = ErrPacket::new(codes::ER_HANDSHAKE_ERROR, "08S01", "Bad handshake");
                self.send_error(&err).await?;

                return Err(error);
            }
        };

        self.stream.capabilities = response.capabilities & server;
        self.collation = response.collation;
        self.context.user.clone_from(&response.username);

        tracing::debug!(
            connection_id = self.context.connection_id,
            user = %response.username,
            capabilities = ?self.stream.capabilities,
            attributes = response.attributes.len(),
            "received handshake response"
        );

        let auth_response = self.auth_response(&response, &scramble).await?;

        if !self.check_password(&scramble, &auth_response) {
            let error = Error::Authentication(format!(
                "Access denied for user '{}'@'{}' (using password: {})",
                self.context.user,
                self.peer,
                if auth_response.is_empty() { "NO" } else { "YES" }
            ));

            tracing::warn!(
                connection_id = self.context.connection_id,
                user = %self.context.user,
                peer = %self.peer,
                "authentication failed"
            );

            self.send_error(&ErrPacket::from_error(&error)).await?;

            return Err(error);
        }

        if let Some(schema) = response.database {
            let token = self.context.token.clone();

            let selected = cancellable(
                &token,
                &mut self.stream,
                self.backend.init_db(&self.context, &schema),
            )
            .await;

            if let Err(error) = selected {
                if !matches!(error, Error::ConnectionClosed) {
                    self.send_error(&ErrPacket::from_error(&error)).await?;
                }

                return Err(error);
            }

            self.context.schema = Some(schema);
        }

        self.send_ok().await?;
        self.state = ConnectionState::Ready;

        tracing::info!(
            connection_id = self.context.connection_id,
            user = %self.context.user,
            schema = ?self.context.schema,
            peer = %self.peer,
            "client authenticated"
        );

        Ok(())
    }

    /// The `mysql_native_password` response of the client, switching it over to that
    /// plugin first if it answered for another one.
    async fn auth_response(
        &mut self,
        response: &HandshakeResponse,
        scramble: &Bytes,
    ) -> Result<Bytes, Error> {
        let plugin = response
            .auth_plugin_name
            .as_deref()
            .unwrap_or(native_password::PLUGIN_NAME);

        // an empty response means "no password" under any plugin
        if plugin == native_password::PLUGIN_NAME || response.auth_response.is_empty() {
            return Ok(response.auth_response.clone());
        }

        tracing::debug!(
            connection_id = self.context.connection_id,
            plugin,
            "switching client to {}",
            native_password::PLUGIN_NAME
        );

        self.stream.write_packet(AuthSwitchRequest {
            plugin: native_password::PLUGIN_NAME.to_owned(),
            data: scramble.clone(),
        })?;
        self.stream.flush().await?;

        let AuthSwitchResponse(data) = self.stream.recv_packet().await?.decode()?;

        Ok(data)
    }

    fn check_password(&self, scramble: &[u8], response: &[u8]) -> bool {
        if self.options.is_trust_mode() {
            return true;
        }

        self.options
            .password_for(&self.context.user)
            .is_some_and(|password| native_password::verify(password, scramble, response))
    }
}
