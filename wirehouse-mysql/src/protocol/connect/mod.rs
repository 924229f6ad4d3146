//! Connection phase packets.
//!
//! <https://dev.mysql.com/doc/internals/en/connection-phase.html>
//! <https://mariadb.com/kb/en/connection/>

mod auth_switch;
mod handshake;
mod handshake_response;
pub mod native_password;

pub use auth_switch::{AuthSwitchRequest, AuthSwitchResponse};
pub use handshake::Handshake;
pub use handshake_response::HandshakeResponse;
