//! Connection lifecycle: handles, the socket registry, handshake
//! authentication, and heartbeat.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod registry;

pub use authenticator::{AuthenticatedConnection, ConnectionAuthenticator};
pub use handle::ConnectionHandle;
pub use registry::SocketRegistry;
