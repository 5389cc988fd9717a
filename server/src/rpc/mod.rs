//! JSON-RPC 2.0 over server-sent events.

pub mod dispatch;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use dispatch::handle_message;
pub use registry::{SessionGuard, SessionRegistry};
pub use transport::{messages_handler, sse_handler};
