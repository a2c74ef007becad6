pub mod calendar;
pub mod diagnostics;
pub mod market;
pub mod reference;
pub mod server;
pub mod session;
pub mod transport;
pub mod types;

pub use diagnostics::RuntimeInfo;
pub use reference::ReferenceDoc;
pub use server::WindMcpServer;
pub use session::{ConnectionStatus, WindSession};
pub use transport::{http_router, serve_http, TransportMode};
