// Sessions with a server: the RPC calls the rest of the client is built on,
// and a blocking TCP implementation of them.

mod conn;
mod options;
pub mod protocol;
mod session;


pub use conn::DbConnection;
pub use options::{parse_site, ConnectOptions};
pub use session::{Connector, Session, TcpConnector};
