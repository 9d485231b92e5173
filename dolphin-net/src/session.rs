use crate::conn::DbConnection;
use crate::options::ConnectOptions;
use dolphin_base::{CancelToken, Result};
use dolphin_vals::Constant;

/// The RPC surface of a server session.
pub trait Session: Send {
    fn run(&mut self, script: &str) -> Result<Constant>;
    fn run_function(&mut self, name: &str, args: &[Constant]) -> Result<Constant>;
    /// Binds each value to its name in the server session.
    fn upload(&mut self, names: &[String], values: &[Constant]) -> Result<()>;
    fn is_connected(&self) -> bool;
    fn close(&mut self);

    /// [`Session::run`], refused up front when `token` is cancelled.
    fn run_cancellable(&mut self, script: &str, token: &CancelToken) -> Result<Constant> {
        token.check()?;
        self.run(script)
    }

    fn run_function_cancellable(&mut self, name: &str, args: &[Constant], token: &CancelToken) -> Result<Constant> {
        token.check()?;
        self.run_function(name, args)
    }
}

/// Opens sessions. Writers and subscribers hold one of these rather than a
/// fixed address so tests can substitute an in-memory server.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn Session>>;
}

#[derive(Clone, Debug)]
pub struct TcpConnector {
    opts: ConnectOptions,
}

impl TcpConnector {
    pub fn new(opts: ConnectOptions) -> Self {
        TcpConnector { opts }
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.opts
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(DbConnection::connect(&self.opts)?))
    }
}
