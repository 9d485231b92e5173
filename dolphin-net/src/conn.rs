use crate::options::ConnectOptions;
use crate::protocol::{read_response, write_connect, write_function, write_script, write_variables};
use crate::session::Session;
use dolphin_base::{conn_err, Error, ErrorKind, Result};
use dolphin_vals::{Constant, Scalar};
use dolphin_wire::{ConstantReader, ConstantWriter, DataInputStream, DataOutputStream};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

struct Link {
    inp: DataInputStream<TcpStream>,
    out: DataOutputStream<TcpStream>,
    reader: ConstantReader,
    writer: ConstantWriter,
    session: String,
}

/// A blocking TCP session. Any connection or framing failure drops the
/// socket; [`DbConnection::reconnect`] opens a new one.
pub struct DbConnection {
    opts: ConnectOptions,
    site: (String, u16),
    link: Option<Link>,
}

fn open_stream(opts: &ConnectOptions, host: &str, port: u16) -> Result<TcpStream> {
    let addrs = (host, port).to_socket_addrs().map_err(Error::from_io)?;
    let mut last = None;
    for addr in addrs {
        let attempt = match opts.connect_timeout() {
            Some(t) => TcpStream::connect_timeout(&addr, t),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(s) => {
                s.set_read_timeout(opts.read_timeout()).map_err(Error::from_io)?;
                s.set_write_timeout(opts.write_timeout()).map_err(Error::from_io)?;
                s.set_nodelay(true).map_err(Error::from_io)?;
                return Ok(s);
            }
            Err(e) => last = Some(e),
        }
    }
    Err(match last {
        Some(e) => Error::from_io(e),
        None => conn_err(format!("{}:{} resolved to no addresses", host, port)),
    })
}

fn handshake(stream: TcpStream) -> Result<Link> {
    let write_half = stream.try_clone().map_err(Error::from_io)?;
    let mut link = Link {
        inp: DataInputStream::new(stream),
        out: DataOutputStream::new(write_half),
        reader: ConstantReader::new(),
        writer: ConstantWriter::new(),
        session: "0".into(),
    };
    write_connect(&mut link.out, &mut link.writer)?;
    let (session, _) = read_response(&mut link.inp, &mut link.reader)?;
    link.session = session;
    Ok(link)
}

impl DbConnection {
    /// Connects to the first reachable site and logs in when a user is set.
    pub fn connect(opts: &ConnectOptions) -> Result<DbConnection> {
        opts.validate()?;
        let mut conn = DbConnection {
            opts: opts.clone(),
            site: (opts.host.clone(), opts.port),
            link: None,
        };
        conn.reconnect()?;
        Ok(conn)
    }

    pub fn reconnect(&mut self) -> Result<()> {
        self.close();
        let sites = self.opts.sites()?;
        let mut failures = Vec::new();
        for (host, port) in sites {
            match open_stream(&self.opts, &host, port).and_then(handshake) {
                Ok(link) => {
                    info!(target: "dolphin", %host, port, session = %link.session, "connected");
                    self.site = (host, port);
                    self.link = Some(link);
                    return self.login();
                }
                Err(e) => {
                    warn!(target: "dolphin", %host, port, "site unreachable: {}", e);
                    failures.push(format!("{}:{}: {}", host, port, e.message()));
                }
            }
        }
        Err(conn_err(format!("no reachable site ({})", failures.join("; "))))
    }

    fn login(&mut self) -> Result<()> {
        if self.opts.user.is_empty() {
            return Ok(());
        }
        let args = [
            Constant::Scalar(Scalar::String(self.opts.user.clone())),
            Constant::Scalar(Scalar::String(self.opts.password.clone())),
        ];
        self.call(|l| write_function(&mut l.out, &mut l.writer, &l.session, "login", &args))?;
        debug!(target: "dolphin", user = %self.opts.user, "logged in");
        Ok(())
    }

    /// The site this connection reached.
    pub fn site(&self) -> (&str, u16) {
        (&self.site.0, self.site.1)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.link.as_ref().map(|l| l.session.as_str())
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.opts
    }

    fn call(&mut self, send: impl FnOnce(&mut Link) -> Result<()>) -> Result<Option<Constant>> {
        let link = self.link.as_mut().ok_or_else(|| conn_err("not connected"))?;
        let res = send(&mut *link).and_then(|_| read_response(&mut link.inp, &mut link.reader));
        match res {
            Ok((_, obj)) => Ok(obj),
            Err(e) => {
                if e.is(ErrorKind::Connection) || e.is(ErrorKind::MalformedData) {
                    warn!(target: "dolphin", site = %self.site.0, "dropping connection: {}", e);
                    self.close();
                }
                Err(e)
            }
        }
    }

    /// Hands the socket over as a one-way message stream, for subscriptions
    /// that reuse their request connection. Also returns a handle that can
    /// shut the socket down from another thread.
    pub fn into_stream(mut self) -> Result<(DataInputStream<TcpStream>, TcpStream)> {
        let link = self.link.take().ok_or_else(|| conn_err("not connected"))?;
        let handle = link.inp.get_ref().try_clone().map_err(Error::from_io)?;
        Ok((link.inp, handle))
    }
}

impl Session for DbConnection {
    fn run(&mut self, script: &str) -> Result<Constant> {
        let obj = self.call(|l| write_script(&mut l.out, &mut l.writer, &l.session, script))?;
        Ok(obj.unwrap_or_else(Constant::null))
    }

    fn run_function(&mut self, name: &str, args: &[Constant]) -> Result<Constant> {
        let obj = self.call(|l| write_function(&mut l.out, &mut l.writer, &l.session, name, args))?;
        Ok(obj.unwrap_or_else(Constant::null))
    }

    fn upload(&mut self, names: &[String], values: &[Constant]) -> Result<()> {
        self.call(|l| write_variables(&mut l.out, &mut l.writer, &l.session, names, values))?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    fn close(&mut self) {
        if let Some(link) = self.link.take() {
            // The peer may already be gone.
            let _ = link.inp.get_ref().shutdown(Shutdown::Both);
            debug!(target: "dolphin", session = %link.session, "closed");
        }
    }
}

impl Drop for DbConnection {
    fn drop(&mut self) {
        self.close();
    }
}
