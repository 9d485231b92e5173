use dolphin_base::{arg_err, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How to reach a server. Loadable from any serde format; unset fields take
/// their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub use_ssl: bool,
    /// Try `ha_sites` in order when the primary site is unreachable.
    pub high_availability: bool,
    /// Extra sites as `host:port`.
    pub ha_sites: Vec<String>,
    pub connect_timeout_ms: u64,
    /// 0 means no timeout.
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            host: "localhost".into(),
            port: 8848,
            user: String::new(),
            password: String::new(),
            use_ssl: false,
            high_availability: false,
            ha_sites: Vec::new(),
            connect_timeout_ms: 10_000,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

fn timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ConnectOptions {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_ha_sites(mut self, sites: Vec<String>) -> Self {
        self.high_availability = true;
        self.ha_sites = sites;
        self
    }

    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    pub fn with_timeouts(mut self, connect_ms: u64, read_ms: u64, write_ms: u64) -> Self {
        self.connect_timeout_ms = connect_ms;
        self.read_timeout_ms = read_ms;
        self.write_timeout_ms = write_ms;
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        timeout(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        timeout(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        timeout(self.write_timeout_ms)
    }

    /// Sites to try in order: the primary, then the HA list without repeats.
    pub fn sites(&self) -> Result<Vec<(String, u16)>> {
        let mut out = vec![(self.host.clone(), self.port)];
        if self.high_availability {
            for s in &self.ha_sites {
                let site = parse_site(s)?;
                if !out.contains(&site) {
                    out.push(site);
                }
            }
        }
        Ok(out)
    }

    pub fn validate(&self) -> Result<()> {
        if self.use_ssl {
            return Err(arg_err("ssl connections are not supported by this build"));
        }
        if self.host.is_empty() {
            return Err(arg_err("host must not be empty"));
        }
        self.sites().map(|_| ())
    }
}

/// Splits `host:port`. The port is taken after the last colon.
pub fn parse_site(s: &str) -> Result<(String, u16)> {
    let (host, port) = s
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| arg_err(format!("site '{}' is not host:port", s)))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| arg_err(format!("bad port in site '{}'", s)))?;
    if host.is_empty() {
        return Err(arg_err(format!("site '{}' has no host", s)));
    }
    Ok((host.to_string(), port))
}
