use dolphin_base::{arg_err, Result};
use dolphin_net::ConnectOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-column compression requested from the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressMethod {
    Lz4,
    Delta,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpsertOptions {
    pub ignore_null: bool,
    pub key_col_names: Vec<String>,
    pub sort_columns: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    #[default]
    Append,
    Upsert(UpsertOptions),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database of the target table; empty for a shared in-memory table.
    pub db_path: String,
    pub table_name: String,
    pub use_ssl: bool,
    pub high_availability: bool,
    pub ha_sites: Vec<String>,
    /// Rows a worker waits for before flushing.
    pub batch_size: usize,
    /// Longest a row waits for its batch to fill, in seconds.
    pub throttle_secs: f64,
    pub thread_count: usize,
    /// Column that routes rows to workers. Required with more than one
    /// thread.
    pub partition_col: String,
    /// One method per column, or empty for none.
    pub compress: Vec<CompressMethod>,
    pub mode: WriteMode,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            host: "localhost".into(),
            port: 8848,
            user: String::new(),
            password: String::new(),
            db_path: String::new(),
            table_name: String::new(),
            use_ssl: false,
            high_availability: false,
            ha_sites: Vec::new(),
            batch_size: 1,
            throttle_secs: 0.01,
            thread_count: 1,
            partition_col: String::new(),
            compress: Vec::new(),
            mode: WriteMode::Append,
        }
    }
}

impl WriterConfig {
    pub fn new(host: impl Into<String>, port: u16, db_path: impl Into<String>, table_name: impl Into<String>) -> Self {
        WriterConfig {
            host: host.into(),
            port,
            db_path: db_path.into(),
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_batching(mut self, batch_size: usize, throttle_secs: f64) -> Self {
        self.batch_size = batch_size;
        self.throttle_secs = throttle_secs;
        self
    }

    pub fn with_threads(mut self, thread_count: usize, partition_col: impl Into<String>) -> Self {
        self.thread_count = thread_count;
        self.partition_col = partition_col.into();
        self
    }

    pub fn with_compression(mut self, compress: Vec<CompressMethod>) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_secs_f64(self.throttle_secs.max(0.0))
    }

    pub fn connect_options(&self) -> ConnectOptions {
        let mut opts = ConnectOptions::new(self.host.clone(), self.port)
            .with_credentials(self.user.clone(), self.password.clone())
            .with_ssl(self.use_ssl);
        if self.high_availability {
            opts = opts.with_ha_sites(self.ha_sites.clone());
        }
        opts
    }

    /// Checks everything that does not need the table's schema.
    pub fn validate(&self) -> Result<()> {
        if self.table_name.is_empty() {
            return Err(arg_err("writer needs a table name"));
        }
        if self.batch_size == 0 {
            return Err(arg_err("batch size must be at least 1"));
        }
        if !(self.throttle_secs >= 0.0) || !self.throttle_secs.is_finite() {
            return Err(arg_err(format!("bad throttle {}", self.throttle_secs)));
        }
        if self.thread_count == 0 {
            return Err(arg_err("thread count must be at least 1"));
        }
        if self.thread_count > 1 && self.partition_col.is_empty() {
            return Err(arg_err("more than one thread needs a partition column"));
        }
        Ok(())
    }

    /// Checks the settings that depend on the table's columns.
    pub fn validate_columns(&self, names: &[String]) -> Result<()> {
        if !self.compress.is_empty() && self.compress.len() != names.len() {
            return Err(arg_err(format!(
                "{} compression methods for {} columns",
                self.compress.len(),
                names.len()
            )));
        }
        if !self.partition_col.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(&self.partition_col)) {
            return Err(arg_err(format!("no column named {}", self.partition_col)));
        }
        if let WriteMode::Upsert(opts) = &self.mode {
            for k in opts.key_col_names.iter().chain(&opts.sort_columns) {
                if !names.iter().any(|n| n.eq_ignore_ascii_case(k)) {
                    return Err(arg_err(format!("no column named {}", k)));
                }
            }
        }
        Ok(())
    }

    /// The server expression naming the target table.
    pub fn table_expr(&self) -> String {
        if self.db_path.is_empty() {
            self.table_name.clone()
        } else {
            format!("loadTable(\"{}\",\"{}\")", self.db_path, self.table_name)
        }
    }

    /// The function each flush calls with its batch.
    pub fn insert_function(&self) -> String {
        match &self.mode {
            WriteMode::Append => format!("tableInsert{{{}}}", self.table_expr()),
            WriteMode::Upsert(opts) => {
                let mut f = format!("upsert!{{{},ignoreNull={}", self.table_expr(), opts.ignore_null);
                if !opts.key_col_names.is_empty() {
                    f.push_str(&format!(",keyColNames=`{}", opts.key_col_names.join("`")));
                }
                if !opts.sort_columns.is_empty() {
                    f.push_str(&format!(",sortColumns=`{}", opts.sort_columns.join("`")));
                }
                f.push('}');
                f
            }
        }
    }
}
