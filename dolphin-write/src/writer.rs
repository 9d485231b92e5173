use crate::config::WriterConfig;
use crate::export::UnwrittenRows;
use crate::route::Router;
use crate::schema::TableSchema;
use dolphin_base::{arg_err, kind_err, type_err, Error, ErrorKind, Result, SyncQueue};
use dolphin_net::{Connector, Session, TcpConnector};
use dolphin_vals::{Constant, Table, TypeDesc, Vector, VectorOps};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Most rows one flush takes off a queue, and most row buffers kept for
/// reuse.
pub const MAX_BATCH_ROWS: usize = 65535;

const POLL: Duration = Duration::from_millis(50);

type Row = Vec<Constant>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadStatus {
    pub thread_id: usize,
    pub sent_rows: u64,
    pub unsent_rows: usize,
    pub send_failed_rows: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterStatus {
    pub is_exiting: bool,
    pub has_error: bool,
    pub error_info: Option<String>,
    pub sent_rows: u64,
    pub unsent_rows: usize,
    pub send_failed_rows: u64,
    pub threads: Vec<ThreadStatus>,
}

#[derive(Default)]
struct Counts {
    sent: u64,
    failed: u64,
}

struct Worker {
    index: usize,
    queue: SyncQueue<Row>,
    failed: SyncQueue<Row>,
    /// Held from taking a batch until its outcome is counted, so a status
    /// snapshot never sees rows in flight.
    counts: Mutex<Counts>,
    exit: AtomicBool,
}

struct Shared {
    table: String,
    names: Vec<String>,
    descs: Vec<TypeDesc>,
    insert_fn: String,
    batch_size: usize,
    throttle: Duration,
    fatal: AtomicBool,
    error: Mutex<Option<String>>,
    unused: SyncQueue<Row>,
}

impl Shared {
    fn fail(&self, e: &Error) {
        self.error.lock().get_or_insert_with(|| e.message().to_string());
        self.fatal.store(true, Ordering::Release);
    }

    fn build_table(&self, rows: &[Row]) -> Result<Table> {
        let mut t = Table::with_schema(self.names.clone(), &self.descs, rows.len())?;
        for row in rows {
            t.append_row(row)?;
        }
        Ok(t)
    }

    /// Takes one batch off the worker's queue and sends it. False once the
    /// writer has failed.
    fn flush(&self, worker: &Worker, session: &mut dyn Session) -> bool {
        let mut counts = worker.counts.lock();
        let rows = worker.queue.pop_batch(self.batch_size.max(MAX_BATCH_ROWS));
        if rows.is_empty() {
            return true;
        }
        let n = rows.len() as u64;
        let sent = self
            .build_table(&rows)
            .and_then(|t| session.run_function(&self.insert_fn, &[Constant::Table(t)]));
        match sent {
            Ok(_) => {
                counts.sent += n;
                drop(counts);
                trace!(target: "dolphin", worker = worker.index, rows = n, "flushed");
                for mut row in rows {
                    row.clear();
                    if !self.unused.push_capped(row, MAX_BATCH_ROWS) {
                        break;
                    }
                }
                true
            }
            Err(e) => {
                error!(target: "dolphin", worker = worker.index, rows = n, error = %e, "flush failed");
                counts.failed += n;
                worker.failed.push_all(rows);
                self.fail(&e);
                false
            }
        }
    }
}

fn flush_loop(shared: Arc<Shared>, worker: Arc<Worker>, mut session: Box<dyn Session>) {
    debug!(target: "dolphin", worker = worker.index, "writer thread started");
    while !shared.fatal.load(Ordering::Acquire) {
        let queued = worker.queue.wait_for(1, POLL);
        let exiting = worker.exit.load(Ordering::Acquire);
        if queued == 0 {
            if exiting {
                break;
            }
            continue;
        }
        if queued < shared.batch_size && !exiting {
            worker.queue.wait_for_len(shared.batch_size, shared.throttle);
        }
        if !shared.flush(&worker, session.as_mut()) {
            break;
        }
    }
    session.close();
    debug!(target: "dolphin", worker = worker.index, "writer thread stopped");
}

/// Inserts rows into one server table from a set of worker threads.
///
/// Rows are routed to workers by the partition column, batched, and sent
/// with one insert call per batch. The first failed batch stops every
/// worker; failed and still-queued rows can then be taken back with
/// [`TableWriter::get_unwritten_data`].
pub struct TableWriter {
    shared: Arc<Shared>,
    router: Router,
    workers: Vec<Arc<Worker>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    finished: AtomicBool,
}

impl TableWriter {
    /// Connects over TCP with the config's address and credentials.
    pub fn connect(config: WriterConfig) -> Result<TableWriter> {
        let connector = TcpConnector::new(config.connect_options());
        TableWriter::new(config, &connector)
    }

    /// Reads the table's schema and opens one session per worker. Fails if
    /// any connection fails.
    pub fn new(config: WriterConfig, connector: &dyn Connector) -> Result<TableWriter> {
        config.validate()?;
        let mut session = connector.connect()?;
        let schema = TableSchema::discover(session.as_mut(), &config)?;
        session.close();
        config.validate_columns(&schema.names)?;
        let router = Router::new(&schema, &config)?;
        if !config.compress.is_empty() {
            debug!(target: "dolphin", methods = ?config.compress, "compression requested");
        }
        let sessions = (0..config.thread_count)
            .map(|_| connector.connect())
            .collect::<Result<Vec<_>>>()?;

        let shared = Arc::new(Shared {
            table: config.table_name.clone(),
            names: schema.names,
            descs: schema.descs,
            insert_fn: config.insert_function(),
            batch_size: config.batch_size,
            throttle: config.throttle(),
            fatal: AtomicBool::new(false),
            error: Mutex::new(None),
            unused: SyncQueue::new(),
        });
        let workers: Vec<Arc<Worker>> = (0..config.thread_count)
            .map(|index| {
                Arc::new(Worker {
                    index,
                    queue: SyncQueue::new(),
                    failed: SyncQueue::new(),
                    counts: Mutex::new(Counts::default()),
                    exit: AtomicBool::new(false),
                })
            })
            .collect();
        let writer = TableWriter {
            shared,
            router,
            workers,
            handles: Mutex::new(Vec::new()),
            finished: AtomicBool::new(false),
        };
        for (worker, session) in writer.workers.iter().zip(sessions) {
            let (s, w) = (writer.shared.clone(), worker.clone());
            let h = thread::Builder::new()
                .name(format!("dolphin-writer-{}", worker.index))
                .spawn(move || flush_loop(s, w, session))
                .map_err(Error::from_io)?;
            writer.handles.lock().push(h);
        }
        info!(target: "dolphin", table = %config.table_name, threads = config.thread_count,
            batch = config.batch_size, "table writer started");
        Ok(writer)
    }

    pub fn column_names(&self) -> &[String] {
        &self.shared.names
    }

    pub fn column_types(&self) -> &[TypeDesc] {
        &self.shared.descs
    }

    fn check_open(&self) -> Result<()> {
        if self.shared.fatal.load(Ordering::Acquire) {
            let msg = self.shared.error.lock().clone().unwrap_or_default();
            return Err(kind_err(
                ErrorKind::FatalWriter,
                format!("writer stopped after an error: {}", msg),
            ));
        }
        if self.finished.load(Ordering::Acquire) {
            return Err(kind_err(ErrorKind::FatalWriter, "writer has finished"));
        }
        Ok(())
    }

    /// An empty row buffer, reused from rows already sent when possible.
    pub fn row_buffer(&self) -> Vec<Constant> {
        let mut row = self.shared.unused.pop().unwrap_or_default();
        row.clear();
        row
    }

    /// Row buffers waiting for reuse.
    pub fn pooled_rows(&self) -> usize {
        self.shared.unused.len()
    }

    /// Converts each value to its column's type in place.
    fn convert(&self, row: &mut Row) -> Result<()> {
        if row.len() != self.shared.names.len() {
            return Err(arg_err(format!(
                "row of {} values for a table of {} columns",
                row.len(),
                self.shared.names.len()
            )));
        }
        for (i, value) in row.iter_mut().enumerate() {
            let desc = self.shared.descs[i];
            let converted = match &*value {
                Constant::Scalar(s) if !desc.array => Constant::Scalar(s.cast(desc)?),
                Constant::Vector(v) if desc.array => {
                    let elem = TypeDesc { array: false, ..desc };
                    if v.desc() == elem {
                        continue;
                    }
                    let items = (0..v.len()).map(|j| v.get(j)?.cast(elem)).collect::<Result<Vec<_>>>()?;
                    Constant::Vector(Vector::from_scalars(elem, &items)?)
                }
                other => {
                    return Err(type_err(format!(
                        "column {} of type {} cannot take a {:?}",
                        self.shared.names[i],
                        desc,
                        other.form()
                    )))
                }
            };
            *value = converted;
        }
        Ok(())
    }

    /// Queues one row, taking ownership of its buffer.
    pub fn insert_row(&self, mut row: Vec<Constant>) -> Result<()> {
        self.check_open()?;
        self.convert(&mut row)?;
        let w = self.router.worker_of(&row, self.workers.len())?;
        self.workers[w].queue.push(row);
        Ok(())
    }

    pub fn insert(&self, row: &[Constant]) -> Result<()> {
        let mut buf = self.row_buffer();
        buf.extend_from_slice(row);
        self.insert_row(buf)
    }

    /// Queues every row of `table`, matching columns by position. Either
    /// every row is queued or none is.
    pub fn insert_table(&self, table: &Table) -> Result<()> {
        self.check_open()?;
        if table.cols() != self.shared.names.len() {
            return Err(arg_err(format!(
                "table of {} columns for a writer of {}",
                table.cols(),
                self.shared.names.len()
            )));
        }
        let mut rows = Vec::with_capacity(table.rows());
        for i in 0..table.rows() {
            let mut row = self.row_buffer();
            row.extend(table.row(i)?);
            self.convert(&mut row)?;
            rows.push(row);
        }
        let n = self.workers.len();
        let targets = match self.router.column() {
            Some(c) if table.columns()[c].desc() == self.shared.descs[c] => {
                self.router.workers_of(&table.columns()[c], n)?
            }
            _ => rows
                .iter()
                .map(|r| self.router.worker_of(r, n))
                .collect::<Result<Vec<_>>>()?,
        };
        let mut per_worker: Vec<Vec<Row>> = (0..n).map(|_| Vec::new()).collect();
        for (row, w) in rows.into_iter().zip(targets) {
            per_worker[w].push(row);
        }
        for (worker, batch) in self.workers.iter().zip(per_worker) {
            worker.queue.push_all(batch);
        }
        Ok(())
    }

    pub fn get_status(&self) -> WriterStatus {
        let mut status = WriterStatus {
            is_exiting: self.finished.load(Ordering::Acquire),
            has_error: self.shared.fatal.load(Ordering::Acquire),
            error_info: self.shared.error.lock().clone(),
            ..WriterStatus::default()
        };
        for w in &self.workers {
            let counts = w.counts.lock();
            let t = ThreadStatus {
                thread_id: w.index,
                sent_rows: counts.sent,
                unsent_rows: w.queue.len(),
                send_failed_rows: counts.failed,
            };
            drop(counts);
            status.sent_rows += t.sent_rows;
            status.unsent_rows += t.unsent_rows;
            status.send_failed_rows += t.send_failed_rows;
            status.threads.push(t);
        }
        status
    }

    /// Lets every worker drain its queue, then joins them. Later calls do
    /// nothing.
    pub fn wait_for_thread_completion(&self) -> Result<()> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for w in &self.workers {
            w.exit.store(true, Ordering::Release);
            w.queue.wake_all();
        }
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        for h in handles {
            if h.join().is_err() {
                warn!(target: "dolphin", table = %self.shared.table, "writer thread panicked");
            }
        }
        let status = self.get_status();
        info!(target: "dolphin", table = %self.shared.table, sent = status.sent_rows,
            unsent = status.unsent_rows, failed = status.send_failed_rows, "table writer finished");
        Ok(())
    }

    /// Removes and returns the rows that failed to send, then those still
    /// queued, worker by worker.
    pub fn get_unwritten_data(&self) -> Vec<Vec<Constant>> {
        let mut out = Vec::new();
        for w in &self.workers {
            let _counts = w.counts.lock();
            out.extend(w.failed.drain_all());
            out.extend(w.queue.drain_all());
        }
        out
    }

    /// [`TableWriter::get_unwritten_data`] packed as msgpack.
    pub fn export_unwritten(&self) -> Result<Vec<u8>> {
        let rows = self.get_unwritten_data();
        UnwrittenRows::new(&self.shared.table, &self.shared.names, &self.shared.descs, &rows)?.to_msgpack()
    }
}

impl Drop for TableWriter {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_thread_completion() {
            warn!(target: "dolphin", error = %e, "table writer shutdown failed");
        }
    }
}
