use dolphin_base::{conn_err, Result};
use dolphin_net::{Connector, Session};
use dolphin_vals::{Constant, DataType, Dictionary, Scalar, Table, TypeDesc, Vector};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub(crate) mod config;
pub(crate) mod export;
pub(crate) mod partition;
pub(crate) mod writer;

/// A server that answers `schema(...)` and records every insert call.
pub(crate) struct MockServer {
    schema: Constant,
    pub(crate) inserts: Mutex<Vec<(String, Table)>>,
    pub(crate) fail: AtomicBool,
    pub(crate) connects: AtomicUsize,
}

impl MockServer {
    pub(crate) fn new(schema: Constant) -> Arc<MockServer> {
        Arc::new(MockServer {
            schema,
            inserts: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
        })
    }

    pub(crate) fn inserted_rows(&self) -> usize {
        self.inserts.lock().iter().map(|(_, t)| t.rows()).sum()
    }
}

pub(crate) struct MockConnector(pub(crate) Arc<MockServer>);

impl Connector for MockConnector {
    fn connect(&self) -> Result<Box<dyn Session>> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            server: self.0.clone(),
            open: true,
        }))
    }
}

struct MockSession {
    server: Arc<MockServer>,
    open: bool,
}

impl Session for MockSession {
    fn run(&mut self, script: &str) -> Result<Constant> {
        if script.starts_with("schema(") {
            return Ok(self.server.schema.clone());
        }
        Err(conn_err(format!("unexpected script {}", script)))
    }

    fn run_function(&mut self, name: &str, args: &[Constant]) -> Result<Constant> {
        if self.server.fail.load(Ordering::SeqCst) {
            return Err(conn_err("insert refused"));
        }
        let Some(Constant::Table(t)) = args.first() else {
            return Err(conn_err("insert without a table"));
        };
        self.server.inserts.lock().push((name.to_string(), t.clone()));
        Ok(Constant::Scalar(Scalar::Int(t.rows() as i32)))
    }

    fn upload(&mut self, _names: &[String], _values: &[Constant]) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// One level of a partitioned table: column name, partition type id and
/// the level's partition schema.
pub(crate) struct Level(pub(crate) &'static str, pub(crate) i32, pub(crate) Constant);

/// The dictionary `schema(table)` returns for columns `cols` partitioned by
/// `levels`.
pub(crate) fn schema_info(cols: &[(&str, DataType)], levels: Vec<Level>) -> Constant {
    let names: Vec<&str> = cols.iter().map(|(n, _)| *n).collect();
    let ids: Vec<i32> = cols.iter().map(|(_, t)| TypeDesc::new(*t).type_id()).collect();
    let defs = Table::new(
        vec!["name".to_string(), "typeInt".to_string(), "extra".to_string()],
        vec![Vector::strings(&names), Vector::ints(&ids), Vector::ints(&vec![0; cols.len()])],
    )
    .expect("colDefs");
    let mut dict =
        Dictionary::new(TypeDesc::new(DataType::String), TypeDesc::new(DataType::Any)).expect("dictionary");
    let key = |k: &str| Scalar::String(k.to_string());
    dict.insert(&key("colDefs"), &Constant::Table(defs)).expect("insert");
    if levels.len() == 1 {
        let Level(col, ty, schema) = levels.into_iter().next().expect("level");
        dict.insert(&key("partitionColumnName"), &Constant::Scalar(Scalar::String(col.to_string())))
            .expect("insert");
        dict.insert(&key("partitionType"), &Constant::Scalar(Scalar::Int(ty)))
            .expect("insert");
        dict.insert(&key("partitionSchema"), &schema).expect("insert");
    } else if !levels.is_empty() {
        let cols: Vec<&str> = levels.iter().map(|l| l.0).collect();
        let types: Vec<i32> = levels.iter().map(|l| l.1).collect();
        let schemas: Vec<Constant> = levels.into_iter().map(|l| l.2).collect();
        dict.insert(&key("partitionColumnName"), &Constant::Vector(Vector::strings(&cols)))
            .expect("insert");
        dict.insert(&key("partitionType"), &Constant::Vector(Vector::ints(&types)))
            .expect("insert");
        dict.insert(&key("partitionSchema"), &any_of(schemas)).expect("insert");
    }
    Constant::Dictionary(dict)
}

pub(crate) fn any_of(elems: Vec<Constant>) -> Constant {
    use dolphin_vals::vector::{AnyCodec, TypedVector};
    Constant::Vector(Vector::Any(TypedVector::from_elems(AnyCodec, elems)))
}

pub(crate) fn row(id: i32, price: f64) -> Vec<Constant> {
    vec![Constant::Scalar(Scalar::Int(id)), Constant::Scalar(Scalar::Double(price))]
}

/// Polls `cond` until it holds or two seconds pass.
pub(crate) fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Scalar cells of `rows`, for comparing rows of plain values.
pub(crate) fn scalars(rows: &[Vec<Constant>]) -> Vec<Vec<Scalar>> {
    rows.iter()
        .map(|r| r.iter().map(|c| c.as_scalar().expect("scalar cell").clone()).collect())
        .collect()
}
