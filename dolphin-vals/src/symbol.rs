use dolphin_base::{kind_err, ErrorKind, Result};
use parking_lot::Mutex;
use rapidhash::RapidHashMap;
use std::sync::Arc;

/// Hard cap on distinct strings in one base.
pub const MAX_SYMBOLS: usize = 2_097_152;

#[derive(Debug, Default)]
struct SymbolTable {
    syms: Vec<String>,
    index: RapidHashMap<String, i32>,
}

impl SymbolTable {
    fn with_null() -> Self {
        let mut t = SymbolTable::default();
        t.syms.push(String::new());
        t.index.insert(String::new(), 0);
        t
    }
}

/// Interning dictionary shared by symbol vectors. Id 0 is the empty string,
/// which is also the symbol null. Ids are handed out in first-use order and
/// never change. The table sits behind a mutex so vectors on different
/// threads can share one base.
#[derive(Debug)]
pub struct SymbolBase {
    id: i32,
    table: Mutex<SymbolTable>,
}

impl SymbolBase {
    pub fn new(id: i32) -> Arc<Self> {
        Arc::new(SymbolBase {
            id,
            table: Mutex::new(SymbolTable::with_null()),
        })
    }

    /// Rebuilds a base from its string list, as received in a base frame.
    /// The first entry must be the empty string.
    pub fn from_symbols(id: i32, symbols: Vec<String>) -> Result<Arc<Self>> {
        if symbols.len() > MAX_SYMBOLS {
            return Err(kind_err(
                ErrorKind::MalformedData,
                format!("symbol base with {} entries exceeds {}", symbols.len(), MAX_SYMBOLS),
            ));
        }
        let mut table = SymbolTable::with_null();
        for (i, s) in symbols.into_iter().enumerate() {
            if i == 0 {
                if !s.is_empty() {
                    return Err(kind_err(
                        ErrorKind::MalformedData,
                        format!("symbol base {} does not start with the empty string", id),
                    ));
                }
                continue;
            }
            let next = table.syms.len() as i32;
            if table.index.insert(s.clone(), next).is_some() {
                return Err(kind_err(
                    ErrorKind::MalformedData,
                    format!("symbol base {} repeats '{}'", id, s),
                ));
            }
            table.syms.push(s);
        }
        Ok(Arc::new(SymbolBase {
            id,
            table: Mutex::new(table),
        }))
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the id of `s`, inserting it if new.
    pub fn find_and_insert(&self, s: &str) -> Result<i32> {
        let mut table = self.table.lock();
        if let Some(&id) = table.index.get(s) {
            return Ok(id);
        }
        if table.syms.len() >= MAX_SYMBOLS {
            return Err(kind_err(
                ErrorKind::OutOfMemory,
                format!("symbol base {} is full ({} entries)", self.id, MAX_SYMBOLS),
            ));
        }
        let id = table.syms.len() as i32;
        table.syms.push(s.to_string());
        table.index.insert(s.to_string(), id);
        Ok(id)
    }

    /// Id of `s` if already interned.
    pub fn find(&self, s: &str) -> Option<i32> {
        self.table.lock().index.get(s).copied()
    }

    pub fn symbol(&self, id: i32) -> Option<String> {
        let table = self.table.lock();
        usize::try_from(id).ok().and_then(|i| table.syms.get(i).cloned())
    }

    /// Runs `f` on the symbol for `id` without cloning it. Unknown ids read
    /// as the empty string.
    pub fn with_symbol<R>(&self, id: i32, f: impl FnOnce(&str) -> R) -> R {
        let table = self.table.lock();
        let s = usize::try_from(id)
            .ok()
            .and_then(|i| table.syms.get(i))
            .map(|s| s.as_str())
            .unwrap_or("");
        f(s)
    }

    pub fn len(&self) -> usize {
        self.table.lock().syms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn symbols(&self) -> Vec<String> {
        self.table.lock().syms.clone()
    }
}
