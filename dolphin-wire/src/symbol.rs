// Symbol base frames: `id, size, size strings`. A base goes over a stream
// once; later vectors sharing it send `id, 0`.

use crate::ioutil::{DataInputStream, DataOutputStream};
use dolphin_base::{malformed_err, Result};
use dolphin_vals::{SymbolBase, MAX_SYMBOLS};
use rapidhash::RapidHashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::debug;

/// Writes a complete base frame.
pub fn write_symbol_base<W: Write>(out: &mut DataOutputStream<W>, id: i32, base: &SymbolBase) -> Result<()> {
    write_symbols(out, id, &base.symbols())
}

fn write_symbols<W: Write>(out: &mut DataOutputStream<W>, id: i32, syms: &[String]) -> Result<()> {
    let size = i32::try_from(syms.len()).map_err(|_| malformed_err("symbol base too large"))?;
    out.write_i32(id);
    out.write_i32(size);
    for s in syms {
        out.write_string(s.as_bytes());
    }
    Ok(())
}

/// Reads one frame as `(id, strings)`; an empty list is a back-reference.
pub fn read_symbol_base<R: Read>(inp: &mut DataInputStream<R>) -> Result<(i32, Vec<String>)> {
    let id = inp.read_i32()?;
    let size = inp.read_i32()?;
    let size = usize::try_from(size).map_err(|_| malformed_err(format!("negative symbol base size {}", size)))?;
    if size > MAX_SYMBOLS {
        return Err(malformed_err(format!("symbol base of {} entries", size)));
    }
    let mut syms = Vec::with_capacity(size);
    for _ in 0..size {
        syms.push(inp.read_string()?);
    }
    Ok((id, syms))
}

/// Per-stream record of bases already sent. Bases are keyed by identity and
/// held so an address is never reused while the stream lives.
#[derive(Default)]
pub struct SymbolBaseWriter {
    sent: RapidHashMap<usize, (i32, usize)>,
    held: Vec<Arc<SymbolBase>>,
}

impl SymbolBaseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `base` in full the first time it is seen, and again if it has
    /// grown since; otherwise writes a back-reference. The recorded length is
    /// that of the snapshot written, so symbols added meanwhile go out next time.
    pub fn write<W: Write>(&mut self, out: &mut DataOutputStream<W>, base: &Arc<SymbolBase>) -> Result<()> {
        let key = Arc::as_ptr(base) as usize;
        let id = match self.sent.get(&key).copied() {
            Some((id, sent_len)) if sent_len == base.len() => {
                out.write_i32(id);
                out.write_i32(0);
                return Ok(());
            }
            Some((id, _)) => id,
            None => {
                let id = self.held.len() as i32;
                self.held.push(base.clone());
                id
            }
        };
        let syms = base.symbols();
        write_symbols(out, id, &syms)?;
        self.sent.insert(key, (id, syms.len()));
        Ok(())
    }
}

/// Per-stream cache of bases received, so back-references resolve.
#[derive(Default)]
pub struct SymbolBaseCache {
    bases: RapidHashMap<i32, Arc<SymbolBase>>,
}

impl SymbolBaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<R: Read>(&mut self, inp: &mut DataInputStream<R>) -> Result<Arc<SymbolBase>> {
        let (id, syms) = read_symbol_base(inp)?;
        if syms.is_empty() {
            return self
                .bases
                .get(&id)
                .cloned()
                .ok_or_else(|| malformed_err(format!("symbol base {} referenced before it was sent", id)));
        }
        let base = SymbolBase::from_symbols(id, syms)?;
        debug!(target: "dolphin", id, size = base.len(), "symbol base received");
        self.bases.insert(id, base.clone());
        Ok(base)
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}
