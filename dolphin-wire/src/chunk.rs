// Chunked vector serialization into caller-sized buffers. A socket writer
// fills one buffer at a time; an element that does not fit is split, and
// the next call resumes inside it.

use crate::elem::FixedElem;
use dolphin_base::{type_err, Result};
use dolphin_vals::{Vector, VectorOps};

/// What one [`serialize_chunk`] call wrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub bytes: usize,
    /// Elements completed by this call, counting one that was split by the
    /// previous call and finished here.
    pub elements: usize,
    /// Bytes already written of the next unfinished element; 0 when the
    /// chunk ends on an element boundary.
    pub partial: usize,
}

/// Writes elements starting at `index_start`, skipping the first `offset`
/// bytes of that element (written by an earlier call). Returns `None` when
/// `index_start` is at or past the end.
pub fn serialize_chunk(v: &Vector, buf: &mut [u8], index_start: usize, offset: usize) -> Result<Option<Chunk>> {
    if index_start >= v.len() {
        return Ok(None);
    }
    let chunk = match v {
        Vector::I8(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::I16(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::I32(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::I64(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::F32(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::F64(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::Fixed(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::Dec32(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::Dec64(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::Dec128(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::Symbol(t) => fixed_chunk(t.elems(), buf, index_start, offset),
        Vector::Str(t) if t.desc().ty == dolphin_vals::DataType::Blob => {
            var_chunk(t.elems(), buf, index_start, offset, |e, out| {
                out.extend_from_slice(&(e.len() as i32).to_le_bytes());
                out.extend_from_slice(e);
            })
        }
        Vector::Str(t) => var_chunk(t.elems(), buf, index_start, offset, |e, out| {
            out.extend_from_slice(e);
            out.push(0);
        }),
        other => {
            return Err(type_err(format!(
                "{} vectors are written as whole objects, not chunks",
                other.desc()
            )))
        }
    };
    Ok(Some(chunk))
}

fn fixed_chunk<E: FixedElem>(elems: &[E], buf: &mut [u8], start: usize, offset: usize) -> Chunk {
    let w = E::WIDTH;
    let mut scratch = [0u8; 16];
    let mut bytes = 0;
    let mut elements = 0;
    let mut skip = offset.min(w);
    for e in &elems[start..] {
        let room = buf.len() - bytes;
        let need = w - skip;
        if room == 0 {
            return Chunk {
                bytes,
                elements,
                partial: skip,
            };
        }
        e.put(&mut scratch, false);
        if need > room {
            buf[bytes..].copy_from_slice(&scratch[skip..skip + room]);
            return Chunk {
                bytes: buf.len(),
                elements,
                partial: skip + room,
            };
        }
        buf[bytes..bytes + need].copy_from_slice(&scratch[skip..w]);
        bytes += need;
        elements += 1;
        skip = 0;
    }
    Chunk {
        bytes,
        elements,
        partial: 0,
    }
}

fn var_chunk(
    elems: &[Vec<u8>],
    buf: &mut [u8],
    start: usize,
    offset: usize,
    encode: impl Fn(&[u8], &mut Vec<u8>),
) -> Chunk {
    let mut scratch = Vec::new();
    let mut bytes = 0;
    let mut elements = 0;
    let mut skip = offset;
    for e in &elems[start..] {
        let room = buf.len() - bytes;
        if room == 0 {
            return Chunk {
                bytes,
                elements,
                partial: skip,
            };
        }
        scratch.clear();
        encode(e, &mut scratch);
        let skip_now = skip.min(scratch.len());
        let need = scratch.len() - skip_now;
        if need > room {
            buf[bytes..].copy_from_slice(&scratch[skip_now..skip_now + room]);
            return Chunk {
                bytes: buf.len(),
                elements,
                partial: skip_now + room,
            };
        }
        buf[bytes..bytes + need].copy_from_slice(&scratch[skip_now..]);
        bytes += need;
        elements += 1;
        skip = 0;
    }
    Chunk {
        bytes,
        elements,
        partial: 0,
    }
}
