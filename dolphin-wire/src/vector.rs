// Flat element data of a vector: the part of a vector frame after its
// header. Reads are resumable; each call reports how many elements landed
// and whether the source blocked first.

use crate::elem::FixedElem;
use crate::ioutil::{DataInputStream, DataOutputStream, StreamStatus};
use dolphin_base::{kind_err, malformed_err, type_err, ErrorKind, Result};
use dolphin_vals::vector::{Codec, SymbolId, TypedVector};
use dolphin_vals::{DataType, Vector, VectorOps};
use std::io::{Read, Write};

const READ_BATCH: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOutcome {
    pub count: usize,
    pub status: StreamStatus,
}

/// Reads up to `target` elements into `v` starting at position `index_start`,
/// overwriting existing elements and growing the vector past its end.
pub fn read_vector_data<R: Read>(
    inp: &mut DataInputStream<R>,
    v: &mut Vector,
    index_start: usize,
    target: usize,
) -> Result<ReadOutcome> {
    if index_start > v.len() {
        return Err(malformed_err(format!(
            "read position {} past vector end {}",
            index_start,
            v.len()
        )));
    }
    match v {
        Vector::I8(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::I16(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::I32(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::I64(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::F32(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::F64(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::Fixed(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::Dec32(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::Dec64(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::Dec128(t) => read_fixed(inp, t, index_start, target, |_| Ok(())),
        Vector::Symbol(t) => {
            let size = t.base().len();
            read_fixed(inp, t, index_start, target, move |ids: &[SymbolId]| {
                match ids.iter().find(|id| id.0 < 0 || id.0 as usize >= size) {
                    Some(bad) => Err(kind_err(
                        ErrorKind::MalformedData,
                        format!("symbol id {} outside base of {}", bad.0, size),
                    )),
                    None => Ok(()),
                }
            })
        }
        Vector::Str(t) if t.desc().ty == DataType::Blob => read_blobs(inp, t, index_start, target),
        Vector::Str(t) => read_strings(inp, t, index_start, target),
        other => Err(type_err(format!(
            "{} vectors are read as whole objects",
            other.desc()
        ))),
    }
}

fn read_fixed<R: Read, C: Codec>(
    inp: &mut DataInputStream<R>,
    t: &mut TypedVector<C>,
    index_start: usize,
    target: usize,
    check: impl Fn(&[C::Elem]) -> Result<()>,
) -> Result<ReadOutcome>
where
    C::Elem: FixedElem,
{
    let w = <C::Elem as FixedElem>::WIDTH;
    let reversed = inp.is_reversed();
    let mut count = 0;
    while count < target {
        let want = (target - count).min(READ_BATCH);
        let ready = inp.fill(want * w)?;
        let n = if ready {
            want
        } else {
            (inp.buffered().len() / w).min(want)
        };
        if n == 0 {
            return Ok(ReadOutcome {
                count,
                status: StreamStatus::WouldBlock,
            });
        }
        let elems: Vec<C::Elem> = inp.buffered()[..n * w]
            .chunks_exact(w)
            .map(|b| <C::Elem as FixedElem>::get(b, reversed))
            .collect();
        check(&elems)?;
        inp.consume(n * w);
        t.write_elems(index_start + count, elems)?;
        count += n;
    }
    Ok(ReadOutcome {
        count,
        status: StreamStatus::Ok,
    })
}

fn read_strings<R: Read, C: Codec<Elem = Vec<u8>>>(
    inp: &mut DataInputStream<R>,
    t: &mut TypedVector<C>,
    index_start: usize,
    target: usize,
) -> Result<ReadOutcome> {
    let mut got = Vec::new();
    let mut status = StreamStatus::Ok;
    while got.len() < target {
        match inp.try_read_until(0)? {
            Some(s) => got.push(s),
            None => {
                status = StreamStatus::WouldBlock;
                break;
            }
        }
    }
    let count = got.len();
    t.write_elems(index_start, got)?;
    Ok(ReadOutcome { count, status })
}

fn read_blobs<R: Read, C: Codec<Elem = Vec<u8>>>(
    inp: &mut DataInputStream<R>,
    t: &mut TypedVector<C>,
    index_start: usize,
    target: usize,
) -> Result<ReadOutcome> {
    let reversed = inp.is_reversed();
    let mut got = Vec::new();
    let mut status = StreamStatus::Ok;
    while got.len() < target {
        if !inp.fill(4)? {
            status = StreamStatus::WouldBlock;
            break;
        }
        let n = i32::get(inp.buffered(), reversed);
        let n = usize::try_from(n).map_err(|_| malformed_err(format!("negative blob length {}", n)))?;
        if !inp.fill(4 + n)? {
            status = StreamStatus::WouldBlock;
            break;
        }
        got.push(inp.buffered()[4..4 + n].to_vec());
        inp.consume(4 + n);
    }
    let count = got.len();
    t.write_elems(index_start, got)?;
    Ok(ReadOutcome { count, status })
}

/// Reads exactly `n` elements appended at the end of `v`, treating a
/// blocked source as a timeout.
pub fn read_vector_all<R: Read>(inp: &mut DataInputStream<R>, v: &mut Vector, n: usize) -> Result<()> {
    let start = v.len();
    let mut done = 0;
    while done < n {
        let out = read_vector_data(inp, v, start + done, n - done)?;
        done += out.count;
        if out.status == StreamStatus::WouldBlock && done < n {
            return Err(dolphin_base::conn_err(format!(
                "timed out after {} of {} elements",
                done, n
            )));
        }
    }
    Ok(())
}

/// Writes elements `start..start+len` of `v` as flat data.
pub fn write_vector_data<W: Write>(out: &mut DataOutputStream<W>, v: &Vector, start: usize, len: usize) -> Result<()> {
    if start + len > v.len() {
        return Err(malformed_err(format!(
            "write range {}..{} past vector end {}",
            start,
            start + len,
            v.len()
        )));
    }
    let end = start + len;
    match v {
        Vector::I8(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::I16(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::I32(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::I64(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::F32(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::F64(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::Fixed(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::Dec32(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::Dec64(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::Dec128(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::Symbol(t) => write_fixed(out, &t.elems()[start..end]),
        Vector::Str(t) if t.desc().ty == DataType::Blob => {
            for e in &t.elems()[start..end] {
                out.write_blob(e)?;
            }
        }
        Vector::Str(t) => {
            for e in &t.elems()[start..end] {
                out.write_string(e);
            }
        }
        other => {
            return Err(type_err(format!(
                "{} vectors are written as whole objects",
                other.desc()
            )))
        }
    }
    Ok(())
}

fn write_fixed<W: Write, E: FixedElem>(out: &mut DataOutputStream<W>, elems: &[E]) {
    let reversed = out.is_reversed();
    let mut scratch = [0u8; 16];
    for e in elems {
        e.put(&mut scratch, reversed);
        out.write_bytes(&scratch[..E::WIDTH]);
    }
}
