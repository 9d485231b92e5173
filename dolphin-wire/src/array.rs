// Array vector data: blocks of at most 65535 rows, each a small header, the
// row counts, then the flat values of those rows.

use crate::ioutil::{DataInputStream, DataOutputStream, StreamStatus};
use crate::vector::{read_vector_data, write_vector_data};
use dolphin_base::{kind_err, malformed_err, type_err, ErrorKind, Result};
use dolphin_vals::{ArrayVector, Vector, VectorOps};
use std::io::{Read, Write};
use tracing::trace;

pub const MAX_BLOCK_ROWS: usize = 65535;

/// Width of the per-row counts in one block.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub enum CountWidth {
    Byte1,
    Byte2,
    Byte4,
}

impl CountWidth {
    pub fn len(&self) -> usize {
        match self {
            CountWidth::Byte1 => 1,
            CountWidth::Byte2 => 2,
            CountWidth::Byte4 => 4,
        }
    }

    /// The narrowest width holding every count in `counts`.
    pub fn select(counts: &[usize]) -> CountWidth {
        let max = counts.iter().copied().max().unwrap_or(0);
        if max <= 0xff {
            CountWidth::Byte1
        } else if max <= 0xffff {
            CountWidth::Byte2
        } else {
            CountWidth::Byte4
        }
    }

    pub fn from_len(n: u8) -> Result<CountWidth> {
        match n {
            1 => Ok(CountWidth::Byte1),
            2 => Ok(CountWidth::Byte2),
            4 => Ok(CountWidth::Byte4),
            other => Err(malformed_err(format!("bad array count width {}", other))),
        }
    }
}

/// Writes the row blocks of `a`. The caller has already written the header,
/// row and column counts, and decimal scale.
pub fn write_array_data<W: Write>(out: &mut DataOutputStream<W>, a: &ArrayVector) -> Result<()> {
    if matches!(a.value(), Vector::Symbol(_)) {
        return Err(type_err("symbol array vectors have no wire form"));
    }
    let index = a.index();
    let mut row = 0;
    while row < index.len() {
        let n = (index.len() - row).min(MAX_BLOCK_ROWS);
        let counts: Vec<usize> = (row..row + n).map(|r| a.row_len(r)).collect();
        let uniform = counts.iter().all(|&c| c == counts[0]);
        let width = CountWidth::select(&counts);
        out.write_u16(n as u16);
        out.write_u8(width.len() as u8);
        out.write_u8(uniform as u8);
        let listed = if uniform { &counts[..1] } else { &counts[..] };
        for &c in listed {
            match width {
                CountWidth::Byte1 => out.write_u8(c as u8),
                CountWidth::Byte2 => out.write_u16(c as u16),
                CountWidth::Byte4 => out.write_u32(c as u32),
            }
        }
        let start = if row == 0 { 0 } else { index[row - 1] as usize };
        let end = index[row + n - 1] as usize;
        write_vector_data(out, a.value(), start, end - start)?;
        row += n;
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    BlockHeader,
    Counts,
    Data,
}

/// Decodes array vector rows from a stream that may stop at any byte. Each
/// [`Self::decode`] call picks up exactly where the previous one stopped;
/// nothing already consumed is read twice.
#[derive(Debug)]
pub struct ArrayVectorDecoder {
    stage: Stage,
    rows_total: usize,
    rows_read: usize,
    block_rows: usize,
    width: CountWidth,
    uniform: bool,
    counts: Vec<usize>,
    block_values: usize,
    values_read: usize,
    index: Vec<i32>,
    value: Vector,
}

impl ArrayVectorDecoder {
    /// `value` supplies the element type; any elements in it are discarded.
    pub fn new(value: Vector, rows: usize) -> Result<Self> {
        if value.desc().array {
            return Err(type_err("array vectors cannot nest"));
        }
        let mut value = value;
        value.clear();
        Ok(ArrayVectorDecoder {
            stage: Stage::BlockHeader,
            rows_total: rows,
            rows_read: 0,
            block_rows: 0,
            width: CountWidth::Byte1,
            uniform: false,
            counts: Vec::new(),
            block_values: 0,
            values_read: 0,
            index: Vec::new(),
            value,
        })
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn is_done(&self) -> bool {
        self.rows_read == self.rows_total
    }

    pub fn decode<R: Read>(&mut self, inp: &mut DataInputStream<R>) -> Result<StreamStatus> {
        loop {
            match self.stage {
                Stage::BlockHeader => {
                    if self.is_done() {
                        return Ok(StreamStatus::Ok);
                    }
                    if !inp.fill(4)? {
                        return Ok(StreamStatus::WouldBlock);
                    }
                    let rows = inp.read_u16()? as usize;
                    let width = CountWidth::from_len(inp.read_u8()?)?;
                    let uniform = inp.read_u8()? != 0;
                    if rows == 0 || self.rows_read + rows > self.rows_total {
                        return Err(malformed_err(format!(
                            "array block of {} rows after {} of {}",
                            rows, self.rows_read, self.rows_total
                        )));
                    }
                    self.block_rows = rows;
                    self.width = width;
                    self.uniform = uniform;
                    self.stage = Stage::Counts;
                }
                Stage::Counts => {
                    let listed = if self.uniform { 1 } else { self.block_rows };
                    if !inp.fill(listed * self.width.len())? {
                        return Ok(StreamStatus::WouldBlock);
                    }
                    let mut counts = Vec::with_capacity(self.block_rows);
                    for _ in 0..listed {
                        let c = match self.width {
                            CountWidth::Byte1 => inp.read_u8()? as usize,
                            CountWidth::Byte2 => inp.read_u16()? as usize,
                            CountWidth::Byte4 => inp.read_u32()? as usize,
                        };
                        counts.push(c);
                    }
                    if self.uniform {
                        counts.resize(self.block_rows, counts[0]);
                    }
                    self.block_values = counts.iter().sum();
                    self.values_read = 0;
                    self.counts = counts;
                    self.stage = Stage::Data;
                }
                Stage::Data => {
                    let remaining = self.block_values - self.values_read;
                    if remaining > 0 {
                        let at = self.value.len();
                        let got = read_vector_data(inp, &mut self.value, at, remaining)?;
                        self.values_read += got.count;
                        if self.values_read < self.block_values {
                            return Ok(StreamStatus::WouldBlock);
                        }
                    }
                    let mut end = self.index.last().map_or(0, |&e| e as usize);
                    for c in self.counts.drain(..) {
                        end += c;
                        let e = i32::try_from(end).map_err(|_| {
                            kind_err(ErrorKind::Overflow, format!("array vector offset {} exceeds i32", end))
                        })?;
                        self.index.push(e);
                    }
                    self.rows_read += self.block_rows;
                    trace!(target: "dolphin", rows = self.rows_read, of = self.rows_total, "array block decoded");
                    self.stage = Stage::BlockHeader;
                }
            }
        }
    }

    pub fn finish(self) -> Result<ArrayVector> {
        if !self.is_done() {
            return Err(malformed_err(format!(
                "array vector incomplete: {} of {} rows",
                self.rows_read, self.rows_total
            )));
        }
        ArrayVector::from_parts(self.index, self.value)
    }
}
