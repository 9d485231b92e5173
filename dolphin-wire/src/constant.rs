// Whole-object codec. Every object starts with a 16-bit `form << 8 | type`
// header; what follows depends on the form.

use crate::array::{write_array_data, ArrayVectorDecoder};
use crate::elem::FixedElem;
use crate::ioutil::{DataInputStream, DataOutputStream, StreamStatus};
use crate::symbol::{SymbolBaseCache, SymbolBaseWriter};
use crate::vector::{read_vector_all, write_vector_data};
use dolphin_base::{conn_err, malformed_err, type_err, Result};
use dolphin_vals::{
    Constant, DataForm, DataType, Decimal, Dictionary, Matrix, Scalar, Set, Table, TypeDesc, Vector, VectorOps,
    ARRAY_TYPE_BASE, SYMBOL_EXTENDED,
};
use std::io::{Read, Write};

const ROW_LABELS: u8 = 1;
const COL_LABELS: u8 = 2;

/// Most columns a decoded table may have.
pub const MAX_TABLE_COLUMNS: usize = 65535;

/// Largest up-front allocation made from a count read off the wire; past
/// it, storage grows with the elements that actually arrive.
const CAPACITY_HINT: usize = 4096;

pub fn header(form: DataForm, type_id: i32) -> i16 {
    (((form.id() & 0xff) << 8) | (type_id & 0xff)) as i16
}

pub fn split_header(h: i16) -> Result<(DataForm, i32)> {
    let h = h as u16;
    Ok((DataForm::from_id((h >> 8) as i32)?, (h & 0xff) as i32))
}

fn wire_len(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| malformed_err(format!("{} elements do not fit a frame", n)))
}

fn read_len<R: Read>(inp: &mut DataInputStream<R>, what: &str) -> Result<usize> {
    let n = inp.read_i32()?;
    usize::try_from(n).map_err(|_| malformed_err(format!("negative {} {}", what, n)))
}

/// Encodes objects onto one stream. Symbol bases are sent once per writer
/// and referenced afterwards, so a writer must stay paired with one peer.
#[derive(Default)]
pub struct ConstantWriter {
    symbols: SymbolBaseWriter,
}

impl ConstantWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write<W: Write>(&mut self, out: &mut DataOutputStream<W>, c: &Constant) -> Result<()> {
        match c {
            Constant::Scalar(s) => {
                out.write_i16(header(DataForm::Scalar, s.data_type().id()));
                write_scalar_value(out, s)
            }
            Constant::Vector(v) => self.write_vector(out, DataForm::Vector, v, v.len(), 1),
            Constant::Pair(v) => self.write_vector(out, DataForm::Pair, v, v.len(), 1),
            Constant::Matrix(m) => self.write_matrix(out, m),
            Constant::Set(s) => {
                out.write_i16(header(DataForm::Set, s.desc().type_id()));
                let keys = s.values();
                self.write_vector(out, DataForm::Vector, keys, keys.len(), 1)
            }
            Constant::Dictionary(d) => {
                out.write_i16(header(DataForm::Dictionary, d.value_desc().type_id()));
                let (keys, values) = (d.keys(), d.values());
                self.write_vector(out, DataForm::Vector, keys, keys.len(), 1)?;
                self.write_vector(out, DataForm::Vector, values, values.len(), 1)
            }
            Constant::Table(t) => self.write_table(out, t),
        }
    }

    fn write_vector<W: Write>(
        &mut self,
        out: &mut DataOutputStream<W>,
        form: DataForm,
        v: &Vector,
        rows: usize,
        cols: usize,
    ) -> Result<()> {
        let desc = v.desc();
        let type_id = match v {
            Vector::Symbol(_) => desc.type_id() + SYMBOL_EXTENDED,
            _ => desc.type_id(),
        };
        out.write_i16(header(form, type_id));
        out.write_i32(wire_len(rows)?);
        out.write_i32(wire_len(cols)?);
        if desc.ty.is_decimal() {
            out.write_i32(desc.scale);
        }
        match v {
            Vector::Symbol(t) => {
                self.symbols.write(out, t.base())?;
                write_vector_data(out, v, 0, v.len())
            }
            Vector::Array(a) => write_array_data(out, a),
            Vector::Any(t) => {
                for e in t.elems() {
                    self.write(out, e)?;
                }
                Ok(())
            }
            _ => write_vector_data(out, v, 0, v.len()),
        }
    }

    fn write_matrix<W: Write>(&mut self, out: &mut DataOutputStream<W>, m: &Matrix) -> Result<()> {
        out.write_i16(header(DataForm::Matrix, m.desc().type_id()));
        let mut flags = 0u8;
        if m.row_labels().is_some() {
            flags |= ROW_LABELS;
        }
        if m.col_labels().is_some() {
            flags |= COL_LABELS;
        }
        out.write_u8(flags);
        for labels in [m.row_labels(), m.col_labels()].into_iter().flatten() {
            self.write_vector(out, DataForm::Vector, labels, labels.len(), 1)?;
        }
        self.write_vector(out, DataForm::Matrix, m.data(), m.rows(), m.cols())
    }

    fn write_table<W: Write>(&mut self, out: &mut DataOutputStream<W>, t: &Table) -> Result<()> {
        out.write_i16(header(DataForm::Table, DataType::Dictionary.id()));
        out.write_i32(wire_len(t.rows())?);
        out.write_i32(wire_len(t.cols())?);
        out.write_string(t.name().as_bytes());
        for name in t.column_names() {
            out.write_string(name.as_bytes());
        }
        for col in t.columns() {
            self.write_vector(out, DataForm::Vector, col, col.len(), 1)?;
        }
        Ok(())
    }
}

fn write_fixed_scalar<W: Write, E: FixedElem>(out: &mut DataOutputStream<W>, e: &E) {
    let mut scratch = [0u8; 16];
    e.put(&mut scratch, out.is_reversed());
    out.write_bytes(&scratch[..E::WIDTH]);
}

fn write_scalar_value<W: Write>(out: &mut DataOutputStream<W>, s: &Scalar) -> Result<()> {
    match s {
        Scalar::Void => out.write_i8(0),
        Scalar::Bool(v) | Scalar::Char(v) => out.write_i8(*v),
        Scalar::Short(v) => out.write_i16(*v),
        Scalar::Int(v)
        | Scalar::Date(v)
        | Scalar::Month(v)
        | Scalar::Time(v)
        | Scalar::Minute(v)
        | Scalar::Second(v)
        | Scalar::DateTime(v)
        | Scalar::DateHour(v) => out.write_i32(*v),
        Scalar::Long(v) | Scalar::Timestamp(v) | Scalar::NanoTime(v) | Scalar::NanoTimestamp(v) => out.write_i64(*v),
        Scalar::Float(v) => out.write_f32(*v),
        Scalar::Double(v) => out.write_f64(*v),
        Scalar::String(v) | Scalar::Symbol(v) => out.write_string(v.as_bytes()),
        Scalar::Blob(v) => out.write_blob(v)?,
        Scalar::Uuid(v) | Scalar::IpAddr(v) | Scalar::Int128(v) => write_fixed_scalar(out, v),
        Scalar::Decimal32(d) => {
            out.write_i32(d.scale());
            out.write_i32(d.raw());
        }
        Scalar::Decimal64(d) => {
            out.write_i32(d.scale());
            out.write_i64(d.raw());
        }
        Scalar::Decimal128(d) => {
            out.write_i32(d.scale());
            out.write_i128(d.raw());
        }
    }
    Ok(())
}

/// Decodes objects from one stream, remembering the symbol bases it has
/// seen. Reads block: a source that stops mid-object is a timeout.
#[derive(Default)]
pub struct ConstantReader {
    symbols: SymbolBaseCache,
}

impl ConstantReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<R: Read>(&mut self, inp: &mut DataInputStream<R>) -> Result<Constant> {
        let (form, type_id) = split_header(inp.read_i16()?)?;
        match form {
            DataForm::Scalar => Ok(Constant::Scalar(read_scalar_value(inp, type_id)?)),
            DataForm::Vector => {
                let (v, _, _) = self.read_vector_body(inp, type_id)?;
                Ok(Constant::Vector(v))
            }
            DataForm::Pair => {
                let (v, _, _) = self.read_vector_body(inp, type_id)?;
                Constant::pair(v)
            }
            DataForm::Matrix => self.read_matrix(inp).map(Constant::Matrix),
            DataForm::Set => {
                let keys = self.read_vector(inp)?;
                Ok(Constant::Set(Set::from_vector(&keys)?))
            }
            DataForm::Dictionary => {
                let keys = self.read_vector(inp)?;
                let values = self.read_vector(inp)?;
                Ok(Constant::Dictionary(Dictionary::from_vectors(&keys, &values)?))
            }
            DataForm::Table => self.read_table(inp).map(Constant::Table),
        }
    }

    /// Reads one object that must be a vector.
    pub fn read_vector<R: Read>(&mut self, inp: &mut DataInputStream<R>) -> Result<Vector> {
        match self.read(inp)? {
            Constant::Vector(v) => Ok(v),
            other => Err(malformed_err(format!("expected a vector, got a {:?}", other.form()))),
        }
    }

    fn read_matrix<R: Read>(&mut self, inp: &mut DataInputStream<R>) -> Result<Matrix> {
        let flags = inp.read_u8()?;
        let row_labels = if flags & ROW_LABELS != 0 {
            Some(self.read_vector(inp)?)
        } else {
            None
        };
        let col_labels = if flags & COL_LABELS != 0 {
            Some(self.read_vector(inp)?)
        } else {
            None
        };
        let (form, type_id) = split_header(inp.read_i16()?)?;
        if form != DataForm::Matrix {
            return Err(malformed_err(format!("matrix body tagged {:?}", form)));
        }
        let (data, rows, cols) = self.read_vector_body(inp, type_id)?;
        let mut m = Matrix::new(data, rows, cols)?;
        m.set_row_labels(row_labels)?;
        m.set_col_labels(col_labels)?;
        Ok(m)
    }

    fn read_table<R: Read>(&mut self, inp: &mut DataInputStream<R>) -> Result<Table> {
        let rows = read_len(inp, "table rows")?;
        let cols = read_len(inp, "table columns")?;
        if cols > MAX_TABLE_COLUMNS {
            return Err(malformed_err(format!("table of {} columns", cols)));
        }
        let name = inp.read_string()?;
        let mut names = Vec::with_capacity(cols.min(CAPACITY_HINT));
        for _ in 0..cols {
            names.push(inp.read_string()?);
        }
        let mut columns = Vec::with_capacity(cols.min(CAPACITY_HINT));
        for name in &names {
            let col = self.read_vector(inp)?;
            if col.len() != rows {
                return Err(malformed_err(format!(
                    "column {} has {} rows, table has {}",
                    name,
                    col.len(),
                    rows
                )));
            }
            columns.push(col);
        }
        let mut t = Table::new(names, columns)?;
        t.set_name(name);
        Ok(t)
    }

    /// Everything after a vector header: dimensions, optional scale or symbol
    /// base, then the elements.
    fn read_vector_body<R: Read>(
        &mut self,
        inp: &mut DataInputStream<R>,
        type_id: i32,
    ) -> Result<(Vector, usize, usize)> {
        let rows = read_len(inp, "vector rows")?;
        let cols = read_len(inp, "vector columns")?;
        let n = rows
            .checked_mul(cols)
            .ok_or_else(|| malformed_err(format!("{} x {} elements overflow", rows, cols)))?;
        if type_id >= SYMBOL_EXTENDED {
            if type_id != DataType::Symbol.id() + SYMBOL_EXTENDED {
                return Err(malformed_err(format!("unknown extended type id {}", type_id)));
            }
            let base = self.symbols.read(inp)?;
            let mut v = Vector::new_symbol(base, 0, n.min(CAPACITY_HINT))?;
            read_vector_all(inp, &mut v, n)?;
            return Ok((v, rows, cols));
        }
        let elem_ty = DataType::from_id(if type_id >= ARRAY_TYPE_BASE {
            type_id - ARRAY_TYPE_BASE
        } else {
            type_id
        })?;
        let scale = if elem_ty.is_decimal() { inp.read_i32()? } else { 0 };
        let desc = TypeDesc::from_type_id(type_id, scale)?;
        let elem = if elem_ty.is_decimal() {
            TypeDesc::decimal(elem_ty, scale)?
        } else {
            TypeDesc::new(elem_ty)
        };
        let v = if desc.array {
            let mut dec = ArrayVectorDecoder::new(Vector::new(elem, 0, 0)?, n)?;
            if dec.decode(inp)? == StreamStatus::WouldBlock {
                return Err(conn_err(format!("timed out after {} of {} array rows", dec.rows_read(), n)));
            }
            Vector::Array(dec.finish()?)
        } else if elem_ty == DataType::Any {
            let mut v = Vector::new(elem, 0, n.min(CAPACITY_HINT))?;
            for _ in 0..n {
                let e = self.read(inp)?;
                v.append_constant(&e)?;
            }
            v
        } else if elem_ty == DataType::Symbol {
            let mut texts = Vec::with_capacity(n.min(CAPACITY_HINT));
            for _ in 0..n {
                texts.push(inp.read_string()?);
            }
            let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
            let mut v = Vector::new(elem, 0, n.min(CAPACITY_HINT))?;
            v.append_strings(&refs)?;
            v
        } else {
            let mut v = Vector::new(elem, 0, n.min(CAPACITY_HINT))?;
            read_vector_all(inp, &mut v, n)?;
            v
        };
        Ok((v, rows, cols))
    }
}

fn read_fixed_scalar<R: Read>(inp: &mut DataInputStream<R>) -> Result<[u8; 16]> {
    let b = inp.read_bytes(16)?;
    Ok(<[u8; 16] as FixedElem>::get(&b, inp.is_reversed()))
}

fn read_scalar_value<R: Read>(inp: &mut DataInputStream<R>, type_id: i32) -> Result<Scalar> {
    let ty = DataType::from_id(type_id)?;
    Ok(match ty {
        DataType::Void => {
            inp.read_i8()?;
            Scalar::Void
        }
        DataType::Bool => Scalar::Bool(inp.read_i8()?),
        DataType::Char => Scalar::Char(inp.read_i8()?),
        DataType::Short => Scalar::Short(inp.read_i16()?),
        DataType::Int
        | DataType::Date
        | DataType::Month
        | DataType::Time
        | DataType::Minute
        | DataType::Second
        | DataType::DateTime
        | DataType::DateHour => Scalar::from_raw_int(ty, inp.read_i32()? as i64),
        DataType::Long | DataType::Timestamp | DataType::NanoTime | DataType::NanoTimestamp => {
            Scalar::from_raw_int(ty, inp.read_i64()?)
        }
        DataType::Float => Scalar::Float(inp.read_f32()?),
        DataType::Double => Scalar::Double(inp.read_f64()?),
        DataType::String => Scalar::String(inp.read_string()?),
        DataType::Symbol => Scalar::Symbol(inp.read_string()?),
        DataType::Blob => Scalar::Blob(inp.read_blob()?),
        DataType::Uuid => Scalar::Uuid(read_fixed_scalar(inp)?),
        DataType::IpAddr => Scalar::IpAddr(read_fixed_scalar(inp)?),
        DataType::Int128 => Scalar::Int128(read_fixed_scalar(inp)?),
        DataType::Decimal32 => {
            let scale = inp.read_i32()?;
            Scalar::Decimal32(Decimal::new(inp.read_i32()?, scale)?)
        }
        DataType::Decimal64 => {
            let scale = inp.read_i32()?;
            Scalar::Decimal64(Decimal::new(inp.read_i64()?, scale)?)
        }
        DataType::Decimal128 => {
            let scale = inp.read_i32()?;
            Scalar::Decimal128(Decimal::new(inp.read_i128()?, scale)?)
        }
        other => return Err(type_err(format!("{} has no scalar wire form", other))),
    })
}

/// Encodes one object into a fresh buffer.
pub fn encode(c: &Constant) -> Result<Vec<u8>> {
    let mut out = DataOutputStream::new(Vec::new());
    ConstantWriter::new().write(&mut out, c)?;
    out.into_inner()
}

/// Decodes one object from a complete buffer.
pub fn decode(bytes: &[u8]) -> Result<Constant> {
    let mut inp = DataInputStream::new(bytes);
    ConstantReader::new().read(&mut inp)
}
