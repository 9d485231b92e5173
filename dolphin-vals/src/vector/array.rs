// Ragged columns: each row holds a variable-length run of one element type.
// `index[i]` is the exclusive end offset of row i in the flat `value`
// vector, so row i spans `value[index[i-1]..index[i]]` with index[-1] = 0.
// An empty row is the array null.

use super::{Vector, VectorOps};
use crate::constant::Constant;
use crate::key::ScalarKey;
use crate::scalar::Scalar;
use crate::types::TypeDesc;
use dolphin_base::{arg_err, kind_err, type_err, ErrorKind, Result};

#[derive(Clone, Debug)]
pub struct ArrayVector {
    index: Vec<i32>,
    value: Box<Vector>,
}

/// A borrowed row of an array vector.
#[derive(Clone, Copy, Debug)]
pub struct VectorView<'a> {
    value: &'a Vector,
    start: usize,
    end: usize,
}

impl<'a> VectorView<'a> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn get(&self, i: usize) -> Result<Scalar> {
        if i >= self.len() {
            return Err(kind_err(
                ErrorKind::InvalidArgument,
                format!("index {} out of row of {}", i, self.len()),
            ));
        }
        self.value.get(self.start + i)
    }

    pub fn get_string(&self, i: usize) -> String {
        if i >= self.len() {
            return String::new();
        }
        self.value.get_string(self.start + i)
    }

    /// Offset of the row's first element in the flat value vector.
    pub fn offset(&self) -> usize {
        self.start
    }

    pub fn to_vector(&self) -> Result<Vector> {
        self.value.sub_vector(self.start, self.len())
    }
}

fn overflow_i32(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| kind_err(ErrorKind::Overflow, format!("array vector offset {} exceeds i32", n)))
}

impl ArrayVector {
    /// An empty column whose rows hold elements of `value`'s type.
    pub fn new(value: Vector) -> Result<Self> {
        if value.desc().array {
            return Err(type_err("array vectors cannot nest"));
        }
        let mut value = value;
        value.clear();
        Ok(ArrayVector {
            index: Vec::new(),
            value: Box::new(value),
        })
    }

    /// Splits `value` into rows of exactly `row_len` elements.
    pub fn with_uniform_rows(value: Vector, row_len: usize) -> Result<Self> {
        if row_len == 0 || value.len() % row_len != 0 {
            return Err(arg_err(format!(
                "{} elements do not split into rows of {}",
                value.len(),
                row_len
            )));
        }
        let rows = value.len() / row_len;
        let index = (1..=rows).map(|r| overflow_i32(r * row_len)).collect::<Result<Vec<_>>>()?;
        Ok(ArrayVector {
            index,
            value: Box::new(value),
        })
    }

    /// Wraps an existing offset index and flat value vector. Offsets must be
    /// non-decreasing and end at the value length.
    pub fn from_parts(index: Vec<i32>, value: Vector) -> Result<Self> {
        if value.desc().array {
            return Err(type_err("array vectors cannot nest"));
        }
        let mut prev = 0i32;
        for &end in &index {
            if end < prev {
                return Err(kind_err(
                    ErrorKind::MalformedData,
                    format!("array vector offsets decrease ({} after {})", end, prev),
                ));
            }
            prev = end;
        }
        if prev as usize != value.len() {
            return Err(kind_err(
                ErrorKind::MalformedData,
                format!("array vector offsets end at {} but {} values present", prev, value.len()),
            ));
        }
        Ok(ArrayVector {
            index,
            value: Box::new(value),
        })
    }

    pub fn index(&self) -> &[i32] {
        &self.index
    }

    pub fn value(&self) -> &Vector {
        &self.value
    }

    pub fn into_parts(self) -> (Vec<i32>, Vector) {
        (self.index, *self.value)
    }

    pub fn elem_desc(&self) -> TypeDesc {
        self.value.desc()
    }

    fn bounds(&self, row: usize) -> Option<(usize, usize)> {
        let end = *self.index.get(row)? as usize;
        let start = if row == 0 { 0 } else { self.index[row - 1] as usize };
        Some((start, end))
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.bounds(row).map_or(0, |(s, e)| e - s)
    }

    pub fn row(&self, row: usize) -> Result<VectorView<'_>> {
        let (start, end) = self.bounds(row).ok_or_else(|| {
            kind_err(
                ErrorKind::InvalidArgument,
                format!("row {} out of range {}", row, self.index.len()),
            )
        })?;
        Ok(VectorView {
            value: &self.value,
            start,
            end,
        })
    }

    /// Columns `col_start..col_end` of one row, clamped to the row length.
    pub fn row_slice(&self, row: usize, col_start: usize, col_end: usize) -> Result<Vector> {
        let view = self.row(row)?;
        let end = col_end.min(view.len());
        let start = col_start.min(end);
        self.value.sub_vector(view.start + start, end - start)
    }

    /// Row containing flat offset `offset`: the first row whose end exceeds it.
    pub fn lower_bound_index(&self, offset: usize) -> usize {
        self.index.partition_point(|&end| (end as usize) <= offset)
    }

    /// The shared row length, or -1 when rows differ.
    pub fn check_vector_size(&self) -> i64 {
        let mut expected = None;
        for row in 0..self.index.len() {
            let n = self.row_len(row);
            match expected {
                None => expected = Some(n),
                Some(e) if e != n => return -1,
                _ => {}
            }
        }
        expected.map_or(0, |n| n as i64)
    }

    pub fn append_row(&mut self, row: &Vector) -> Result<()> {
        if row.desc().array {
            return Err(type_err("array vectors cannot nest"));
        }
        self.value.append_vector(row)?;
        self.index.push(overflow_i32(self.value.len())?);
        Ok(())
    }

    pub fn append_empty_rows(&mut self, n: usize) -> Result<()> {
        let end = overflow_i32(self.value.len())?;
        self.index
            .try_reserve(n)
            .map_err(|e| kind_err(ErrorKind::OutOfMemory, e.to_string()))?;
        self.index.extend(std::iter::repeat(end).take(n));
        Ok(())
    }

    /// Builds a new array vector from a row selection; `None` is an empty row.
    fn rebuild(&self, rows: impl Iterator<Item = Option<usize>>) -> Result<ArrayVector> {
        let mut flat = Vec::new();
        let mut index = Vec::new();
        for row in rows {
            if let Some(r) = row {
                let (s, e) = self.bounds(r).ok_or_else(|| {
                    kind_err(
                        ErrorKind::InvalidArgument,
                        format!("row {} out of range {}", r, self.index.len()),
                    )
                })?;
                flat.extend(s..e);
            }
            index.push(overflow_i32(flat.len())?);
        }
        let value = self.value.gather(&flat)?;
        Ok(ArrayVector {
            index,
            value: Box::new(value),
        })
    }

    pub fn gather_rows(&self, rows: &[usize]) -> Result<ArrayVector> {
        self.rebuild(rows.iter().map(|&r| Some(r)))
    }

    /// Rows at `start + rows[k]`.
    pub fn gather_from(&self, start: usize, rows: &[usize]) -> Result<ArrayVector> {
        self.rebuild(rows.iter().map(|&r| Some(start + r)))
    }

    fn replace_with(&mut self, other: ArrayVector) {
        self.index = other.index;
        self.value = other.value;
    }

    fn row_constant(&self, row: usize) -> Result<Constant> {
        Ok(Constant::Vector(self.row(row)?.to_vector()?))
    }

    fn row_unsupported(&self, op: &str) -> dolphin_base::Error {
        type_err(format!("{} is not supported on {}", op, self.desc()))
    }
}

impl VectorOps for ArrayVector {
    fn desc(&self) -> TypeDesc {
        self.value.desc().array_of()
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn capacity(&self) -> usize {
        self.index.capacity()
    }

    fn reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.index.capacity() {
            return Ok(());
        }
        self.index
            .try_reserve_exact(capacity - self.index.len())
            .map_err(|e| kind_err(ErrorKind::OutOfMemory, e.to_string()))
    }

    fn is_null_at(&self, i: usize) -> bool {
        self.row_len(i) == 0
    }

    fn has_null(&self) -> bool {
        self.value.has_null() || (0..self.index.len()).any(|r| self.row_len(r) == 0)
    }

    fn get(&self, _i: usize) -> Result<Scalar> {
        Err(type_err(format!("rows of {} are vectors, not scalars", self.desc())))
    }

    fn get_constant(&self, i: usize) -> Result<Constant> {
        self.row_constant(i)
    }

    fn get_string(&self, i: usize) -> String {
        match self.row(i) {
            Ok(view) => {
                let items: Vec<String> = (0..view.len()).map(|k| view.get_string(k)).collect();
                format!("[{}]", items.join(","))
            }
            Err(_) => String::new(),
        }
    }

    fn set(&mut self, i: usize, value: &Scalar) -> Result<()> {
        let mut row = self.value.empty_like(1)?;
        row.append(value, 1)?;
        self.set_constant(i, &Constant::Vector(row))
    }

    fn set_constant(&mut self, i: usize, value: &Constant) -> Result<()> {
        if i >= self.index.len() {
            return Err(kind_err(
                ErrorKind::InvalidArgument,
                format!("row {} out of range {}", i, self.index.len()),
            ));
        }
        let row = match value {
            Constant::Vector(v) => v.clone(),
            Constant::Scalar(s) => {
                let mut v = self.value.empty_like(1)?;
                if !s.is_null() {
                    v.append(s, 1)?;
                }
                v
            }
            other => return Err(type_err(format!("cannot store a {:?} as an array row", other.form()))),
        };
        let mut rebuilt = ArrayVector::new(self.value.empty_like(self.value.len())?)?;
        for r in 0..self.index.len() {
            if r == i {
                rebuilt.append_row(&row)?;
            } else {
                rebuilt.append_row(&self.row(r)?.to_vector()?)?;
            }
        }
        self.replace_with(rebuilt);
        Ok(())
    }

    fn append(&mut self, value: &Scalar, count: usize) -> Result<()> {
        for _ in 0..count {
            if value.is_null() {
                self.append_empty_rows(1)?;
            } else {
                self.value.append(value, 1)?;
                self.index.push(overflow_i32(self.value.len())?);
            }
        }
        Ok(())
    }

    fn append_constant(&mut self, value: &Constant) -> Result<()> {
        match value {
            Constant::Vector(v) => self.append_row(v),
            Constant::Scalar(s) => self.append(s, 1),
            other => Err(type_err(format!("cannot append a {:?} as an array row", other.form()))),
        }
    }

    fn append_strings(&mut self, _texts: &[&str]) -> Result<()> {
        Err(self.row_unsupported("append_strings"))
    }

    fn fill(&mut self, _start: usize, _len: usize, _value: &Scalar) -> Result<()> {
        Err(self.row_unsupported("fill"))
    }

    fn null_fill(&mut self, value: &Scalar) -> Result<()> {
        self.value.null_fill(value)
    }

    fn remove(&mut self, positions: &[usize]) -> Result<()> {
        let mut del = positions.iter().peekable();
        let mut keep = Vec::with_capacity(self.index.len().saturating_sub(positions.len()));
        for r in 0..self.index.len() {
            if del.peek() == Some(&&r) {
                del.next();
            } else {
                keep.push(r);
            }
        }
        if del.next().is_some() {
            return Err(arg_err("remove positions out of range or not ascending"));
        }
        let rebuilt = self.gather_rows(&keep)?;
        self.replace_with(rebuilt);
        Ok(())
    }

    fn remove_tail(&mut self, n: usize) {
        let keep = self.index.len().saturating_sub(n);
        self.index.truncate(keep);
        let end = self.index.last().map_or(0, |&e| e as usize);
        let extra = self.value.len() - end;
        self.value.remove_tail(extra);
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        if len > self.index.len() {
            self.append_empty_rows(len - self.index.len())
        } else {
            self.remove_tail(self.index.len() - len);
            Ok(())
        }
    }

    fn next(&mut self, steps: usize) -> Result<()> {
        let len = self.index.len();
        let steps = steps.min(len);
        let rows = (steps..len).map(Some).chain(std::iter::repeat(None).take(steps));
        let rebuilt = self.rebuild(rows)?;
        self.replace_with(rebuilt);
        Ok(())
    }

    fn prev(&mut self, steps: usize) -> Result<()> {
        let len = self.index.len();
        let steps = steps.min(len);
        let rows = std::iter::repeat(None).take(steps).chain((0..len - steps).map(Some));
        let rebuilt = self.rebuild(rows)?;
        self.replace_with(rebuilt);
        Ok(())
    }

    fn reverse(&mut self) -> Result<()> {
        let rows = (0..self.index.len()).rev().map(Some);
        let rebuilt = self.rebuild(rows)?;
        self.replace_with(rebuilt);
        Ok(())
    }

    fn is_sorted(&self, _asc: bool, _strict: bool) -> Result<bool> {
        Err(self.row_unsupported("is_sorted"))
    }

    fn asof(&self, _value: &Scalar) -> Result<Option<usize>> {
        Err(self.row_unsupported("asof"))
    }

    fn find(&self, _value: &Scalar) -> Result<Option<usize>> {
        Err(self.row_unsupported("find"))
    }

    fn replace(&mut self, old: &Scalar, new: &Scalar) -> Result<usize> {
        self.value.replace(old, new)
    }

    fn hash_buckets(&self, _start: usize, _len: usize, _buckets: i32, _out: &mut Vec<i32>) -> Result<()> {
        Err(self.row_unsupported("hashing"))
    }

    fn keys(&self) -> Result<Vec<ScalarKey>> {
        Err(self.row_unsupported("keying"))
    }

    fn sub_vector(&self, start: usize, len: usize) -> Result<Vector> {
        let end = start
            .checked_add(len)
            .filter(|&e| e <= self.index.len())
            .ok_or_else(|| arg_err(format!("range {}+{} out of bounds {}", start, len, self.index.len())))?;
        Ok(Vector::Array(self.rebuild((start..end).map(Some))?))
    }

    fn gather(&self, indices: &[usize]) -> Result<Vector> {
        Ok(Vector::Array(self.gather_rows(indices)?))
    }

    fn empty_like(&self, capacity: usize) -> Result<Vector> {
        let mut a = ArrayVector::new(self.value.empty_like(0)?)?;
        a.reserve(capacity)?;
        Ok(Vector::Array(a))
    }

    fn neg(&mut self) -> Result<()> {
        self.value.neg()
    }

    fn allocated_memory(&self) -> usize {
        self.index.capacity() * 4 + self.value.allocated_memory()
    }

    fn clear(&mut self) {
        self.index.clear();
        self.value.clear();
    }
}
