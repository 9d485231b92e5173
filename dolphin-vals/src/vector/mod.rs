mod array;
mod codec;
mod store;
mod typed;

pub use array::{ArrayVector, VectorView};
pub use codec::{AnyCodec, Codec, DecimalCodec, FixedCodec, PrimCodec, StrCodec, SymbolCodec, SymbolId};
pub use store::{Element, RawStore, GROWTH};
pub use typed::{
    AnyVector, DecimalVector, FastVector, FixedLengthVector, StringVector, SymbolVector, TypedVector, WrapVector,
};

use crate::constant::Constant;
use crate::key::ScalarKey;
use crate::prim::Primitive;
use crate::scalar::Scalar;
use crate::symbol::SymbolBase;
use crate::types::{DataCategory, DataType, Storage, TypeDesc};
use dolphin_base::{type_err, Result};
use std::borrow::Cow;
use std::sync::Arc;

/// The capability set every vector shape provides.
pub trait VectorOps {
    fn desc(&self) -> TypeDesc;
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    /// Grows to at least `capacity`; a no-op when already large enough.
    fn reserve(&mut self, capacity: usize) -> Result<()>;
    fn is_null_at(&self, i: usize) -> bool;
    fn has_null(&self) -> bool;

    fn get(&self, i: usize) -> Result<Scalar>;
    fn get_constant(&self, i: usize) -> Result<Constant>;
    /// Text of element `i`; null and out-of-range read as "".
    fn get_string(&self, i: usize) -> String;

    fn set(&mut self, i: usize, value: &Scalar) -> Result<()>;
    fn set_constant(&mut self, i: usize, value: &Constant) -> Result<()>;
    fn append(&mut self, value: &Scalar, count: usize) -> Result<()>;
    fn append_constant(&mut self, value: &Constant) -> Result<()>;
    /// Parses and appends every text or none of them.
    fn append_strings(&mut self, texts: &[&str]) -> Result<()>;
    fn fill(&mut self, start: usize, len: usize, value: &Scalar) -> Result<()>;
    /// Replaces every null with `value`.
    fn null_fill(&mut self, value: &Scalar) -> Result<()>;

    /// Deletes strictly ascending positions.
    fn remove(&mut self, positions: &[usize]) -> Result<()>;
    fn remove_tail(&mut self, n: usize);
    fn resize(&mut self, len: usize) -> Result<()>;
    fn next(&mut self, steps: usize) -> Result<()>;
    fn prev(&mut self, steps: usize) -> Result<()>;
    fn reverse(&mut self) -> Result<()>;

    fn is_sorted(&self, asc: bool, strict: bool) -> Result<bool>;
    /// Last position whose value is <= `value` in an ascending vector.
    fn asof(&self, value: &Scalar) -> Result<Option<usize>>;
    fn find(&self, value: &Scalar) -> Result<Option<usize>>;
    /// Returns how many elements were replaced.
    fn replace(&mut self, old: &Scalar, new: &Scalar) -> Result<usize>;
    /// Pushes one partition bucket per element of `start..start+len`.
    fn hash_buckets(&self, start: usize, len: usize, buckets: i32, out: &mut Vec<i32>) -> Result<()>;
    fn keys(&self) -> Result<Vec<ScalarKey>>;

    fn sub_vector(&self, start: usize, len: usize) -> Result<Vector>;
    fn gather(&self, indices: &[usize]) -> Result<Vector>;
    /// An empty vector of the same type (and symbol base).
    fn empty_like(&self, capacity: usize) -> Result<Vector>;
    fn neg(&mut self) -> Result<()>;
    fn allocated_memory(&self) -> usize;
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data_type(&self) -> DataType {
        self.desc().ty
    }

    fn category(&self) -> DataCategory {
        if self.desc().array {
            DataCategory::Array
        } else {
            self.desc().ty.category()
        }
    }
}

#[derive(Clone, Debug)]
pub enum Vector {
    I8(FastVector<i8>),
    I16(FastVector<i16>),
    I32(FastVector<i32>),
    I64(FastVector<i64>),
    F32(FastVector<f32>),
    F64(FastVector<f64>),
    Str(StringVector),
    Symbol(SymbolVector),
    Fixed(FixedLengthVector),
    Dec32(DecimalVector<i32>),
    Dec64(DecimalVector<i64>),
    Dec128(DecimalVector<i128>),
    Array(ArrayVector),
    Any(AnyVector),
}

macro_rules! each {
    ($v:expr, $x:ident => $body:expr) => {
        match $v {
            Vector::I8($x) => $body,
            Vector::I16($x) => $body,
            Vector::I32($x) => $body,
            Vector::I64($x) => $body,
            Vector::F32($x) => $body,
            Vector::F64($x) => $body,
            Vector::Str($x) => $body,
            Vector::Symbol($x) => $body,
            Vector::Fixed($x) => $body,
            Vector::Dec32($x) => $body,
            Vector::Dec64($x) => $body,
            Vector::Dec128($x) => $body,
            Vector::Array($x) => $body,
            Vector::Any($x) => $body,
        }
    };
}

macro_rules! wrap_codec {
    ($codec:ty, $variant:ident) => {
        impl WrapVector for $codec {
            fn wrap(v: TypedVector<Self>) -> Vector {
                Vector::$variant(v)
            }
        }
    };
}

wrap_codec!(PrimCodec<i8>, I8);
wrap_codec!(PrimCodec<i16>, I16);
wrap_codec!(PrimCodec<i32>, I32);
wrap_codec!(PrimCodec<i64>, I64);
wrap_codec!(PrimCodec<f32>, F32);
wrap_codec!(PrimCodec<f64>, F64);
wrap_codec!(StrCodec, Str);
wrap_codec!(SymbolCodec, Symbol);
wrap_codec!(FixedCodec, Fixed);
wrap_codec!(DecimalCodec<i32>, Dec32);
wrap_codec!(DecimalCodec<i64>, Dec64);
wrap_codec!(DecimalCodec<i128>, Dec128);
wrap_codec!(AnyCodec, Any);

impl VectorOps for Vector {
    fn desc(&self) -> TypeDesc {
        each!(self, v => v.desc())
    }
    fn len(&self) -> usize {
        each!(self, v => v.len())
    }
    fn capacity(&self) -> usize {
        each!(self, v => v.capacity())
    }
    fn reserve(&mut self, capacity: usize) -> Result<()> {
        each!(self, v => v.reserve(capacity))
    }
    fn is_null_at(&self, i: usize) -> bool {
        each!(self, v => v.is_null_at(i))
    }
    fn has_null(&self) -> bool {
        each!(self, v => v.has_null())
    }
    fn get(&self, i: usize) -> Result<Scalar> {
        each!(self, v => v.get(i))
    }
    fn get_constant(&self, i: usize) -> Result<Constant> {
        each!(self, v => v.get_constant(i))
    }
    fn get_string(&self, i: usize) -> String {
        each!(self, v => v.get_string(i))
    }
    fn set(&mut self, i: usize, value: &Scalar) -> Result<()> {
        each!(self, v => v.set(i, value))
    }
    fn set_constant(&mut self, i: usize, value: &Constant) -> Result<()> {
        each!(self, v => v.set_constant(i, value))
    }
    fn append(&mut self, value: &Scalar, count: usize) -> Result<()> {
        each!(self, v => v.append(value, count))
    }
    fn append_constant(&mut self, value: &Constant) -> Result<()> {
        each!(self, v => v.append_constant(value))
    }
    fn append_strings(&mut self, texts: &[&str]) -> Result<()> {
        each!(self, v => v.append_strings(texts))
    }
    fn fill(&mut self, start: usize, len: usize, value: &Scalar) -> Result<()> {
        each!(self, v => v.fill(start, len, value))
    }
    fn null_fill(&mut self, value: &Scalar) -> Result<()> {
        each!(self, v => v.null_fill(value))
    }
    fn remove(&mut self, positions: &[usize]) -> Result<()> {
        each!(self, v => v.remove(positions))
    }
    fn remove_tail(&mut self, n: usize) {
        each!(self, v => v.remove_tail(n))
    }
    fn resize(&mut self, len: usize) -> Result<()> {
        each!(self, v => v.resize(len))
    }
    fn next(&mut self, steps: usize) -> Result<()> {
        each!(self, v => v.next(steps))
    }
    fn prev(&mut self, steps: usize) -> Result<()> {
        each!(self, v => v.prev(steps))
    }
    fn reverse(&mut self) -> Result<()> {
        each!(self, v => v.reverse())
    }
    fn is_sorted(&self, asc: bool, strict: bool) -> Result<bool> {
        each!(self, v => v.is_sorted(asc, strict))
    }
    fn asof(&self, value: &Scalar) -> Result<Option<usize>> {
        each!(self, v => v.asof(value))
    }
    fn find(&self, value: &Scalar) -> Result<Option<usize>> {
        each!(self, v => v.find(value))
    }
    fn replace(&mut self, old: &Scalar, new: &Scalar) -> Result<usize> {
        each!(self, v => v.replace(old, new))
    }
    fn hash_buckets(&self, start: usize, len: usize, buckets: i32, out: &mut Vec<i32>) -> Result<()> {
        each!(self, v => v.hash_buckets(start, len, buckets, out))
    }
    fn keys(&self) -> Result<Vec<ScalarKey>> {
        each!(self, v => v.keys())
    }
    fn sub_vector(&self, start: usize, len: usize) -> Result<Vector> {
        each!(self, v => v.sub_vector(start, len))
    }
    fn gather(&self, indices: &[usize]) -> Result<Vector> {
        each!(self, v => v.gather(indices))
    }
    fn empty_like(&self, capacity: usize) -> Result<Vector> {
        each!(self, v => v.empty_like(capacity))
    }
    fn neg(&mut self) -> Result<()> {
        each!(self, v => v.neg())
    }
    fn allocated_memory(&self) -> usize {
        each!(self, v => v.allocated_memory())
    }
    fn clear(&mut self) {
        each!(self, v => v.clear())
    }
}

impl Vector {
    /// A vector of `len` nulls with room for `capacity`. Symbol vectors get
    /// a fresh base; use [`Vector::new_symbol`] to share one.
    pub fn new(desc: TypeDesc, len: usize, capacity: usize) -> Result<Vector> {
        if desc.array {
            let mut a = ArrayVector::new(Vector::new(TypeDesc { array: false, ..desc }, 0, 0)?)?;
            a.resize(len)?;
            a.reserve(capacity)?;
            return Ok(Vector::Array(a));
        }
        let ty = desc.ty;
        Ok(match ty.storage() {
            Storage::Void | Storage::I8 => Vector::I8(TypedVector::new(PrimCodec::new(ty), len, capacity)?),
            Storage::I16 => Vector::I16(TypedVector::new(PrimCodec::new(ty), len, capacity)?),
            Storage::I32 => Vector::I32(TypedVector::new(PrimCodec::new(ty), len, capacity)?),
            Storage::I64 => Vector::I64(TypedVector::new(PrimCodec::new(ty), len, capacity)?),
            Storage::F32 => Vector::F32(TypedVector::new(PrimCodec::new(ty), len, capacity)?),
            Storage::F64 => Vector::F64(TypedVector::new(PrimCodec::new(ty), len, capacity)?),
            Storage::Str => Vector::Str(TypedVector::new(StrCodec::new(ty), len, capacity)?),
            Storage::Symbol => return Vector::new_symbol(SymbolBase::new(0), len, capacity),
            Storage::Fixed16 => Vector::Fixed(TypedVector::new(FixedCodec::new(ty), len, capacity)?),
            Storage::Dec32 => Vector::Dec32(TypedVector::new(DecimalCodec::new(desc.scale)?, len, capacity)?),
            Storage::Dec64 => Vector::Dec64(TypedVector::new(DecimalCodec::new(desc.scale)?, len, capacity)?),
            Storage::Dec128 => Vector::Dec128(TypedVector::new(DecimalCodec::new(desc.scale)?, len, capacity)?),
            Storage::Any => Vector::Any(TypedVector::new(AnyCodec, len, capacity)?),
        })
    }

    pub fn new_symbol(base: Arc<SymbolBase>, len: usize, capacity: usize) -> Result<Vector> {
        Ok(Vector::Symbol(TypedVector::new(SymbolCodec::new(base), len, capacity)?))
    }

    pub fn from_scalars(desc: TypeDesc, items: &[Scalar]) -> Result<Vector> {
        let mut v = Vector::new(desc, 0, items.len())?;
        for s in items {
            v.append(s, 1)?;
        }
        Ok(v)
    }

    pub fn from_strings<S: AsRef<str>>(desc: TypeDesc, items: &[S]) -> Result<Vector> {
        let mut v = Vector::new(desc, 0, items.len())?;
        let texts: Vec<&str> = items.iter().map(|s| s.as_ref()).collect();
        v.append_strings(&texts)?;
        Ok(v)
    }

    pub fn ints(data: &[i32]) -> Vector {
        Vector::I32(FastVector::from_slice(DataType::Int, data))
    }

    pub fn longs(data: &[i64]) -> Vector {
        Vector::I64(FastVector::from_slice(DataType::Long, data))
    }

    pub fn doubles(data: &[f64]) -> Vector {
        Vector::F64(FastVector::from_slice(DataType::Double, data))
    }

    pub fn strings<S: AsRef<str>>(data: &[S]) -> Vector {
        Vector::Str(StringVector::from_strings(DataType::String, data))
    }

    pub fn symbol_base(&self) -> Option<&Arc<SymbolBase>> {
        match self {
            Vector::Symbol(v) => Some(v.base()),
            Vector::Array(a) => a.value().symbol_base(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayVector> {
        match self {
            Vector::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Appends all of `other`. Same-typed storage (and for decimals the same
    /// scale, for symbols the same base) is copied in bulk; anything else goes
    /// element by element through the checked conversions.
    pub fn append_vector(&mut self, other: &Vector) -> Result<()> {
        match (&mut *self, other) {
            (Vector::I8(a), Vector::I8(b)) if a.desc() == b.desc() => a.extend_elems(b.elems()),
            (Vector::I16(a), Vector::I16(b)) if a.desc() == b.desc() => a.extend_elems(b.elems()),
            (Vector::I32(a), Vector::I32(b)) if a.desc() == b.desc() => a.extend_elems(b.elems()),
            (Vector::I64(a), Vector::I64(b)) if a.desc() == b.desc() => a.extend_elems(b.elems()),
            (Vector::F32(a), Vector::F32(b)) if a.desc() == b.desc() => a.extend_elems(b.elems()),
            (Vector::F64(a), Vector::F64(b)) if a.desc() == b.desc() => a.extend_elems(b.elems()),
            (Vector::Str(a), Vector::Str(b)) if a.desc() == b.desc() => a.extend_elems(b.elems()),
            (Vector::Fixed(a), Vector::Fixed(b)) if a.desc() == b.desc() => a.extend_elems(b.elems()),
            (Vector::Dec32(a), Vector::Dec32(b)) if a.scale() == b.scale() => a.extend_elems(b.elems()),
            (Vector::Dec64(a), Vector::Dec64(b)) if a.scale() == b.scale() => a.extend_elems(b.elems()),
            (Vector::Dec128(a), Vector::Dec128(b)) if a.scale() == b.scale() => a.extend_elems(b.elems()),
            (Vector::Symbol(a), Vector::Symbol(b)) if Arc::ptr_eq(a.base(), b.base()) => a.extend_elems(b.elems()),
            (Vector::Any(a), Vector::Any(b)) => a.extend_elems(b.elems()),
            (Vector::Array(a), Vector::Array(b)) => {
                for r in 0..b.len() {
                    a.append_row(&b.row(r)?.to_vector()?)?;
                }
                Ok(())
            }
            (me, _) => {
                me.reserve(me.len() + other.len())?;
                for i in 0..other.len() {
                    me.append_constant(&other.get_constant(i)?)?;
                }
                Ok(())
            }
        }
    }

    /// Reads `len` elements from `start` as `U`, borrowing the internal
    /// buffer when `U` is the storage type and converting otherwise.
    pub fn get_slice<U: Primitive>(&self, start: usize, len: usize) -> Result<Cow<'_, [U]>> {
        match self {
            Vector::I8(v) => v.get_slice(start, len),
            Vector::I16(v) => v.get_slice(start, len),
            Vector::I32(v) => v.get_slice(start, len),
            Vector::I64(v) => v.get_slice(start, len),
            Vector::F32(v) => v.get_slice(start, len),
            Vector::F64(v) => v.get_slice(start, len),
            Vector::Dec32(_) | Vector::Dec64(_) | Vector::Dec128(_) => {
                let mut out = Vec::with_capacity(len);
                for i in start..start + len {
                    let f = self.get(i)?.to_f64();
                    out.push(f.map_or(U::NULL, U::from_f64));
                }
                Ok(Cow::Owned(out))
            }
            other => Err(type_err(format!("cannot read {} as numbers", other.desc()))),
        }
    }

    /// Like [`Vector::get_slice`] but writes conversions into `buf`.
    pub fn get_const<'a, U: Primitive>(&'a self, start: usize, buf: &'a mut [U]) -> Result<&'a [U]> {
        match self {
            Vector::I8(v) => v.get_const(start, buf),
            Vector::I16(v) => v.get_const(start, buf),
            Vector::I32(v) => v.get_const(start, buf),
            Vector::I64(v) => v.get_const(start, buf),
            Vector::F32(v) => v.get_const(start, buf),
            Vector::F64(v) => v.get_const(start, buf),
            other => {
                let converted = other.get_slice::<U>(start, buf.len())?;
                buf.copy_from_slice(&converted);
                Ok(buf)
            }
        }
    }

    /// Appends numbers of any primitive width to a numeric vector.
    pub fn append_slice<U: Primitive>(&mut self, data: &[U]) -> Result<()> {
        match self {
            Vector::I8(v) => v.append_slice(data),
            Vector::I16(v) => v.append_slice(data),
            Vector::I32(v) => v.append_slice(data),
            Vector::I64(v) => v.append_slice(data),
            Vector::F32(v) => v.append_slice(data),
            Vector::F64(v) => v.append_slice(data),
            other => {
                let desc = other.desc();
                for x in data {
                    let s = if U::IS_FLOAT {
                        Scalar::Double(x.convert())
                    } else {
                        Scalar::Long(x.convert())
                    };
                    other.append(&s.cast(desc)?, 1)?;
                }
                Ok(())
            }
        }
    }

    /// Batched positional assignment from a general index vector.
    pub fn set_indexed(&mut self, positions: &Vector, values: &Vector) -> Result<()> {
        if positions.len() != values.len() {
            return Err(type_err(format!(
                "{} positions for {} values",
                positions.len(),
                values.len()
            )));
        }
        let mut buf = [0i32; 1024];
        let mut done = 0;
        while done < positions.len() {
            let n = (positions.len() - done).min(buf.len());
            let ids = positions.get_const(done, &mut buf[..n])?;
            for (k, &pos) in ids.iter().enumerate() {
                let pos = usize::try_from(pos).map_err(|_| type_err(format!("negative position {}", pos)))?;
                self.set_constant(pos, &values.get_constant(done + k)?)?;
            }
            done += n;
        }
        Ok(())
    }

    /// Element-wise equality including nulls, by text for symbols.
    pub fn equals(&self, other: &Vector) -> bool {
        if self.desc() != other.desc() || self.len() != other.len() {
            return false;
        }
        match (self, other) {
            (Vector::Symbol(_), _) | (Vector::Array(_), _) | (Vector::Any(_), _) => {
                (0..self.len()).all(|i| self.get_string(i) == other.get_string(i))
            }
            _ => (0..self.len()).all(|i| match (self.get(i), other.get(i)) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }),
        }
    }
}
