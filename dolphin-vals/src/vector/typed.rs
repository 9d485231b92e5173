use super::codec::{AnyCodec, Codec, DecimalCodec, FixedCodec, PrimCodec, StrCodec, SymbolCodec, SymbolId};
use super::store::{Element, RawStore};
use super::{Vector, VectorOps};
use crate::constant::Constant;
use crate::decimal::{parse_raw, Decimal, DecimalRaw};
use crate::key::ScalarKey;
use crate::prim::Primitive;
use crate::scalar::Scalar;
use crate::symbol::SymbolBase;
use crate::types::{DataType, TypeDesc};
use dolphin_base::{arg_err, kind_err, ErrorKind, Result};
use std::any::Any;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

/// Wraps a typed vector back into the [`Vector`] enum; one impl per
/// concrete codec.
pub trait WrapVector: Codec {
    fn wrap(v: TypedVector<Self>) -> Vector;
}

/// A vector whose elements are all `C::Elem`, interpreted through `C`.
#[derive(Clone, Debug)]
pub struct TypedVector<C: Codec> {
    codec: C,
    store: RawStore<C::Elem>,
}

pub type FastVector<T> = TypedVector<PrimCodec<T>>;
pub type StringVector = TypedVector<StrCodec>;
pub type FixedLengthVector = TypedVector<FixedCodec>;
pub type DecimalVector<T> = TypedVector<DecimalCodec<T>>;
pub type SymbolVector = TypedVector<SymbolCodec>;
pub type AnyVector = TypedVector<AnyCodec>;

impl<C: Codec> TypedVector<C> {
    pub fn new(codec: C, len: usize, capacity: usize) -> Result<Self> {
        Ok(TypedVector {
            codec,
            store: RawStore::with_size(len, capacity)?,
        })
    }

    pub fn from_elems(codec: C, elems: Vec<C::Elem>) -> Self {
        TypedVector {
            codec,
            store: RawStore::from_vec(elems),
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn elems(&self) -> &[C::Elem] {
        self.store.as_slice()
    }

    pub fn elem(&self, i: usize) -> Option<&C::Elem> {
        self.store.get(i)
    }

    pub(crate) fn store(&self) -> &RawStore<C::Elem> {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut RawStore<C::Elem> {
        &mut self.store
    }

    pub fn push_elem(&mut self, e: C::Elem) -> Result<()> {
        self.store.push(e)
    }

    pub fn extend_elems(&mut self, es: &[C::Elem]) -> Result<()> {
        self.store.extend_from_slice(es)
    }

    /// Overwrites elements from `start`, extending the vector past its end.
    pub fn write_elems(&mut self, start: usize, es: Vec<C::Elem>) -> Result<()> {
        let len = self.store.len();
        if start > len {
            return Err(arg_err(format!("write at {} past end {}", start, len)));
        }
        let overlap = (len - start).min(es.len());
        let mut it = es.into_iter();
        for (i, e) in it.by_ref().take(overlap).enumerate() {
            self.store.set(start + i, e)?;
        }
        self.store.extend(it.collect())
    }

    /// The exact null state, refreshing the cached hint.
    pub fn refresh_null(&mut self) -> bool {
        self.store.has_null()
    }

    fn elem_at(&self, i: usize) -> Result<&C::Elem> {
        self.store.get(i).ok_or_else(|| {
            kind_err(
                ErrorKind::InvalidArgument,
                format!("index {} out of range {}", i, self.store.len()),
            )
        })
    }

    fn with_elems(&self, elems: Vec<C::Elem>) -> Self {
        TypedVector::from_elems(self.codec.clone(), elems)
    }
}

impl<C: WrapVector> VectorOps for TypedVector<C> {
    fn desc(&self) -> TypeDesc {
        self.codec.desc()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn capacity(&self) -> usize {
        self.store.capacity()
    }

    fn reserve(&mut self, capacity: usize) -> Result<()> {
        self.store.reserve(capacity)
    }

    fn is_null_at(&self, i: usize) -> bool {
        self.store.is_null_at(i)
    }

    fn has_null(&self) -> bool {
        self.store.scan_null()
    }

    fn get(&self, i: usize) -> Result<Scalar> {
        self.codec.to_scalar(self.elem_at(i)?)
    }

    fn get_constant(&self, i: usize) -> Result<Constant> {
        self.codec.to_constant(self.elem_at(i)?)
    }

    fn get_string(&self, i: usize) -> String {
        self.store.get(i).map(|e| self.codec.format(e)).unwrap_or_default()
    }

    fn set(&mut self, i: usize, value: &Scalar) -> Result<()> {
        let e = self.codec.from_scalar(value)?;
        self.store.set(i, e)
    }

    fn set_constant(&mut self, i: usize, value: &Constant) -> Result<()> {
        let e = self.codec.from_constant(value)?;
        self.store.set(i, e)
    }

    fn append(&mut self, value: &Scalar, count: usize) -> Result<()> {
        let e = self.codec.from_scalar(value)?;
        self.store.push_n(e, count)
    }

    fn append_constant(&mut self, value: &Constant) -> Result<()> {
        let e = self.codec.from_constant(value)?;
        self.store.push(e)
    }

    fn append_strings(&mut self, texts: &[&str]) -> Result<()> {
        let parsed = texts
            .iter()
            .map(|t| self.codec.parse(t))
            .collect::<Result<Vec<_>>>()?;
        self.store.extend(parsed)
    }

    fn fill(&mut self, start: usize, len: usize, value: &Scalar) -> Result<()> {
        let e = self.codec.from_scalar(value)?;
        self.store.fill(start, len, &e)
    }

    fn null_fill(&mut self, value: &Scalar) -> Result<()> {
        let e = self.codec.from_scalar(value)?;
        self.store.null_fill(&e);
        Ok(())
    }

    fn remove(&mut self, positions: &[usize]) -> Result<()> {
        self.store.remove(positions)
    }

    fn remove_tail(&mut self, n: usize) {
        self.store.remove_tail(n)
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        self.store.resize(len)
    }

    fn next(&mut self, steps: usize) -> Result<()> {
        self.store.next(steps);
        Ok(())
    }

    fn prev(&mut self, steps: usize) -> Result<()> {
        self.store.prev(steps);
        Ok(())
    }

    fn reverse(&mut self) -> Result<()> {
        self.store.reverse();
        Ok(())
    }

    fn is_sorted(&self, asc: bool, strict: bool) -> Result<bool> {
        let bad = if asc { Ordering::Greater } else { Ordering::Less };
        Ok(!self.store.as_slice().windows(2).any(|w| {
            let ord = self.codec.compare(&w[0], &w[1]);
            ord == bad || (strict && ord == Ordering::Equal)
        }))
    }

    fn asof(&self, value: &Scalar) -> Result<Option<usize>> {
        let target = self.codec.from_scalar(value)?;
        let end = self
            .store
            .as_slice()
            .partition_point(|e| self.codec.compare(e, &target) != Ordering::Greater);
        Ok(end.checked_sub(1))
    }

    fn find(&self, value: &Scalar) -> Result<Option<usize>> {
        let target = self.codec.from_scalar(value)?;
        Ok(self.store.as_slice().iter().position(|e| *e == target))
    }

    fn replace(&mut self, old: &Scalar, new: &Scalar) -> Result<usize> {
        let old = self.codec.from_scalar(old)?;
        let new = self.codec.from_scalar(new)?;
        let mut n = 0;
        let positions: Vec<usize> = self
            .store
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == old)
            .map(|(i, _)| i)
            .collect();
        for i in positions {
            self.store.set(i, new.clone())?;
            n += 1;
        }
        Ok(n)
    }

    fn hash_buckets(&self, start: usize, len: usize, buckets: i32, out: &mut Vec<i32>) -> Result<()> {
        if buckets <= 0 {
            return Err(arg_err(format!("bucket count {} must be positive", buckets)));
        }
        for e in self.store.slice(start, len)? {
            out.push(self.codec.hash_bucket(e, buckets)?);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<ScalarKey>> {
        self.store.as_slice().iter().map(|e| self.codec.key(e)).collect()
    }

    fn sub_vector(&self, start: usize, len: usize) -> Result<Vector> {
        let elems = self.store.slice(start, len)?.to_vec();
        Ok(C::wrap(self.with_elems(elems)))
    }

    fn gather(&self, indices: &[usize]) -> Result<Vector> {
        let elems = self.store.gather(indices)?;
        Ok(C::wrap(self.with_elems(elems)))
    }

    fn empty_like(&self, capacity: usize) -> Result<Vector> {
        Ok(C::wrap(TypedVector::new(self.codec.clone(), 0, capacity)?))
    }

    fn neg(&mut self) -> Result<()> {
        self.codec.neg(&<C::Elem as Element>::null())?;
        let negated = self
            .store
            .as_slice()
            .iter()
            .map(|e| self.codec.neg(e))
            .collect::<Result<Vec<_>>>()?;
        self.store.clear();
        self.store.extend(negated)
    }

    fn allocated_memory(&self) -> usize {
        self.store.allocated_memory()
    }

    fn clear(&mut self) {
        self.store.clear()
    }
}

impl<T: Primitive + Element> FastVector<T> {
    pub fn from_slice(ty: DataType, data: &[T]) -> Self {
        TypedVector::from_elems(PrimCodec::new(ty), data.to_vec())
    }

    /// Reads `buf.len()` elements from `start` as `U`. When `U` is the
    /// storage type the internal buffer is returned and `buf` is untouched;
    /// otherwise elements are converted into `buf`.
    pub fn get_const<'a, U: Primitive>(&'a self, start: usize, buf: &'a mut [U]) -> Result<&'a [U]> {
        let len = buf.len();
        let src = self.store.slice(start, len)?;
        if let Some(same) = (&self.store.data as &dyn Any).downcast_ref::<Vec<U>>() {
            return Ok(&same[start..start + len]);
        }
        for (out, v) in buf.iter_mut().zip(src) {
            *out = v.convert();
        }
        Ok(buf)
    }

    /// Like [`Self::get_const`] but allocates the converted copy itself.
    pub fn get_slice<U: Primitive>(&self, start: usize, len: usize) -> Result<Cow<'_, [U]>> {
        let src = self.store.slice(start, len)?;
        if let Some(same) = (&self.store.data as &dyn Any).downcast_ref::<Vec<U>>() {
            return Ok(Cow::Borrowed(&same[start..start + len]));
        }
        Ok(Cow::Owned(src.iter().map(|v| v.convert()).collect()))
    }

    /// Appends foreign-width values; the source null maps to this type's null.
    pub fn append_slice<U: Primitive>(&mut self, data: &[U]) -> Result<()> {
        let converted: Vec<T> = data.iter().map(|v| v.convert()).collect();
        self.store.extend(converted)
    }

    /// Batched positional assignment. Positions are read through a fixed
    /// 1024-element buffer so a foreign-typed index vector is never copied
    /// whole.
    pub fn set_indexed(&mut self, positions: &FastVector<i32>, values: &[T]) -> Result<()> {
        if positions.len() != values.len() {
            return Err(arg_err(format!(
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
                let pos = usize::try_from(pos).map_err(|_| arg_err(format!("negative position {}", pos)))?;
                self.store.set(pos, values[done + k])?;
            }
            done += n;
        }
        Ok(())
    }
}

impl<T: DecimalRaw + Element> DecimalVector<T>
where
    DecimalCodec<T>: WrapVector + Codec<Elem = T>,
    Scalar: From<Decimal<T>>,
{
    pub fn scale(&self) -> i32 {
        self.codec.scale()
    }

    /// Appends decimal text with an explicit strictness.
    pub fn append_decimal_strings(&mut self, texts: &[&str], strict: bool) -> Result<()> {
        let scale = self.scale();
        let parsed = texts
            .iter()
            .map(|t| match parse_raw(t, scale, strict, T::MAX_PRECISION)? {
                Some((raw, _)) => Ok(Decimal::<T>::from_i128(raw, scale)?.raw()),
                None => Ok(T::NULL),
            })
            .collect::<Result<Vec<T>>>()?;
        self.store.extend(parsed)
    }

    pub fn get_decimal(&self, i: usize) -> Result<Decimal<T>> {
        Ok(Decimal::from_stored(*self.elem_at(i)?, self.scale()))
    }

    /// True when every non-null raw magnitude is below `limit`.
    pub fn valid_index(&self, limit: u128) -> bool {
        self.store
            .as_slice()
            .iter()
            .all(|&e| Element::is_null(&e) || DecimalRaw::to_i128(e).unsigned_abs() < limit)
    }
}

impl SymbolVector {
    pub fn with_base(base: Arc<SymbolBase>) -> Self {
        TypedVector::from_elems(SymbolCodec::new(base), Vec::new())
    }

    pub fn base(&self) -> &Arc<SymbolBase> {
        self.codec.base()
    }

    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.store.as_slice().iter().map(|id| id.0)
    }

    pub fn push_id(&mut self, id: i32) -> Result<()> {
        if id < 0 || id as usize >= self.base().len() {
            return Err(kind_err(
                ErrorKind::MalformedData,
                format!("symbol id {} outside base of {}", id, self.base().len()),
            ));
        }
        self.store.push(SymbolId(id))
    }
}

impl StringVector {
    pub fn from_strings<S: AsRef<str>>(ty: DataType, items: &[S]) -> Self {
        let elems = items.iter().map(|s| s.as_ref().as_bytes().to_vec()).collect();
        TypedVector::from_elems(StrCodec::new(ty), elems)
    }
}
