use crate::fixed::Fixed16;
use dolphin_base::{kind_err, ErrorKind, Result};
use std::fmt::Debug;

/// Something a vector can hold: a value with a reserved null.
pub trait Element: Clone + Debug + PartialEq + Send + Sync + 'static {
    fn null() -> Self;
    fn is_null(&self) -> bool;
    /// Heap bytes owned beyond the inline size.
    fn heap_size(&self) -> usize {
        0
    }
}

macro_rules! prim_element {
    ($($t:ty),*) => {
        $(impl Element for $t {
            fn null() -> Self {
                <$t as crate::prim::Primitive>::NULL
            }
            fn is_null(&self) -> bool {
                *self == <$t as crate::prim::Primitive>::NULL
            }
        })*
    };
}

prim_element!(i8, i16, i32, i64, f32, f64);

impl Element for i128 {
    fn null() -> Self {
        i128::MIN
    }
    fn is_null(&self) -> bool {
        *self == i128::MIN
    }
}

impl Element for Vec<u8> {
    fn null() -> Self {
        Vec::new()
    }
    fn is_null(&self) -> bool {
        self.is_empty()
    }
    fn heap_size(&self) -> usize {
        self.capacity()
    }
}

impl Element for Fixed16 {
    fn null() -> Self {
        [0u8; 16]
    }
    fn is_null(&self) -> bool {
        *self == [0u8; 16]
    }
}

/// Growth factor applied when an append outruns the capacity.
pub const GROWTH: f64 = 1.2;

/// Dense storage shared by every typed vector. Capacity is managed here
/// rather than left to `Vec` so growth is the fixed 1.2 factor and never
/// shrinks; `contain_null` is an upper bound that only a scan can clear.
#[derive(Clone, Debug)]
pub struct RawStore<E: Element> {
    pub(crate) data: Vec<E>,
    contain_null: bool,
}

impl<E: Element> Default for RawStore<E> {
    fn default() -> Self {
        RawStore {
            data: Vec::new(),
            contain_null: false,
        }
    }
}

impl<E: Element> RawStore<E> {
    /// `len` null elements with room for `capacity`.
    pub fn with_size(len: usize, capacity: usize) -> Result<Self> {
        let mut store = RawStore::default();
        store.reserve(capacity.max(len))?;
        if len > 0 {
            store.data.resize(len, E::null());
            store.contain_null = true;
        }
        Ok(store)
    }

    pub fn from_vec(data: Vec<E>) -> Self {
        let contain_null = data.iter().any(|e| e.is_null());
        RawStore { data, contain_null }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn as_slice(&self) -> &[E] {
        &self.data
    }

    /// Grows to `max(capacity * 1.2, wanted)` when `wanted` exceeds the
    /// current capacity; otherwise leaves the buffer untouched.
    pub fn reserve(&mut self, wanted: usize) -> Result<()> {
        let cap = self.data.capacity();
        if wanted <= cap {
            return Ok(());
        }
        let grown = ((cap as f64) * GROWTH) as usize;
        let target = grown.max(wanted);
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|e| kind_err(ErrorKind::OutOfMemory, format!("cannot grow vector to {}: {}", target, e)))
    }

    fn check_capacity(&mut self, extra: usize) -> Result<()> {
        let wanted = self
            .data
            .len()
            .checked_add(extra)
            .ok_or_else(|| kind_err(ErrorKind::OutOfMemory, "vector length overflow"))?;
        self.reserve(wanted)
    }

    pub fn push(&mut self, e: E) -> Result<()> {
        self.check_capacity(1)?;
        self.contain_null |= e.is_null();
        self.data.push(e);
        Ok(())
    }

    pub fn push_n(&mut self, e: E, count: usize) -> Result<()> {
        self.check_capacity(count)?;
        if count > 0 {
            self.contain_null |= e.is_null();
        }
        self.data.extend(std::iter::repeat(e).take(count));
        Ok(())
    }

    pub fn extend_from_slice(&mut self, es: &[E]) -> Result<()> {
        self.check_capacity(es.len())?;
        self.contain_null |= es.iter().any(|e| e.is_null());
        self.data.extend_from_slice(es);
        Ok(())
    }

    pub fn extend(&mut self, es: Vec<E>) -> Result<()> {
        self.check_capacity(es.len())?;
        self.contain_null |= es.iter().any(|e| e.is_null());
        self.data.extend(es);
        Ok(())
    }

    pub fn get(&self, i: usize) -> Option<&E> {
        self.data.get(i)
    }

    pub fn set(&mut self, i: usize, e: E) -> Result<()> {
        let len = self.data.len();
        let slot = self
            .data
            .get_mut(i)
            .ok_or_else(|| kind_err(ErrorKind::InvalidArgument, format!("index {} out of range {}", i, len)))?;
        self.contain_null |= e.is_null();
        *slot = e;
        Ok(())
    }

    /// Overwrites `len` slots from `start`, growing the vector if the range
    /// runs past the end.
    pub fn fill(&mut self, start: usize, len: usize, e: &E) -> Result<()> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| kind_err(ErrorKind::InvalidArgument, "fill range overflow"))?;
        if start > self.data.len() {
            return Err(kind_err(
                ErrorKind::InvalidArgument,
                format!("fill start {} past end {}", start, self.data.len()),
            ));
        }
        if end > self.data.len() {
            self.resize(end)?;
        }
        for slot in &mut self.data[start..end] {
            *slot = e.clone();
        }
        if e.is_null() && len > 0 {
            self.contain_null = true;
        }
        Ok(())
    }

    pub fn is_null_at(&self, i: usize) -> bool {
        self.data.get(i).map_or(true, |e| e.is_null())
    }

    /// The null hint; true means "maybe".
    pub fn contain_null(&self) -> bool {
        self.contain_null
    }

    /// Exact answer, refreshing the hint when it was stale.
    pub fn has_null(&mut self) -> bool {
        if self.contain_null {
            self.contain_null = self.data.iter().any(|e| e.is_null());
        }
        self.contain_null
    }

    pub fn scan_null(&self) -> bool {
        self.contain_null && self.data.iter().any(|e| e.is_null())
    }

    pub fn null_fill(&mut self, e: &E) {
        if e.is_null() || !self.contain_null {
            return;
        }
        for slot in self.data.iter_mut().filter(|s| s.is_null()) {
            *slot = e.clone();
        }
        self.contain_null = false;
    }

    /// Removes the given positions, which must be strictly ascending, in one
    /// forward compaction pass.
    pub fn remove(&mut self, positions: &[usize]) -> Result<()> {
        if positions.is_empty() {
            return Ok(());
        }
        let len = self.data.len();
        for w in positions.windows(2) {
            if w[0] >= w[1] {
                return Err(kind_err(
                    ErrorKind::InvalidArgument,
                    format!("remove positions not strictly ascending at {}", w[1]),
                ));
            }
        }
        if let Some(&last) = positions.last() {
            if last >= len {
                return Err(kind_err(
                    ErrorKind::InvalidArgument,
                    format!("remove position {} out of range {}", last, len),
                ));
            }
        }
        let mut write = positions[0];
        let mut del = positions.iter().peekable();
        for read in positions[0]..len {
            if del.peek() == Some(&&read) {
                del.next();
                continue;
            }
            self.data.swap(write, read);
            write += 1;
        }
        self.data.truncate(write);
        if self.contain_null {
            self.contain_null = self.data.iter().any(|e| e.is_null());
        }
        Ok(())
    }

    /// Drops the last `n` elements.
    pub fn remove_tail(&mut self, n: usize) {
        let keep = self.data.len().saturating_sub(n);
        self.data.truncate(keep);
    }

    /// New slots are null. Shrinking keeps the capacity.
    pub fn resize(&mut self, n: usize) -> Result<()> {
        let len = self.data.len();
        if n > len {
            self.check_capacity(n - len)?;
            self.data.resize(n, E::null());
            self.contain_null = true;
        } else {
            self.data.truncate(n);
        }
        Ok(())
    }

    /// Shifts elements toward the front by `steps`; the tail becomes null.
    pub fn next(&mut self, steps: usize) {
        let len = self.data.len();
        if steps == 0 || len == 0 {
            return;
        }
        let steps = steps.min(len);
        self.data.rotate_left(steps);
        for slot in &mut self.data[len - steps..] {
            *slot = E::null();
        }
        self.contain_null = true;
    }

    /// Shifts elements toward the back by `steps`; the head becomes null.
    pub fn prev(&mut self, steps: usize) {
        let len = self.data.len();
        if steps == 0 || len == 0 {
            return;
        }
        let steps = steps.min(len);
        self.data.rotate_right(steps);
        for slot in &mut self.data[..steps] {
            *slot = E::null();
        }
        self.contain_null = true;
    }

    pub fn reverse(&mut self) {
        self.data.reverse();
    }

    pub fn gather(&self, indices: &[usize]) -> Result<Vec<E>> {
        let mut out = Vec::new();
        out.try_reserve_exact(indices.len())
            .map_err(|e| kind_err(ErrorKind::OutOfMemory, e.to_string()))?;
        for &i in indices {
            let e = self.data.get(i).ok_or_else(|| {
                kind_err(ErrorKind::InvalidArgument, format!("index {} out of range {}", i, self.data.len()))
            })?;
            out.push(e.clone());
        }
        Ok(out)
    }

    pub fn slice(&self, start: usize, len: usize) -> Result<&[E]> {
        start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| {
                kind_err(
                    ErrorKind::InvalidArgument,
                    format!("range {}+{} out of bounds {}", start, len, self.data.len()),
                )
            })
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.contain_null = false;
    }

    pub fn allocated_memory(&self) -> usize {
        self.data.capacity() * std::mem::size_of::<E>() + self.data.iter().map(|e| e.heap_size()).sum::<usize>()
    }
}
