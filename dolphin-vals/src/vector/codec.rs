// A codec gives a storage element its logical type: how it reads as a
// scalar, how text and scalars become elements, how elements order and hash.
// One generic vector type is instantiated per codec.

use super::store::Element;
use crate::constant::Constant;
use crate::decimal::{format_raw, parse_raw, rescale_raw, Decimal, DecimalRaw};
use crate::fixed::{self, Fixed16};
use crate::key::ScalarKey;
use crate::prim::{Primitive, LONG_NULL};
use crate::scalar::{bytes_bucket, Scalar};
use crate::symbol::SymbolBase;
use crate::types::{DataType, TypeDesc};
use dolphin_base::{type_err, Result};
use std::cmp::Ordering;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

pub trait Codec: Clone + Debug + Send + Sync + 'static {
    type Elem: Element;

    fn desc(&self) -> TypeDesc;
    fn to_scalar(&self, e: &Self::Elem) -> Result<Scalar>;
    fn from_scalar(&self, s: &Scalar) -> Result<Self::Elem>;
    fn parse(&self, text: &str) -> Result<Self::Elem>;
    fn compare(&self, a: &Self::Elem, b: &Self::Elem) -> Ordering;
    fn hash_bucket(&self, e: &Self::Elem, buckets: i32) -> Result<i32>;

    fn format(&self, e: &Self::Elem) -> String {
        if e.is_null() {
            return String::new();
        }
        self.to_scalar(e).map(|s| s.get_string()).unwrap_or_default()
    }

    fn to_constant(&self, e: &Self::Elem) -> Result<Constant> {
        Ok(Constant::Scalar(self.to_scalar(e)?))
    }

    fn from_constant(&self, c: &Constant) -> Result<Self::Elem> {
        match c {
            Constant::Scalar(s) => self.from_scalar(s),
            other => Err(type_err(format!(
                "cannot store a {:?} in a {} vector",
                other.form(),
                self.desc()
            ))),
        }
    }

    fn key(&self, e: &Self::Elem) -> Result<ScalarKey> {
        Ok(ScalarKey::from(&self.to_scalar(e)?))
    }

    /// Element-wise negation, when the type supports it.
    fn neg(&self, _e: &Self::Elem) -> Result<Self::Elem> {
        Err(type_err(format!("neg is not supported on {}", self.desc())))
    }
}

/// Numeric and temporal types over one of the six primitive widths.
#[derive(Clone, Debug)]
pub struct PrimCodec<T> {
    ty: DataType,
    _t: PhantomData<T>,
}

impl<T: Primitive> PrimCodec<T> {
    pub fn new(ty: DataType) -> Self {
        PrimCodec { ty, _t: PhantomData }
    }

    pub fn data_type(&self) -> DataType {
        self.ty
    }
}

impl<T: Primitive + Element> Codec for PrimCodec<T> {
    type Elem = T;

    fn desc(&self) -> TypeDesc {
        TypeDesc::new(self.ty)
    }

    fn to_scalar(&self, e: &T) -> Result<Scalar> {
        Ok(match self.ty {
            DataType::Float => Scalar::Float(e.convert()),
            DataType::Double => Scalar::Double(e.convert()),
            ty => Scalar::from_raw_int(ty, e.to_i64().unwrap_or(LONG_NULL)),
        })
    }

    fn from_scalar(&self, s: &Scalar) -> Result<T> {
        let cast;
        let s = if s.data_type() == self.ty {
            s
        } else {
            cast = s.cast(self.desc())?;
            &cast
        };
        Ok(match s {
            Scalar::Float(v) => v.convert(),
            Scalar::Double(v) => v.convert(),
            _ => s.int_value().map_or(T::NULL, T::from_i64),
        })
    }

    fn parse(&self, text: &str) -> Result<T> {
        self.from_scalar(&Scalar::parse(self.desc(), text)?)
    }

    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Equal)
    }

    fn hash_bucket(&self, e: &T, buckets: i32) -> Result<i32> {
        e.hash_bucket(buckets)
            .ok_or_else(|| type_err(format!("{} values cannot be hash partitioned", self.ty)))
    }

    fn key(&self, e: &T) -> Result<ScalarKey> {
        if e.is_null() {
            Ok(ScalarKey::Null)
        } else if T::IS_FLOAT {
            Ok(ScalarKey::Float(e.as_f64().into()))
        } else {
            Ok(ScalarKey::Int(e.as_i64()))
        }
    }

    fn neg(&self, e: &T) -> Result<T> {
        match self.ty {
            DataType::Bool | DataType::Void => Err(type_err(format!("neg is not supported on {}", self.ty))),
            ty if ty.is_temporal() => Err(type_err(format!("neg is not supported on {}", ty))),
            _ => Ok(e.neg()),
        }
    }
}

/// STRING and BLOB; the empty value doubles as null.
#[derive(Clone, Debug)]
pub struct StrCodec {
    ty: DataType,
}

impl StrCodec {
    pub fn new(ty: DataType) -> Self {
        StrCodec { ty }
    }
}

impl Codec for StrCodec {
    type Elem = Vec<u8>;

    fn desc(&self) -> TypeDesc {
        TypeDesc::new(self.ty)
    }

    fn to_scalar(&self, e: &Vec<u8>) -> Result<Scalar> {
        Ok(match self.ty {
            DataType::Blob => Scalar::Blob(e.clone()),
            _ => Scalar::String(String::from_utf8_lossy(e).into_owned()),
        })
    }

    fn from_scalar(&self, s: &Scalar) -> Result<Vec<u8>> {
        Ok(match s {
            Scalar::String(v) | Scalar::Symbol(v) => v.as_bytes().to_vec(),
            Scalar::Blob(b) => b.clone(),
            other => other.get_string().into_bytes(),
        })
    }

    fn parse(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }

    fn format(&self, e: &Vec<u8>) -> String {
        String::from_utf8_lossy(e).into_owned()
    }

    fn compare(&self, a: &Vec<u8>, b: &Vec<u8>) -> Ordering {
        a.cmp(b)
    }

    fn hash_bucket(&self, e: &Vec<u8>, buckets: i32) -> Result<i32> {
        if e.is_empty() {
            return Ok(-1);
        }
        Ok(bytes_bucket(e, buckets))
    }

    fn key(&self, e: &Vec<u8>) -> Result<ScalarKey> {
        Ok(if e.is_empty() {
            ScalarKey::Null
        } else {
            ScalarKey::Bytes(e.clone())
        })
    }
}

/// UUID, IPADDR and INT128.
#[derive(Clone, Debug)]
pub struct FixedCodec {
    ty: DataType,
}

impl FixedCodec {
    pub fn new(ty: DataType) -> Self {
        FixedCodec { ty }
    }
}

impl Codec for FixedCodec {
    type Elem = Fixed16;

    fn desc(&self) -> TypeDesc {
        TypeDesc::new(self.ty)
    }

    fn to_scalar(&self, e: &Fixed16) -> Result<Scalar> {
        Ok(match self.ty {
            DataType::Uuid => Scalar::Uuid(*e),
            DataType::IpAddr => Scalar::IpAddr(*e),
            _ => Scalar::Int128(*e),
        })
    }

    fn from_scalar(&self, s: &Scalar) -> Result<Fixed16> {
        if let Some(v) = s.fixed_value() {
            return Ok(v);
        }
        if s.is_null() {
            return Ok(fixed::FIXED_NULL);
        }
        match s {
            Scalar::String(t) | Scalar::Symbol(t) => fixed::parse(self.ty, t),
            other => Err(type_err(format!("cannot convert {} to {}", other.data_type(), self.ty))),
        }
    }

    fn parse(&self, text: &str) -> Result<Fixed16> {
        fixed::parse(self.ty, text)
    }

    fn format(&self, e: &Fixed16) -> String {
        fixed::format(self.ty, e)
    }

    fn compare(&self, a: &Fixed16, b: &Fixed16) -> Ordering {
        fixed::to_u128(a).cmp(&fixed::to_u128(b))
    }

    fn hash_bucket(&self, e: &Fixed16, buckets: i32) -> Result<i32> {
        if fixed::is_null(e) {
            return Ok(-1);
        }
        Ok(bytes_bucket(e, buckets))
    }
}

/// Scaled fixed-point columns; every element shares the codec's scale.
#[derive(Clone, Debug)]
pub struct DecimalCodec<T> {
    scale: i32,
    _t: PhantomData<T>,
}

impl<T: DecimalRaw> DecimalCodec<T> {
    pub fn new(scale: i32) -> Result<Self> {
        TypeDesc::decimal(T::TYPE, scale)?;
        Ok(DecimalCodec { scale, _t: PhantomData })
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }
}

impl<T: DecimalRaw + Element> Codec for DecimalCodec<T>
where
    Scalar: From<Decimal<T>>,
{
    type Elem = T;

    fn desc(&self) -> TypeDesc {
        TypeDesc {
            ty: T::TYPE,
            array: false,
            scale: self.scale,
        }
    }

    fn to_scalar(&self, e: &T) -> Result<Scalar> {
        Ok(Scalar::from(Decimal::from_stored(*e, self.scale)))
    }

    /// Decimals of another scale or width take the checked conversion path
    /// and fail with an overflow error rather than truncate.
    fn from_scalar(&self, s: &Scalar) -> Result<T> {
        if s.is_null() {
            return Ok(T::NULL);
        }
        let (raw, scale) = match s {
            Scalar::Decimal32(d) => (d.raw().to_i128(), d.scale()),
            Scalar::Decimal64(d) => (d.raw().to_i128(), d.scale()),
            Scalar::Decimal128(d) => (d.raw().to_i128(), d.scale()),
            other => return self.from_scalar(&other.cast(self.desc())?),
        };
        let raw = rescale_raw(raw, scale, self.scale)?;
        Ok(Decimal::<T>::from_i128(raw, self.scale)?.raw())
    }

    fn parse(&self, text: &str) -> Result<T> {
        match parse_raw(text, self.scale, true, T::MAX_PRECISION)? {
            Some((raw, _)) => Ok(Decimal::<T>::from_i128(raw, self.scale)?.raw()),
            None => Ok(T::NULL),
        }
    }

    fn format(&self, e: &T) -> String {
        if e.is_null() {
            String::new()
        } else {
            format_raw(e.to_i128(), self.scale)
        }
    }

    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }

    fn hash_bucket(&self, e: &T, buckets: i32) -> Result<i32> {
        if e.is_null() {
            return Ok(-1);
        }
        let raw = e.to_i128();
        match T::WIDTH {
            4 => Ok((raw as u32 as u64 % buckets as u64) as i32),
            8 => Ok((raw as u64 % buckets as u64) as i32),
            _ => Ok(bytes_bucket(&raw.to_le_bytes(), buckets)),
        }
    }

    fn neg(&self, e: &T) -> Result<T> {
        if e.is_null() {
            Ok(*e)
        } else {
            Ok(-*e)
        }
    }
}

/// Element of a symbol vector: an id into the shared base, 0 for null.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub i32);

impl Element for SymbolId {
    fn null() -> Self {
        SymbolId(0)
    }
    fn is_null(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Clone, Debug)]
pub struct SymbolCodec {
    base: Arc<SymbolBase>,
}

impl SymbolCodec {
    pub fn new(base: Arc<SymbolBase>) -> Self {
        SymbolCodec { base }
    }

    pub fn base(&self) -> &Arc<SymbolBase> {
        &self.base
    }
}

impl Codec for SymbolCodec {
    type Elem = SymbolId;

    fn desc(&self) -> TypeDesc {
        TypeDesc::new(DataType::Symbol)
    }

    fn to_scalar(&self, e: &SymbolId) -> Result<Scalar> {
        Ok(Scalar::Symbol(self.base.with_symbol(e.0, |s| s.to_string())))
    }

    fn from_scalar(&self, s: &Scalar) -> Result<SymbolId> {
        let id = match s {
            Scalar::String(v) | Scalar::Symbol(v) => self.base.find_and_insert(v)?,
            other if other.is_null() => 0,
            other => self.base.find_and_insert(&other.get_string())?,
        };
        Ok(SymbolId(id))
    }

    fn parse(&self, text: &str) -> Result<SymbolId> {
        Ok(SymbolId(self.base.find_and_insert(text)?))
    }

    fn format(&self, e: &SymbolId) -> String {
        self.base.with_symbol(e.0, |s| s.to_string())
    }

    fn compare(&self, a: &SymbolId, b: &SymbolId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let sa = self.base.with_symbol(a.0, |s| s.to_string());
        self.base.with_symbol(b.0, |sb| sa.as_str().cmp(sb))
    }

    fn hash_bucket(&self, e: &SymbolId, buckets: i32) -> Result<i32> {
        if e.is_null() {
            return Ok(-1);
        }
        Ok(self.base.with_symbol(e.0, |s| bytes_bucket(s.as_bytes(), buckets)))
    }
}

impl Element for Constant {
    fn null() -> Self {
        Constant::Scalar(Scalar::Void)
    }
    fn is_null(&self) -> bool {
        matches!(self, Constant::Scalar(s) if s.is_null())
    }
}

/// Heterogeneous elements: each slot holds any constant.
#[derive(Clone, Debug, Default)]
pub struct AnyCodec;

impl Codec for AnyCodec {
    type Elem = Constant;

    fn desc(&self) -> TypeDesc {
        TypeDesc::new(DataType::Any)
    }

    fn to_scalar(&self, e: &Constant) -> Result<Scalar> {
        match e {
            Constant::Scalar(s) => Ok(s.clone()),
            other => Err(type_err(format!("element is a {:?}, not a scalar", other.form()))),
        }
    }

    fn from_scalar(&self, s: &Scalar) -> Result<Constant> {
        Ok(Constant::Scalar(s.clone()))
    }

    fn parse(&self, text: &str) -> Result<Constant> {
        if text.is_empty() {
            return Ok(Constant::null());
        }
        Ok(Constant::Scalar(Scalar::String(text.to_string())))
    }

    fn format(&self, e: &Constant) -> String {
        e.get_string()
    }

    fn to_constant(&self, e: &Constant) -> Result<Constant> {
        Ok(e.clone())
    }

    fn from_constant(&self, c: &Constant) -> Result<Constant> {
        Ok(c.clone())
    }

    fn compare(&self, _a: &Constant, _b: &Constant) -> Ordering {
        Ordering::Equal
    }

    fn hash_bucket(&self, _e: &Constant, _buckets: i32) -> Result<i32> {
        Err(type_err("ANY vectors cannot be hash partitioned"))
    }

    fn key(&self, e: &Constant) -> Result<ScalarKey> {
        match e {
            Constant::Scalar(s) => Ok(ScalarKey::from(s)),
            _ => Err(type_err("only scalar elements can be keys")),
        }
    }
}
