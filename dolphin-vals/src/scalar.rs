use crate::decimal::{rescale_raw, Decimal, Decimal128, Decimal32, Decimal64, DecimalRaw};
use crate::fixed::{self, Fixed16};
use crate::prim::{Primitive, DOUBLE_NULL, FLOAT_NULL, LONG_NULL};
use crate::temporal;
use crate::types::{DataCategory, DataType, Storage, TypeDesc};
use dolphin_base::{murmur32, parse_err, type_err, Result};
use serde::{Deserialize, Serialize};

/// A single typed value. Integer-backed variants hold the raw stored value,
/// so null is the type's sentinel rather than a separate flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Void,
    Bool(i8),
    Char(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Date(i32),
    Month(i32),
    Time(i32),
    Minute(i32),
    Second(i32),
    DateTime(i32),
    DateHour(i32),
    Timestamp(i64),
    NanoTime(i64),
    NanoTimestamp(i64),
    Float(f32),
    Double(f64),
    String(String),
    Symbol(String),
    Blob(Vec<u8>),
    Uuid(Fixed16),
    IpAddr(Fixed16),
    Int128(Fixed16),
    Decimal32(Decimal32),
    Decimal64(Decimal64),
    Decimal128(Decimal128),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Void => DataType::Void,
            Scalar::Bool(_) => DataType::Bool,
            Scalar::Char(_) => DataType::Char,
            Scalar::Short(_) => DataType::Short,
            Scalar::Int(_) => DataType::Int,
            Scalar::Long(_) => DataType::Long,
            Scalar::Date(_) => DataType::Date,
            Scalar::Month(_) => DataType::Month,
            Scalar::Time(_) => DataType::Time,
            Scalar::Minute(_) => DataType::Minute,
            Scalar::Second(_) => DataType::Second,
            Scalar::DateTime(_) => DataType::DateTime,
            Scalar::DateHour(_) => DataType::DateHour,
            Scalar::Timestamp(_) => DataType::Timestamp,
            Scalar::NanoTime(_) => DataType::NanoTime,
            Scalar::NanoTimestamp(_) => DataType::NanoTimestamp,
            Scalar::Float(_) => DataType::Float,
            Scalar::Double(_) => DataType::Double,
            Scalar::String(_) => DataType::String,
            Scalar::Symbol(_) => DataType::Symbol,
            Scalar::Blob(_) => DataType::Blob,
            Scalar::Uuid(_) => DataType::Uuid,
            Scalar::IpAddr(_) => DataType::IpAddr,
            Scalar::Int128(_) => DataType::Int128,
            Scalar::Decimal32(_) => DataType::Decimal32,
            Scalar::Decimal64(_) => DataType::Decimal64,
            Scalar::Decimal128(_) => DataType::Decimal128,
        }
    }

    pub fn type_desc(&self) -> TypeDesc {
        let ty = self.data_type();
        TypeDesc {
            ty,
            array: false,
            scale: self.scale().unwrap_or(0),
        }
    }

    pub fn category(&self) -> DataCategory {
        self.data_type().category()
    }

    pub fn scale(&self) -> Option<i32> {
        match self {
            Scalar::Decimal32(d) => Some(d.scale()),
            Scalar::Decimal64(d) => Some(d.scale()),
            Scalar::Decimal128(d) => Some(d.scale()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Scalar::Void => true,
            Scalar::Bool(v) | Scalar::Char(v) => v.is_null(),
            Scalar::Short(v) => v.is_null(),
            Scalar::Int(v)
            | Scalar::Date(v)
            | Scalar::Month(v)
            | Scalar::Time(v)
            | Scalar::Minute(v)
            | Scalar::Second(v)
            | Scalar::DateTime(v)
            | Scalar::DateHour(v) => v.is_null(),
            Scalar::Long(v) | Scalar::Timestamp(v) | Scalar::NanoTime(v) | Scalar::NanoTimestamp(v) => {
                v.is_null()
            }
            Scalar::Float(v) => v.is_null(),
            Scalar::Double(v) => v.is_null(),
            Scalar::String(s) | Scalar::Symbol(s) => s.is_empty(),
            Scalar::Blob(b) => b.is_empty(),
            Scalar::Uuid(v) | Scalar::IpAddr(v) | Scalar::Int128(v) => fixed::is_null(v),
            Scalar::Decimal32(d) => d.is_null(),
            Scalar::Decimal64(d) => d.is_null(),
            Scalar::Decimal128(d) => d.is_null(),
        }
    }

    /// The null value of a type.
    pub fn null_of(desc: TypeDesc) -> Scalar {
        match desc.ty {
            DataType::Void | DataType::Any | DataType::Dictionary => Scalar::Void,
            DataType::String => Scalar::String(String::new()),
            DataType::Symbol => Scalar::Symbol(String::new()),
            DataType::Blob => Scalar::Blob(Vec::new()),
            DataType::Uuid => Scalar::Uuid(fixed::FIXED_NULL),
            DataType::IpAddr => Scalar::IpAddr(fixed::FIXED_NULL),
            DataType::Int128 => Scalar::Int128(fixed::FIXED_NULL),
            DataType::Float => Scalar::Float(FLOAT_NULL),
            DataType::Double => Scalar::Double(DOUBLE_NULL),
            DataType::Decimal32 => Scalar::Decimal32(Decimal::null(desc.scale)),
            DataType::Decimal64 => Scalar::Decimal64(Decimal::null(desc.scale)),
            DataType::Decimal128 => Scalar::Decimal128(Decimal::null(desc.scale)),
            ty => Scalar::from_raw_int(ty, LONG_NULL),
        }
    }

    /// Builds an integer-backed scalar from a raw value. Values that do not
    /// fit the storage width become null.
    pub fn from_raw_int(ty: DataType, v: i64) -> Scalar {
        match ty {
            DataType::Bool => Scalar::Bool(i8::from_i64(v)),
            DataType::Char => Scalar::Char(i8::from_i64(v)),
            DataType::Short => Scalar::Short(i16::from_i64(v)),
            DataType::Int => Scalar::Int(i32::from_i64(v)),
            DataType::Date => Scalar::Date(i32::from_i64(v)),
            DataType::Month => Scalar::Month(i32::from_i64(v)),
            DataType::Time => Scalar::Time(i32::from_i64(v)),
            DataType::Minute => Scalar::Minute(i32::from_i64(v)),
            DataType::Second => Scalar::Second(i32::from_i64(v)),
            DataType::DateTime => Scalar::DateTime(i32::from_i64(v)),
            DataType::DateHour => Scalar::DateHour(i32::from_i64(v)),
            DataType::Long => Scalar::Long(v),
            DataType::Timestamp => Scalar::Timestamp(v),
            DataType::NanoTime => Scalar::NanoTime(v),
            DataType::NanoTimestamp => Scalar::NanoTimestamp(v),
            DataType::Float => Scalar::Float(f32::from_i64(v)),
            DataType::Double => Scalar::Double(f64::from_i64(v)),
            _ => Scalar::Void,
        }
    }

    /// Raw integer of an integer-backed scalar, `None` for null or for
    /// non-integer storage.
    pub fn int_value(&self) -> Option<i64> {
        match self {
            Scalar::Bool(v) | Scalar::Char(v) => v.to_i64(),
            Scalar::Short(v) => v.to_i64(),
            Scalar::Int(v)
            | Scalar::Date(v)
            | Scalar::Month(v)
            | Scalar::Time(v)
            | Scalar::Minute(v)
            | Scalar::Second(v)
            | Scalar::DateTime(v)
            | Scalar::DateHour(v) => v.to_i64(),
            Scalar::Long(v) | Scalar::Timestamp(v) | Scalar::NanoTime(v) | Scalar::NanoTimestamp(v) => {
                v.to_i64()
            }
            _ => None,
        }
    }

    /// Numeric view of integer, floating and decimal scalars.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => v.to_f64(),
            Scalar::Double(v) => v.to_f64(),
            Scalar::Decimal32(d) => d.to_f64(),
            Scalar::Decimal64(d) => d.to_f64(),
            Scalar::Decimal128(d) => d.to_f64(),
            _ => self.int_value().map(|v| v as f64),
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Scalar::Float(v) => v.to_i64(),
            Scalar::Double(v) => v.to_i64(),
            Scalar::Decimal32(_) | Scalar::Decimal64(_) | Scalar::Decimal128(_) => {
                self.to_f64().map(|f| i64::from_f64(f))
            }
            _ => self.int_value(),
        }
    }

    pub fn get_string(&self) -> String {
        if self.is_null() {
            return String::new();
        }
        match self {
            Scalar::Bool(v) => (if *v != 0 { "true" } else { "false" }).to_string(),
            Scalar::Char(v) => v.to_string(),
            Scalar::Short(v) => v.to_string(),
            Scalar::Int(v) => v.to_string(),
            Scalar::Long(v) => v.to_string(),
            Scalar::Float(v) => v.to_string(),
            Scalar::Double(v) => v.to_string(),
            Scalar::String(s) | Scalar::Symbol(s) => s.clone(),
            Scalar::Blob(b) => String::from_utf8_lossy(b).into_owned(),
            Scalar::Uuid(v) | Scalar::IpAddr(v) | Scalar::Int128(v) => fixed::format(self.data_type(), v),
            Scalar::Decimal32(d) => d.to_string(),
            Scalar::Decimal64(d) => d.to_string(),
            Scalar::Decimal128(d) => d.to_string(),
            s => match s.int_value() {
                Some(raw) => temporal::format(s.data_type(), raw),
                None => String::new(),
            },
        }
    }

    /// Parses text as a value of `desc`. Empty text is null for every type.
    pub fn parse(desc: TypeDesc, text: &str) -> Result<Scalar> {
        let ty = desc.ty;
        let bad = || parse_err(format!("cannot parse '{}' as {}", text, desc));
        match ty {
            DataType::String => return Ok(Scalar::String(text.to_string())),
            DataType::Symbol => return Ok(Scalar::Symbol(text.to_string())),
            DataType::Blob => return Ok(Scalar::Blob(text.as_bytes().to_vec())),
            _ => {}
        }
        let t = text.trim();
        if t.is_empty() {
            return Ok(Scalar::null_of(desc));
        }
        Ok(match ty {
            DataType::Bool => match t.to_ascii_lowercase().as_str() {
                "true" | "1" => Scalar::Bool(1),
                "false" | "0" => Scalar::Bool(0),
                _ => return Err(bad()),
            },
            DataType::Char => match t.parse::<i64>() {
                Ok(v) if (i8::MIN as i64 + 1..=i8::MAX as i64).contains(&v) => Scalar::Char(v as i8),
                Ok(_) => return Err(bad()),
                Err(_) => {
                    let mut chars = t.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) if c.is_ascii() => Scalar::Char(c as i8),
                        _ => return Err(bad()),
                    }
                }
            },
            DataType::Short | DataType::Int | DataType::Long => {
                let v: i64 = t.parse().map_err(|_| bad())?;
                let s = Scalar::from_raw_int(ty, v);
                if s.is_null() {
                    return Err(bad());
                }
                s
            }
            DataType::Float => Scalar::Float(t.parse::<f32>().map_err(|_| bad())?),
            DataType::Double => Scalar::Double(t.parse::<f64>().map_err(|_| bad())?),
            DataType::Uuid => Scalar::Uuid(fixed::parse(ty, t)?),
            DataType::IpAddr => Scalar::IpAddr(fixed::parse(ty, t)?),
            DataType::Int128 => Scalar::Int128(fixed::parse(ty, t)?),
            DataType::Decimal32 => Scalar::Decimal32(Decimal::parse(t, desc.scale, true)?),
            DataType::Decimal64 => Scalar::Decimal64(Decimal::parse(t, desc.scale, true)?),
            DataType::Decimal128 => Scalar::Decimal128(Decimal::parse(t, desc.scale, true)?),
            ty if ty.is_temporal() => match temporal::parse(ty, t)? {
                Some(raw) => Scalar::from_raw_int(ty, raw),
                None => Scalar::null_of(desc),
            },
            _ => return Err(type_err(format!("cannot parse text into {}", desc))),
        })
    }

    /// Converts to another type. Nulls stay null; narrowing that loses the
    /// value is null for integers and an overflow error for decimals.
    pub fn cast(&self, desc: TypeDesc) -> Result<Scalar> {
        let to = desc.ty;
        let from = self.data_type();
        if from == to && self.scale().map_or(true, |s| s == desc.scale) {
            return Ok(self.clone());
        }
        if self.is_null() {
            return Ok(Scalar::null_of(desc));
        }
        let incompatible = || type_err(format!("cannot convert {} to {}", from, desc));
        match (from.category(), to.category()) {
            (DataCategory::Literal, DataCategory::Literal) => Ok(match to {
                DataType::Blob => Scalar::Blob(self.literal_bytes()),
                DataType::Symbol => Scalar::Symbol(self.get_string()),
                _ => Scalar::String(self.get_string()),
            }),
            (DataCategory::Literal, _) => Scalar::parse(desc, &self.get_string()),
            (_, DataCategory::Literal) => Scalar::parse(desc, &self.get_string()),
            (DataCategory::Binary, DataCategory::Binary) => {
                let v = self.fixed_value().ok_or_else(incompatible)?;
                Ok(match to {
                    DataType::Uuid => Scalar::Uuid(v),
                    DataType::IpAddr => Scalar::IpAddr(v),
                    _ => Scalar::Int128(v),
                })
            }
            (DataCategory::Temporal, DataCategory::Temporal) => {
                let raw = self.int_value().ok_or_else(incompatible)?;
                Ok(Scalar::from_raw_int(to, temporal::convert(from, to, raw)?))
            }
            (DataCategory::Denary, DataCategory::Denary) => match self {
                Scalar::Decimal32(d) => decimal_to(d, desc),
                Scalar::Decimal64(d) => decimal_to(d, desc),
                Scalar::Decimal128(d) => decimal_to(d, desc),
                _ => Err(incompatible()),
            },
            (_, DataCategory::Denary) => {
                let built = match (self.int_value(), self.to_f64()) {
                    (Some(i), _) => Scalar::decimal_from_i64(desc, i)?,
                    (None, Some(f)) => Scalar::decimal_from_f64(desc, f)?,
                    _ => return Err(incompatible()),
                };
                Ok(built)
            }
            (
                DataCategory::Logical | DataCategory::Integral | DataCategory::Temporal,
                DataCategory::Logical | DataCategory::Integral | DataCategory::Temporal,
            ) => {
                let raw = self.int_value().ok_or_else(incompatible)?;
                let raw = if to == DataType::Bool { (raw != 0) as i64 } else { raw };
                Ok(Scalar::from_raw_int(to, raw))
            }
            (_, DataCategory::Floating) => {
                let f = self.to_f64().ok_or_else(incompatible)?;
                Ok(match to {
                    DataType::Float => Scalar::Float(f32::from_f64(f)),
                    _ => Scalar::Double(f),
                })
            }
            (DataCategory::Floating | DataCategory::Denary, DataCategory::Logical | DataCategory::Integral) => {
                let f = self.to_f64().ok_or_else(incompatible)?;
                Ok(Scalar::from_raw_int(to, i64::from_f64(f)))
            }
            _ => Err(incompatible()),
        }
    }

    fn decimal_from_i64(desc: TypeDesc, v: i64) -> Result<Scalar> {
        Ok(match desc.ty {
            DataType::Decimal32 => Scalar::Decimal32(Decimal::from_i64(v, desc.scale)?),
            DataType::Decimal64 => Scalar::Decimal64(Decimal::from_i64(v, desc.scale)?),
            _ => Scalar::Decimal128(Decimal::from_i64(v, desc.scale)?),
        })
    }

    fn decimal_from_f64(desc: TypeDesc, v: f64) -> Result<Scalar> {
        Ok(match desc.ty {
            DataType::Decimal32 => Scalar::Decimal32(Decimal::from_f64(v, desc.scale)?),
            DataType::Decimal64 => Scalar::Decimal64(Decimal::from_f64(v, desc.scale)?),
            _ => Scalar::Decimal128(Decimal::from_f64(v, desc.scale)?),
        })
    }

    fn literal_bytes(&self) -> Vec<u8> {
        match self {
            Scalar::Blob(b) => b.clone(),
            Scalar::String(s) | Scalar::Symbol(s) => s.as_bytes().to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn fixed_value(&self) -> Option<Fixed16> {
        match self {
            Scalar::Uuid(v) | Scalar::IpAddr(v) | Scalar::Int128(v) => Some(*v),
            _ => None,
        }
    }

    /// Partition bucket: unsigned modulo for integers, murmur32 for strings
    /// and 16-byte values, -1 for null. Floating values cannot be bucketed.
    pub fn hash_bucket(&self, buckets: i32) -> Result<i32> {
        if buckets <= 0 {
            return Err(type_err(format!("bucket count {} must be positive", buckets)));
        }
        if self.is_null() {
            return Ok(-1);
        }
        let b = match self {
            Scalar::Bool(v) | Scalar::Char(v) => v.hash_bucket(buckets),
            Scalar::Short(v) => v.hash_bucket(buckets),
            Scalar::Int(v)
            | Scalar::Date(v)
            | Scalar::Month(v)
            | Scalar::Time(v)
            | Scalar::Minute(v)
            | Scalar::Second(v)
            | Scalar::DateTime(v)
            | Scalar::DateHour(v) => v.hash_bucket(buckets),
            Scalar::Long(v) | Scalar::Timestamp(v) | Scalar::NanoTime(v) | Scalar::NanoTimestamp(v) => {
                v.hash_bucket(buckets)
            }
            Scalar::String(s) | Scalar::Symbol(s) => Some(bytes_bucket(s.as_bytes(), buckets)),
            Scalar::Blob(b) => Some(bytes_bucket(b, buckets)),
            Scalar::Uuid(v) | Scalar::IpAddr(v) | Scalar::Int128(v) => Some(bytes_bucket(v, buckets)),
            Scalar::Decimal32(d) => d.raw().hash_bucket(buckets),
            Scalar::Decimal64(d) => d.raw().hash_bucket(buckets),
            Scalar::Decimal128(d) => Some(bytes_bucket(&d.raw().to_le_bytes(), buckets)),
            _ => None,
        };
        b.ok_or_else(|| type_err(format!("{} values cannot be hash partitioned", self.data_type())))
    }

    pub fn storage(&self) -> Storage {
        self.data_type().storage()
    }
}

pub(crate) fn bytes_bucket(bytes: &[u8], buckets: i32) -> i32 {
    dolphin_base::bucket_of(murmur32(bytes), buckets as u32)
}

fn decimal_to<T: DecimalRaw>(d: &Decimal<T>, desc: TypeDesc) -> Result<Scalar> {
    let raw = rescale_raw(d.raw().to_i128(), d.scale(), desc.scale)?;
    Ok(match desc.ty {
        DataType::Decimal32 => Scalar::Decimal32(Decimal::from_i128(raw, desc.scale)?),
        DataType::Decimal64 => Scalar::Decimal64(Decimal::from_i128(raw, desc.scale)?),
        _ => Scalar::Decimal128(Decimal::from_i128(raw, desc.scale)?),
    })
}

impl From<Decimal32> for Scalar {
    fn from(d: Decimal32) -> Self {
        Scalar::Decimal32(d)
    }
}

impl From<Decimal64> for Scalar {
    fn from(d: Decimal64) -> Self {
        Scalar::Decimal64(d)
    }
}

impl From<Decimal128> for Scalar {
    fn from(d: Decimal128) -> Self {
        Scalar::Decimal128(d)
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.get_string())
    }
}
