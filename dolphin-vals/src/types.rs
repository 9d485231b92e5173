use dolphin_base::{arg_err, malformed_err, Result};
use serde::{Deserialize, Serialize};

/// Array-vector type ids are the element type id plus this offset.
pub const ARRAY_TYPE_BASE: i32 = 64;

/// Marks a symbol vector that carries its symbol base inline on the wire.
pub const SYMBOL_EXTENDED: i32 = 128;

// Primitive types as numbered by the server. The numbering is part of the
// wire protocol, so the gaps (function defs, handles, code, etc.) are kept
// even though this crate never materializes values of those types.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum DataType {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Date,
    Month,
    Time,
    Minute,
    Second,
    DateTime,
    Timestamp,
    NanoTime,
    NanoTimestamp,
    Float,
    Double,
    Symbol,
    String,
    Uuid,
    Any,
    Dictionary,
    DateHour,
    IpAddr,
    Int128,
    Blob,
    Decimal32,
    Decimal64,
    Decimal128,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum DataCategory {
    Nothing,
    Logical,
    Integral,
    Floating,
    Temporal,
    Literal,
    Binary,
    Denary,
    Mixed,
    Array,
    System,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum DataForm {
    Scalar,
    Vector,
    Pair,
    Matrix,
    Set,
    Dictionary,
    Table,
}

/// How a type's elements are laid out in memory. Several logical types share
/// one storage class (all the 32-bit temporal types are `I32`, etc.).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Storage {
    Void,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Str,
    Symbol,
    Fixed16,
    Dec32,
    Dec64,
    Dec128,
    Any,
}

const ALL_TYPES: [DataType; 29] = [
    DataType::Void,
    DataType::Bool,
    DataType::Char,
    DataType::Short,
    DataType::Int,
    DataType::Long,
    DataType::Date,
    DataType::Month,
    DataType::Time,
    DataType::Minute,
    DataType::Second,
    DataType::DateTime,
    DataType::Timestamp,
    DataType::NanoTime,
    DataType::NanoTimestamp,
    DataType::Float,
    DataType::Double,
    DataType::Symbol,
    DataType::String,
    DataType::Uuid,
    DataType::Any,
    DataType::Dictionary,
    DataType::DateHour,
    DataType::IpAddr,
    DataType::Int128,
    DataType::Blob,
    DataType::Decimal32,
    DataType::Decimal64,
    DataType::Decimal128,
];

impl DataType {
    pub fn id(&self) -> i32 {
        match self {
            DataType::Void => 0,
            DataType::Bool => 1,
            DataType::Char => 2,
            DataType::Short => 3,
            DataType::Int => 4,
            DataType::Long => 5,
            DataType::Date => 6,
            DataType::Month => 7,
            DataType::Time => 8,
            DataType::Minute => 9,
            DataType::Second => 10,
            DataType::DateTime => 11,
            DataType::Timestamp => 12,
            DataType::NanoTime => 13,
            DataType::NanoTimestamp => 14,
            DataType::Float => 15,
            DataType::Double => 16,
            DataType::Symbol => 17,
            DataType::String => 18,
            DataType::Uuid => 19,
            DataType::Any => 25,
            DataType::Dictionary => 27,
            DataType::DateHour => 28,
            DataType::IpAddr => 30,
            DataType::Int128 => 31,
            DataType::Blob => 32,
            DataType::Decimal32 => 37,
            DataType::Decimal64 => 38,
            DataType::Decimal128 => 39,
        }
    }

    pub fn from_id(id: i32) -> Result<Self> {
        ALL_TYPES
            .iter()
            .find(|t| t.id() == id)
            .copied()
            .ok_or_else(|| malformed_err(format!("unknown data type id {}", id)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Void => "VOID",
            DataType::Bool => "BOOL",
            DataType::Char => "CHAR",
            DataType::Short => "SHORT",
            DataType::Int => "INT",
            DataType::Long => "LONG",
            DataType::Date => "DATE",
            DataType::Month => "MONTH",
            DataType::Time => "TIME",
            DataType::Minute => "MINUTE",
            DataType::Second => "SECOND",
            DataType::DateTime => "DATETIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::NanoTime => "NANOTIME",
            DataType::NanoTimestamp => "NANOTIMESTAMP",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Symbol => "SYMBOL",
            DataType::String => "STRING",
            DataType::Uuid => "UUID",
            DataType::Any => "ANY",
            DataType::Dictionary => "DICTIONARY",
            DataType::DateHour => "DATEHOUR",
            DataType::IpAddr => "IPADDR",
            DataType::Int128 => "INT128",
            DataType::Blob => "BLOB",
            DataType::Decimal32 => "DECIMAL32",
            DataType::Decimal64 => "DECIMAL64",
            DataType::Decimal128 => "DECIMAL128",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let upper = name.trim().to_ascii_uppercase();
        ALL_TYPES
            .iter()
            .find(|t| t.name() == upper)
            .copied()
            .ok_or_else(|| arg_err(format!("unknown data type name {}", name)))
    }

    pub fn category(&self) -> DataCategory {
        match self {
            DataType::Void => DataCategory::Nothing,
            DataType::Bool => DataCategory::Logical,
            DataType::Char | DataType::Short | DataType::Int | DataType::Long => {
                DataCategory::Integral
            }
            DataType::Float | DataType::Double => DataCategory::Floating,
            DataType::Date
            | DataType::Month
            | DataType::Time
            | DataType::Minute
            | DataType::Second
            | DataType::DateTime
            | DataType::Timestamp
            | DataType::NanoTime
            | DataType::NanoTimestamp
            | DataType::DateHour => DataCategory::Temporal,
            DataType::Symbol | DataType::String | DataType::Blob => DataCategory::Literal,
            DataType::Uuid | DataType::IpAddr | DataType::Int128 => DataCategory::Binary,
            DataType::Decimal32 | DataType::Decimal64 | DataType::Decimal128 => {
                DataCategory::Denary
            }
            DataType::Any => DataCategory::Mixed,
            DataType::Dictionary => DataCategory::System,
        }
    }

    pub fn storage(&self) -> Storage {
        match self {
            DataType::Void => Storage::Void,
            DataType::Bool | DataType::Char => Storage::I8,
            DataType::Short => Storage::I16,
            DataType::Int
            | DataType::Date
            | DataType::Month
            | DataType::Time
            | DataType::Minute
            | DataType::Second
            | DataType::DateTime
            | DataType::DateHour => Storage::I32,
            DataType::Long | DataType::Timestamp | DataType::NanoTime | DataType::NanoTimestamp => {
                Storage::I64
            }
            DataType::Float => Storage::F32,
            DataType::Double => Storage::F64,
            DataType::String | DataType::Blob => Storage::Str,
            DataType::Symbol => Storage::Symbol,
            DataType::Uuid | DataType::IpAddr | DataType::Int128 => Storage::Fixed16,
            DataType::Decimal32 => Storage::Dec32,
            DataType::Decimal64 => Storage::Dec64,
            DataType::Decimal128 => Storage::Dec128,
            DataType::Any | DataType::Dictionary => Storage::Any,
        }
    }

    /// Bytes per element on the wire, or 0 for variable-width types.
    pub fn unit_len(&self) -> usize {
        match self.storage() {
            Storage::I8 => 1,
            Storage::I16 => 2,
            Storage::I32 | Storage::F32 | Storage::Symbol | Storage::Dec32 => 4,
            Storage::I64 | Storage::F64 | Storage::Dec64 => 8,
            Storage::Fixed16 | Storage::Dec128 => 16,
            Storage::Void | Storage::Str | Storage::Any => 0,
        }
    }

    pub fn is_decimal(&self) -> bool {
        self.category() == DataCategory::Denary
    }

    pub fn is_temporal(&self) -> bool {
        self.category() == DataCategory::Temporal
    }

    /// Largest scale (and digit count) a decimal type can carry.
    pub fn max_precision(&self) -> Option<i32> {
        match self {
            DataType::Decimal32 => Some(9),
            DataType::Decimal64 => Some(18),
            DataType::Decimal128 => Some(38),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl DataForm {
    pub fn id(&self) -> i32 {
        match self {
            DataForm::Scalar => 0,
            DataForm::Vector => 1,
            DataForm::Pair => 2,
            DataForm::Matrix => 3,
            DataForm::Set => 4,
            DataForm::Dictionary => 5,
            DataForm::Table => 6,
        }
    }

    pub fn from_id(id: i32) -> Result<Self> {
        Ok(match id {
            0 => DataForm::Scalar,
            1 => DataForm::Vector,
            2 => DataForm::Pair,
            3 => DataForm::Matrix,
            4 => DataForm::Set,
            5 => DataForm::Dictionary,
            6 => DataForm::Table,
            _ => return Err(malformed_err(format!("unsupported data form {}", id))),
        })
    }
}

/// A column's full type: element type, whether each row is an array of
/// elements, and the scale for decimal types.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct TypeDesc {
    pub ty: DataType,
    pub array: bool,
    pub scale: i32,
}

impl TypeDesc {
    pub fn new(ty: DataType) -> Self {
        TypeDesc {
            ty,
            array: false,
            scale: 0,
        }
    }

    pub fn decimal(ty: DataType, scale: i32) -> Result<Self> {
        match ty.max_precision() {
            Some(max) if (0..=max).contains(&scale) => Ok(TypeDesc {
                ty,
                array: false,
                scale,
            }),
            Some(max) => Err(arg_err(format!(
                "scale {} out of range 0..={} for {}",
                scale, max, ty
            ))),
            None => Err(arg_err(format!("{} is not a decimal type", ty))),
        }
    }

    pub fn array_of(self) -> Self {
        TypeDesc {
            array: true,
            ..self
        }
    }

    pub fn type_id(&self) -> i32 {
        if self.array {
            self.ty.id() + ARRAY_TYPE_BASE
        } else {
            self.ty.id()
        }
    }

    /// Splits a wire type id into element type and array flag.
    pub fn from_type_id(id: i32, scale: i32) -> Result<Self> {
        let (ty, array) = if (ARRAY_TYPE_BASE..ARRAY_TYPE_BASE * 2).contains(&id) {
            (DataType::from_id(id - ARRAY_TYPE_BASE)?, true)
        } else {
            (DataType::from_id(id)?, false)
        };
        Ok(TypeDesc { ty, array, scale })
    }

    /// Parses server type names such as `INT`, `DOUBLE[]`, `DECIMAL64(4)`.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        let (name, array) = match name.strip_suffix("[]") {
            Some(inner) => (inner, true),
            None => (name, false),
        };
        let (base, scale) = match name.find('(') {
            Some(open) => {
                let close = name
                    .rfind(')')
                    .ok_or_else(|| arg_err(format!("unbalanced type name {}", name)))?;
                let scale = name[open + 1..close]
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| arg_err(format!("bad scale in type name {}", name)))?;
                (&name[..open], scale)
            }
            None => (name, 0),
        };
        let ty = DataType::from_name(base)?;
        let desc = if ty.is_decimal() {
            TypeDesc::decimal(ty, scale)?
        } else {
            TypeDesc::new(ty)
        };
        Ok(if array { desc.array_of() } else { desc })
    }
}

impl std::fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ty)?;
        if self.ty.is_decimal() {
            write!(f, "({})", self.scale)?;
        }
        if self.array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Packs a type id and decimal scale into one 32-bit descriptor: bit 31 set
/// when a scale is present, bits 16..=30 the scale, bits 0..=15 the type id.
pub fn pack_type_scale(type_id: i32, scale: Option<i32>) -> i32 {
    let base = (type_id as u32) & 0xffff;
    match scale {
        Some(s) => ((1u32 << 31) | (((s as u32) & 0x7fff) << 16) | base) as i32,
        None => base as i32,
    }
}

pub fn unpack_type_scale(packed: i32) -> (i32, Option<i32>) {
    let bits = packed as u32;
    let type_id = (bits & 0xffff) as i32;
    if bits & (1u32 << 31) != 0 {
        (type_id, Some(((bits >> 16) & 0x7fff) as i32))
    } else {
        (type_id, None)
    }
}
