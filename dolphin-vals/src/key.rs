use crate::decimal::DecimalRaw;
use crate::scalar::Scalar;
use ordered_float::OrderedFloat;

/// Hashable identity of a scalar, used by sets and dictionaries. Values of
/// one category that are equal compare equal regardless of width, so an INT
/// 3 and a LONG 3 are the same key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarKey {
    Null,
    Int(i64),
    Float(OrderedFloat<f64>),
    Bytes(Vec<u8>),
    Fixed([u8; 16]),
    /// Raw value and scale with trailing fractional zeros removed.
    Decimal(i128, i32),
}

fn decimal_key(raw: i128, scale: i32) -> ScalarKey {
    // Strip trailing zeros so 1.50 and 1.5 meet.
    let (mut raw, mut scale) = (raw, scale);
    while scale > 0 && raw % 10 == 0 {
        raw /= 10;
        scale -= 1;
    }
    ScalarKey::Decimal(raw, scale)
}

impl From<&Scalar> for ScalarKey {
    fn from(s: &Scalar) -> Self {
        if s.is_null() {
            return ScalarKey::Null;
        }
        match s {
            Scalar::Float(v) => ScalarKey::Float(OrderedFloat(*v as f64)),
            Scalar::Double(v) => ScalarKey::Float(OrderedFloat(*v)),
            Scalar::String(v) | Scalar::Symbol(v) => ScalarKey::Bytes(v.as_bytes().to_vec()),
            Scalar::Blob(b) => ScalarKey::Bytes(b.clone()),
            Scalar::Uuid(v) | Scalar::IpAddr(v) | Scalar::Int128(v) => ScalarKey::Fixed(*v),
            Scalar::Decimal32(d) => decimal_key(d.raw().to_i128(), d.scale()),
            Scalar::Decimal64(d) => decimal_key(d.raw().to_i128(), d.scale()),
            Scalar::Decimal128(d) => decimal_key(d.raw().to_i128(), d.scale()),
            other => match other.int_value() {
                Some(v) => ScalarKey::Int(v),
                None => ScalarKey::Null,
            },
        }
    }
}
