// Fixed-width numeric storage types and their null sentinels. Every typed
// vector ultimately stores one of these six, and every conversion between
// them goes through `Primitive::convert`, which maps the source's sentinel
// to the destination's sentinel rather than treating it as data.

use std::fmt::Debug;

pub const CHAR_NULL: i8 = i8::MIN;
pub const SHORT_NULL: i16 = i16::MIN;
pub const INT_NULL: i32 = i32::MIN;
pub const LONG_NULL: i64 = i64::MIN;
pub const FLOAT_NULL: f32 = -f32::MAX;
pub const DOUBLE_NULL: f64 = -f64::MAX;

pub trait Primitive: Copy + PartialEq + PartialOrd + Default + Debug + Send + Sync + 'static {
    const NULL: Self;
    const WIDTH: usize;
    const IS_FLOAT: bool;

    fn is_null(self) -> bool {
        self == Self::NULL
    }
    fn as_i64(self) -> i64;
    fn as_f64(self) -> f64;
    /// Out-of-range values (including the source sentinel) become null.
    fn from_i64(v: i64) -> Self;
    /// Rounds half away from zero for integer targets; NaN becomes null.
    fn from_f64(v: f64) -> Self;

    fn to_i64(self) -> Option<i64> {
        if self.is_null() {
            None
        } else {
            Some(self.as_i64())
        }
    }

    fn to_f64(self) -> Option<f64> {
        if self.is_null() {
            None
        } else {
            Some(self.as_f64())
        }
    }

    fn convert<U: Primitive>(self) -> U {
        if self.is_null() {
            U::NULL
        } else if Self::IS_FLOAT {
            U::from_f64(self.as_f64())
        } else {
            U::from_i64(self.as_i64())
        }
    }

    fn write_le(self, out: &mut [u8]);
    fn read_le(buf: &[u8]) -> Self;
    fn write_be(self, out: &mut [u8]);
    fn read_be(buf: &[u8]) -> Self;

    /// Bucket for hash partitioning, -1 for null. Floating types cannot be
    /// hash-partitioned and return `None`.
    fn hash_bucket(self, buckets: i32) -> Option<i32>;

    fn neg(self) -> Self;
}

macro_rules! int_primitive {
    ($t:ty, $u:ty, $width:expr) => {
        impl Primitive for $t {
            const NULL: Self = <$t>::MIN;
            const WIDTH: usize = $width;
            const IS_FLOAT: bool = false;

            fn as_i64(self) -> i64 {
                self as i64
            }
            fn as_f64(self) -> f64 {
                self as f64
            }
            fn from_i64(v: i64) -> Self {
                if v > <$t>::MIN as i64 && v <= <$t>::MAX as i64 {
                    v as $t
                } else {
                    Self::NULL
                }
            }
            fn from_f64(v: f64) -> Self {
                let r = v.round();
                if r.is_nan() || r <= <$t>::MIN as f64 || r > <$t>::MAX as f64 {
                    Self::NULL
                } else {
                    r as $t
                }
            }
            fn write_le(self, out: &mut [u8]) {
                out[..$width].copy_from_slice(&self.to_le_bytes());
            }
            fn read_le(buf: &[u8]) -> Self {
                let mut b = [0u8; $width];
                b.copy_from_slice(&buf[..$width]);
                <$t>::from_le_bytes(b)
            }
            fn write_be(self, out: &mut [u8]) {
                out[..$width].copy_from_slice(&self.to_be_bytes());
            }
            fn read_be(buf: &[u8]) -> Self {
                let mut b = [0u8; $width];
                b.copy_from_slice(&buf[..$width]);
                <$t>::from_be_bytes(b)
            }
            fn hash_bucket(self, buckets: i32) -> Option<i32> {
                if self.is_null() {
                    Some(-1)
                } else {
                    Some(((self as $u) as u64 % buckets as u64) as i32)
                }
            }
            fn neg(self) -> Self {
                if self.is_null() {
                    self
                } else {
                    -self
                }
            }
        }
    };
}

macro_rules! float_primitive {
    ($t:ty, $null:expr, $width:expr) => {
        impl Primitive for $t {
            const NULL: Self = $null;
            const WIDTH: usize = $width;
            const IS_FLOAT: bool = true;

            fn as_i64(self) -> i64 {
                i64::from_f64(self as f64)
            }
            fn as_f64(self) -> f64 {
                self as f64
            }
            fn from_i64(v: i64) -> Self {
                if v == LONG_NULL {
                    Self::NULL
                } else {
                    v as $t
                }
            }
            fn from_f64(v: f64) -> Self {
                if v.is_nan() {
                    Self::NULL
                } else {
                    v as $t
                }
            }
            fn write_le(self, out: &mut [u8]) {
                out[..$width].copy_from_slice(&self.to_le_bytes());
            }
            fn read_le(buf: &[u8]) -> Self {
                let mut b = [0u8; $width];
                b.copy_from_slice(&buf[..$width]);
                <$t>::from_le_bytes(b)
            }
            fn write_be(self, out: &mut [u8]) {
                out[..$width].copy_from_slice(&self.to_be_bytes());
            }
            fn read_be(buf: &[u8]) -> Self {
                let mut b = [0u8; $width];
                b.copy_from_slice(&buf[..$width]);
                <$t>::from_be_bytes(b)
            }
            fn hash_bucket(self, _buckets: i32) -> Option<i32> {
                None
            }
            fn neg(self) -> Self {
                if self.is_null() {
                    self
                } else {
                    -self
                }
            }
        }
    };
}

int_primitive!(i8, u8, 1);
int_primitive!(i16, u16, 2);
int_primitive!(i32, u32, 4);
int_primitive!(i64, u64, 8);
float_primitive!(f32, FLOAT_NULL, 4);
float_primitive!(f64, DOUBLE_NULL, 8);
