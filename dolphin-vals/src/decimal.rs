// Fixed-point decimals: a raw integer holding `value * 10^scale`. The raw
// width (i32, i64, i128) bounds the number of digits (9, 18, 38); the raw
// type's minimum is reserved as null.
//
// All arithmetic happens in i128 with checked operations. Results are
// narrowed back into the raw width only after a precision check, so no
// combination of operands can silently wrap.

use crate::types::DataType;
use dolphin_base::{arg_err, overflow_err, parse_err, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;

pub trait DecimalRaw:
    funty::Signed + std::ops::Neg<Output = Self> + Default + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    const NULL: Self;
    const MAX_PRECISION: i32;
    const WIDTH: usize;
    const TYPE: DataType;

    fn to_i128(self) -> i128;
    /// `None` when the value does not fit the raw width or collides with null.
    fn from_i128(v: i128) -> Option<Self>;
    fn write_le(self, out: &mut [u8]);
    fn read_le(buf: &[u8]) -> Self;
    fn write_be(self, out: &mut [u8]);
    fn read_be(buf: &[u8]) -> Self;
}

macro_rules! decimal_raw {
    ($t:ty, $prec:expr, $width:expr, $dt:expr) => {
        impl DecimalRaw for $t {
            const NULL: Self = <$t>::MIN;
            const MAX_PRECISION: i32 = $prec;
            const WIDTH: usize = $width;
            const TYPE: DataType = $dt;

            fn to_i128(self) -> i128 {
                self as i128
            }
            fn from_i128(v: i128) -> Option<Self> {
                match <$t>::try_from(v) {
                    Ok(x) if x != <$t>::MIN => Some(x),
                    _ => None,
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
        }
    };
}

decimal_raw!(i32, 9, 4, DataType::Decimal32);
decimal_raw!(i64, 18, 8, DataType::Decimal64);
decimal_raw!(i128, 38, 16, DataType::Decimal128);

pub fn pow10(n: i32) -> Option<i128> {
    if !(0..=38).contains(&n) {
        return None;
    }
    10_i128.checked_pow(n as u32)
}

/// True when `raw` has at most `precision` digits.
pub fn fits_precision(raw: i128, precision: i32) -> bool {
    match pow10(precision) {
        Some(limit) => raw.checked_abs().map_or(false, |a| a < limit),
        None => true,
    }
}

/// Multiplies by a power of ten, failing on overflow.
pub fn upscale(raw: i128, digits: i32) -> Result<i128> {
    pow10(digits)
        .and_then(|p| raw.checked_mul(p))
        .ok_or_else(|| overflow_err(format!("decimal {} overflows when scaled by 10^{}", raw, digits)))
}

/// Divides by a power of ten, rounding half away from zero.
pub fn downscale(raw: i128, digits: i32) -> i128 {
    match pow10(digits) {
        Some(p) if p > 1 => {
            let q = raw / p;
            let r = (raw % p).abs();
            if r * 2 >= p {
                q + raw.signum()
            } else {
                q
            }
        }
        Some(_) => raw,
        None => 0,
    }
}

/// Moves `raw` from one scale to another.
pub fn rescale_raw(raw: i128, from: i32, to: i32) -> Result<i128> {
    match from.cmp(&to) {
        Ordering::Equal => Ok(raw),
        Ordering::Less => upscale(raw, to - from),
        Ordering::Greater => Ok(downscale(raw, from - to)),
    }
}

pub fn format_raw(raw: i128, scale: i32) -> String {
    let neg = raw < 0;
    let abs = raw.unsigned_abs();
    let mut out = String::new();
    if neg {
        out.push('-');
    }
    if scale <= 0 {
        out.push_str(&abs.to_string());
        return out;
    }
    let p = 10_u128.pow(scale as u32);
    out.push_str(&(abs / p).to_string());
    out.push('.');
    out.push_str(&format!("{:0width$}", abs % p, width = scale as usize));
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Sign,
    BeforeFirstDigit,
    BeforeDecimal,
    AfterDecimal,
    End,
}

/// Parses decimal text into `(raw, scale)`, or `None` for null.
///
/// A negative `scale` takes the scale from the number of fractional digits
/// present. Extra fractional digits round half away from zero. A malformed
/// character before the first digit makes the whole value null; a malformed
/// character after a digit is an error when `strict`, and otherwise ends the
/// number at that point.
pub fn parse_raw(text: &str, scale: i32, strict: bool, precision: i32) -> Result<Option<(i128, i32)>> {
    let auto = scale < 0;
    if scale > precision {
        return Err(arg_err(format!("scale {} exceeds precision {}", scale, precision)));
    }
    let overflow = || overflow_err(format!("decimal '{}' exceeds {} digits", text, precision));
    let mut state = State::Sign;
    let mut negative = false;
    let mut raw: i128 = 0;
    let mut frac_digits = 0;
    let mut round_up = false;
    let mut seen_digit = false;
    for c in text.chars() {
        match state {
            State::Sign => match c {
                ' ' | '\t' => {}
                '-' => {
                    negative = true;
                    state = State::BeforeFirstDigit;
                }
                '+' => state = State::BeforeFirstDigit,
                '0'..='9' => {
                    raw = c as i128 - '0' as i128;
                    seen_digit = true;
                    state = State::BeforeDecimal;
                }
                '.' => state = State::AfterDecimal,
                _ => return Ok(None),
            },
            State::BeforeFirstDigit => match c {
                '0'..='9' => {
                    raw = c as i128 - '0' as i128;
                    seen_digit = true;
                    state = State::BeforeDecimal;
                }
                '.' => state = State::AfterDecimal,
                _ => return Ok(None),
            },
            State::BeforeDecimal => match c {
                '0'..='9' => {
                    raw = raw
                        .checked_mul(10)
                        .and_then(|r| r.checked_add(c as i128 - '0' as i128))
                        .ok_or_else(overflow)?;
                }
                '.' => state = State::AfterDecimal,
                ' ' | '\t' => state = State::End,
                _ if strict => {
                    return Err(parse_err(format!("unexpected '{}' in decimal '{}'", c, text)))
                }
                _ => break,
            },
            State::AfterDecimal => match c {
                '0'..='9' => {
                    seen_digit = true;
                    let d = c as i128 - '0' as i128;
                    if auto || frac_digits < scale {
                        raw = raw.checked_mul(10).and_then(|r| r.checked_add(d)).ok_or_else(overflow)?;
                        frac_digits += 1;
                    } else if frac_digits == scale {
                        round_up = d >= 5;
                        // Only the first dropped digit decides rounding.
                        frac_digits += 1;
                    }
                }
                ' ' | '\t' => state = State::End,
                _ if strict => {
                    return Err(parse_err(format!("unexpected '{}' in decimal '{}'", c, text)))
                }
                _ => break,
            },
            State::End => match c {
                ' ' | '\t' => {}
                _ if strict => {
                    return Err(parse_err(format!("trailing '{}' in decimal '{}'", c, text)))
                }
                _ => break,
            },
        }
    }
    if !seen_digit {
        return Ok(None);
    }
    let scale = if auto { frac_digits } else { scale };
    if frac_digits < scale {
        raw = upscale(raw, scale - frac_digits).map_err(|_| overflow())?;
    }
    if round_up {
        raw = raw.checked_add(1).ok_or_else(overflow)?;
    }
    if negative {
        raw = -raw;
    }
    if scale > precision || !fits_precision(raw, precision) {
        return Err(overflow());
    }
    Ok(Some((raw, scale)))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Decimal<T: DecimalRaw> {
    scale: i32,
    raw: T,
}

pub type Decimal32 = Decimal<i32>;
pub type Decimal64 = Decimal<i64>;
pub type Decimal128 = Decimal<i128>;

fn check_scale<T: DecimalRaw>(scale: i32) -> Result<()> {
    if (0..=T::MAX_PRECISION).contains(&scale) {
        Ok(())
    } else {
        Err(arg_err(format!(
            "scale {} out of range 0..={} for {}",
            scale,
            T::MAX_PRECISION,
            T::TYPE
        )))
    }
}

impl<T: DecimalRaw> Decimal<T> {
    /// Fails with an overflow error when `raw` has more digits than `T` allows.
    pub fn new(raw: T, scale: i32) -> Result<Self> {
        check_scale::<T>(scale)?;
        if raw != T::NULL && !fits_precision(raw.to_i128(), T::MAX_PRECISION) {
            return Err(overflow_err(format!(
                "raw value {:?} exceeds {} digits of {}",
                raw,
                T::MAX_PRECISION,
                T::TYPE
            )));
        }
        Ok(Decimal { scale, raw })
    }

    pub fn null(scale: i32) -> Self {
        Decimal { scale, raw: T::NULL }
    }

    /// Wraps a raw value already validated by the vector that stored it.
    pub(crate) fn from_stored(raw: T, scale: i32) -> Self {
        Decimal { scale, raw }
    }

    /// Narrows an i128 raw value, failing when it exceeds the precision.
    pub fn from_i128(raw: i128, scale: i32) -> Result<Self> {
        check_scale::<T>(scale)?;
        match T::from_i128(raw) {
            Some(r) if fits_precision(raw, T::MAX_PRECISION) => Ok(Decimal { scale, raw: r }),
            _ => Err(overflow_err(format!(
                "{} does not fit {}({})",
                format_raw(raw, scale),
                T::TYPE,
                scale
            ))),
        }
    }

    pub fn parse(text: &str, scale: i32, strict: bool) -> Result<Self> {
        match parse_raw(text, scale, strict, T::MAX_PRECISION)? {
            Some((raw, scale)) => Self::from_i128(raw, scale),
            None => Ok(Self::null(scale.max(0))),
        }
    }

    pub fn from_f64(v: f64, scale: i32) -> Result<Self> {
        check_scale::<T>(scale)?;
        if v.is_nan() || v == crate::prim::DOUBLE_NULL {
            return Ok(Self::null(scale));
        }
        let scaled = (v * 10f64.powi(scale)).round();
        if !scaled.is_finite() || scaled.abs() >= 1e38 {
            return Err(overflow_err(format!("{} does not fit {}({})", v, T::TYPE, scale)));
        }
        Self::from_i128(scaled as i128, scale)
    }

    pub fn from_i64(v: i64, scale: i32) -> Result<Self> {
        if v == crate::prim::LONG_NULL {
            return Ok(Self::null(scale));
        }
        Self::from_i128(upscale(v as i128, scale)?, scale)
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn raw(&self) -> T {
        self.raw
    }

    pub fn is_null(&self) -> bool {
        self.raw == T::NULL
    }

    pub fn to_f64(&self) -> Option<f64> {
        if self.is_null() {
            None
        } else {
            Some(self.raw.to_i128() as f64 / 10f64.powi(self.scale))
        }
    }

    pub fn rescale(&self, scale: i32) -> Result<Self> {
        if self.is_null() {
            check_scale::<T>(scale)?;
            return Ok(Self::null(scale));
        }
        Self::from_i128(rescale_raw(self.raw.to_i128(), self.scale, scale)?, scale)
    }

    /// Changes raw width at the same scale.
    pub fn convert<U: DecimalRaw>(&self) -> Result<Decimal<U>> {
        if self.is_null() {
            check_scale::<U>(self.scale)?;
            return Ok(Decimal::null(self.scale));
        }
        Decimal::<U>::from_i128(self.raw.to_i128(), self.scale)
    }

    fn aligned(&self, other: &Self) -> Result<(i128, i128, i32)> {
        let scale = self.scale.max(other.scale);
        let a = rescale_raw(self.raw.to_i128(), self.scale, scale)?;
        let b = rescale_raw(other.raw.to_i128(), other.scale, scale)?;
        Ok((a, b, scale))
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.is_null() || other.is_null() {
            return Ok(Self::null(self.scale.max(other.scale)));
        }
        let (a, b, scale) = self.aligned(other)?;
        let sum = a
            .checked_add(b)
            .ok_or_else(|| overflow_err(format!("{} + {} overflows", self, other)))?;
        Self::from_i128(sum, scale)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        if self.is_null() || other.is_null() {
            return Ok(Self::null(self.scale.max(other.scale)));
        }
        let (a, b, scale) = self.aligned(other)?;
        let diff = a
            .checked_sub(b)
            .ok_or_else(|| overflow_err(format!("{} - {} overflows", self, other)))?;
        Self::from_i128(diff, scale)
    }

    /// The product carries the sum of the operand scales.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        let scale = self.scale + other.scale;
        if scale > T::MAX_PRECISION {
            return Err(overflow_err(format!(
                "product scale {} exceeds {} for {}",
                scale,
                T::MAX_PRECISION,
                T::TYPE
            )));
        }
        if self.is_null() || other.is_null() {
            return Ok(Self::null(scale));
        }
        let p = self
            .raw
            .to_i128()
            .checked_mul(other.raw.to_i128())
            .ok_or_else(|| overflow_err(format!("{} * {} overflows", self, other)))?;
        Self::from_i128(p, scale)
    }

    /// The quotient keeps the dividend's scale; dividing by zero is null.
    pub fn div(&self, other: &Self) -> Result<Self> {
        if self.is_null() || other.is_null() || other.raw.to_i128() == 0 {
            return Ok(Self::null(self.scale));
        }
        let num = upscale(self.raw.to_i128(), other.scale)?;
        let den = other.raw.to_i128();
        let q = num / den;
        let r = num % den;
        let q = if r.checked_mul(2).map_or(true, |r2| r2.abs() >= den.abs()) {
            q + (num.signum() * den.signum())
        } else {
            q
        };
        Self::from_i128(q, self.scale)
    }

    /// Nulls order before every value.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ok(Ordering::Equal),
            (true, false) => Ok(Ordering::Less),
            (false, true) => Ok(Ordering::Greater),
            (false, false) => {
                let (a, b, _) = self.aligned(other)?;
                Ok(a.cmp(&b))
            }
        }
    }
}

impl<T: DecimalRaw> std::fmt::Display for Decimal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            Ok(())
        } else {
            f.write_str(&format_raw(self.raw.to_i128(), self.scale))
        }
    }
}
