use crate::decimal::{format_raw, parse_raw, Decimal128, Decimal32, Decimal64};
use crate::{DataType, Scalar, TypeDesc, Vector, VectorOps};
use dolphin_base::ErrorKind;
use std::cmp::Ordering;
use test_log::test;

#[test]
fn test_parse_rounds_half_up_on_dropped_digit() {
    let d = Decimal64::parse("123.456", 2, false).unwrap();
    assert_eq!(d.raw(), 12346);
    assert_eq!(d.scale(), 2);
    assert_eq!(d.to_string(), "123.46");

    let d = Decimal64::parse("-0.125", 2, false).unwrap();
    assert_eq!(d.raw(), -13);
    assert_eq!(d.to_string(), "-0.13");

    let d = Decimal32::parse("1.2349", 3, false).unwrap();
    assert_eq!(d.raw(), 1235);
}

#[test]
fn test_parse_auto_scale_and_padding() {
    let (raw, scale) = parse_raw("3.1400", -1, true, 18).unwrap().unwrap();
    assert_eq!((raw, scale), (31400, 4));
    let d = Decimal64::parse("7", 3, true).unwrap();
    assert_eq!(d.raw(), 7000);
    assert_eq!(d.to_string(), "7.000");
}

#[test]
fn test_parse_malformed() {
    assert!(Decimal64::parse("", 2, true).unwrap().is_null());
    assert!(Decimal64::parse("abc", 2, true).unwrap().is_null());
    let e = Decimal64::parse("12x", 2, true).unwrap_err();
    assert!(e.is(ErrorKind::Parse));
    let d = Decimal64::parse("12x", 2, false).unwrap();
    assert_eq!(d.raw(), 1200);
}

#[test]
fn test_overflow() {
    let e = Decimal32::new(1_000_000_000, 0).unwrap_err();
    assert!(e.is(ErrorKind::Overflow));
    assert!(Decimal32::new(999_999_999, 0).is_ok());

    let wide = Decimal128::from_i128(10_i128.pow(20), 2).unwrap();
    let e = wide.convert::<i32>().unwrap_err();
    assert!(e.is(ErrorKind::Overflow));

    let e = Decimal32::parse("12345678901", 0, true).unwrap_err();
    assert!(e.is(ErrorKind::Overflow));
}

#[test]
fn test_arithmetic() {
    let a = Decimal64::parse("1.50", 2, true).unwrap();
    let b = Decimal64::parse("0.125", 3, true).unwrap();
    let sum = a.add(&b).unwrap();
    assert_eq!((sum.raw(), sum.scale()), (1625, 3));
    let diff = a.sub(&b).unwrap();
    assert_eq!(diff.to_string(), "1.375");
    let prod = a.mul(&b).unwrap();
    assert_eq!(prod.scale(), 5);
    assert_eq!(prod.to_string(), "0.18750");

    let q = Decimal64::parse("1.00", 2, true)
        .unwrap()
        .div(&Decimal64::parse("3", 0, true).unwrap())
        .unwrap();
    assert_eq!(q.to_string(), "0.33");
    let q = Decimal64::parse("2.00", 2, true)
        .unwrap()
        .div(&Decimal64::parse("3", 0, true).unwrap())
        .unwrap();
    assert_eq!(q.to_string(), "0.67");

    let zero = Decimal64::new(0, 0).unwrap();
    assert!(a.div(&zero).unwrap().is_null());

    let big = Decimal32::new(1, 5).unwrap();
    let e = big.mul(&Decimal32::new(1, 5).unwrap()).unwrap_err();
    assert!(e.is(ErrorKind::Overflow));
}

#[test]
fn test_compare_nulls_first() {
    let n = Decimal64::null(2);
    let v = Decimal64::parse("-5", 2, true).unwrap();
    assert_eq!(n.compare(&v).unwrap(), Ordering::Less);
    assert_eq!(v.compare(&n).unwrap(), Ordering::Greater);
    let w = Decimal64::parse("-5.0", 1, true).unwrap();
    assert_eq!(v.compare(&w).unwrap(), Ordering::Equal);
}

#[test]
fn test_format_raw() {
    assert_eq!(format_raw(-5, 3), "-0.005");
    assert_eq!(format_raw(120, 0), "120");
    assert_eq!(format_raw(0, 2), "0.00");
}

#[test]
fn test_decimal_vector_scale_conversion() {
    let desc = TypeDesc::decimal(DataType::Decimal32, 2).unwrap();
    let mut v = Vector::new(desc, 0, 4).unwrap();
    v.append_strings(&["1.005", "", "-3.1"]).unwrap();
    assert_eq!(v.get_string(0), "1.01");
    assert!(v.is_null_at(1));
    assert_eq!(v.get_string(2), "-3.10");

    let wider = Scalar::Decimal64(Decimal64::parse("2.5", 1, true).unwrap());
    v.append(&wider, 1).unwrap();
    assert_eq!(v.get_string(3), "2.50");

    let huge = Scalar::Decimal128(Decimal128::from_i128(10_i128.pow(30), 0).unwrap());
    let e = v.append(&huge, 1).unwrap_err();
    assert!(e.is(ErrorKind::Overflow));
    assert_eq!(v.len(), 4);
}

#[test]
fn test_decimals_serialize_with_scale() {
    let d = Decimal128::parse("-98765432109876543210.5", 3, false).unwrap();
    let bytes = rmp_serde::to_vec(&d).unwrap();
    let back: Decimal128 = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(back, d);
    assert_eq!(back.scale(), 3);

    let s = Scalar::from(Decimal32::parse("1.5", 1, false).unwrap());
    let bytes = rmp_serde::to_vec(&s).unwrap();
    let back: Scalar = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(back, s);
}
