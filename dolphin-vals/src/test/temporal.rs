use crate::temporal::{civil_from_days, convert, days_from_civil, format, parse};
use crate::{DataType, Scalar, TypeDesc};
use dolphin_base::ErrorKind;
use test_log::test;

#[test]
fn test_civil_days() {
    assert_eq!(days_from_civil(1970, 1, 1), 0);
    assert_eq!(days_from_civil(2000, 3, 1), 11017);
    assert_eq!(civil_from_days(-1), (1969, 12, 31));
    assert_eq!(civil_from_days(19723), (2024, 1, 1));
}

#[test]
fn test_formats() {
    assert_eq!(format(DataType::Date, 19723), "2024.01.01");
    assert_eq!(format(DataType::Month, 2024 * 12 + 1), "2024.02M");
    assert_eq!(format(DataType::Time, 3_723_004), "01:02:03.004");
    assert_eq!(format(DataType::Minute, 61), "01:01m");
    assert_eq!(format(DataType::Second, 59), "00:00:59");
    assert_eq!(format(DataType::DateTime, 86_400 + 3_661), "1970.01.02T01:01:01");
    assert_eq!(format(DataType::DateHour, 25), "1970.01.02T01");
    assert_eq!(format(DataType::Timestamp, -1), "1969.12.31T23:59:59.999");
    assert_eq!(format(DataType::NanoTime, 1), "00:00:00.000000001");
}

#[test]
fn test_parse_variants() {
    assert_eq!(parse(DataType::Date, "2024.01.01").unwrap(), Some(19723));
    assert_eq!(parse(DataType::Date, "2024-01-01").unwrap(), Some(19723));
    assert_eq!(parse(DataType::Date, "2024/01/01").unwrap(), Some(19723));
    assert_eq!(parse(DataType::Month, "2024.02M").unwrap(), Some(2024 * 12 + 1));
    assert_eq!(parse(DataType::Minute, "01:01m").unwrap(), Some(61));
    assert_eq!(
        parse(DataType::Timestamp, "1970.01.02 00:00:00.5").unwrap(),
        Some(86_400_500)
    );
    assert_eq!(
        parse(DataType::NanoTimestamp, "1970.01.01T00:00:00.000000123").unwrap(),
        Some(123)
    );
    assert_eq!(parse(DataType::DateTime, "").unwrap(), None);
}

#[test]
fn test_parse_rejects() {
    assert!(parse(DataType::Date, "2023.02.29").unwrap_err().is(ErrorKind::Parse));
    assert!(parse(DataType::Time, "24:00:00").unwrap_err().is(ErrorKind::Parse));
    assert!(parse(DataType::Month, "2024.13M").unwrap_err().is(ErrorKind::Parse));
}

#[test]
fn test_convert() {
    let ts = parse(DataType::Timestamp, "2024.01.01T12:30:00.250").unwrap().unwrap();
    assert_eq!(convert(DataType::Timestamp, DataType::Date, ts).unwrap(), 19723);
    assert_eq!(
        convert(DataType::Timestamp, DataType::Second, ts).unwrap(),
        12 * 3600 + 30 * 60
    );
    assert_eq!(
        convert(DataType::Timestamp, DataType::Month, ts).unwrap(),
        2024 * 12
    );
    let e = convert(DataType::Time, DataType::Date, 1000).unwrap_err();
    assert!(e.is(ErrorKind::TypeIncompatible));
}

#[test]
fn test_scalar_round_trip_text() {
    let desc = TypeDesc::new(DataType::DateTime);
    let s = Scalar::parse(desc, "2024.01.01T08:00:00").unwrap();
    assert_eq!(s.get_string(), "2024.01.01T08:00:00");
    let d = s.cast(TypeDesc::new(DataType::Date)).unwrap();
    assert_eq!(d, Scalar::Date(19723));
    assert!(Scalar::parse(desc, "").unwrap().is_null());
}
