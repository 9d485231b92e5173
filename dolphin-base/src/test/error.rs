use crate::{err, overflow_err, Error, ErrorKind, Result};
use test_log::test;

#[test]
fn test_error() {
    let e = err("test error");
    assert_eq!(e.kind(), ErrorKind::Other);
    assert_eq!(e.message(), "test error");
}

#[test]
fn test_kinds_are_distinguishable() {
    let e = overflow_err("decimal too wide");
    assert!(e.is(ErrorKind::Overflow));
    assert!(!e.is(ErrorKind::Parse));
    assert_eq!(e.to_string(), "overflow: decimal too wide");
}

#[test]
fn test_io_classification() {
    let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short frame");
    assert_eq!(Error::from_io(eof).kind(), ErrorKind::MalformedData);
    let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
    assert_eq!(Error::from_io(reset).kind(), ErrorKind::Connection);
}

#[test]
fn test_question_mark_conversion() {
    fn parse(s: &str) -> Result<i32> {
        Ok(s.parse::<i32>()?)
    }
    assert_eq!(parse("12").unwrap(), 12);
    assert_eq!(parse("x").unwrap_err().kind(), ErrorKind::Other);
}
