use crate::protocol::{
    read_request, read_response, write_function, write_response, write_variables, Request, MAX_BODY_LEN, MAX_OBJECTS,
};
use dolphin_base::{ErrorKind, Result};
use dolphin_vals::{Constant, Scalar};
use dolphin_wire::{ConstantReader, ConstantWriter, DataInputStream, DataOutputStream};
use test_log::test;

#[test]
fn test_function_request_framing() -> Result<()> {
    let mut out = DataOutputStream::new(Vec::new());
    let args = [Constant::Scalar(Scalar::Int(5))];
    write_function(&mut out, &mut ConstantWriter::new(), "42", "f", &args)?;
    let bytes = out.into_inner()?;
    assert!(bytes.starts_with(b"API 42 14\nfunction\nf\n1\n1"));

    let mut inp = DataInputStream::new(&bytes[..]);
    let (session, req) = read_request(&mut inp, &mut ConstantReader::new())?;
    assert_eq!(session, "42");
    match req {
        Request::Function { name, args } => {
            assert_eq!(name, "f");
            assert_eq!(args[0].as_scalar()?, &Scalar::Int(5));
        }
        other => panic!("unexpected {}", other.kind()),
    }
    Ok(())
}

#[test]
fn test_variable_count_mismatch() {
    let mut out = DataOutputStream::new(Vec::new());
    let e = write_variables(&mut out, &mut ConstantWriter::new(), "1", &["a".into()], &[]).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));
}

#[test]
fn test_response_error_text() -> Result<()> {
    let mut out = DataOutputStream::new(Vec::new());
    write_response(&mut out, &mut ConstantWriter::new(), "3", Err("bad\nthing"))?;
    let bytes = out.into_inner()?;
    let mut inp = DataInputStream::new(&bytes[..]);
    let e = read_response(&mut inp, &mut ConstantReader::new()).unwrap_err();
    assert!(e.message().contains("bad thing"));

    let mut out = DataOutputStream::new(Vec::new());
    let one = Constant::Scalar(Scalar::Int(5));
    write_response(&mut out, &mut ConstantWriter::new(), "3", Ok(Some(&one)))?;
    let bytes = out.into_inner()?;
    let (session, obj) = read_response(&mut DataInputStream::new(&bytes[..]), &mut ConstantReader::new())?;
    assert_eq!(session, "3");
    assert_eq!(obj.map(|c| c.get_string()), Some("5".to_string()));
    Ok(())
}

#[test]
fn test_oversized_object_count_in_response() {
    let bytes = b"0 18446744073709551615 1\nOK\n";
    let e = read_response(&mut DataInputStream::new(&bytes[..]), &mut ConstantReader::new()).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));

    let bytes = format!("0 {} 1\nOK\n", MAX_OBJECTS + 1);
    let e = read_response(&mut DataInputStream::new(bytes.as_bytes()), &mut ConstantReader::new()).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));
}

#[test]
fn test_oversized_request_lengths() {
    let e = read_request(
        &mut DataInputStream::new(&b"API 0 18446744073709551615\n"[..]),
        &mut ConstantReader::new(),
    )
    .unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));

    let header = format!("API 0 {}\n", MAX_BODY_LEN + 1);
    let e = read_request(&mut DataInputStream::new(header.as_bytes()), &mut ConstantReader::new()).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));

    let body = "function\nf\n18446744073709551615\n1";
    let frame = format!("API 0 {}\n{}", body.len(), body);
    let e = read_request(&mut DataInputStream::new(frame.as_bytes()), &mut ConstantReader::new()).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));
}
