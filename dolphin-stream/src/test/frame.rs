use crate::{read_frame, write_frame, Frame, FrameDecoder, MessageBody};
use dolphin_base::{ErrorKind, Result};
use dolphin_vals::vector::{AnyCodec, TypedVector};
use dolphin_vals::{Constant, Scalar, Table, Vector};
use dolphin_wire::{ConstantReader, ConstantWriter, DataInputStream, DataOutputStream};
use test_log::test;

fn any_of(cols: Vec<Vector>) -> Constant {
    let elems = cols.into_iter().map(Constant::Vector).collect();
    Constant::Vector(Vector::Any(TypedVector::from_elems(AnyCodec, elems)))
}

fn frame(topics: &[&str], offset: i64, body: Constant) -> Frame {
    Frame {
        sent_time: 1_700_000_000_000,
        offset,
        topics: topics.iter().map(|t| t.to_string()).collect(),
        body,
    }
}

#[test]
fn test_frame_bytes_round_trip() -> Result<()> {
    let f = frame(&["h:1/t/a", "h:1/t/b"], 42, any_of(vec![Vector::ints(&[1, 2])]));
    let mut out = DataOutputStream::new(Vec::new());
    write_frame(&mut out, &mut ConstantWriter::new(), &f)?;
    let bytes = out.into_inner()?;
    assert_eq!(bytes[0], 1);

    let mut inp = DataInputStream::new(&bytes[..]);
    let back = read_frame(&mut inp, &mut ConstantReader::new())?;
    assert_eq!(back.sent_time, f.sent_time);
    assert_eq!(back.offset, 42);
    assert_eq!(back.topics, vec!["h:1/t/a", "h:1/t/b"]);
    assert_eq!(back.body.len(), 1);
    Ok(())
}

#[test]
fn test_schema_frame_names_later_columns() -> Result<()> {
    let mut dec = FrameDecoder::new();
    let schema = Table::new(
        vec!["Sym".to_string(), "Price".to_string()],
        vec![Vector::strings::<&str>(&[]), Vector::doubles(&[])],
    )?;
    let none = dec.split(frame(&["t"], 0, Constant::Table(schema)), false)?;
    assert!(none.is_empty());
    assert_eq!(dec.schema("t").map(|s| s.len()), Some(2));

    let body = any_of(vec![Vector::strings(&["a", "b"]), Vector::doubles(&[1.0, 2.5])]);
    let msgs = dec.split(frame(&["t"], 10, body), false)?;
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].offset, 10);
    assert_eq!(msgs[1].offset, 11);
    assert_eq!(msgs[1].get("PRICE").map(|c| c.as_scalar()).transpose()?, Some(&Scalar::Double(2.5)));
    match msgs[1].get("sym") {
        Some(Constant::Scalar(Scalar::String(s))) => assert_eq!(s, "b"),
        other => panic!("unexpected {:?}", other),
    }
    Ok(())
}

#[test]
fn test_columns_unnamed_without_schema() -> Result<()> {
    let mut dec = FrameDecoder::new();
    let msgs = dec.split(frame(&["t"], 0, any_of(vec![Vector::ints(&[7])])), false)?;
    match &msgs[0].body {
        MessageBody::Row { names, values } => {
            assert_eq!(names, &vec!["col0".to_string()]);
            assert_eq!(values[0].as_scalar()?, &Scalar::Int(7));
        }
        other => panic!("unexpected {:?}", other),
    }
    Ok(())
}

#[test]
fn test_frame_as_table_and_many_topics() -> Result<()> {
    let mut dec = FrameDecoder::new();
    let body = any_of(vec![Vector::ints(&[1, 2, 3])]);
    let msgs = dec.split(frame(&["x", "y"], 5, body), true)?;
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].topic, "x");
    assert_eq!(msgs[1].topic, "y");
    assert_eq!(msgs[0].rows(), 3);
    assert_eq!(msgs[0].last_offset(), 7);
    assert!(msgs[0].table().is_some());
    Ok(())
}

#[test]
fn test_ragged_columns_rejected() {
    let mut dec = FrameDecoder::new();
    let body = any_of(vec![Vector::ints(&[1, 2]), Vector::ints(&[1])]);
    let e = dec.split(frame(&["t"], 0, body), false).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));

    let e = dec
        .split(frame(&["t"], 0, Constant::Scalar(Scalar::Int(1))), false)
        .unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));
}
