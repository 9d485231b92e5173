use super::Trickle;
use crate::{
    read_symbol_base, read_vector_data, write_symbol_base, ConstantReader, ConstantWriter, DataInputStream,
    DataOutputStream, StreamStatus,
};
use dolphin_base::{ErrorKind, Result};
use dolphin_vals::{Constant, SymbolBase, Vector, VectorOps};
use test_log::test;

#[test]
fn test_base_frame_round_trip() -> Result<()> {
    let base = SymbolBase::new(7);
    let ids = ["a", "b", "a"]
        .iter()
        .map(|s| base.find_and_insert(s))
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(ids, vec![1, 2, 1]);

    let mut out = DataOutputStream::new(Vec::new());
    write_symbol_base(&mut out, base.id(), &base)?;
    let bytes = out.into_inner()?;
    let mut inp = DataInputStream::new(&bytes[..]);
    let (id, syms) = read_symbol_base(&mut inp)?;
    assert_eq!(id, 7);
    assert_eq!(syms, vec!["", "a", "b"]);
    let back = SymbolBase::from_symbols(id, syms)?;
    assert_eq!(back.find("a"), Some(1));
    assert_eq!(back.find("b"), Some(2));
    Ok(())
}

#[test]
fn test_shared_base_sent_once() -> Result<()> {
    let base = SymbolBase::new(0);
    let mut first = Vector::new_symbol(base.clone(), 0, 2)?;
    first.append_strings(&["x", "y"])?;
    let mut second = Vector::new_symbol(base.clone(), 0, 1)?;
    second.append_strings(&["y"])?;

    let mut out = DataOutputStream::new(Vec::new());
    let mut w = ConstantWriter::new();
    w.write(&mut out, &Constant::Vector(first.clone()))?;
    let after_first = out.pending().len();
    w.write(&mut out, &Constant::Vector(second.clone()))?;
    // header, rows, cols, base id, size 0, one id
    assert_eq!(out.pending().len() - after_first, 2 + 4 + 4 + 4 + 4 + 4);
    let bytes = out.into_inner()?;

    let mut inp = DataInputStream::new(&bytes[..]);
    let mut r = ConstantReader::new();
    let a = r.read_vector(&mut inp)?;
    let b = r.read_vector(&mut inp)?;
    assert!(a.equals(&first));
    assert!(b.equals(&second));
    assert!(std::sync::Arc::ptr_eq(
        a.symbol_base().expect("symbol vector"),
        b.symbol_base().expect("symbol vector")
    ));
    Ok(())
}

#[test]
fn test_unknown_base_reference() -> Result<()> {
    let mut out = DataOutputStream::new(Vec::new());
    out.write_i32(3);
    out.write_i32(0);
    let bytes = out.into_inner()?;
    let mut inp = DataInputStream::new(&bytes[..]);
    let e = crate::SymbolBaseCache::new().read(&mut inp).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));
    Ok(())
}

#[test]
fn test_symbol_ids_validated_on_read() -> Result<()> {
    let mut out = DataOutputStream::new(Vec::new());
    for id in [1i32, 2, 9] {
        out.write_i32(id);
    }
    let bytes = out.into_inner()?;
    let base = SymbolBase::from_symbols(0, vec!["".into(), "p".into(), "q".into()])?;
    let mut v = Vector::new_symbol(base, 0, 3)?;
    let mut inp = DataInputStream::new(&bytes[..]);
    let e = read_vector_data(&mut inp, &mut v, 0, 3).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));
    assert_eq!(v.len(), 0);
    Ok(())
}

#[test]
fn test_flat_reads_resume() -> Result<()> {
    let mut out = DataOutputStream::new(Vec::new());
    for s in ["one", "two", "three"] {
        out.write_string(s.as_bytes());
    }
    let bytes = out.into_inner()?;
    let mut v = Vector::strings::<&str>(&[]);
    let mut inp = DataInputStream::new(Trickle::new(bytes, 2));
    let mut done = 0;
    let mut calls = 0;
    while done < 3 {
        let got = read_vector_data(&mut inp, &mut v, done, 3 - done)?;
        done += got.count;
        if done < 3 {
            assert_eq!(got.status, StreamStatus::WouldBlock);
        }
        calls += 1;
        assert!(calls < 100);
    }
    assert!(v.equals(&Vector::strings(&["one", "two", "three"])));
    Ok(())
}

#[test]
fn test_grown_base_resent_in_full() -> Result<()> {
    let base = SymbolBase::new(0);
    base.find_and_insert("x")?;
    let mut w = crate::SymbolBaseWriter::new();
    let mut out = DataOutputStream::new(Vec::new());
    w.write(&mut out, &base)?;
    w.write(&mut out, &base)?;
    base.find_and_insert("y")?;
    w.write(&mut out, &base)?;
    w.write(&mut out, &base)?;
    let bytes = out.into_inner()?;

    let mut inp = DataInputStream::new(&bytes[..]);
    let frames = (0..4).map(|_| read_symbol_base(&mut inp)).collect::<Result<Vec<_>>>()?;
    let sizes: Vec<usize> = frames.iter().map(|(_, syms)| syms.len()).collect();
    assert_eq!(sizes, vec![2, 0, 3, 0]);
    assert!(frames.iter().all(|(id, _)| *id == 0));
    assert_eq!(frames[2].1, vec!["", "x", "y"]);
    Ok(())
}
