use super::Trickle;
use crate::{encode, ArrayVectorDecoder, ConstantReader, CountWidth, DataInputStream, DataOutputStream, StreamStatus};
use dolphin_base::{ErrorKind, Result};
use dolphin_vals::{ArrayVector, Constant, Vector, VectorOps};
use test_log::test;

fn rows(data: &[&[i32]]) -> Result<ArrayVector> {
    let mut a = ArrayVector::new(Vector::ints(&[]))?;
    for r in data {
        a.append_row(&Vector::ints(r))?;
    }
    Ok(a)
}

/// The block bytes of `a`, without the object header and dimensions.
fn block_bytes(a: &ArrayVector) -> Result<Vec<u8>> {
    let mut out = DataOutputStream::new(Vec::new());
    crate::write_array_data(&mut out, a)?;
    out.into_inner()
}

#[test]
fn test_count_width_selection() {
    assert_eq!(CountWidth::select(&[]), CountWidth::Byte1);
    assert_eq!(CountWidth::select(&[3, 255]), CountWidth::Byte1);
    assert_eq!(CountWidth::select(&[256]), CountWidth::Byte2);
    assert_eq!(CountWidth::select(&[1, 70000]), CountWidth::Byte4);
    assert!(CountWidth::from_len(3).is_err());
}

#[test]
fn test_uniform_rows_write_one_count() -> Result<()> {
    let a = rows(&[&[1, 2], &[3, 4], &[5, 6]])?;
    let bytes = block_bytes(&a)?;
    // u16 rows, u8 width, u8 uniform, one u8 count, six i32 values
    assert_eq!(bytes.len(), 4 + 1 + 24);
    assert_eq!(&bytes[..5], &[3, 0, 1, 1, 2]);

    let ragged = rows(&[&[1, 2], &[3], &[4, 5, 6]])?;
    let bytes = block_bytes(&ragged)?;
    assert_eq!(&bytes[..7], &[3, 0, 1, 0, 2, 1, 3]);
    Ok(())
}

#[test]
fn test_decoder_resumes_across_blocked_reads() -> Result<()> {
    let a = rows(&[&[1, 2], &[3], &[4, 5, 6], &[], &[7]])?;
    let bytes = block_bytes(&a)?;
    let mut inp = DataInputStream::new(Trickle::new(bytes, 3));
    let mut dec = ArrayVectorDecoder::new(Vector::ints(&[]), 5)?;
    let mut blocked = 0;
    while dec.decode(&mut inp)? == StreamStatus::WouldBlock {
        blocked += 1;
        assert!(blocked < 1000);
    }
    assert!(blocked > 0);
    assert!(dec.is_done());
    let back = dec.finish()?;
    assert_eq!(back.index(), &[2, 3, 6, 6, 7]);
    assert!(back.value().equals(&Vector::ints(&[1, 2, 3, 4, 5, 6, 7])));
    assert_eq!(inp.get_ref().remaining(), 0);
    Ok(())
}

#[test]
fn test_many_rows_span_blocks() -> Result<()> {
    let value = Vector::ints(&(0..70_000).collect::<Vec<i32>>());
    let a = ArrayVector::with_uniform_rows(value, 1)?;
    let bytes = encode(&Constant::Vector(Vector::Array(a.clone())))?;
    let mut inp = DataInputStream::new(&bytes[..]);
    let back = ConstantReader::new().read_vector(&mut inp)?;
    assert_eq!(back.len(), 70_000);
    let back = back.as_array().cloned().expect("array vector");
    assert_eq!(back.index(), a.index());
    Ok(())
}

#[test]
fn test_decoder_rejects_oversized_block() -> Result<()> {
    let bytes = block_bytes(&rows(&[&[1], &[2]])?)?;
    let mut inp = DataInputStream::new(&bytes[..]);
    let mut dec = ArrayVectorDecoder::new(Vector::ints(&[]), 1)?;
    let e = dec.decode(&mut inp).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));

    let dec = ArrayVectorDecoder::new(Vector::ints(&[]), 2)?;
    assert!(dec.finish().is_err());
    Ok(())
}
