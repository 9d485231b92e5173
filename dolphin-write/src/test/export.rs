use crate::UnwrittenRows;
use dolphin_base::{ErrorKind, Result};
use dolphin_vals::{Constant, DataType, Scalar, TypeDesc, Vector, VectorOps};
use test_log::test;

#[test]
fn test_nulls_decimals_and_arrays_survive() -> Result<()> {
    let names = vec!["amount".to_string(), "tags".to_string(), "note".to_string()];
    let amount = TypeDesc::decimal(DataType::Decimal64, 2)?;
    let tags = TypeDesc::new(DataType::Int).array_of();
    let note = TypeDesc::new(DataType::String);
    let descs = vec![amount, tags, note];
    let rows = vec![
        vec![
            Constant::Scalar(Scalar::parse(amount, "12.34")?),
            Constant::Vector(Vector::ints(&[1, 2, 3])),
            Constant::Scalar(Scalar::String("a b".into())),
        ],
        vec![
            Constant::Scalar(Scalar::null_of(amount)),
            Constant::Vector(Vector::ints(&[])),
            Constant::Scalar(Scalar::String(String::new())),
        ],
    ];
    let parked = UnwrittenRows::new("pt", &names, &descs, &rows)?;
    let back = UnwrittenRows::from_msgpack(&parked.to_msgpack()?)?;
    assert_eq!(back, parked);
    assert_eq!(back.descs()?, descs);

    let restored = back.to_rows()?;
    assert_eq!(restored[0][0].as_scalar()?.get_string(), "12.34");
    let first_tags = restored[0][1].as_vector()?;
    assert_eq!((0..first_tags.len()).map(|i| first_tags.get_string(i)).collect::<Vec<_>>(), ["1", "2", "3"]);
    assert!(restored[1][0].as_scalar()?.is_null());
    assert_eq!(restored[1][1].as_vector()?.len(), 0);
    assert_eq!(restored[0][2].as_scalar()?, &Scalar::String("a b".into()));
    Ok(())
}

#[test]
fn test_row_width_must_match() {
    let names = vec!["id".to_string()];
    let descs = vec![TypeDesc::new(DataType::Int)];
    let rows = vec![vec![Constant::Scalar(Scalar::Int(1)), Constant::Scalar(Scalar::Int(2))]];
    let err = UnwrittenRows::new("t", &names, &descs, &rows).unwrap_err();
    assert!(err.is(ErrorKind::InvalidArgument));
}

#[test]
fn test_garbage_is_rejected() {
    assert!(UnwrittenRows::from_msgpack(&[0xc1, 0x00]).is_err());
}
