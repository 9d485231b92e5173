use super::{any_of, schema_info, Level};
use crate::route::Router;
use crate::{PartitionDomain, PartitionType, TableSchema, WriterConfig};
use dolphin_base::{ErrorKind, Result};
use dolphin_vals::{Constant, DataType, Scalar, TypeDesc, Vector};
use test_log::test;

fn int(v: i32) -> Scalar {
    Scalar::Int(v)
}

#[test]
fn test_range_domain() -> Result<()> {
    let bounds = Constant::Vector(Vector::ints(&[0, 10, 20]));
    let d = PartitionDomain::from_schema(PartitionType::Range, &bounds)?;
    assert_eq!(d.partition_of(&int(0))?, 0);
    assert_eq!(d.partition_of(&int(5))?, 0);
    assert_eq!(d.partition_of(&int(15))?, 1);
    assert_eq!(d.partition_of(&int(20))?, -1);
    assert_eq!(d.partition_of(&int(-1))?, -1);
    assert_eq!(d.partition_of(&Scalar::null_of(TypeDesc::new(DataType::Int)))?, -1);
    let mut out = Vec::new();
    d.partitions_of(&Vector::ints(&[5, 15, 25]), &mut out)?;
    assert_eq!(out, vec![0, 1, -1]);
    Ok(())
}

#[test]
fn test_range_bounds_must_ascend() {
    let bounds = Constant::Vector(Vector::ints(&[10, 0]));
    let err = PartitionDomain::from_schema(PartitionType::Range, &bounds).unwrap_err();
    assert!(err.is(ErrorKind::MalformedData));
}

#[test]
fn test_list_domain() -> Result<()> {
    let lists = any_of(vec![
        Constant::Vector(Vector::ints(&[1, 2])),
        Constant::Vector(Vector::ints(&[3])),
    ]);
    let d = PartitionDomain::from_schema(PartitionType::List, &lists)?;
    assert_eq!(d.partition_of(&int(2))?, 0);
    assert_eq!(d.partition_of(&int(3))?, 1);
    assert_eq!(d.partition_of(&Scalar::Long(3))?, 1);
    assert_eq!(d.partition_of(&int(9))?, -1);
    Ok(())
}

#[test]
fn test_value_domain_converts_before_hashing() -> Result<()> {
    let days = Vector::from_scalars(TypeDesc::new(DataType::Date), &[Scalar::Date(1), Scalar::Date(2)])?;
    let d = PartitionDomain::from_schema(PartitionType::Value, &Constant::Vector(days))?;
    let day_one = d.partition_of(&Scalar::Date(1))?;
    assert_eq!(d.partition_of(&Scalar::Timestamp(86_400_000 + 5_000))?, day_one);
    assert_ne!(d.partition_of(&Scalar::Date(2))?, day_one);
    Ok(())
}

#[test]
fn test_hash_domain_and_unroutable_types() -> Result<()> {
    let d = PartitionDomain::from_schema(PartitionType::Hash, &Constant::Scalar(int(4)))?;
    assert_eq!(d.partition_of(&int(9))?, 1);
    for ty in [PartitionType::Seq, PartitionType::Compo] {
        let err = PartitionDomain::from_schema(ty, &Constant::Scalar(int(4))).unwrap_err();
        assert!(err.is(ErrorKind::InvalidArgument));
    }
    assert!(PartitionType::from_id(9).unwrap_err().is(ErrorKind::MalformedData));
    Ok(())
}

#[test]
fn test_composite_schema_picks_level() -> Result<()> {
    let days = Vector::from_scalars(TypeDesc::new(DataType::Date), &[Scalar::Date(1)])?;
    let info = schema_info(
        &[("date", DataType::Date), ("id", DataType::Int), ("price", DataType::Double)],
        vec![
            Level("date", 1, Constant::Vector(days)),
            Level("id", 5, Constant::Scalar(int(4))),
        ],
    );
    let schema = TableSchema::from_info(&info, "ID")?;
    assert_eq!(schema.names, vec!["date", "id", "price"]);
    assert_eq!(schema.descs[2], TypeDesc::new(DataType::Double));
    let p = schema.partition.expect("partitioned");
    assert_eq!(p.column, 1);
    assert!(matches!(p.domain, PartitionDomain::Hash { buckets: 4 }));

    let err = TableSchema::from_info(&info, "price").unwrap_err();
    assert!(err.is(ErrorKind::InvalidArgument));
    assert!(TableSchema::from_info(&info, "")?.partition.is_none());
    Ok(())
}

#[test]
fn test_router_sends_unpartitioned_rows_to_first_worker() -> Result<()> {
    let bounds = Constant::Vector(Vector::ints(&[0, 10, 20]));
    let info = schema_info(
        &[("id", DataType::Int), ("price", DataType::Double)],
        vec![Level("id", 2, bounds)],
    );
    let schema = TableSchema::from_info(&info, "id")?;
    let config = WriterConfig::new("h", 1, "dfs://db", "pt").with_threads(2, "id");
    let router = Router::new(&schema, &config)?;
    let r = |id: i32| vec![Constant::Scalar(int(id)), Constant::Scalar(Scalar::Double(0.0))];
    assert_eq!(router.worker_of(&r(15), 2)?, 1);
    assert_eq!(router.worker_of(&r(99), 2)?, 0);
    assert_eq!(router.workers_of(&Vector::ints(&[3, 12, 40]), 2)?, vec![0, 1, 0]);

    let single = Router::new(&schema, &WriterConfig::new("h", 1, "dfs://db", "pt"))?;
    assert_eq!(single.worker_of(&r(15), 1)?, 0);
    assert_eq!(single.column(), None);
    Ok(())
}
