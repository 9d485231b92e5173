// Partition domains: the server's rule for which partition a value lands
// in. Rows are routed to writer threads by partition so one thread owns
// each partition's inserts.

use dolphin_base::{arg_err, malformed_err, Result};
use dolphin_vals::{Constant, DataType, Scalar, ScalarKey, TypeDesc, Vector, VectorOps};
use rapidhash::RapidHashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartitionType {
    Seq,
    Value,
    Range,
    List,
    Compo,
    Hash,
}

impl PartitionType {
    pub fn from_id(id: i64) -> Result<PartitionType> {
        Ok(match id {
            0 => PartitionType::Seq,
            1 => PartitionType::Value,
            2 => PartitionType::Range,
            3 => PartitionType::List,
            4 => PartitionType::Compo,
            5 => PartitionType::Hash,
            other => return Err(malformed_err(format!("unknown partition type {}", other))),
        })
    }
}

#[derive(Clone, Debug)]
pub enum PartitionDomain {
    /// The column's own hash over `buckets` buckets.
    Hash { buckets: i32 },
    /// Each distinct value (in the domain's type) is its own partition; the
    /// value's hash identifies it.
    Value { desc: TypeDesc },
    /// Partition `i` holds `bounds[i] <= v < bounds[i + 1]`.
    Range { bounds: Vector },
    /// Partition `i` holds the values of list `i`.
    List {
        desc: TypeDesc,
        index: RapidHashMap<ScalarKey, i32>,
    },
}

impl PartitionDomain {
    /// Builds a domain from the `partitionSchema` the server reports for a
    /// single level.
    pub fn from_schema(ty: PartitionType, schema: &Constant) -> Result<PartitionDomain> {
        match ty {
            PartitionType::Hash => {
                let buckets = schema
                    .as_scalar()?
                    .to_i64()
                    .filter(|&n| n > 0 && n <= i32::MAX as i64)
                    .ok_or_else(|| malformed_err("hash partition without a bucket count"))?;
                Ok(PartitionDomain::Hash {
                    buckets: buckets as i32,
                })
            }
            PartitionType::Value => Ok(PartitionDomain::Value {
                desc: schema.as_vector()?.desc(),
            }),
            PartitionType::Range => {
                let bounds = schema.as_vector()?;
                if bounds.len() < 2 {
                    return Err(malformed_err("range partition needs at least two bounds"));
                }
                if !bounds.is_sorted(true, true)? {
                    return Err(malformed_err("range partition bounds are not ascending"));
                }
                Ok(PartitionDomain::Range {
                    bounds: bounds.clone(),
                })
            }
            PartitionType::List => list_domain(schema.as_vector()?),
            PartitionType::Seq | PartitionType::Compo => Err(arg_err(format!(
                "{:?} partitions cannot route rows by value",
                ty
            ))),
        }
    }

    /// Partition of one value; -1 when it belongs to none.
    pub fn partition_of(&self, key: &Scalar) -> Result<i32> {
        if key.is_null() {
            return Ok(-1);
        }
        match self {
            PartitionDomain::Hash { buckets } => key.hash_bucket(*buckets),
            PartitionDomain::Value { desc } => {
                let v = key.cast(*desc)?;
                if v.is_null() {
                    return Ok(-1);
                }
                v.hash_bucket(i32::MAX)
            }
            PartitionDomain::Range { bounds } => {
                let v = key.cast(bounds.desc())?;
                match bounds.asof(&v)? {
                    Some(i) if i + 1 < bounds.len() => Ok(i as i32),
                    _ => Ok(-1),
                }
            }
            PartitionDomain::List { desc, index } => {
                let v = key.cast(*desc)?;
                Ok(index.get(&ScalarKey::from(&v)).copied().unwrap_or(-1))
            }
        }
    }

    /// Pushes the partition of every element of `col`.
    pub fn partitions_of(&self, col: &Vector, out: &mut Vec<i32>) -> Result<()> {
        if let PartitionDomain::Hash { buckets } = self {
            return col.hash_buckets(0, col.len(), *buckets, out);
        }
        out.reserve(col.len());
        for i in 0..col.len() {
            out.push(self.partition_of(&col.get(i)?)?);
        }
        Ok(())
    }
}

fn list_domain(lists: &Vector) -> Result<PartitionDomain> {
    let mut index = RapidHashMap::default();
    let mut desc = None;
    let mut add = |s: Scalar, i: usize, desc: &mut Option<TypeDesc>| {
        desc.get_or_insert(s.type_desc());
        index.insert(ScalarKey::from(&s), i as i32);
    };
    match lists {
        Vector::Any(any) => {
            for (i, c) in any.elems().iter().enumerate() {
                match c {
                    Constant::Scalar(s) => add(s.clone(), i, &mut desc),
                    Constant::Vector(v) => {
                        for j in 0..v.len() {
                            add(v.get(j)?, i, &mut desc);
                        }
                    }
                    other => {
                        return Err(malformed_err(format!(
                            "list partition entry is a {:?}",
                            other.form()
                        )))
                    }
                }
            }
        }
        flat => {
            for i in 0..flat.len() {
                add(flat.get(i)?, i, &mut desc);
            }
        }
    }
    Ok(PartitionDomain::List {
        desc: desc.unwrap_or_else(|| TypeDesc::new(DataType::Void)),
        index,
    })
}
