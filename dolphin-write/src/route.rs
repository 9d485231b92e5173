use crate::config::WriterConfig;
use crate::partition::PartitionDomain;
use crate::schema::TableSchema;
use dolphin_base::{arg_err, type_err, Result};
use dolphin_vals::{Constant, Scalar, Vector, VectorOps};

/// Picks the worker for each row. The same value always lands on the same
/// worker for a given table and thread count.
#[derive(Clone, Debug)]
pub(crate) enum Router {
    Single,
    /// The column's own hash, for tables without a usable domain.
    Hash { column: usize },
    Domain { column: usize, domain: PartitionDomain },
}

/// Rows outside every partition go to the first worker.
fn slot(bucket: i32, threads: usize) -> usize {
    if bucket < 0 {
        0
    } else {
        bucket as usize % threads
    }
}

fn key(row: &[Constant], column: usize) -> Result<&Scalar> {
    match row.get(column) {
        Some(Constant::Scalar(s)) => Ok(s),
        Some(other) => Err(type_err(format!("partition value is a {:?}", other.form()))),
        None => Err(arg_err(format!("row has no column {}", column))),
    }
}

impl Router {
    pub(crate) fn new(schema: &TableSchema, config: &WriterConfig) -> Result<Router> {
        if config.thread_count <= 1 {
            return Ok(Router::Single);
        }
        let column = schema
            .column_index(&config.partition_col)
            .ok_or_else(|| arg_err(format!("no column named {}", config.partition_col)))?;
        if schema.descs[column].array {
            return Err(type_err("an array column cannot route rows"));
        }
        Ok(match &schema.partition {
            Some(p) if p.column == column => Router::Domain {
                column,
                domain: p.domain.clone(),
            },
            _ => Router::Hash { column },
        })
    }

    pub(crate) fn column(&self) -> Option<usize> {
        match self {
            Router::Single => None,
            Router::Hash { column } | Router::Domain { column, .. } => Some(*column),
        }
    }

    pub(crate) fn worker_of(&self, row: &[Constant], threads: usize) -> Result<usize> {
        let bucket = match self {
            Router::Single => return Ok(0),
            Router::Hash { column } => key(row, *column)?.hash_bucket(threads as i32)?,
            Router::Domain { column, domain } => domain.partition_of(key(row, *column)?)?,
        };
        Ok(slot(bucket, threads))
    }

    /// Workers for every element of the routing column.
    pub(crate) fn workers_of(&self, col: &Vector, threads: usize) -> Result<Vec<usize>> {
        let mut buckets = Vec::with_capacity(col.len());
        match self {
            Router::Single => return Ok(vec![0; col.len()]),
            Router::Hash { .. } => col.hash_buckets(0, col.len(), threads as i32, &mut buckets)?,
            Router::Domain { domain, .. } => domain.partitions_of(col, &mut buckets)?,
        }
        Ok(buckets.into_iter().map(|b| slot(b, threads)).collect())
    }
}
