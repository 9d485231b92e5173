use crate::config::WriterConfig;
use crate::partition::{PartitionDomain, PartitionType};
use dolphin_base::{arg_err, malformed_err, Result};
use dolphin_net::Session;
use dolphin_vals::{Constant, Dictionary, Scalar, Table, TypeDesc, Vector, VectorOps};
use tracing::debug;

/// The partition level rows are routed by.
#[derive(Clone, Debug)]
pub struct Partitioning {
    /// Position of the partition column in the table.
    pub column: usize,
    pub domain: PartitionDomain,
}

/// Column layout of the target table, as reported by `schema(table)`.
#[derive(Clone, Debug)]
pub struct TableSchema {
    pub names: Vec<String>,
    pub descs: Vec<TypeDesc>,
    pub partition: Option<Partitioning>,
}

fn entry(dict: &Dictionary, key: &str) -> Result<Option<Constant>> {
    dict.get(&Scalar::String(key.to_string()))
}

/// A scalar or a vector, as a list of scalars.
fn listed(c: &Constant) -> Result<Vec<Scalar>> {
    match c {
        Constant::Scalar(s) => Ok(vec![s.clone()]),
        Constant::Vector(v) => (0..v.len()).map(|i| v.get(i)).collect(),
        other => Err(malformed_err(format!("expected a scalar or vector, got a {:?}", other.form()))),
    }
}

impl TableSchema {
    pub fn discover(session: &mut dyn Session, config: &WriterConfig) -> Result<TableSchema> {
        let info = session.run(&format!("schema({})", config.table_expr()))?;
        let schema = TableSchema::from_info(&info, &config.partition_col)?;
        debug!(target: "dolphin", table = %config.table_name, cols = schema.names.len(),
            partitioned = schema.partition.is_some(), "table schema");
        Ok(schema)
    }

    /// Reads the schema dictionary. `partition_col` picks the level of a
    /// composite partition; it may be empty when rows need no routing.
    pub fn from_info(info: &Constant, partition_col: &str) -> Result<TableSchema> {
        let Constant::Dictionary(dict) = info else {
            return Err(malformed_err(format!("schema is a {:?}, not a dictionary", info.form())));
        };
        let defs = entry(dict, "colDefs")?
            .ok_or_else(|| malformed_err("schema without colDefs"))?
            .into_table()?;
        let (names, descs) = column_defs(&defs)?;
        let mut schema = TableSchema {
            names,
            descs,
            partition: None,
        };
        if partition_col.is_empty() {
            return Ok(schema);
        }
        let Some(level_names) = entry(dict, "partitionColumnName")? else {
            return Ok(schema);
        };
        let level_names: Vec<String> = listed(&level_names)?.iter().map(|s| s.get_string()).collect();
        let types = listed(&entry(dict, "partitionType")?.ok_or_else(|| malformed_err("schema without partitionType"))?)?;
        let domains = entry(dict, "partitionSchema")?.ok_or_else(|| malformed_err("schema without partitionSchema"))?;
        let domains = if level_names.len() == 1 {
            vec![domains]
        } else {
            match domains {
                Constant::Vector(Vector::Any(any)) => any.elems().to_vec(),
                other => return Err(malformed_err(format!("composite partition schema is a {:?}", other.form()))),
            }
        };
        if types.len() != level_names.len() || domains.len() != level_names.len() {
            return Err(malformed_err("partition levels disagree in number"));
        }
        let level = level_names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(partition_col))
            .ok_or_else(|| arg_err(format!("{} is not a partitioning column", partition_col)))?;
        let ty = PartitionType::from_id(
            types[level]
                .to_i64()
                .ok_or_else(|| malformed_err("partition type is not an integer"))?,
        )?;
        let column = schema
            .column_index(partition_col)
            .ok_or_else(|| arg_err(format!("no column named {}", partition_col)))?;
        schema.partition = Some(Partitioning {
            column,
            domain: PartitionDomain::from_schema(ty, &domains[level])?,
        });
        Ok(schema)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn empty_table(&self, capacity: usize) -> Result<Table> {
        Table::with_schema(self.names.clone(), &self.descs, capacity)
    }
}

fn column_defs(defs: &Table) -> Result<(Vec<String>, Vec<TypeDesc>)> {
    let names = defs
        .column_by_name("name")
        .ok_or_else(|| malformed_err("colDefs without name"))?;
    let types = defs
        .column_by_name("typeInt")
        .ok_or_else(|| malformed_err("colDefs without typeInt"))?;
    let extra = defs.column_by_name("extra");
    let mut out_names = Vec::with_capacity(defs.rows());
    let mut out_descs = Vec::with_capacity(defs.rows());
    for i in 0..defs.rows() {
        let id = types
            .get(i)?
            .to_i64()
            .ok_or_else(|| malformed_err(format!("column {} has no type", i)))?;
        let scale = match extra {
            Some(e) => e.get(i)?.to_i64().unwrap_or(0),
            None => 0,
        };
        let desc = TypeDesc::from_type_id(id as i32, 0)?;
        let desc = if desc.ty.is_decimal() {
            let d = TypeDesc::decimal(desc.ty, scale as i32)?;
            if desc.array {
                d.array_of()
            } else {
                d
            }
        } else {
            desc
        };
        out_names.push(names.get_string(i));
        out_descs.push(desc);
    }
    Ok((out_names, out_descs))
}
