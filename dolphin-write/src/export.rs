// Unwritten rows as a self-describing msgpack document, so a caller can
// park them and resubmit later. Values travel as text in their column's
// type; array cells are comma separated.

use dolphin_base::{arg_err, Error, Result};
use dolphin_vals::{pack_type_scale, unpack_type_scale, Constant, Scalar, TypeDesc, Vector, VectorOps};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwrittenRows {
    pub table: String,
    pub columns: Vec<String>,
    /// Packed type id and scale per column.
    pub types: Vec<i32>,
    pub rows: Vec<Vec<String>>,
}

fn cell_text(c: &Constant) -> String {
    match c {
        Constant::Vector(v) => (0..v.len()).map(|i| v.get_string(i)).collect::<Vec<_>>().join(","),
        other => other.get_string(),
    }
}

fn parse_cell(desc: TypeDesc, text: &str) -> Result<Constant> {
    if desc.array {
        let elem = TypeDesc { array: false, ..desc };
        let mut v = Vector::new(elem, 0, 0)?;
        if !text.is_empty() {
            let parts: Vec<&str> = text.split(',').collect();
            v.append_strings(&parts)?;
        }
        return Ok(Constant::Vector(v));
    }
    if text.is_empty() {
        return Ok(Constant::Scalar(Scalar::null_of(desc)));
    }
    Ok(Constant::Scalar(Scalar::parse(desc, text)?))
}

impl UnwrittenRows {
    pub fn new(table: &str, names: &[String], descs: &[TypeDesc], rows: &[Vec<Constant>]) -> Result<UnwrittenRows> {
        if names.len() != descs.len() {
            return Err(arg_err("column names and types differ in number"));
        }
        let types = descs
            .iter()
            .map(|d| pack_type_scale(d.type_id(), d.ty.is_decimal().then_some(d.scale)))
            .collect();
        let mut text = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != names.len() {
                return Err(arg_err(format!("row of {} values for {} columns", row.len(), names.len())));
            }
            text.push(row.iter().map(cell_text).collect());
        }
        Ok(UnwrittenRows {
            table: table.to_string(),
            columns: names.to_vec(),
            types,
            rows: text,
        })
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(Error::new)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<UnwrittenRows> {
        rmp_serde::from_slice(bytes).map_err(Error::new)
    }

    pub fn descs(&self) -> Result<Vec<TypeDesc>> {
        self.types
            .iter()
            .map(|&packed| {
                let (id, scale) = unpack_type_scale(packed);
                TypeDesc::from_type_id(id, scale.unwrap_or(0))
            })
            .collect()
    }

    /// The rows as values again, ready for another insert.
    pub fn to_rows(&self) -> Result<Vec<Vec<Constant>>> {
        let descs = self.descs()?;
        self.rows
            .iter()
            .map(|row| row.iter().zip(&descs).map(|(t, d)| parse_cell(*d, t)).collect())
            .collect()
    }
}
