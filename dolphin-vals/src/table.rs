use crate::constant::Constant;
use crate::types::TypeDesc;
use crate::vector::{Vector, VectorOps};
use dolphin_base::{arg_err, Result};
use rapidhash::RapidHashMap;
use tracing::debug;

/// Named, equal-length columns. Column lookup by name ignores case.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    names: Vec<String>,
    columns: Vec<Vector>,
    index: RapidHashMap<String, usize>,
}

impl Table {
    pub fn new(names: Vec<String>, columns: Vec<Vector>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(arg_err(format!(
                "{} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        if let Some(first) = columns.first() {
            let rows = first.len();
            if let Some((n, c)) = names.iter().zip(&columns).find(|(_, c)| c.len() != rows) {
                return Err(arg_err(format!(
                    "column {} has {} rows, expected {}",
                    n,
                    c.len(),
                    rows
                )));
            }
        }
        let mut index = RapidHashMap::default();
        for (i, n) in names.iter().enumerate() {
            if n.is_empty() {
                return Err(arg_err(format!("column {} has no name", i)));
            }
            if index.insert(n.to_lowercase(), i).is_some() {
                return Err(arg_err(format!("duplicate column name {}", n)));
            }
        }
        Ok(Table {
            name: String::new(),
            names,
            columns,
            index,
        })
    }

    /// An empty table of the given column types.
    pub fn with_schema(names: Vec<String>, descs: &[TypeDesc], capacity: usize) -> Result<Self> {
        let columns = descs
            .iter()
            .map(|d| Vector::new(*d, 0, capacity))
            .collect::<Result<Vec<_>>>()?;
        Table::new(names, columns)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Vector] {
        &self.columns
    }

    pub fn column(&self, i: usize) -> Option<&Vector> {
        self.columns.get(i)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_lowercase()).copied()
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Vector> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn schema(&self) -> Vec<(String, TypeDesc)> {
        self.names
            .iter()
            .cloned()
            .zip(self.columns.iter().map(|c| c.desc()))
            .collect()
    }

    /// Appends one row. On failure every column is rolled back to its
    /// previous length.
    pub fn append_row(&mut self, row: &[Constant]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(arg_err(format!(
                "row of {} values for a table of {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        for (i, (col, value)) in self.columns.iter_mut().zip(row).enumerate() {
            if let Err(e) = col.append_constant(value) {
                debug!(column = %self.names[i], "rolling back partial row");
                for done in &mut self.columns[..i] {
                    done.remove_tail(1);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Appends every row of `other`, matching columns by position.
    pub fn append_table(&mut self, other: &Table) -> Result<()> {
        if other.cols() != self.cols() {
            return Err(arg_err(format!(
                "cannot append a table of {} columns to one of {}",
                other.cols(),
                self.cols()
            )));
        }
        let before = self.rows();
        for i in 0..self.columns.len() {
            if let Err(e) = self.columns[i].append_vector(&other.columns[i]) {
                for done in &mut self.columns[..i] {
                    let added = done.len() - before;
                    done.remove_tail(added);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn row(&self, i: usize) -> Result<Vec<Constant>> {
        if i >= self.rows() {
            return Err(arg_err(format!("row {} outside table of {} rows", i, self.rows())));
        }
        self.columns.iter().map(|c| c.get_constant(i)).collect()
    }

    pub fn sub_table(&self, start: usize, len: usize) -> Result<Table> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.sub_vector(start, len))
            .collect::<Result<Vec<_>>>()?;
        self.derive(columns)
    }

    /// The rows at `indices`, in that order.
    pub fn gather(&self, indices: &[usize]) -> Result<Table> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.gather(indices))
            .collect::<Result<Vec<_>>>()?;
        self.derive(columns)
    }

    /// Same columns and types, no rows.
    pub fn empty_like(&self, capacity: usize) -> Result<Table> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.empty_like(capacity))
            .collect::<Result<Vec<_>>>()?;
        self.derive(columns)
    }

    fn derive(&self, columns: Vec<Vector>) -> Result<Table> {
        Ok(Table {
            name: self.name.clone(),
            names: self.names.clone(),
            columns,
            index: self.index.clone(),
        })
    }

    pub fn into_columns(self) -> Vec<Vector> {
        self.columns
    }

    pub fn allocated_memory(&self) -> usize {
        self.columns.iter().map(|c| c.allocated_memory()).sum()
    }
}
