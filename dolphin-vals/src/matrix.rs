use crate::scalar::Scalar;
use crate::types::TypeDesc;
use crate::vector::{Vector, VectorOps};
use dolphin_base::{arg_err, Result};

/// A 2-D block over one flat vector in column-major order, with optional
/// row and column label vectors.
#[derive(Clone, Debug)]
pub struct Matrix {
    data: Vector,
    rows: usize,
    cols: usize,
    row_labels: Option<Vector>,
    col_labels: Option<Vector>,
}

impl Matrix {
    pub fn new(data: Vector, rows: usize, cols: usize) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(arg_err(format!(
                "{} elements cannot form a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        if data.desc().array {
            return Err(arg_err("matrix cells cannot be arrays"));
        }
        Ok(Matrix {
            data,
            rows,
            cols,
            row_labels: None,
            col_labels: None,
        })
    }

    /// A matrix of nulls.
    pub fn with_shape(desc: TypeDesc, rows: usize, cols: usize) -> Result<Self> {
        let n = rows
            .checked_mul(cols)
            .ok_or_else(|| arg_err(format!("{}x{} matrix too large", rows, cols)))?;
        Matrix::new(Vector::new(desc, n, n)?, rows, cols)
    }

    /// Builds from equal-length columns.
    pub fn from_columns(columns: &[Vector]) -> Result<Self> {
        let first = columns
            .first()
            .ok_or_else(|| arg_err("a matrix needs at least one column"))?;
        let rows = first.len();
        let mut data = first.empty_like(rows * columns.len())?;
        for c in columns {
            if c.len() != rows {
                return Err(arg_err(format!("column of {} rows in a matrix of {}", c.len(), rows)));
            }
            data.append_vector(c)?;
        }
        Matrix::new(data, rows, columns.len())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn desc(&self) -> TypeDesc {
        self.data.desc()
    }

    pub fn data(&self) -> &Vector {
        &self.data
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(arg_err(format!(
                "cell ({}, {}) outside {}x{} matrix",
                row, col, self.rows, self.cols
            )));
        }
        Ok(col * self.rows + row)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Scalar> {
        self.data.get(self.offset(row, col)?)
    }

    pub fn get_string(&self, row: usize, col: usize) -> String {
        match self.offset(row, col) {
            Ok(i) => self.data.get_string(i),
            Err(_) => String::new(),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: &Scalar) -> Result<()> {
        let i = self.offset(row, col)?;
        self.data.set(i, value)
    }

    pub fn column(&self, col: usize) -> Result<Vector> {
        if col >= self.cols {
            return Err(arg_err(format!("column {} outside {} columns", col, self.cols)));
        }
        self.data.sub_vector(col * self.rows, self.rows)
    }

    pub fn row(&self, row: usize) -> Result<Vector> {
        let indices = (0..self.cols).map(|c| self.offset(row, c)).collect::<Result<Vec<_>>>()?;
        self.data.gather(&indices)
    }

    pub fn row_labels(&self) -> Option<&Vector> {
        self.row_labels.as_ref()
    }

    pub fn col_labels(&self) -> Option<&Vector> {
        self.col_labels.as_ref()
    }

    pub fn set_row_labels(&mut self, labels: Option<Vector>) -> Result<()> {
        if let Some(l) = &labels {
            if l.len() != self.rows {
                return Err(arg_err(format!("{} row labels for {} rows", l.len(), self.rows)));
            }
        }
        self.row_labels = labels;
        Ok(())
    }

    pub fn set_col_labels(&mut self, labels: Option<Vector>) -> Result<()> {
        if let Some(l) = &labels {
            if l.len() != self.cols {
                return Err(arg_err(format!("{} column labels for {} columns", l.len(), self.cols)));
            }
        }
        self.col_labels = labels;
        Ok(())
    }

    pub fn allocated_memory(&self) -> usize {
        self.data.allocated_memory()
            + self.row_labels.as_ref().map_or(0, |l| l.allocated_memory())
            + self.col_labels.as_ref().map_or(0, |l| l.allocated_memory())
    }
}
