use crate::dict::Dictionary;
use crate::matrix::Matrix;
use crate::scalar::Scalar;
use crate::set::Set;
use crate::table::Table;
use crate::types::{DataCategory, DataForm, DataType, TypeDesc};
use crate::vector::{Vector, VectorOps};
use dolphin_base::{arg_err, type_err, Result};

/// Any value the server can send or receive.
#[derive(Clone, Debug)]
pub enum Constant {
    Scalar(Scalar),
    Vector(Vector),
    /// Always two elements.
    Pair(Vector),
    Matrix(Matrix),
    Set(Set),
    Dictionary(Dictionary),
    Table(Table),
}

impl Constant {
    pub fn null() -> Constant {
        Constant::Scalar(Scalar::Void)
    }

    pub fn pair(v: Vector) -> Result<Constant> {
        if v.len() != 2 {
            return Err(arg_err(format!("a pair needs 2 elements, got {}", v.len())));
        }
        Ok(Constant::Pair(v))
    }

    pub fn form(&self) -> DataForm {
        match self {
            Constant::Scalar(_) => DataForm::Scalar,
            Constant::Vector(_) => DataForm::Vector,
            Constant::Pair(_) => DataForm::Pair,
            Constant::Matrix(_) => DataForm::Matrix,
            Constant::Set(_) => DataForm::Set,
            Constant::Dictionary(_) => DataForm::Dictionary,
            Constant::Table(_) => DataForm::Table,
        }
    }

    /// Element type. Dictionaries report their value type; tables report
    /// `Dictionary`, the way the server tags them on the wire.
    pub fn desc(&self) -> TypeDesc {
        match self {
            Constant::Scalar(s) => s.type_desc(),
            Constant::Vector(v) | Constant::Pair(v) => v.desc(),
            Constant::Matrix(m) => m.desc(),
            Constant::Set(s) => s.desc(),
            Constant::Dictionary(d) => d.value_desc(),
            Constant::Table(_) => TypeDesc::new(DataType::Dictionary),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.desc().ty
    }

    pub fn category(&self) -> DataCategory {
        self.data_type().category()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Constant::Scalar(s) if s.is_null())
    }

    /// Rows for vectors and tables, 1 for scalars.
    pub fn len(&self) -> usize {
        match self {
            Constant::Scalar(_) => 1,
            Constant::Vector(v) | Constant::Pair(v) => v.len(),
            Constant::Matrix(m) => m.rows(),
            Constant::Set(s) => s.len(),
            Constant::Dictionary(d) => d.len(),
            Constant::Table(t) => t.rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_scalar(&self) -> Result<&Scalar> {
        match self {
            Constant::Scalar(s) => Ok(s),
            other => Err(type_err(format!("expected a scalar, got a {:?}", other.form()))),
        }
    }

    pub fn as_vector(&self) -> Result<&Vector> {
        match self {
            Constant::Vector(v) => Ok(v),
            other => Err(type_err(format!("expected a vector, got a {:?}", other.form()))),
        }
    }

    pub fn as_table(&self) -> Result<&Table> {
        match self {
            Constant::Table(t) => Ok(t),
            other => Err(type_err(format!("expected a table, got a {:?}", other.form()))),
        }
    }

    pub fn into_table(self) -> Result<Table> {
        match self {
            Constant::Table(t) => Ok(t),
            other => Err(type_err(format!("expected a table, got a {:?}", other.form()))),
        }
    }

    pub fn get_string(&self) -> String {
        match self {
            Constant::Scalar(s) => s.get_string(),
            Constant::Vector(v) => join(v, "[", "]"),
            Constant::Pair(v) => format!("{} : {}", v.get_string(0), v.get_string(1)),
            Constant::Set(s) => join(s.values(), "set(", ")"),
            Constant::Matrix(m) => (0..m.rows())
                .map(|r| {
                    (0..m.cols())
                        .map(|c| m.get_string(r, c))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Constant::Dictionary(d) => (0..d.len())
                .map(|i| format!("{}->{}", d.keys().get_string(i), d.values().get_string(i)))
                .collect::<Vec<_>>()
                .join("\n"),
            Constant::Table(t) => {
                let mut lines = vec![t.column_names().join(" ")];
                for r in 0..t.rows() {
                    lines.push(
                        t.columns()
                            .iter()
                            .map(|c| c.get_string(r))
                            .collect::<Vec<_>>()
                            .join(" "),
                    );
                }
                lines.join("\n")
            }
        }
    }

    pub fn allocated_memory(&self) -> usize {
        match self {
            Constant::Scalar(Scalar::String(s)) | Constant::Scalar(Scalar::Symbol(s)) => s.capacity(),
            Constant::Scalar(Scalar::Blob(b)) => b.capacity(),
            Constant::Scalar(_) => 0,
            Constant::Vector(v) | Constant::Pair(v) => v.allocated_memory(),
            Constant::Matrix(m) => m.allocated_memory(),
            Constant::Set(s) => s.allocated_memory(),
            Constant::Dictionary(d) => d.allocated_memory(),
            Constant::Table(t) => t.allocated_memory(),
        }
    }
}

fn same_labels(a: Option<&Vector>, b: Option<&Vector>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.equals(b),
        (None, None) => true,
        _ => false,
    }
}

/// Structural equality: same form, type and elements, nulls equal to nulls.
impl PartialEq for Constant {
    fn eq(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::Scalar(a), Constant::Scalar(b)) => a == b,
            (Constant::Vector(a), Constant::Vector(b)) | (Constant::Pair(a), Constant::Pair(b)) => a.equals(b),
            (Constant::Matrix(a), Constant::Matrix(b)) => {
                a.rows() == b.rows()
                    && a.data().equals(b.data())
                    && same_labels(a.row_labels(), b.row_labels())
                    && same_labels(a.col_labels(), b.col_labels())
            }
            (Constant::Set(a), Constant::Set(b)) => a.values().equals(b.values()),
            (Constant::Dictionary(a), Constant::Dictionary(b)) => {
                a.keys().equals(b.keys()) && a.values().equals(b.values())
            }
            (Constant::Table(a), Constant::Table(b)) => {
                a.column_names() == b.column_names()
                    && a.columns().iter().zip(b.columns()).all(|(x, y)| x.equals(y))
            }
            _ => false,
        }
    }
}

fn join(v: &Vector, open: &str, close: &str) -> String {
    let items: Vec<String> = (0..v.len()).map(|i| v.get_string(i)).collect();
    format!("{}{}{}", open, items.join(","), close)
}

impl From<Scalar> for Constant {
    fn from(s: Scalar) -> Self {
        Constant::Scalar(s)
    }
}

impl From<Vector> for Constant {
    fn from(v: Vector) -> Self {
        Constant::Vector(v)
    }
}

impl From<Table> for Constant {
    fn from(t: Table) -> Self {
        Constant::Table(t)
    }
}
