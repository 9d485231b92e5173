use crate::key::ScalarKey;
use crate::scalar::Scalar;
use crate::types::TypeDesc;
use crate::vector::{Vector, VectorOps};
use dolphin_base::{type_err, Result};
use rapidhash::RapidHashMap;

/// Distinct scalars of one type, kept in insertion order.
#[derive(Clone, Debug)]
pub struct Set {
    values: Vector,
    index: RapidHashMap<ScalarKey, usize>,
}

impl Set {
    pub fn new(desc: TypeDesc) -> Result<Self> {
        if desc.array {
            return Err(type_err("set elements cannot be arrays"));
        }
        Ok(Set {
            values: Vector::new(desc, 0, 0)?,
            index: RapidHashMap::default(),
        })
    }

    /// Builds a set from a vector, dropping repeats.
    pub fn from_vector(values: &Vector) -> Result<Self> {
        let mut set = Set {
            values: values.empty_like(values.len())?,
            index: RapidHashMap::default(),
        };
        for i in 0..values.len() {
            set.insert(&values.get(i)?)?;
        }
        Ok(set)
    }

    pub fn desc(&self) -> TypeDesc {
        self.values.desc()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns false when the value was already present.
    pub fn insert(&mut self, value: &Scalar) -> Result<bool> {
        let key = ScalarKey::from(value);
        if self.index.contains_key(&key) {
            return Ok(false);
        }
        self.values.append(value, 1)?;
        self.index.insert(key, self.values.len() - 1);
        Ok(true)
    }

    pub fn contains(&self, value: &Scalar) -> bool {
        self.index.contains_key(&ScalarKey::from(value))
    }

    pub fn remove(&mut self, value: &Scalar) -> Result<bool> {
        let key = ScalarKey::from(value);
        let Some(pos) = self.index.remove(&key) else {
            return Ok(false);
        };
        self.values.remove(&[pos])?;
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Ok(true)
    }

    pub fn values(&self) -> &Vector {
        &self.values
    }

    pub fn allocated_memory(&self) -> usize {
        self.values.allocated_memory() + self.index.capacity() * std::mem::size_of::<(ScalarKey, usize)>()
    }
}
