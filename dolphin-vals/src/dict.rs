use crate::constant::Constant;
use crate::key::ScalarKey;
use crate::scalar::Scalar;
use crate::types::TypeDesc;
use crate::vector::{Vector, VectorOps};
use dolphin_base::{arg_err, type_err, Result};
use rapidhash::RapidHashMap;

/// Scalar keys mapped to values, both held as parallel vectors so the
/// dictionary serializes as a key vector and a value vector.
#[derive(Clone, Debug)]
pub struct Dictionary {
    keys: Vector,
    values: Vector,
    index: RapidHashMap<ScalarKey, usize>,
}

impl Dictionary {
    pub fn new(key_desc: TypeDesc, value_desc: TypeDesc) -> Result<Self> {
        if key_desc.array {
            return Err(type_err("dictionary keys cannot be arrays"));
        }
        Ok(Dictionary {
            keys: Vector::new(key_desc, 0, 0)?,
            values: Vector::new(value_desc, 0, 0)?,
            index: RapidHashMap::default(),
        })
    }

    /// Pairs up two equal-length vectors; a repeated key keeps its last value.
    pub fn from_vectors(keys: &Vector, values: &Vector) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(arg_err(format!(
                "{} keys for {} values",
                keys.len(),
                values.len()
            )));
        }
        let mut dict = Dictionary {
            keys: keys.empty_like(keys.len())?,
            values: values.empty_like(values.len())?,
            index: RapidHashMap::default(),
        };
        for i in 0..keys.len() {
            dict.insert(&keys.get(i)?, &values.get_constant(i)?)?;
        }
        Ok(dict)
    }

    pub fn key_desc(&self) -> TypeDesc {
        self.keys.desc()
    }

    pub fn value_desc(&self) -> TypeDesc {
        self.values.desc()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn insert(&mut self, key: &Scalar, value: &Constant) -> Result<()> {
        let k = ScalarKey::from(key);
        if let Some(&pos) = self.index.get(&k) {
            return self.values.set_constant(pos, value);
        }
        self.keys.append(key, 1)?;
        if let Err(e) = self.values.append_constant(value) {
            self.keys.remove_tail(1);
            return Err(e);
        }
        self.index.insert(k, self.keys.len() - 1);
        Ok(())
    }

    pub fn get(&self, key: &Scalar) -> Result<Option<Constant>> {
        match self.index.get(&ScalarKey::from(key)) {
            Some(&pos) => Ok(Some(self.values.get_constant(pos)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &Scalar) -> bool {
        self.index.contains_key(&ScalarKey::from(key))
    }

    pub fn remove(&mut self, key: &Scalar) -> Result<bool> {
        let Some(pos) = self.index.remove(&ScalarKey::from(key)) else {
            return Ok(false);
        };
        self.keys.remove(&[pos])?;
        self.values.remove(&[pos])?;
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Ok(true)
    }

    pub fn keys(&self) -> &Vector {
        &self.keys
    }

    pub fn values(&self) -> &Vector {
        &self.values
    }

    pub fn allocated_memory(&self) -> usize {
        self.keys.allocated_memory() + self.values.allocated_memory()
    }
}
