// Typed values exchanged with the server: scalars, vectors and the
// composite forms built from them.

mod constant;
pub mod decimal;
mod dict;
pub mod fixed;
mod key;
mod matrix;
mod prim;
mod scalar;
mod set;
mod symbol;
mod table;
pub mod temporal;
mod types;
pub mod vector;


pub use constant::Constant;
pub use decimal::{Decimal, Decimal128, Decimal32, Decimal64, DecimalRaw};
pub use dict::Dictionary;
pub use fixed::{Fixed16, FIXED_NULL};
pub use key::ScalarKey;
pub use matrix::Matrix;
pub use prim::{Primitive, CHAR_NULL, DOUBLE_NULL, FLOAT_NULL, INT_NULL, LONG_NULL, SHORT_NULL};
pub use scalar::Scalar;
pub use set::Set;
pub use symbol::{SymbolBase, MAX_SYMBOLS};
pub use table::Table;
pub use types::{
    pack_type_scale, unpack_type_scale, DataCategory, DataForm, DataType, Storage, TypeDesc,
    ARRAY_TYPE_BASE, SYMBOL_EXTENDED,
};
pub use vector::{ArrayVector, Vector, VectorOps, VectorView};
