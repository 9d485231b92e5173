// Binary form of values as exchanged with the server.
//
// Every object is a 16-bit header (`form << 8 | type`) followed by a body
// that depends on the form. Vector bodies are flat little-endian element
// data; strings end in NUL, blobs carry an i32 length. Array vectors are
// cut into blocks of at most 65535 rows, each carrying its own row counts
// at the narrowest width that fits. Symbol vectors ship their string base
// once per stream and reference it by id afterwards.
//
// Reading is resumable at two levels: flat vector data and array vector
// blocks both stop cleanly when the source would block and pick up again
// on the next call. Writing can be chunked into caller-sized buffers with
// elements split across chunk boundaries.

mod array;
mod chunk;
mod constant;
mod elem;
mod ioutil;
mod symbol;
mod vector;


pub use array::{write_array_data, ArrayVectorDecoder, CountWidth, MAX_BLOCK_ROWS};
pub use chunk::{serialize_chunk, Chunk};
pub use constant::{decode, encode, header, split_header, ConstantReader, ConstantWriter, MAX_TABLE_COLUMNS};
pub use elem::FixedElem;
pub use ioutil::{DataInputStream, DataOutputStream, StreamStatus};
pub use symbol::{read_symbol_base, write_symbol_base, SymbolBaseCache, SymbolBaseWriter};
pub use vector::{read_vector_all, read_vector_data, write_vector_data, ReadOutcome};
