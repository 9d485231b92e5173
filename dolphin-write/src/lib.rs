// Multi-threaded inserts into a server table. Rows are routed to worker
// threads by the table's partition column, buffered, and flushed in
// batches; a failed flush stops the writer and keeps its rows for
// retrieval.

mod config;
mod export;
mod partition;
mod route;
mod schema;
mod writer;

#[cfg(test)]
mod test;

pub use config::{CompressMethod, UpsertOptions, WriteMode, WriterConfig};
pub use export::UnwrittenRows;
pub use partition::{PartitionDomain, PartitionType};
pub use schema::{Partitioning, TableSchema};
pub use writer::{TableWriter, ThreadStatus, WriterStatus, MAX_BATCH_ROWS};
