use super::{row, scalars, schema_info, wait_until, Level, MockConnector, MockServer};
use crate::{TableWriter, UnwrittenRows, WriterConfig};
use dolphin_base::{ErrorKind, Result};
use dolphin_vals::{Constant, DataType, Scalar, Table, Vector};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use test_log::test;

fn trades() -> Arc<MockServer> {
    MockServer::new(schema_info(&[("id", DataType::Int), ("price", DataType::Double)], vec![]))
}

#[test]
fn test_rows_spread_over_threads_by_hash() -> Result<()> {
    let server = trades();
    let config = WriterConfig::new("localhost", 8848, "", "trades")
        .with_batching(10, 0.01)
        .with_threads(3, "id");
    let writer = TableWriter::new(config, &MockConnector(server.clone()))?;
    assert_eq!(server.connects.load(Ordering::SeqCst), 4);
    for i in 0..100 {
        writer.insert(&row(i % 10, i as f64))?;
    }
    writer.wait_for_thread_completion()?;
    let status = writer.get_status();
    let per_thread: Vec<u64> = status.threads.iter().map(|t| t.sent_rows).collect();
    assert_eq!(per_thread, vec![40, 30, 30]);
    assert_eq!(status.sent_rows, 100);
    assert_eq!(status.unsent_rows, 0);
    assert!(!status.has_error);
    assert!(status.is_exiting);
    assert_eq!(server.inserted_rows(), 100);
    assert!(server.inserts.lock().iter().all(|(f, _)| f == "tableInsert{trades}"));
    Ok(())
}

#[test]
fn test_hash_partitioned_table_routes_by_domain() -> Result<()> {
    let server = MockServer::new(schema_info(
        &[("id", DataType::Int), ("price", DataType::Double)],
        vec![Level("id", 5, Constant::Scalar(Scalar::Int(6)))],
    ));
    let config = WriterConfig::new("localhost", 8848, "dfs://db", "pt")
        .with_batching(100, 0.01)
        .with_threads(3, "ID");
    let writer = TableWriter::new(config, &MockConnector(server.clone()))?;
    let ids: Vec<i32> = (0..100).map(|i| i % 10).collect();
    let prices: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let table = Table::new(
        vec!["id".to_string(), "price".to_string()],
        vec![Vector::ints(&ids), Vector::doubles(&prices)],
    )?;
    writer.insert_table(&table)?;
    writer.wait_for_thread_completion()?;
    let per_thread: Vec<u64> = writer.get_status().threads.iter().map(|t| t.sent_rows).collect();
    assert_eq!(per_thread, vec![40, 30, 30]);
    let inserts = server.inserts.lock();
    assert!(inserts
        .iter()
        .all(|(f, _)| f == "tableInsert{loadTable(\"dfs://db\",\"pt\")}"));
    Ok(())
}

#[test]
fn test_partial_batch_flushes_after_throttle() -> Result<()> {
    let server = trades();
    let config = WriterConfig::new("localhost", 8848, "", "trades").with_batching(1000, 0.02);
    let writer = TableWriter::new(config, &MockConnector(server.clone()))?;
    for i in 0..5 {
        writer.insert(&row(i, 1.0))?;
    }
    assert!(wait_until(|| writer.get_status().sent_rows == 5));
    assert_eq!(server.inserted_rows(), 5);
    assert!(wait_until(|| writer.pooled_rows() > 0));
    assert!(writer.row_buffer().is_empty());
    Ok(())
}

#[test]
fn test_failed_flush_stops_writer_and_keeps_rows() -> Result<()> {
    let server = trades();
    server.fail.store(true, Ordering::SeqCst);
    let config = WriterConfig::new("localhost", 8848, "", "trades").with_batching(3, 1.0);
    let writer = TableWriter::new(config, &MockConnector(server.clone()))?;
    let table = Table::new(
        vec!["id".to_string(), "price".to_string()],
        vec![Vector::ints(&[1, 2, 3]), Vector::doubles(&[0.5, 1.5, 2.5])],
    )?;
    writer.insert_table(&table)?;
    assert!(wait_until(|| writer.get_status().has_error));

    let err = writer.insert(&row(4, 4.0)).unwrap_err();
    assert!(err.is(ErrorKind::FatalWriter));
    assert!(err.message().contains("insert refused"));
    let status = writer.get_status();
    assert_eq!(status.send_failed_rows, 3);
    assert_eq!(status.sent_rows, 0);
    assert!(status.error_info.unwrap_or_default().contains("insert refused"));

    let parked = UnwrittenRows::from_msgpack(&writer.export_unwritten()?)?;
    assert_eq!(parked.table, "trades");
    assert_eq!(parked.columns, vec!["id", "price"]);
    assert_eq!(
        scalars(&parked.to_rows()?),
        scalars(&[row(1, 0.5), row(2, 1.5), row(3, 2.5)])
    );
    assert!(writer.get_unwritten_data().is_empty());
    Ok(())
}

#[test]
fn test_unwritten_rows_in_queue_order() -> Result<()> {
    let server = trades();
    server.fail.store(true, Ordering::SeqCst);
    let config = WriterConfig::new("localhost", 8848, "", "trades").with_batching(2, 0.5);
    let writer = TableWriter::new(config, &MockConnector(server))?;
    writer.insert(&row(1, 1.0))?;
    writer.insert(&row(2, 2.0))?;
    assert!(wait_until(|| writer.get_status().has_error));
    let rows = writer.get_unwritten_data();
    assert_eq!(scalars(&rows), scalars(&[row(1, 1.0), row(2, 2.0)]));
    Ok(())
}

#[test]
fn test_values_convert_to_column_types() -> Result<()> {
    let server = trades();
    let config = WriterConfig::new("localhost", 8848, "", "trades");
    let writer = TableWriter::new(config, &MockConnector(server.clone()))?;
    writer.insert(&[Constant::Scalar(Scalar::Long(7)), Constant::Scalar(Scalar::Int(2))])?;
    writer.wait_for_thread_completion()?;
    let inserts = server.inserts.lock();
    let t = &inserts[0].1;
    assert_eq!(scalars(&[t.row(0)?]), scalars(&[row(7, 2.0)]));
    Ok(())
}

#[test]
fn test_bad_rows_are_refused() -> Result<()> {
    let writer = TableWriter::new(WriterConfig::new("localhost", 8848, "", "trades"), &MockConnector(trades()))?;
    let short = writer.insert(&[Constant::Scalar(Scalar::Int(1))]).unwrap_err();
    assert!(short.is(ErrorKind::InvalidArgument));
    let vector = writer
        .insert(&[Constant::Vector(Vector::ints(&[1])), Constant::Scalar(Scalar::Double(1.0))])
        .unwrap_err();
    assert!(vector.is(ErrorKind::TypeIncompatible));
    let narrow = Table::new(vec!["id".to_string()], vec![Vector::ints(&[1])])?;
    assert!(writer.insert_table(&narrow).unwrap_err().is(ErrorKind::InvalidArgument));
    assert_eq!(writer.get_status().unsent_rows, 0);
    Ok(())
}

#[test]
fn test_completion_is_idempotent() -> Result<()> {
    let server = trades();
    let writer = TableWriter::new(WriterConfig::new("localhost", 8848, "", "trades"), &MockConnector(server.clone()))?;
    writer.insert(&row(1, 1.0))?;
    writer.wait_for_thread_completion()?;
    writer.wait_for_thread_completion()?;
    assert_eq!(server.inserted_rows(), 1);
    assert!(writer.insert(&row(2, 2.0)).unwrap_err().is(ErrorKind::FatalWriter));
    assert!(!writer.get_status().has_error);
    Ok(())
}

#[test]
fn test_construction_checks_columns() {
    let connector = MockConnector(trades());
    let no_col = WriterConfig::new("localhost", 8848, "", "trades").with_threads(2, "");
    assert!(TableWriter::new(no_col, &connector).err().is_some_and(|e| e.is(ErrorKind::InvalidArgument)));
    let unknown = WriterConfig::new("localhost", 8848, "", "trades").with_threads(2, "sym");
    assert!(TableWriter::new(unknown, &connector).err().is_some_and(|e| e.is(ErrorKind::InvalidArgument)));
    assert_eq!(connector.0.connects.load(Ordering::SeqCst), 1);
}
