use crate::{CompressMethod, UpsertOptions, WriteMode, WriterConfig};
use dolphin_base::ErrorKind;
use test_log::test;

fn names() -> Vec<String> {
    vec!["id".to_string(), "price".to_string()]
}

#[test]
fn test_insert_function_text() {
    let mem = WriterConfig::new("h", 1, "", "trades");
    assert_eq!(mem.table_expr(), "trades");
    assert_eq!(mem.insert_function(), "tableInsert{trades}");

    let upsert = WriterConfig::new("h", 1, "dfs://db", "pt").with_mode(WriteMode::Upsert(UpsertOptions {
        ignore_null: true,
        key_col_names: vec!["id".into(), "date".into()],
        sort_columns: vec!["price".into()],
    }));
    assert_eq!(
        upsert.insert_function(),
        "upsert!{loadTable(\"dfs://db\",\"pt\"),ignoreNull=true,keyColNames=`id`date,sortColumns=`price}"
    );
    let plain = WriterConfig::new("h", 1, "", "t").with_mode(WriteMode::Upsert(UpsertOptions::default()));
    assert_eq!(plain.insert_function(), "upsert!{t,ignoreNull=false}");
}

#[test]
fn test_validation() {
    let ok = WriterConfig::new("h", 1, "", "trades");
    assert!(ok.validate().is_ok());
    for bad in [
        WriterConfig::new("h", 1, "", ""),
        ok.clone().with_batching(0, 0.01),
        ok.clone().with_batching(1, -1.0),
        ok.clone().with_batching(1, f64::NAN),
        ok.clone().with_threads(0, "id"),
        ok.clone().with_threads(2, ""),
    ] {
        assert!(bad.validate().unwrap_err().is(ErrorKind::InvalidArgument));
    }
}

#[test]
fn test_column_validation() {
    let ok = WriterConfig::new("h", 1, "", "trades").with_threads(2, "PRICE");
    assert!(ok.validate_columns(&names()).is_ok());
    let short = ok.clone().with_compression(vec![CompressMethod::Lz4]);
    assert!(short.validate_columns(&names()).is_err());
    let full = ok.clone().with_compression(vec![CompressMethod::Lz4, CompressMethod::Delta]);
    assert!(full.validate_columns(&names()).is_ok());
    let keys = ok.with_mode(WriteMode::Upsert(UpsertOptions {
        key_col_names: vec!["sym".into()],
        ..UpsertOptions::default()
    }));
    assert!(keys.validate_columns(&names()).unwrap_err().is(ErrorKind::InvalidArgument));
}

#[test]
fn test_settings_survive_msgpack() {
    let config = WriterConfig::new("h", 1, "dfs://db", "pt")
        .with_credentials("admin", "123456")
        .with_batching(500, 0.5)
        .with_threads(4, "id")
        .with_compression(vec![CompressMethod::Delta]);
    let bytes = rmp_serde::to_vec_named(&config).expect("encode");
    let back: WriterConfig = rmp_serde::from_slice(&bytes).expect("decode");
    assert_eq!(back, config);
    assert_eq!(back.throttle().as_millis(), 500);
    assert_eq!(back.connect_options().user, "admin");
}
