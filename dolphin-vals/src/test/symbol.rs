use crate::vector::SymbolVector;
use crate::{DataType, Scalar, SymbolBase, TypeDesc, Vector, VectorOps};
use dolphin_base::ErrorKind;
use std::sync::Arc;
use std::thread;
use test_log::test;

#[test]
fn test_interning_shares_ids() {
    let mut v = Vector::new(TypeDesc::new(DataType::Symbol), 0, 0).unwrap();
    v.append_strings(&["AAPL", "MSFT", "AAPL"]).unwrap();
    let Vector::Symbol(s) = &v else {
        panic!("expected a symbol vector");
    };
    assert_eq!(s.ids().collect::<Vec<_>>(), vec![1, 2, 1]);
    assert_eq!(s.base().len(), 3);
    assert_eq!(v.get(2).unwrap(), Scalar::Symbol("AAPL".into()));
    v.append(&Scalar::Symbol(String::new()), 1).unwrap();
    assert!(v.is_null_at(3));
}

#[test]
fn test_from_symbols_validates() {
    let base = SymbolBase::from_symbols(7, vec!["".into(), "a".into(), "b".into()]).unwrap();
    assert_eq!(base.id(), 7);
    assert_eq!(base.find("b"), Some(2));
    assert_eq!(base.symbol(1).as_deref(), Some("a"));
    assert_eq!(base.symbol(9), None);

    let e = SymbolBase::from_symbols(1, vec!["x".into()]).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));
    let e = SymbolBase::from_symbols(1, vec!["".into(), "a".into(), "a".into()]).unwrap_err();
    assert!(e.is(ErrorKind::MalformedData));
}

#[test]
fn test_shared_base_across_threads() {
    let base = SymbolBase::new(0);
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let base = base.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    base.find_and_insert(&format!("s{}", (i + t) % 50)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(base.len(), 51);
}

#[test]
fn test_push_id_checks_range() {
    let base = SymbolBase::from_symbols(1, vec!["".into(), "x".into()]).unwrap();
    let mut v = SymbolVector::with_base(base);
    v.push_id(1).unwrap();
    assert!(v.push_id(2).unwrap_err().is(ErrorKind::MalformedData));
    assert_eq!(v.get_string(0), "x");
}

#[test]
fn test_append_between_bases() {
    let a = Vector::from_strings(TypeDesc::new(DataType::Symbol), &["x", "y"]).unwrap();
    let mut b = Vector::from_strings(TypeDesc::new(DataType::Symbol), &["y"]).unwrap();
    b.append_vector(&a).unwrap();
    assert_eq!(b.len(), 3);
    let Vector::Symbol(s) = &b else {
        panic!("expected a symbol vector");
    };
    assert_eq!(s.ids().collect::<Vec<_>>(), vec![1, 2, 1]);

    let shared = a.symbol_base().cloned().unwrap();
    let mut c = Vector::new_symbol(shared.clone(), 0, 0).unwrap();
    c.append_vector(&a).unwrap();
    assert!(Arc::ptr_eq(c.symbol_base().unwrap(), &shared));
    assert!(c.equals(&a));
}
