use crate::vector::{FastVector, RawStore};
use crate::{DataType, Scalar, TypeDesc, Vector, VectorOps, INT_NULL};
use dolphin_base::ErrorKind;
use std::borrow::Cow;
use test_log::test;

#[test]
fn test_new_vector_is_all_null() {
    let v = Vector::new(TypeDesc::new(DataType::Int), 3, 10).unwrap();
    assert_eq!(v.len(), 3);
    assert!(v.capacity() >= 10);
    assert!((0..3).all(|i| v.is_null_at(i)));
    assert!(v.has_null());
    assert_eq!(v.get_string(0), "");
}

#[test]
fn test_capacity_grows_and_never_shrinks() {
    let mut s: RawStore<i64> = RawStore::with_size(0, 10).unwrap();
    assert!(s.capacity() >= 10);
    s.push_n(1, 10).unwrap();
    s.push(2).unwrap();
    assert!(s.capacity() >= 12);
    let cap = s.capacity();
    let ptr = s.as_slice().as_ptr();
    s.reserve(cap).unwrap();
    s.reserve(1).unwrap();
    assert_eq!(s.capacity(), cap);
    assert_eq!(s.as_slice().as_ptr(), ptr);
    s.resize(2).unwrap();
    assert_eq!(s.capacity(), cap);
    s.clear();
    assert_eq!(s.capacity(), cap);
}

#[test]
fn test_null_hint_is_conservative() {
    let mut v = FastVector::<i32>::from_slice(DataType::Int, &[1, INT_NULL, 3]);
    assert!(v.refresh_null());
    v.set(1, &Scalar::Int(2)).unwrap();
    assert!(v.store().contain_null());
    assert!(!v.refresh_null());
    assert!(!v.store().contain_null());
}

#[test]
fn test_remove_positions() {
    let mut v = Vector::ints(&[0, 1, 2, 3, 4, 5]);
    v.remove(&[1, 3, 4]).unwrap();
    assert_eq!(v.get_slice::<i32>(0, 3).unwrap().as_ref(), &[0, 2, 5]);
    let e = v.remove(&[2, 1]).unwrap_err();
    assert!(e.is(ErrorKind::InvalidArgument));
    let e = v.remove(&[7]).unwrap_err();
    assert!(e.is(ErrorKind::InvalidArgument));
    assert_eq!(v.len(), 3);
}

#[test]
fn test_next_prev_reverse() {
    let mut v = Vector::ints(&[1, 2, 3, 4]);
    v.next(1).unwrap();
    assert_eq!(v.get_string(0), "2");
    assert!(v.is_null_at(3));
    v.prev(2).unwrap();
    assert!(v.is_null_at(0) && v.is_null_at(1));
    assert_eq!(v.get_string(2), "2");
    assert_eq!(v.get_string(3), "3");
    v.reverse().unwrap();
    assert_eq!(v.get_string(0), "3");
}

#[test]
fn test_asof_and_find() {
    let v = Vector::ints(&[1, 3, 3, 7]);
    assert!(v.is_sorted(true, false).unwrap());
    assert!(!v.is_sorted(true, true).unwrap());
    assert_eq!(v.asof(&Scalar::Int(0)).unwrap(), None);
    assert_eq!(v.asof(&Scalar::Int(3)).unwrap(), Some(2));
    assert_eq!(v.asof(&Scalar::Int(5)).unwrap(), Some(2));
    assert_eq!(v.asof(&Scalar::Int(100)).unwrap(), Some(3));
    assert_eq!(v.find(&Scalar::Int(7)).unwrap(), Some(3));
    assert_eq!(v.find(&Scalar::Int(8)).unwrap(), None);
}

#[test]
fn test_get_slice_borrows_same_type() {
    let v = Vector::longs(&[10, 20, 30]);
    match v.get_slice::<i64>(1, 2).unwrap() {
        Cow::Borrowed(s) => assert_eq!(s, &[20, 30]),
        Cow::Owned(_) => panic!("expected a borrowed slice"),
    }
    let as_f64 = v.get_slice::<f64>(0, 3).unwrap();
    assert_eq!(as_f64.as_ref(), &[10.0, 20.0, 30.0]);
    assert!(v.get_slice::<i64>(2, 5).is_err());
}

#[test]
fn test_width_conversions_map_nulls() {
    let mut v = Vector::new(TypeDesc::new(DataType::Short), 0, 0).unwrap();
    v.append_slice(&[1i64, i64::MIN, 7]).unwrap();
    assert_eq!(v.len(), 3);
    assert!(v.is_null_at(1));
    let mut buf = [0i32; 3];
    let got = v.get_const(0, &mut buf).unwrap();
    assert_eq!(got, &[1, INT_NULL, 7]);
}

#[test]
fn test_append_strings_is_atomic() {
    let mut v = Vector::new(TypeDesc::new(DataType::Int), 0, 0).unwrap();
    v.append_strings(&["1", "2"]).unwrap();
    let e = v.append_strings(&["3", "x", "4"]).unwrap_err();
    assert!(e.is(ErrorKind::Parse));
    assert_eq!(v.len(), 2);

    let mut u = Vector::new(TypeDesc::new(DataType::Uuid), 0, 0).unwrap();
    let e = u
        .append_strings(&["5d212a78-cc48-e3b1-4235-b4d91473ee87", "not-a-uuid"])
        .unwrap_err();
    assert!(e.is(ErrorKind::Parse));
    assert!(u.is_empty());
}

#[test]
fn test_fixed_formats() {
    let v = Vector::from_strings(
        TypeDesc::new(DataType::IpAddr),
        &["192.168.1.1", "", "2001:db8::1"],
    )
    .unwrap();
    assert_eq!(v.get_string(0), "192.168.1.1");
    assert!(v.is_null_at(1));
    assert_eq!(v.get_string(2), "2001:db8::1");

    let u = Vector::from_strings(
        TypeDesc::new(DataType::Uuid),
        &["5d212a78-cc48-e3b1-4235-b4d91473ee87"],
    )
    .unwrap();
    assert_eq!(u.get_string(0), "5d212a78-cc48-e3b1-4235-b4d91473ee87");
}

#[test]
fn test_set_indexed() {
    let mut v = Vector::ints(&[0; 5]);
    v.set_indexed(&Vector::longs(&[4, 0]), &Vector::ints(&[9, 8]))
        .unwrap();
    assert_eq!(v.get_slice::<i32>(0, 5).unwrap().as_ref(), &[8, 0, 0, 0, 9]);
    assert!(v
        .set_indexed(&Vector::ints(&[1]), &Vector::ints(&[1, 2]))
        .is_err());
}

#[test]
fn test_hash_buckets() {
    let v = Vector::ints(&[7, -1, INT_NULL]);
    let mut out = Vec::new();
    v.hash_buckets(0, 3, 5, &mut out).unwrap();
    assert_eq!(out[0], 2);
    assert_eq!(out[1], (u32::MAX % 5) as i32);
    assert_eq!(out[2], -1);
    let d = Vector::doubles(&[1.0]);
    assert!(d.hash_buckets(0, 1, 5, &mut out).is_err());

    let s = Vector::strings(&["abc", "abc", ""]);
    let mut sb = Vec::new();
    s.hash_buckets(0, 3, 16, &mut sb).unwrap();
    assert_eq!(sb[0], sb[1]);
    assert!((0..16).contains(&sb[0]));
    assert_eq!(sb[2], -1);
}

#[test]
fn test_neg_rejects_temporal() {
    let mut v = Vector::ints(&[1, INT_NULL, -3]);
    v.neg().unwrap();
    assert_eq!(v.get_string(0), "-1");
    assert!(v.is_null_at(1));
    assert_eq!(v.get_string(2), "3");
    let mut d = Vector::new(TypeDesc::new(DataType::Date), 1, 1).unwrap();
    assert!(d.neg().unwrap_err().is(ErrorKind::TypeIncompatible));
}

#[test]
fn test_append_vector_converts() {
    let mut v = Vector::longs(&[1]);
    v.append_vector(&Vector::ints(&[2, INT_NULL])).unwrap();
    assert_eq!(v.len(), 3);
    assert_eq!(v.get(1).unwrap(), Scalar::Long(2));
    assert!(v.is_null_at(2));
    assert!(v.equals(&Vector::longs(&[1, 2, i64::MIN])));
}
