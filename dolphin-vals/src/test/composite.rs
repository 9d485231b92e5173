use crate::{
    Constant, DataForm, DataType, Dictionary, Matrix, Scalar, Set, Table, TypeDesc, Vector,
    VectorOps,
};
use dolphin_base::ErrorKind;
use test_log::test;

fn trades() -> Table {
    Table::new(
        vec!["sym".into(), "qty".into()],
        vec![Vector::strings(&["a", "b"]), Vector::ints(&[1, 2])],
    )
    .unwrap()
}

#[test]
fn test_table_shape_checks() {
    let e = Table::new(
        vec!["a".into(), "b".into()],
        vec![Vector::ints(&[1]), Vector::ints(&[1, 2])],
    )
    .unwrap_err();
    assert!(e.is(ErrorKind::InvalidArgument));
    let e = Table::new(
        vec!["a".into(), "A".into()],
        vec![Vector::ints(&[1]), Vector::ints(&[2])],
    )
    .unwrap_err();
    assert!(e.is(ErrorKind::InvalidArgument));
}

#[test]
fn test_table_append_row_rolls_back() {
    let mut t = trades();
    t.append_row(&[Scalar::String("c".into()).into(), Scalar::Int(3).into()])
        .unwrap();
    assert_eq!(t.rows(), 3);
    let bad = [
        Constant::Scalar(Scalar::String("d".into())),
        Constant::Scalar(Scalar::String("oops".into())),
    ];
    assert!(t.append_row(&bad).is_err());
    assert_eq!(t.rows(), 3);
    assert_eq!(t.column(0).unwrap().len(), 3);
    assert_eq!(t.column_by_name("QTY").unwrap().get_string(2), "3");
}

#[test]
fn test_table_slicing() {
    let mut t = trades();
    let other = trades();
    t.append_table(&other).unwrap();
    assert_eq!(t.rows(), 4);
    let sub = t.sub_table(1, 2).unwrap();
    assert_eq!(sub.column(0).unwrap().get_string(0), "b");
    let g = t.gather(&[3, 0]).unwrap();
    assert_eq!(g.column(1).unwrap().get_string(0), "2");
    let empty = t.empty_like(8).unwrap();
    assert_eq!(empty.rows(), 0);
    assert_eq!(empty.schema(), t.schema());
    let row = t.row(1).unwrap();
    assert_eq!(row[0].get_string(), "b");
}

#[test]
fn test_matrix_column_major() {
    let mut m = Matrix::new(Vector::ints(&[1, 2, 3, 4, 5, 6]), 2, 3).unwrap();
    assert_eq!(m.get(1, 0).unwrap(), Scalar::Int(2));
    assert_eq!(m.get(0, 2).unwrap(), Scalar::Int(5));
    m.set(1, 2, &Scalar::Int(9)).unwrap();
    assert!(m.column(2).unwrap().equals(&Vector::ints(&[5, 9])));
    assert!(m.row(0).unwrap().equals(&Vector::ints(&[1, 3, 5])));
    assert!(m.get(2, 0).is_err());
    assert!(Matrix::new(Vector::ints(&[1, 2, 3]), 2, 2).is_err());
    assert!(m.set_row_labels(Some(Vector::strings(&["r0"]))).is_err());
    m.set_col_labels(Some(Vector::strings(&["a", "b", "c"]))).unwrap();
    assert_eq!(Constant::Matrix(m).form(), DataForm::Matrix);
}

#[test]
fn test_set_and_dictionary() {
    let s = Set::from_vector(&Vector::ints(&[3, 1, 3])).unwrap();
    assert_eq!(s.len(), 2);
    assert!(s.contains(&Scalar::Int(1)));
    assert!(!s.contains(&Scalar::Int(2)));

    let mut d = Dictionary::new(TypeDesc::new(DataType::String), TypeDesc::new(DataType::Double)).unwrap();
    d.insert(&Scalar::String("x".into()), &Scalar::Double(1.5).into())
        .unwrap();
    d.insert(&Scalar::String("x".into()), &Scalar::Double(2.5).into())
        .unwrap();
    assert_eq!(d.len(), 1);
    let got = d.get(&Scalar::String("x".into())).unwrap().unwrap();
    assert_eq!(got.as_scalar().unwrap(), &Scalar::Double(2.5));
    assert!(d.get(&Scalar::String("y".into())).unwrap().is_none());
    assert!(d.remove(&Scalar::String("x".into())).unwrap());
    assert!(d.is_empty());
}

#[test]
fn test_constant_forms() {
    let p = Constant::pair(Vector::ints(&[1, 5])).unwrap();
    assert_eq!(p.form(), DataForm::Pair);
    assert_eq!(p.get_string(), "1 : 5");
    assert!(Constant::pair(Vector::ints(&[1])).is_err());
    assert_eq!(Constant::from(trades()).data_type(), DataType::Dictionary);
    assert!(Constant::null().is_null());
    assert_eq!(Constant::from(Vector::ints(&[1, 2])).get_string(), "[1,2]");
}

#[test]
fn test_constants_compare_structurally() {
    let a = Constant::Table(trades());
    assert_eq!(a, Constant::Table(trades()));
    let renamed = Table::new(
        vec!["sym".into(), "size".into()],
        vec![Vector::strings(&["a", "b"]), Vector::ints(&[1, 2])],
    )
    .unwrap();
    assert_ne!(a, Constant::Table(renamed));

    let m = Matrix::new(Vector::ints(&[1, 2, 3, 4]), 2, 2).unwrap();
    let flat = Matrix::new(Vector::ints(&[1, 2, 3, 4]), 1, 4).unwrap();
    assert_eq!(Constant::Matrix(m.clone()), Constant::Matrix(m.clone()));
    assert_ne!(Constant::Matrix(m), Constant::Matrix(flat));

    let v = Constant::Vector(Vector::ints(&[1, 2]));
    assert_ne!(v, Constant::Pair(Vector::ints(&[1, 2])));
    assert_eq!(Constant::Scalar(Scalar::Int(7)), Constant::Scalar(Scalar::Int(7)));
    assert_ne!(v, Constant::Scalar(Scalar::Int(7)));
}
