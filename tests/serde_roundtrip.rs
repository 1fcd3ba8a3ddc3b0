//! JSON round-trips for the serializable surface types.

use bipersist::betti::SupportPoint;
use bipersist::grade::{Grade, Multigrade};
use bipersist::vineyard::{Bar, Barcode};

#[test]
fn grade_round_trips() {
    let g = Grade::new(7, 3);
    let json = serde_json::to_string(&g).unwrap();
    let back: Grade = serde_json::from_str(&json).unwrap();
    assert_eq!(g, back);
}

#[test]
fn multigrade_round_trips_as_an_antichain() {
    let mut m = Multigrade::singleton(Grade::new(3, 0));
    m.insert(Grade::new(0, 2));
    m.insert(Grade::new(2, 1));
    let json = serde_json::to_string(&m).unwrap();
    let back: Multigrade = serde_json::from_str(&json).unwrap();
    assert_eq!(m, back);
    assert!(back.is_antichain());
}

#[test]
fn support_point_round_trips() {
    let p = SupportPoint {
        x: 4,
        y: 1,
        betti0: 2,
        betti1: 0,
    };
    let json = serde_json::to_string(&p).unwrap();
    let back: SupportPoint = serde_json::from_str(&json).unwrap();
    assert_eq!(p, back);
}

#[test]
fn barcode_round_trips_with_multiplicities() {
    let mut bc = Barcode::new();
    bc.add_bar(0, 3);
    bc.add_bar(0, 3);
    bc.add_bar(1, 2);
    bc.add_essential(0);
    bc.finalize();

    let json = serde_json::to_string(&bc).unwrap();
    let back: Barcode = serde_json::from_str(&json).unwrap();
    assert_eq!(bc, back);
    assert_eq!(back.num_finite(), 3);
}

#[test]
fn bar_serializes_all_fields() {
    let bar = Bar {
        birth: 1,
        death: 5,
        multiplicity: 2,
    };
    let json = serde_json::to_string(&bar).unwrap();
    assert_eq!(json, r#"{"birth":1,"death":5,"multiplicity":2}"#);
}
