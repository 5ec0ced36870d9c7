use stowage::Version;
use tests::fixtures::{contact, order, order_key, sample_order};
use tests::{tests, Db};

use pretty_assertions::assert_eq;

fn save_then_load_round_trips(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut saved = sample_order(1, "ACME");
    ifc.save(&mut saved).unwrap();

    let mut loaded = order_key(1);
    assert!(ifc.load(&mut loaded).unwrap());
    assert_eq!(loaded.to_json(), saved.to_json());
    assert!(!loaded.is_modified());
}

fn load_missing_returns_false(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut missing = order_key(404);
    assert!(!ifc.load(&mut missing).unwrap());
    assert_eq!(missing.get("id").and_then(|v| v.as_i64()), Some(404));
}

fn null_members_round_trip(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut saved = sample_order(2, "Initech");
    saved.expect_object_mut("address").unwrap().set_null(true);
    saved.expect_group_mut("tags").unwrap().set_null(true);
    ifc.save(&mut saved).unwrap();

    let mut loaded = order_key(2);
    assert!(ifc.load(&mut loaded).unwrap());
    assert!(loaded.object("address").unwrap().is_null());
    assert!(loaded.group("tags").unwrap().is_null());
    assert!(loaded.get("note").unwrap().is_null());
}

fn present_objects_without_values_round_trip(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&contact(0)).unwrap();

    let mut saved = contact(1);
    saved.expect_object_mut("address").unwrap().set_null(false);
    let stops = saved.expect_group_mut("stops").unwrap();
    stops.push_object().unwrap();
    stops.push_object().unwrap().set_null(true);
    ifc.save(&mut saved).unwrap();

    let mut loaded = contact(1);
    loaded.expect_object_mut("address").unwrap().set_null(true);
    assert!(ifc.load(&mut loaded).unwrap());

    let address = loaded.object("address").unwrap();
    assert!(!address.is_null());
    assert!(address.get("city").unwrap().is_null());

    let stops = loaded.group("stops").unwrap();
    assert_eq!(stops.len(), 2);
    assert!(!stops.elements()[0].as_object().unwrap().is_null());
    assert!(stops.elements()[1].as_object().unwrap().is_null());
    assert_eq!(loaded.to_json(), saved.to_json());
}

fn save_const_leaves_object_untouched(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let order = sample_order(3, "Globex");
    ifc.save_const(&order).unwrap();
    assert_eq!(order.version().unwrap(), Version::New);
    assert!(order.is_modified());

    let mut loaded = order_key(3);
    assert!(ifc.load(&mut loaded).unwrap());
    assert_eq!(loaded.version().unwrap(), Version::Existing(1));
    assert_eq!(loaded.get("customer").and_then(|v| v.as_str()), Some("Globex"));
}

fn destroy_reports_existence(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut saved = sample_order(4, "Umbrella");
    ifc.save(&mut saved).unwrap();

    assert!(ifc.destroy(&saved).unwrap());
    assert!(!ifc.destroy(&order_key(4)).unwrap());
    assert!(!ifc.load(&mut order_key(4)).unwrap());
}

fn structure_is_idempotent(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();
    ifc.structure(&order()).unwrap();

    let mut saved = sample_order(5, "Hooli");
    ifc.save(&mut saved).unwrap();
    ifc.structure(&order()).unwrap();
    assert!(ifc.load(&mut order_key(5)).unwrap());
}

fn drop_all_removes_everything(db: &Db) {
    let ifc = db.ifc();
    ifc.drop_all(&order()).unwrap();
    ifc.structure(&order()).unwrap();

    let mut saved = sample_order(6, "Stark");
    ifc.save(&mut saved).unwrap();

    ifc.drop_all(&order()).unwrap();
    ifc.drop_all(&order()).unwrap();
    ifc.structure(&order()).unwrap();
    assert!(!ifc.load(&mut order_key(6)).unwrap());
}

tests!(
    save_then_load_round_trips,
    load_missing_returns_false,
    null_members_round_trip,
    present_objects_without_values_round_trip,
    save_const_leaves_object_untouched,
    destroy_reports_existence,
    structure_is_idempotent,
    drop_all_removes_everything,
);
