use stowage::Version;
use tests::fixtures::{counter, order, order_key, sample_order};
use tests::{tests, Db};

use pretty_assertions::assert_eq;

fn each_save_increments_version(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut order = sample_order(10, "ACME");
    assert_eq!(order.version().unwrap(), Version::New);

    for expected in 1..=3 {
        ifc.save(&mut order).unwrap();
        assert_eq!(order.version().unwrap(), Version::Existing(expected));
        assert!(!order.is_modified());
    }

    let mut loaded = order_key(10);
    ifc.load(&mut loaded).unwrap();
    assert_eq!(loaded.version().unwrap(), Version::Existing(3));
}

fn stale_copy_conflicts(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut order = sample_order(11, "ACME");
    ifc.save(&mut order).unwrap();

    let mut stale = order.clone();
    order.set("customer", "ACME Corp").unwrap();
    ifc.save(&mut order).unwrap();

    stale.set("customer", "Ace").unwrap();
    let err = ifc.save(&mut stale).unwrap_err();
    assert!(err.is_version_conflict(), "{err}");
    assert_eq!(stale.version().unwrap(), Version::Existing(1));

    let err = ifc.destroy(&stale).unwrap_err();
    assert!(err.is_version_conflict(), "{err}");

    let mut loaded = order_key(11);
    ifc.load(&mut loaded).unwrap();
    assert_eq!(
        loaded.get("customer").and_then(|v| v.as_str()),
        Some("ACME Corp")
    );
}

fn destroy_of_removed_versioned_object_conflicts(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut order = sample_order(12, "ACME");
    ifc.save(&mut order).unwrap();
    let copy = order.clone();

    assert!(ifc.destroy(&order).unwrap());
    let err = ifc.destroy(&copy).unwrap_err();
    assert!(err.is_version_conflict(), "{err}");

    // Without a version constraint a missing row is only reported.
    assert!(!ifc.destroy(&order_key(12)).unwrap());
}

fn duplicate_insert_is_unique_violation(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    ifc.save(&mut sample_order(13, "ACME")).unwrap();

    let err = ifc.save(&mut sample_order(13, "Other")).unwrap_err();
    assert!(err.is_unique_violation(), "{err}");
}

fn unknown_version_updates_existing(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut first = sample_order(14, "ACME");
    ifc.save(&mut first).unwrap();
    ifc.save(&mut first).unwrap();

    let mut blind = sample_order(14, "Blind write");
    blind.set("version", -1).unwrap();
    assert_eq!(blind.version().unwrap(), Version::Unknown);
    ifc.save(&mut blind).unwrap();
    assert_eq!(blind.version().unwrap(), Version::Existing(3));

    let mut loaded = order_key(14);
    ifc.load(&mut loaded).unwrap();
    assert_eq!(loaded.version().unwrap(), Version::Existing(3));
    assert_eq!(
        loaded.get("customer").and_then(|v| v.as_str()),
        Some("Blind write")
    );
}

fn unknown_version_inserts_when_absent(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut order = sample_order(15, "ACME");
    order.set("version", -1).unwrap();
    ifc.save(&mut order).unwrap();
    assert_eq!(order.version().unwrap(), Version::Existing(1));
}

fn unversioned_objects_overwrite(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&counter("", 0)).unwrap();

    ifc.save(&mut counter("visits", 1)).unwrap();
    ifc.save(&mut counter("visits", 7)).unwrap();

    let mut loaded = counter("visits", 0);
    assert!(ifc.load(&mut loaded).unwrap());
    assert_eq!(loaded.get("hits").and_then(|v| v.as_i64()), Some(7));
}

tests!(
    each_save_increments_version,
    stale_copy_conflicts,
    destroy_of_removed_versioned_object_conflicts,
    duplicate_insert_is_unique_violation,
    unknown_version_updates_existing,
    unknown_version_inserts_when_absent,
    unversioned_objects_overwrite,
);
