use stowage::transaction::audit_object;
use stowage::{err, ConnectionKind, IsolationLevel, TransactionState};
use tests::fixtures::{order, order_key, sample_order};
use tests::{tests, Db, CONNECTION};

use pretty_assertions::assert_eq;

fn commit_makes_saves_visible(db: &Db) {
    if !db.supports_transactions() {
        return;
    }
    db.ifc().structure(&order()).unwrap();

    db.registry()
        .execute(|tx| {
            let ifc = tx.db_ifc(CONNECTION)?;
            ifc.save(&mut sample_order(40, "ACME"))?;
            ifc.save(&mut sample_order(41, "ACME"))?;
            Ok(())
        })
        .unwrap();

    assert!(db.ifc().load(&mut order_key(40)).unwrap());
    assert!(db.ifc().load(&mut order_key(41)).unwrap());
}

fn callback_error_rolls_back(db: &Db) {
    if !db.supports_transactions() {
        return;
    }
    db.ifc().structure(&order()).unwrap();

    let err = db
        .registry()
        .execute(|tx| {
            let ifc = tx.db_ifc(CONNECTION)?;
            ifc.save(&mut sample_order(42, "ACME"))?;
            ifc.save(&mut sample_order(43, "ACME"))?;
            Err::<(), _>(err!("changed my mind"))
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "changed my mind");

    assert!(!db.ifc().load(&mut order_key(42)).unwrap());
    assert!(!db.ifc().load(&mut order_key(43)).unwrap());
}

fn failed_save_only_unwinds_itself(db: &Db) {
    // A failed write aborts a MongoDB transaction as a whole.
    if !db.supports_transactions() || db.kind() == ConnectionKind::Document {
        return;
    }
    db.ifc().structure(&order()).unwrap();
    db.ifc().save(&mut sample_order(44, "ACME")).unwrap();

    db.registry()
        .execute(|tx| {
            let ifc = tx.db_ifc(CONNECTION)?;
            ifc.save(&mut sample_order(45, "ACME"))?;

            let duplicate = ifc.save(&mut sample_order(44, "Duplicate"));
            assert!(duplicate.unwrap_err().is_unique_violation());

            ifc.save(&mut sample_order(46, "ACME"))?;
            Ok(())
        })
        .unwrap();

    assert!(db.ifc().load(&mut order_key(45)).unwrap());
    assert!(db.ifc().load(&mut order_key(46)).unwrap());

    let mut kept = order_key(44);
    db.ifc().load(&mut kept).unwrap();
    assert_eq!(kept.get("customer").and_then(|v| v.as_str()), Some("ACME"));
}

fn dropped_transaction_rolls_back(db: &Db) {
    if !db.supports_transactions() {
        return;
    }
    db.ifc().structure(&order()).unwrap();

    {
        let mut tx = db.registry().transaction();
        let ifc = tx.db_ifc(CONNECTION).unwrap();
        ifc.save(&mut sample_order(47, "ACME")).unwrap();
        assert_eq!(tx.state(), TransactionState::Active);
    }

    assert!(!db.ifc().load(&mut order_key(47)).unwrap());
}

fn connection_serves_one_transaction(db: &Db) {
    if !db.supports_transactions() {
        return;
    }
    db.ifc().structure(&order()).unwrap();

    let mut first = db.registry().transaction();
    first.set_isolation(IsolationLevel::Serializable).unwrap();
    let ifc = first.db_ifc(CONNECTION).unwrap();
    assert!(first.set_isolation(IsolationLevel::ReadCommitted).is_err());

    let mut second = db.registry().transaction();
    let err = second.db_ifc(CONNECTION).unwrap_err();
    assert!(err.is_transaction_mismatch(), "{err}");
    second.rollback().unwrap();

    let err = db.ifc().save(&mut sample_order(48, "ACME")).unwrap_err();
    assert!(err.is_transaction_mismatch(), "{err}");

    ifc.save(&mut sample_order(48, "ACME")).unwrap();
    first.commit().unwrap();

    let err = ifc.save(&mut sample_order(49, "ACME")).unwrap_err();
    assert!(err.is_transaction_mismatch(), "{err}");

    assert!(db.ifc().load(&mut order_key(48)).unwrap());
}

fn audit_trail_records_changes(db: &Db) {
    if !db.supports_transactions() {
        return;
    }
    db.ifc().structure(&order()).unwrap();
    db.ifc().save(&mut sample_order(50, "ACME")).unwrap();

    let mut tx = db.registry().transaction();
    tx.set_uid("clerk-7");
    tx.set_comment("month end");
    let ifc = tx.db_ifc(CONNECTION).unwrap();

    let mut changed = order_key(50);
    ifc.load(&mut changed).unwrap();
    changed.set("paid", true).unwrap();
    ifc.save(&mut changed).unwrap();
    assert!(ifc.destroy(&changed).unwrap());
    tx.commit().unwrap();

    let cursor = db.ifc().query(&audit_object().unwrap(), "").unwrap();
    let mut records = vec![];
    let mut cursor = cursor;
    while cursor.valid() {
        let mut record = audit_object().unwrap();
        db.ifc().retrieve(&mut record, &mut cursor).unwrap();
        records.push(record);
        cursor.next().unwrap();
    }
    assert_eq!(records.len(), 2);

    for record in &records {
        assert_eq!(record.get("uid").and_then(|v| v.as_str()), Some("clerk-7"));
        assert_eq!(record.get("comment").and_then(|v| v.as_str()), Some("month end"));
        assert_eq!(record.get("connection").and_then(|v| v.as_str()), Some(CONNECTION));
        assert_eq!(record.get("object_type").and_then(|v| v.as_str()), Some("Order"));
        assert_eq!(record.get("object_key").and_then(|v| v.as_str()), Some("Order(id=50)"));
        assert!(!record.get("before").unwrap().is_null());
    }

    let destroys = records
        .iter()
        .filter(|record| record.get("destroy").and_then(|v| v.as_bool()) == Some(true))
        .collect::<Vec<_>>();
    assert_eq!(destroys.len(), 1);
    assert!(destroys[0].get("after").unwrap().is_null());
}

fn audit_can_be_disabled(db: &Db) {
    if !db.supports_transactions() {
        return;
    }
    db.ifc().structure(&order()).unwrap();
    db.ifc().structure(&audit_object().unwrap()).unwrap();

    let mut tx = db.registry().transaction();
    tx.set_audit(false);
    let ifc = tx.db_ifc(CONNECTION).unwrap();
    ifc.save(&mut sample_order(51, "ACME")).unwrap();
    tx.commit().unwrap();

    let cursor = db
        .ifc()
        .with_count_cursor(true)
        .query(&audit_object().unwrap(), "")
        .unwrap();
    assert_eq!(cursor.count(), 0);
}

tests!(
    commit_makes_saves_visible,
    callback_error_rolls_back,
    failed_save_only_unwinds_itself,
    dropped_transaction_rolls_back,
    connection_serves_one_transaction,
    audit_trail_records_changes,
    audit_can_be_disabled,
);
