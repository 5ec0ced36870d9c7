use stowage::{ConnectionInformation, ConnectionKind, Object, Registry, ScalarMeta};
use stowage_sql::Flavor;
use tests::fixtures::{order, order_key, sample_order};

use pretty_assertions::assert_eq;
use std::time::Duration;

fn sqlite_registry() -> Registry {
    tests::init_logging();
    let mut registry = Registry::new();
    registry
        .add_connection("shop", ConnectionInformation::new("sqlite::memory:", "main"))
        .unwrap();
    registry
}

#[test]
fn unknown_connection_is_reported() {
    let registry = sqlite_registry();
    let err = registry.get_db_ifc("warehouse").unwrap_err();
    assert!(err.is_unknown_connection(), "{err}");

    let mut registry = registry;
    let err = registry
        .copy_connection("copy", "warehouse", "other")
        .unwrap_err();
    assert!(err.is_unknown_connection(), "{err}");
}

#[test]
fn unsupported_scheme_is_rejected() {
    let mut registry = Registry::new();
    let err = registry
        .add_connection("x", ConnectionInformation::new("oracle://localhost/db", "db"))
        .unwrap_err();
    assert!(err.is_invalid_connection_url(), "{err}");
}

#[test]
fn aliases_share_the_connection() {
    let mut registry = sqlite_registry();
    registry.copy_connection("archive", "shop", "main").unwrap();

    let shop = registry.get_db_ifc("shop").unwrap();
    let archive = registry.get_db_ifc("archive").unwrap();
    assert_eq!(archive.connection_name(), "archive");
    assert_eq!(archive.database(), "main");
    assert_eq!(
        archive.connection().kind().unwrap(),
        ConnectionKind::Relational(Flavor::Sqlite)
    );

    shop.structure(&order()).unwrap();
    shop.save(&mut sample_order(1, "ACME")).unwrap();
    assert!(archive.load(&mut order_key(1)).unwrap());
}

#[test]
fn interface_builders_return_copies() {
    let registry = sqlite_registry();
    let ifc = registry.get_db_ifc("shop").unwrap();

    let tuned = ifc
        .with_count_cursor(true)
        .with_dirty_read(true)
        .with_query_skip(5)
        .with_query_limit(10)
        .with_timeout(Duration::from_secs(3));

    assert!(tuned.count_cursor());
    assert!(tuned.dirty_read());
    assert_eq!(tuned.query_skip(), 5);
    assert_eq!(tuned.query_limit(), Some(10));
    assert_eq!(tuned.timeout(), Some(Duration::from_secs(3)));

    assert!(!ifc.count_cursor());
    assert!(!ifc.dirty_read());
    assert_eq!(ifc.query_skip(), 0);
    assert_eq!(ifc.query_limit(), None);
    assert_eq!(ifc.timeout(), None);

    assert_eq!(tuned.with_query_limit(0).query_limit(), None);
}

#[test]
fn dirty_read_and_timeout_queries_run() {
    let registry = sqlite_registry();
    let ifc = registry.get_db_ifc("shop").unwrap();
    ifc.structure(&order()).unwrap();
    ifc.save(&mut sample_order(1, "ACME")).unwrap();

    let cursor = ifc
        .with_dirty_read(true)
        .with_timeout(Duration::from_millis(500))
        .query(&order(), "")
        .unwrap();
    assert!(cursor.valid());
}

#[test]
fn failed_audit_write_commits_no_connection() {
    let mut registry = sqlite_registry();
    registry
        .add_connection("ledger", ConnectionInformation::new("sqlite::memory:", "main"))
        .unwrap();

    let shop = registry.get_db_ifc("shop").unwrap();
    let ledger = registry.get_db_ifc("ledger").unwrap();
    shop.structure(&order()).unwrap();
    ledger.structure(&order()).unwrap();

    // Occupies the audit table name on the ledger with an unrelated shape.
    let squatter = Object::builder("Squatter")
        .backend_name(stowage::transaction::AUDIT_TABLE)
        .key("serial", ScalarMeta::i64())
        .build()
        .unwrap();
    ledger.structure(&squatter).unwrap();

    let mut tx = registry.transaction();
    tx.db_ifc("shop")
        .unwrap()
        .save(&mut sample_order(1, "ACME"))
        .unwrap();
    tx.db_ifc("ledger")
        .unwrap()
        .save(&mut sample_order(2, "ACME"))
        .unwrap();
    assert!(tx.commit().is_err());

    assert!(!shop.load(&mut order_key(1)).unwrap());
    assert!(!ledger.load(&mut order_key(2)).unwrap());
}
