use stowage::CursorState;
use tests::fixtures::{order, sample_order};
use tests::{tests, Db};

use pretty_assertions::assert_eq;

/// Stores five orders: ids 30..=34, alternating customers.
fn seed(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();
    for id in 30..35 {
        let customer = if id % 2 == 0 { "ACME" } else { "Initech" };
        ifc.save(&mut sample_order(id, customer)).unwrap();
    }
}

fn collect_ids(db: &Db, mut cursor: stowage::Cursor) -> Vec<i64> {
    let ifc = db.ifc();
    let mut ids = vec![];
    while cursor.valid() {
        let mut row = order();
        ifc.retrieve(&mut row, &mut cursor).unwrap();
        ids.push(row.get("id").and_then(|v| v.as_i64()).unwrap());
        cursor.next().unwrap();
    }
    ids
}

fn qbe_matches_modified_fields(db: &Db) {
    seed(db);

    let mut example = order();
    example.set("customer", "ACME").unwrap();

    let cursor = db.ifc().qbe(&example).unwrap();
    assert_eq!(collect_ids(db, cursor), vec![30, 32, 34]);
}

fn qbe_with_key_finds_one(db: &Db) {
    seed(db);

    let mut example = order();
    example.set("id", 33).unwrap();

    let cursor = db.ifc().qbe(&example).unwrap();
    assert_eq!(collect_ids(db, cursor), vec![33]);
}

fn native_query(db: &Db) {
    seed(db);

    let filter = db.native(r#""customer" = 'Initech'"#, r#"{"customer": "Initech"}"#);
    let cursor = db.ifc().query(&order(), filter).unwrap();
    assert_eq!(collect_ids(db, cursor), vec![31, 33]);
}

fn empty_filter_matches_all(db: &Db) {
    seed(db);

    let cursor = db.ifc().query(&order(), "").unwrap();
    assert_eq!(collect_ids(db, cursor), vec![30, 31, 32, 33, 34]);
}

fn retrieved_objects_are_complete(db: &Db) {
    seed(db);

    let mut example = order();
    example.set("id", 31).unwrap();

    let ifc = db.ifc();
    let mut cursor = ifc.qbe(&example).unwrap();
    let mut row = order();
    ifc.retrieve(&mut row, &mut cursor).unwrap();

    assert_eq!(row.to_json(), sample_order_saved(31, "Initech").to_json());
    assert!(!row.is_modified());
}

/// What `sample_order` looks like after one save.
fn sample_order_saved(id: i64, customer: &str) -> stowage::Object {
    let mut order = sample_order(id, customer);
    order.set_version(1).unwrap();
    order
}

fn skip_and_limit(db: &Db) {
    seed(db);

    let ifc = db.ifc().with_query_skip(1).with_query_limit(2);
    assert_eq!(ifc.query_skip(), 1);
    assert_eq!(ifc.query_limit(), Some(2));

    let cursor = ifc.query(&order(), "").unwrap();
    assert_eq!(collect_ids(db, cursor), vec![31, 32]);
}

fn count_cursor(db: &Db) {
    seed(db);

    let mut example = order();
    example.set("customer", "ACME").unwrap();

    let ifc = db.ifc().with_count_cursor(true);
    let cursor = ifc.qbe(&example).unwrap();
    assert_eq!(cursor.state(), CursorState::Closed);
    assert_eq!(cursor.count(), 3);

    let cursor = ifc.with_query_limit(2).query(&order(), "").unwrap();
    assert_eq!(cursor.count(), 2);
}

fn empty_result_and_exhausted_cursor(db: &Db) {
    seed(db);

    let ifc = db.ifc();
    let mut example = order();
    example.set("customer", "Nobody").unwrap();

    let mut cursor = ifc.qbe(&example).unwrap();
    assert_eq!(cursor.state(), CursorState::Closed);
    let err = ifc.retrieve(&mut order(), &mut cursor).unwrap_err();
    assert!(err.is_cursor_exhausted());

    let mut example = order();
    example.set("id", 30).unwrap();
    let mut cursor = ifc.qbe(&example).unwrap();
    assert_eq!(cursor.pos(), 0);
    cursor.next().unwrap();
    assert_eq!(cursor.state(), CursorState::Exhausted);
    assert_eq!(cursor.count(), 1);
    let err = ifc.retrieve(&mut order(), &mut cursor).unwrap_err();
    assert!(err.is_cursor_exhausted());
}

tests!(
    qbe_matches_modified_fields,
    qbe_with_key_finds_one,
    native_query,
    empty_filter_matches_all,
    retrieved_objects_are_complete,
    skip_and_limit,
    count_cursor,
    empty_result_and_exhausted_cursor,
);
