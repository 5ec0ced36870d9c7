use tests::fixtures::{add_line, order, order_key, sample_order};
use tests::{tests, Db};

use pretty_assertions::assert_eq;
use stowage::{Element, Object};

fn skus(order: &Object) -> Vec<String> {
    order
        .group("lines")
        .unwrap()
        .iter()
        .filter_map(Element::as_object)
        .map(|line| line.get("sku").and_then(|v| v.as_str()).unwrap().to_string())
        .collect()
}

fn elements_keep_their_order(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut saved = sample_order(20, "ACME");
    for i in 0..10 {
        add_line(&mut saved, &format!("Z-{i}"), i);
    }
    ifc.save(&mut saved).unwrap();

    let mut loaded = order_key(20);
    ifc.load(&mut loaded).unwrap();
    assert_eq!(loaded.group("lines").unwrap().len(), 12);
    assert_eq!(skus(&loaded), skus(&saved));
}

fn empty_group_reads_back_empty(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut saved = sample_order(21, "ACME");
    saved.expect_group_mut("lines").unwrap().clear();
    saved.expect_group_mut("tags").unwrap().clear();
    ifc.save(&mut saved).unwrap();

    let mut loaded = order_key(21);
    ifc.load(&mut loaded).unwrap();

    let lines = loaded.group("lines").unwrap();
    assert!(lines.is_empty());
    assert!(!lines.is_null());

    let tags = loaded.group("tags").unwrap();
    assert!(tags.is_empty());
    assert!(!tags.is_null());
}

fn shrinking_a_group_drops_elements(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut order = sample_order(22, "ACME");
    ifc.save(&mut order).unwrap();

    order.expect_group_mut("lines").unwrap().remove(0);
    ifc.save(&mut order).unwrap();

    let mut loaded = order_key(22);
    ifc.load(&mut loaded).unwrap();
    assert_eq!(skus(&loaded), vec!["B-7".to_string()]);
}

fn scalar_group_round_trips(db: &Db) {
    let ifc = db.ifc();
    ifc.structure(&order()).unwrap();

    let mut saved = sample_order(23, "ACME");
    let tags = saved.expect_group_mut("tags").unwrap();
    tags.push_value("fragile").unwrap();
    tags.push_value("gift").unwrap();
    ifc.save(&mut saved).unwrap();

    let mut loaded = order_key(23);
    ifc.load(&mut loaded).unwrap();

    let tags = loaded
        .group("tags")
        .unwrap()
        .iter()
        .filter_map(Element::as_field)
        .map(|tag| tag.value().as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(tags, ["rush", "fragile", "gift"]);
}

tests!(
    elements_keep_their_order,
    empty_group_reads_back_empty,
    shrinking_a_group_drops_elements,
    scalar_group_round_trips,
);
