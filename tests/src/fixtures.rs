//! Object types shared by the scenarios.

use stowage::{Granularity, Object, ScalarMeta, Template};

use chrono::{DateTime, TimeZone, Utc};

/// An order: scalar fields, a nullable nested address, a group of line
/// objects and a nullable group of scalar tags.
pub fn order() -> Object {
    Object::builder("Order")
        .key("id", ScalarMeta::i64())
        .version("version")
        .field("customer", ScalarMeta::text_max(40))
        .field("placed", ScalarMeta::time(Granularity::Millisecond))
        .field("total", ScalarMeta::float())
        .field("paid", ScalarMeta::boolean())
        .field("note", ScalarMeta::text().nullable())
        .object(
            "address",
            Object::builder("Address")
                .nullable()
                .field("city", ScalarMeta::text_max(20))
                .field("zip", ScalarMeta::text_max(5)),
        )
        .group(
            "lines",
            Template::object(
                Object::builder("Line")
                    .field("sku", ScalarMeta::text_max(8))
                    .field("qty", ScalarMeta::i32()),
            ),
        )
        .nullable_group("tags", Template::scalar(ScalarMeta::text_max(10)))
        .build()
        .unwrap()
}

/// A small order with every member populated.
pub fn sample_order(id: i64, customer: &str) -> Object {
    let mut order = order();
    order.set("id", id).unwrap();
    order.set("customer", customer).unwrap();
    order.set("placed", placed()).unwrap();
    order.set("total", 99.5).unwrap();
    order.set("paid", false).unwrap();

    let address = order.expect_object_mut("address").unwrap();
    address.set("city", "Lisbon").unwrap();
    address.set("zip", "1100").unwrap();

    add_line(&mut order, "A-1", 2);
    add_line(&mut order, "B-7", 1);
    order
        .expect_group_mut("tags")
        .unwrap()
        .push_value("rush")
        .unwrap();
    order
}

pub fn add_line(order: &mut Object, sku: &str, qty: i32) {
    let line = order
        .expect_group_mut("lines")
        .unwrap()
        .push_object()
        .unwrap();
    line.set("sku", sku).unwrap();
    line.set("qty", qty).unwrap();
}

/// An empty order carrying only `id`, ready for a load.
pub fn order_key(id: i64) -> Object {
    let mut order = order();
    order.set("id", id).unwrap();
    order
}

/// A contact whose nullable address holds only nullable fields, so a
/// present address can carry no values at all.
pub fn contact(id: i64) -> Object {
    let mut contact = Object::builder("Contact")
        .key("id", ScalarMeta::i64())
        .version("version")
        .object(
            "address",
            Object::builder("Address")
                .nullable()
                .field("city", ScalarMeta::text_max(20).nullable()),
        )
        .group(
            "stops",
            Template::object(
                Object::builder("Stop")
                    .nullable()
                    .field("city", ScalarMeta::text_max(20).nullable()),
            ),
        )
        .build()
        .unwrap();
    contact.set("id", id).unwrap();
    contact
}

/// A key-only type with no version field.
pub fn counter(name: &str, hits: i64) -> Object {
    let mut counter = Object::builder("Counter")
        .key("name", ScalarMeta::text_max(20))
        .field("hits", ScalarMeta::i64())
        .build()
        .unwrap();
    counter.set("name", name).unwrap();
    counter.set("hits", hits).unwrap();
    counter
}

pub fn placed() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap() + chrono::Duration::milliseconds(250)
}
