//! Tests for cross-collection reference resolution.

use bson::{doc, Bson};
use bucatini_core::reference::DocumentReference;

#[test]
fn resolves_ref_and_id_with_default_database() {
    let value = Bson::Document(doc! { "$ref": "coll", "$id": 7 });
    let reference = DocumentReference::resolve(&value, "db").unwrap();

    assert_eq!(reference.database, "db");
    assert_eq!(reference.collection, "coll");
    assert_eq!(reference.id, Bson::Int32(7));
}

#[test]
fn explicit_db_overrides_default() {
    let value = Bson::Document(doc! { "$ref": "coll", "$id": 7, "$db": "other" });
    let reference = DocumentReference::resolve(&value, "db").unwrap();

    assert_eq!(reference.database, "other");
}

#[test]
fn mistyped_db_falls_back_to_default() {
    let value = Bson::Document(doc! { "$ref": "coll", "$id": 7, "$db": 42 });
    let reference = DocumentReference::resolve(&value, "db").unwrap();

    assert_eq!(reference.database, "db");
}

#[test]
fn missing_id_yields_none() {
    let value = Bson::Document(doc! { "$ref": "coll" });
    assert_eq!(DocumentReference::resolve(&value, "db"), None);
}

#[test]
fn missing_ref_yields_none() {
    let value = Bson::Document(doc! { "$id": 7 });
    assert_eq!(DocumentReference::resolve(&value, "db"), None);
}

#[test]
fn mistyped_ref_yields_none() {
    let value = Bson::Document(doc! { "$ref": 99, "$id": 7 });
    assert_eq!(DocumentReference::resolve(&value, "db"), None);
}

#[test]
fn marker_is_found_in_nested_data() {
    let value = Bson::Document(doc! {
        "author": { "link": { "$ref": "users", "$id": "u-12" } },
    });
    let reference = DocumentReference::resolve(&value, "db").unwrap();

    assert_eq!(reference.collection, "users");
    assert_eq!(reference.id, Bson::String("u-12".to_string()));
}

#[test]
fn object_id_identifiers_pass_through() {
    let oid = bson::oid::ObjectId::new();
    let value = Bson::Document(doc! { "$ref": "coll", "$id": oid });
    let reference = DocumentReference::resolve(&value, "db").unwrap();

    assert_eq!(reference.id, Bson::ObjectId(oid));
}
