use std::fs;
use std::path::PathBuf;

use repo_core::core_api::CoreErrorCode;
use repo_core::document::SaveDocument;
use repo_core::schema::{FieldValue, InstanceField, ItemCounter, ItemKey, PlayerAttribute};
use repo_core::transform::{from_view, to_view};
use serde_json::{Value, json};

const MINE: &str = "Item Mine Explosive";
const ALICE: &str = "76561198000000001";
const BOB: &str = "76561198000000002";

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_document() -> SaveDocument {
    let path = workspace_root().join("tests/fixtures/editable.json");
    let bytes = fs::read(&path).unwrap_or_else(|e| panic!("failed to read {:?}: {}", path, e));
    SaveDocument::from_slice(&bytes).expect("fixture should parse")
}

fn document(value: Value) -> SaveDocument {
    SaveDocument::from_json_value(value).expect("test document should be well formed")
}

fn minimal(categories: Value) -> SaveDocument {
    document(json!({
        "dictionaryOfDictionaries": { "value": categories },
        "playerNames": { "value": { "p1": "alice" } },
    }))
}

#[test]
fn players_default_missing_attributes_to_zero() {
    let doc = minimal(json!({ "playerHealth": { "p1": 80 } }));
    let view = to_view(&doc);

    let p1 = view.player("p1").expect("p1 should have a record");
    assert_eq!(p1.name, "alice");
    assert_eq!(p1.get(PlayerAttribute::Health), 80);
    assert_eq!(p1.get(PlayerAttribute::UpgradeSpeed), 0);
    assert_eq!(p1.attributes.len(), PlayerAttribute::ALL.len());
}

#[test]
fn composite_keys_become_numbered_instances() {
    let doc = minimal(json!({
        "item": { "Mine": 3, "Mine/1": 3, "Mine/2": 5 },
    }));
    let view = to_view(&doc);

    let mine = view.item("Mine").expect("Mine should have a record");
    let values: Vec<(u32, i64)> = mine.instances.iter().map(|(&n, i)| (n, i.item)).collect();
    assert_eq!(values, vec![(0, 3), (1, 3), (2, 5)]);
}

#[test]
fn editing_one_instance_changes_only_its_composite_key() {
    let source = json!({
        "dictionaryOfDictionaries": { "value": {
            "item": { "Mine": 3, "Mine/1": 3, "Mine/2": 5 },
            "itemStatBattery": { "Mine/1": 100 },
        }},
        "playerNames": { "value": {} },
    });
    let doc = document(source.clone());

    let mut view = to_view(&doc);
    view.item_mut("Mine")
        .and_then(|item| item.instance_mut(2))
        .expect("instance 2 should exist")
        .item = 9;
    let out = from_view(&view, &doc).expect("merge should succeed");

    let mut expected = source;
    expected["dictionaryOfDictionaries"]["value"]["item"]["Mine/2"] = json!(9);
    assert_eq!(out.into_json_value(), expected);
}

#[test]
fn instance_zero_exists_when_only_composite_keys_are_present() {
    let doc = minimal(json!({
        "item": { "Battery/1": 1 },
        "itemStatBattery": { "Battery/1": 60 },
    }));
    let view = to_view(&doc);

    let battery = view.item("Battery").expect("Battery should have a record");
    assert_eq!(battery.instance(0).map(|i| (i.item, i.stat_battery)), Some((0, 0)));
    assert_eq!(battery.instance(1).map(|i| (i.item, i.stat_battery)), Some((1, 60)));
}

#[test]
fn items_from_aggregate_categories_get_records_without_extra_instances() {
    let doc = minimal(json!({
        "itemsPurchased": { "Cart": 2 },
        "itemStatBattery": { "Cart/4": 50 },
    }));
    let view = to_view(&doc);

    let cart = view.item("Cart").expect("Cart should have a record");
    assert_eq!(cart.counter(ItemCounter::Purchased), 2);
    assert_eq!(cart.instances.keys().copied().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn unedited_view_maps_back_to_an_identical_document() {
    let cases = [
        fixture_document(),
        minimal(json!({ "item": { "Gun": 4 }, "itemStatBattery": { "Gun": 100 } })),
        minimal(json!({ "item": { "Drone/1": 1, "Drone/3": 2 } })),
        minimal(json!({ "item": { "Mine": 3, "Mine/1": 3 }, "itemsPurchased": { "Mine": 1.0 } })),
        minimal(json!({ "playerHealth": { "p1": true }, "runStats": { "level": 2.9 } })),
        minimal(json!({ "item": { "odd/key": 1, "Mine/01": 2, "/5": 3 } })),
        minimal(json!({})),
    ];

    for doc in cases {
        let out = from_view(&to_view(&doc), &doc).expect("merge should succeed");
        assert_eq!(out, doc);
        assert_eq!(out.to_vec().unwrap(), doc.to_vec().unwrap());
    }
}

#[test]
fn unknown_fields_and_categories_survive_an_edit() {
    let doc = fixture_document();
    let mut view = to_view(&doc);
    view.player_mut(ALICE).unwrap().set(PlayerAttribute::Health, 100);

    let out = from_view(&view, &doc).expect("merge should succeed");

    assert_eq!(out.fields()["saveVersion"], doc.fields()["saveVersion"]);
    assert_eq!(
        out.category("playerFriendlyFire"),
        doc.category("playerFriendlyFire")
    );
    assert_eq!(
        out.fields()["dictionaryOfDictionaries"]["__type"],
        doc.fields()["dictionaryOfDictionaries"]["__type"]
    );
    assert_eq!(out.entry("playerHealth", ALICE), Some(&json!(100)));
    assert_eq!(out.entry("playerHealth", BOB), Some(&json!(100)));
}

#[test]
fn fixture_view_reads_game_info_players_and_items() {
    let view = to_view(&fixture_document());
    let info = &view.game_info;

    assert_eq!(info.text("teamName"), "R.E.P.O.");
    assert_eq!(info.text("date"), "2025-03-14");
    assert_eq!(info.float("timePlayed"), 5417.25);
    assert_eq!(info.integer("level"), 4);
    assert_eq!(info.integer("currency"), 37);
    assert_eq!(info.integer("save level"), 0);
    assert_eq!(info.player_names.len(), 2);

    let bob = view.player(BOB).unwrap();
    assert_eq!(bob.name, "bob");
    assert_eq!(bob.get(PlayerAttribute::HasCrown), 1);
    assert_eq!(bob.get(PlayerAttribute::UpgradeThrow), 2);

    let ids: Vec<&str> = view.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "Item Drone Battery",
            "Item Gun Handgun",
            MINE,
            "Item Upgrade Player Health",
        ]
    );
    let mine = view.item(MINE).unwrap();
    assert_eq!(mine.counter(ItemCounter::PurchasedTotal), 5);
    assert_eq!(mine.instance(2).unwrap().stat_battery, 80);
}

#[test]
fn new_zero_values_are_not_inserted() {
    let doc = minimal(json!({ "playerHealth": { "p1": 50 } }));
    let out = from_view(&to_view(&doc), &doc).unwrap();
    assert!(out.category("playerUpgradeSpeed").is_none());
}

#[test]
fn edits_to_absent_categories_create_them() {
    let doc = minimal(json!({}));
    let mut view = to_view(&doc);
    view.player_mut("p1").unwrap().set(PlayerAttribute::UpgradeSpeed, 2);

    let out = from_view(&view, &doc).unwrap();
    assert_eq!(out.entry("playerUpgradeSpeed", "p1"), Some(&json!(2)));
}

#[test]
fn game_info_writes_top_level_fields_when_present_and_run_stats_otherwise() {
    let doc = fixture_document();
    let mut view = to_view(&doc);
    let entries = &mut view.game_info.entries;
    entries.insert("teamName".into(), FieldValue::Text("Semibots".into()));
    entries.insert("date".into(), FieldValue::Text("2025-04-01".into()));
    entries.insert("timePlayed".into(), FieldValue::Float(6000.5));
    entries.insert("currency".into(), FieldValue::Integer(999));
    entries.insert("bonusHaul".into(), FieldValue::Integer(7));

    let out = from_view(&view, &doc).unwrap();

    assert_eq!(out.field_value("teamName"), Some(&json!("Semibots")));
    assert_eq!(out.field_value("dateAndTime"), Some(&json!("2025-04-01")));
    assert_eq!(out.field_value("timePlayed"), Some(&json!(6000.5)));
    assert!(!out.has_field("date"));
    assert_eq!(out.entry("runStats", "currency"), Some(&json!(999)));
    assert_eq!(out.entry("runStats", "bonusHaul"), Some(&json!(7)));
    assert_eq!(out.entry("runStats", "level"), Some(&json!(4)));
}

#[test]
fn game_info_text_is_coerced_to_the_canonical_kind() {
    let doc = fixture_document();
    let mut view = to_view(&doc);
    view.game_info
        .entries
        .insert("lives".into(), FieldValue::Text(" 5 ".into()));

    let out = from_view(&view, &doc).unwrap();
    assert_eq!(out.entry("runStats", "lives"), Some(&json!(5)));
}

#[test]
fn non_numeric_text_for_an_integer_field_is_rejected() {
    let doc = fixture_document();
    let mut view = to_view(&doc);
    view.game_info
        .entries
        .insert("currency".into(), FieldValue::Text("lots".into()));

    let err = from_view(&view, &doc).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::InvalidFieldValue);
    assert!(err.message.contains("currency"));
}

#[test]
fn item_keys_parse_and_encode() {
    assert_eq!(ItemKey::parse("Mine/2"), ItemKey::new("Mine", 2));
    assert_eq!(ItemKey::parse("Mine"), ItemKey::bare("Mine"));
    assert_eq!(ItemKey::parse("odd/key"), ItemKey::bare("odd/key"));
    assert_eq!(ItemKey::parse("Mine/01"), ItemKey::bare("Mine/01"));
    assert_eq!(ItemKey::parse("Mine/0"), ItemKey::bare("Mine/0"));
    assert_eq!(ItemKey::parse("/3"), ItemKey::bare("/3"));
    assert_eq!(ItemKey::parse("a/b/3"), ItemKey::new("a/b", 3));

    assert_eq!(ItemKey::new("Mine", 2).encode(), "Mine/2");
    assert_eq!(ItemKey::bare("Mine").encode(), "Mine");
}

#[test]
fn documents_without_the_category_table_are_rejected() {
    let err = SaveDocument::from_json_value(json!({ "teamName": { "value": "x" } })).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::MalformedJson);

    let err = SaveDocument::from_slice(b"[1, 2, 3]").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::MalformedJson);

    let err = SaveDocument::from_slice(b"{not json").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::MalformedJson);
}

#[test]
fn set_values_replace_non_canonical_stored_values() {
    let doc = document(json!({
        "dictionaryOfDictionaries": { "value": {
            "playerHealth": { "p1": "oops", "p2": 80.6 },
            "itemsPurchased": { "Mine": 2.5 },
            "item": { "Mine": true },
            "runStats": { "level": 2.9 },
        }},
        "playerNames": { "value": { "p1": "alice", "p2": "bob" } },
    }));

    let mut view = to_view(&doc);
    view.player_mut("p1").unwrap().set(PlayerAttribute::Health, 0);
    view.player_mut("p2").unwrap().set(PlayerAttribute::Health, 80);
    let mine = view.item_mut("Mine").unwrap();
    mine.set_counter(ItemCounter::Purchased, 2);
    assert!(mine.set_instance(0, InstanceField::Item, 1));
    view.game_info.set("level", FieldValue::Integer(2));

    let out = from_view(&view, &doc).expect("merge should succeed");
    assert_eq!(out.entry("playerHealth", "p1"), Some(&json!(0)));
    assert_eq!(out.entry("playerHealth", "p2"), Some(&json!(80)));
    assert_eq!(out.entry("itemsPurchased", "Mine"), Some(&json!(2)));
    assert_eq!(out.entry("item", "Mine"), Some(&json!(1)));
    assert_eq!(out.entry("runStats", "level"), Some(&json!(2)));
}

#[test]
fn non_canonical_values_survive_when_not_set() {
    let doc = minimal(json!({
        "playerHealth": { "p1": 80.6 },
        "playerUpgradeSpeed": { "p1": "oops" },
    }));
    let mut view = to_view(&doc);
    view.player_mut("p1").unwrap().set(PlayerAttribute::UpgradeRange, 3);

    let out = from_view(&view, &doc).unwrap();
    assert_eq!(out.entry("playerHealth", "p1"), Some(&json!(80.6)));
    assert_eq!(out.entry("playerUpgradeSpeed", "p1"), Some(&json!("oops")));
    assert_eq!(out.entry("playerUpgradeRange", "p1"), Some(&json!(3)));
}

#[test]
fn set_instance_reports_missing_instances() {
    let doc = minimal(json!({ "item": { "Mine": 3 } }));
    let mut view = to_view(&doc);
    let mine = view.item_mut("Mine").unwrap();

    assert!(!mine.set_instance(4, InstanceField::Item, 1));
    assert!(!mine.is_instance_edited(4, InstanceField::Item));
    assert_eq!(from_view(&view, &doc).unwrap(), doc);
}
