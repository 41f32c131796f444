//! Mapping between the flat category tables of a [`SaveDocument`] and the
//! player/item records of a [`SaveView`].
//!
//! `from_view` writes a value when it differs from the canonical reading of the
//! stored one, or when it was set through the view's `set*` methods, in which case
//! the canonical integer replaces whatever was stored. It never inserts a default 0
//! where the key was absent. An unedited view therefore maps back to a document
//! equal to the one it came from, and anything the view does not model is carried
//! through untouched.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use serde_json::Value as JsonValue;

use crate::core_api::CoreError;
use crate::document::SaveDocument;
use crate::schema::{
    CATEGORY_ITEM, CATEGORY_RUN_STATS, FIELD_DATE_AND_TIME, FIELD_PLAYER_NAMES, FIELD_TEAM_NAME,
    FIELD_TIME_PLAYED, FieldKind, FieldValue, GAME_INFO_DATE, GAME_INFO_TEAM_NAME,
    GAME_INFO_TIME_PLAYED, InstanceField, ItemCounter, ItemKey, PlayerAttribute, json_to_i64,
    item_scoped_categories, top_level_field_for,
};
use crate::view::{GameInfo, ItemInstance, ItemRecord, PlayerName, PlayerRecord, SaveView};

const NAMED_SCALARS: [(&str, &str); 3] = [
    (GAME_INFO_TEAM_NAME, FIELD_TEAM_NAME),
    (GAME_INFO_DATE, FIELD_DATE_AND_TIME),
    (GAME_INFO_TIME_PLAYED, FIELD_TIME_PLAYED),
];

pub fn to_view(doc: &SaveDocument) -> SaveView {
    let game_info = read_game_info(doc);
    let players = read_players(doc, &game_info.player_names);
    let items = read_items(doc);

    debug!(
        "built view: {} game-info entries, {} players, {} items",
        game_info.entries.len(),
        players.len(),
        items.len()
    );

    SaveView {
        game_info,
        players,
        items,
    }
}

/// Returns a copy of `doc` with every modelled value taken from `view`.
pub fn from_view(view: &SaveView, doc: &SaveDocument) -> Result<SaveDocument, CoreError> {
    let mut out = doc.clone();
    let mut writes = 0usize;

    for item in &view.items {
        for counter in ItemCounter::ALL {
            writes += write_integer(
                &mut out,
                (counter.category(), &item.id),
                item.counter(counter),
                item.is_counter_edited(counter),
            ) as usize;
        }
        for (&n, instance) in &item.instances {
            let key = ItemKey::new(item.id.as_str(), n).encode();
            for field in InstanceField::ALL {
                writes += write_integer(
                    &mut out,
                    (field.category(), &key),
                    instance.get(field),
                    item.is_instance_edited(n, field),
                ) as usize;
            }
        }
    }

    for player in &view.players {
        for attribute in PlayerAttribute::ALL {
            writes += write_integer(
                &mut out,
                (attribute.category(), &player.id),
                player.get(attribute),
                player.is_edited(attribute),
            ) as usize;
        }
    }

    for (key, value) in &view.game_info.entries {
        let value = value.coerce(FieldKind::for_game_info_key(key), key)?;
        let edited = view.game_info.is_edited(key);
        writes += write_game_info(&mut out, key, value, edited) as usize;
    }

    debug!("merged view into document with {writes} changed values");
    Ok(out)
}

fn read_game_info(doc: &SaveDocument) -> GameInfo {
    let player_names = doc
        .field_value(FIELD_PLAYER_NAMES)
        .and_then(JsonValue::as_object)
        .map(|names| {
            names
                .iter()
                .map(|(id, name)| PlayerName {
                    id: id.clone(),
                    name: match name {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                })
                .collect()
        })
        .unwrap_or_default();

    let mut entries = BTreeMap::new();
    for (key, field) in NAMED_SCALARS {
        let kind = FieldKind::for_game_info_key(key);
        let value = doc
            .field_value(field)
            .and_then(|v| FieldValue::from_json(v, kind))
            .unwrap_or_else(|| kind.default_value());
        entries.insert(key.to_string(), value);
    }

    // runStats wins over a same-named top-level scalar.
    if let Some(run_stats) = doc.run_stats() {
        for (key, raw) in run_stats {
            match FieldValue::from_json(raw, FieldKind::for_game_info_key(key)) {
                Some(value) => {
                    entries.insert(key.clone(), value);
                }
                None => debug!("runStats entry {key:?} is not a scalar; leaving it out of game info"),
            }
        }
    }

    GameInfo::new(player_names, entries)
}

fn read_players(doc: &SaveDocument, names: &[PlayerName]) -> Vec<PlayerRecord> {
    names
        .iter()
        .map(|player| {
            let attributes = PlayerAttribute::ALL
                .into_iter()
                .map(|attr| (attr, read_integer(doc, attr.category(), &player.id)))
                .collect();
            PlayerRecord::new(player.id.clone(), player.name.clone(), attributes)
        })
        .collect()
}

fn read_items(doc: &SaveDocument) -> Vec<ItemRecord> {
    let mut ids: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();

    for category in item_scoped_categories() {
        let Some(entries) = doc.category(category) else {
            continue;
        };
        for raw_key in entries.keys() {
            let key = ItemKey::parse(raw_key);
            let instances = ids.entry(key.item_id).or_default();
            // Extra instances only come from composite keys in `item`.
            if category == CATEGORY_ITEM && key.instance > 0 {
                instances.insert(key.instance);
            }
        }
    }

    ids.into_iter()
        .map(|(id, extra)| {
            let counters = ItemCounter::ALL
                .into_iter()
                .map(|counter| (counter, read_integer(doc, counter.category(), &id)))
                .collect();

            let instances = std::iter::once(0)
                .chain(extra)
                .map(|n| {
                    let key = ItemKey::new(id.as_str(), n).encode();
                    let mut instance = ItemInstance::default();
                    for field in InstanceField::ALL {
                        instance.set(field, read_integer(doc, field.category(), &key));
                    }
                    (n, instance)
                })
                .collect();

            ItemRecord::new(id, counters, instances)
        })
        .collect()
}

fn read_integer(doc: &SaveDocument, category: &str, key: &str) -> i64 {
    let Some(raw) = doc.entry(category, key) else {
        return 0;
    };
    json_to_i64(raw).unwrap_or_else(|| {
        warn!("{category}[{key:?}] holds non-numeric {raw}; reading it as 0");
        0
    })
}

fn write_integer(out: &mut SaveDocument, slot: (&str, &str), value: i64, edited: bool) -> bool {
    let (category, key) = slot;
    let canonical = JsonValue::from(value);
    match out.entry(category, key) {
        Some(raw) if *raw == canonical => return false,
        Some(raw) if !edited && json_to_i64(raw).unwrap_or(0) == value => return false,
        None if !edited && value == 0 => return false,
        _ => {}
    }
    out.set_entry(category, key, canonical);
    true
}

fn current_game_info(doc: &SaveDocument, key: &str, kind: FieldKind) -> FieldValue {
    doc.run_stats()
        .and_then(|stats| stats.get(key))
        .and_then(|raw| FieldValue::from_json(raw, kind))
        .or_else(|| {
            doc.field_value(top_level_field_for(key))
                .and_then(|raw| FieldValue::from_json(raw, kind))
        })
        .unwrap_or_else(|| kind.default_value())
}

// runStats first, matching how game info is read.
fn stored_game_info<'a>(doc: &'a SaveDocument, key: &str) -> Option<&'a JsonValue> {
    doc.run_stats()
        .and_then(|stats| stats.get(key))
        .or_else(|| doc.field_value(top_level_field_for(key)))
}

fn write_game_info(out: &mut SaveDocument, key: &str, value: FieldValue, edited: bool) -> bool {
    let json = value.to_json();
    let unchanged = if edited {
        stored_game_info(out, key) == Some(&json)
    } else {
        current_game_info(out, key, value.kind()) == value
    };
    if unchanged {
        return false;
    }

    let field = top_level_field_for(key);
    let shadowed_in_run_stats = out.run_stats().is_some_and(|stats| stats.contains_key(key));

    if out.has_field(field) {
        out.set_field_value(field, json.clone());
        // Keep a shadowing runStats copy in step so the edit stays visible.
        if shadowed_in_run_stats {
            out.set_entry(CATEGORY_RUN_STATS, key, json);
        }
    } else {
        out.set_entry(CATEGORY_RUN_STATS, key, json);
    }
    true
}
