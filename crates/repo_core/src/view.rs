use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{FieldValue, InstanceField, ItemCounter, PlayerAttribute};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveView {
    pub game_info: GameInfo,
    pub players: Vec<PlayerRecord>,
    pub items: Vec<ItemRecord>,
}

impl SaveView {
    pub fn player(&self, id: &str) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut PlayerRecord> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemRecord> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut ItemRecord> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn instance_count(&self) -> usize {
        self.items.iter().map(|i| i.instances.len()).sum()
    }
}

/// Top-level scalars plus every `runStats` entry, keyed by game-info name
/// (`teamName`, `date`, `timePlayed`, `level`, `currency`, ...).
///
/// Values changed through the `set*` methods of the view types are written back
/// even when they read the same as a non-canonical stored value (`80.6`, `"oops"`).
/// Direct field mutation is only written when the value actually differs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameInfo {
    pub player_names: Vec<PlayerName>,
    pub entries: BTreeMap<String, FieldValue>,
    #[serde(skip)]
    edited: BTreeSet<String>,
}

impl GameInfo {
    pub(crate) fn new(
        player_names: Vec<PlayerName>,
        entries: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            player_names,
            entries,
            edited: BTreeSet::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        self.edited.insert(key.clone());
        self.entries.insert(key, value);
    }

    pub fn is_edited(&self, key: &str) -> bool {
        self.edited.contains(key)
    }

    pub fn integer(&self, key: &str) -> i64 {
        self.get(key).and_then(FieldValue::as_i64).unwrap_or(0)
    }

    pub fn float(&self, key: &str) -> f64 {
        self.get(key).and_then(FieldValue::as_f64).unwrap_or(0.0)
    }

    pub fn text(&self, key: &str) -> String {
        self.get(key).map(FieldValue::to_string).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerName {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub attributes: BTreeMap<PlayerAttribute, i64>,
    #[serde(skip)]
    edited: BTreeSet<PlayerAttribute>,
}

impl PlayerRecord {
    pub(crate) fn new(
        id: String,
        name: String,
        attributes: BTreeMap<PlayerAttribute, i64>,
    ) -> Self {
        Self {
            id,
            name,
            attributes,
            edited: BTreeSet::new(),
        }
    }

    pub fn get(&self, attribute: PlayerAttribute) -> i64 {
        self.attributes.get(&attribute).copied().unwrap_or(0)
    }

    pub fn set(&mut self, attribute: PlayerAttribute, value: i64) {
        self.edited.insert(attribute);
        self.attributes.insert(attribute, value);
    }

    pub fn is_edited(&self, attribute: PlayerAttribute) -> bool {
        self.edited.contains(&attribute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub counters: BTreeMap<ItemCounter, i64>,
    /// Instance 0 is always present.
    pub instances: BTreeMap<u32, ItemInstance>,
    #[serde(skip)]
    edited_counters: BTreeSet<ItemCounter>,
    #[serde(skip)]
    edited_instances: BTreeSet<(u32, InstanceField)>,
}

impl ItemRecord {
    pub(crate) fn new(
        id: String,
        counters: BTreeMap<ItemCounter, i64>,
        instances: BTreeMap<u32, ItemInstance>,
    ) -> Self {
        Self {
            id,
            counters,
            instances,
            edited_counters: BTreeSet::new(),
            edited_instances: BTreeSet::new(),
        }
    }

    pub fn counter(&self, counter: ItemCounter) -> i64 {
        self.counters.get(&counter).copied().unwrap_or(0)
    }

    pub fn set_counter(&mut self, counter: ItemCounter, value: i64) {
        self.edited_counters.insert(counter);
        self.counters.insert(counter, value);
    }

    /// Sets one field of instance `n`. Returns false if there is no such instance.
    pub fn set_instance(&mut self, n: u32, field: InstanceField, value: i64) -> bool {
        let Some(instance) = self.instances.get_mut(&n) else {
            return false;
        };
        instance.set(field, value);
        self.edited_instances.insert((n, field));
        true
    }

    pub fn is_counter_edited(&self, counter: ItemCounter) -> bool {
        self.edited_counters.contains(&counter)
    }

    pub fn is_instance_edited(&self, n: u32, field: InstanceField) -> bool {
        self.edited_instances.contains(&(n, field))
    }

    pub fn instance(&self, n: u32) -> Option<&ItemInstance> {
        self.instances.get(&n)
    }

    pub fn instance_mut(&mut self, n: u32) -> Option<&mut ItemInstance> {
        self.instances.get_mut(&n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemInstance {
    pub item: i64,
    #[serde(rename = "itemStatBattery")]
    pub stat_battery: i64,
}

impl ItemInstance {
    pub fn get(&self, field: InstanceField) -> i64 {
        match field {
            InstanceField::Item => self.item,
            InstanceField::StatBattery => self.stat_battery,
        }
    }

    pub fn set(&mut self, field: InstanceField, value: i64) {
        match field {
            InstanceField::Item => self.item = value,
            InstanceField::StatBattery => self.stat_battery = value,
        }
    }
}
