use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Number as JsonNumber, Value as JsonValue};

use crate::core_api::{CoreError, CoreErrorCode};

pub const FIELD_DICTIONARY_OF_DICTIONARIES: &str = "dictionaryOfDictionaries";
pub const FIELD_PLAYER_NAMES: &str = "playerNames";
pub const FIELD_TEAM_NAME: &str = "teamName";
pub const FIELD_DATE_AND_TIME: &str = "dateAndTime";
pub const FIELD_TIME_PLAYED: &str = "timePlayed";
pub const WRAPPER_VALUE: &str = "value";

pub const CATEGORY_RUN_STATS: &str = "runStats";
pub const CATEGORY_ITEM: &str = "item";
pub const CATEGORY_ITEM_STAT_BATTERY: &str = "itemStatBattery";

pub const GAME_INFO_TEAM_NAME: &str = FIELD_TEAM_NAME;
pub const GAME_INFO_DATE: &str = "date";
pub const GAME_INFO_TIME_PLAYED: &str = FIELD_TIME_PLAYED;

/// Game-info entries shown in the summary header, with display labels.
pub const GAME_INFO_HEADER: [(&str, &str); 8] = [
    (GAME_INFO_TEAM_NAME, "Team"),
    (GAME_INFO_DATE, "Date"),
    (GAME_INFO_TIME_PLAYED, "Time Played"),
    ("level", "Level"),
    ("currency", "Currency"),
    ("lives", "Lives"),
    ("chargingStationCharge", "Charges"),
    ("totalHaul", "Total Haul"),
];

/// Top-level save field backing a named game-info entry. Everything else lives
/// in `runStats` unless the document already carries a same-named top-level field.
pub fn top_level_field_for(game_info_key: &str) -> &str {
    match game_info_key {
        GAME_INFO_DATE => FIELD_DATE_AND_TIME,
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayerAttribute {
    #[serde(rename = "playerHealth")]
    Health,
    #[serde(rename = "playerUpgradeHealth")]
    UpgradeHealth,
    #[serde(rename = "playerUpgradeStamina")]
    UpgradeStamina,
    #[serde(rename = "playerUpgradeExtraJump")]
    UpgradeExtraJump,
    #[serde(rename = "playerUpgradeLaunch")]
    UpgradeLaunch,
    #[serde(rename = "playerUpgradeMapPlayerCount")]
    UpgradeMapPlayerCount,
    #[serde(rename = "playerUpgradeSpeed")]
    UpgradeSpeed,
    #[serde(rename = "playerUpgradeStrength")]
    UpgradeStrength,
    #[serde(rename = "playerUpgradeRange")]
    UpgradeRange,
    #[serde(rename = "playerUpgradeThrow")]
    UpgradeThrow,
    #[serde(rename = "playerHasCrown")]
    HasCrown,
}

impl PlayerAttribute {
    pub const ALL: [Self; 11] = [
        Self::Health,
        Self::UpgradeHealth,
        Self::UpgradeStamina,
        Self::UpgradeExtraJump,
        Self::UpgradeLaunch,
        Self::UpgradeMapPlayerCount,
        Self::UpgradeSpeed,
        Self::UpgradeStrength,
        Self::UpgradeRange,
        Self::UpgradeThrow,
        Self::HasCrown,
    ];

    pub fn category(self) -> &'static str {
        match self {
            Self::Health => "playerHealth",
            Self::UpgradeHealth => "playerUpgradeHealth",
            Self::UpgradeStamina => "playerUpgradeStamina",
            Self::UpgradeExtraJump => "playerUpgradeExtraJump",
            Self::UpgradeLaunch => "playerUpgradeLaunch",
            Self::UpgradeMapPlayerCount => "playerUpgradeMapPlayerCount",
            Self::UpgradeSpeed => "playerUpgradeSpeed",
            Self::UpgradeStrength => "playerUpgradeStrength",
            Self::UpgradeRange => "playerUpgradeRange",
            Self::UpgradeThrow => "playerUpgradeThrow",
            Self::HasCrown => "playerHasCrown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Health => "Current Health",
            Self::UpgradeHealth => "Health",
            Self::UpgradeStamina => "Stamina",
            Self::UpgradeExtraJump => "Extra Jump",
            Self::UpgradeLaunch => "Launch",
            Self::UpgradeMapPlayerCount => "Map Player Count",
            Self::UpgradeSpeed => "Speed",
            Self::UpgradeStrength => "Strength",
            Self::UpgradeRange => "Range",
            Self::UpgradeThrow => "Throw Power",
            Self::HasCrown => "Has Crown",
        }
    }

    pub fn from_category(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.category() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemCounter {
    #[serde(rename = "itemsPurchased")]
    Purchased,
    #[serde(rename = "itemsPurchasedTotal")]
    PurchasedTotal,
    #[serde(rename = "itemsUpgradesPurchased")]
    UpgradesPurchased,
    #[serde(rename = "itemBatteryUpgrades")]
    BatteryUpgrades,
}

impl ItemCounter {
    pub const ALL: [Self; 4] = [
        Self::Purchased,
        Self::PurchasedTotal,
        Self::UpgradesPurchased,
        Self::BatteryUpgrades,
    ];

    pub fn category(self) -> &'static str {
        match self {
            Self::Purchased => "itemsPurchased",
            Self::PurchasedTotal => "itemsPurchasedTotal",
            Self::UpgradesPurchased => "itemsUpgradesPurchased",
            Self::BatteryUpgrades => "itemBatteryUpgrades",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Purchased => "Purchased",
            Self::PurchasedTotal => "Purchased Total",
            Self::UpgradesPurchased => "Upgrades",
            Self::BatteryUpgrades => "Battery Upgrades",
        }
    }

    pub fn from_category(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|counter| counter.category() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstanceField {
    #[serde(rename = "item")]
    Item,
    #[serde(rename = "itemStatBattery")]
    StatBattery,
}

impl InstanceField {
    pub const ALL: [Self; 2] = [Self::Item, Self::StatBattery];

    pub fn category(self) -> &'static str {
        match self {
            Self::Item => CATEGORY_ITEM,
            Self::StatBattery => CATEGORY_ITEM_STAT_BATTERY,
        }
    }

    pub fn from_category(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.category() == name)
    }
}

/// Every category whose keys are item keys.
pub fn item_scoped_categories() -> impl Iterator<Item = &'static str> {
    ItemCounter::ALL
        .into_iter()
        .map(ItemCounter::category)
        .chain(InstanceField::ALL.into_iter().map(InstanceField::category))
}

/// Item identity: the bare id plus an instance number, where 0 is the implicit
/// first instance stored under the bare id and `n >= 1` is stored as `"id/n"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub item_id: String,
    pub instance: u32,
}

impl ItemKey {
    pub fn new(item_id: impl Into<String>, instance: u32) -> Self {
        Self {
            item_id: item_id.into(),
            instance,
        }
    }

    pub fn bare(item_id: impl Into<String>) -> Self {
        Self::new(item_id, 0)
    }

    /// Splits on the last `/`. Only a canonical positive decimal suffix makes a
    /// composite key; anything else is kept whole as a bare id so it re-encodes
    /// to exactly the same string.
    pub fn parse(raw: &str) -> Self {
        let Some((item_id, suffix)) = raw.rsplit_once('/') else {
            return Self::bare(raw);
        };

        match suffix.parse::<u32>() {
            Ok(n) if n >= 1 && !item_id.is_empty() && n.to_string() == suffix => {
                Self::new(item_id, n)
            }
            _ => {
                warn!("item key {raw:?} has no usable instance suffix; treating it as a bare id");
                Self::bare(raw)
            }
        }
    }

    pub fn encode(&self) -> String {
        if self.instance == 0 {
            self.item_id.clone()
        } else {
            format!("{}/{}", self.item_id, self.instance)
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
}

impl FieldKind {
    pub fn for_game_info_key(key: &str) -> Self {
        match key {
            GAME_INFO_TIME_PLAYED => Self::Float,
            GAME_INFO_DATE | GAME_INFO_TEAM_NAME => Self::Text,
            _ => Self::Integer,
        }
    }

    pub fn default_value(self) -> FieldValue {
        match self {
            Self::Integer => FieldValue::Integer(0),
            Self::Float => FieldValue::Float(0.0),
            Self::Text => FieldValue::Text(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Integer(_) => FieldKind::Integer,
            Self::Float(_) => FieldKind::Float,
            Self::Text(_) => FieldKind::Text,
        }
    }

    /// Parses user-supplied text as `kind`.
    pub fn parse(raw: &str, kind: FieldKind, field: &str) -> Result<Self, CoreError> {
        match kind {
            FieldKind::Text => Ok(Self::Text(raw.to_string())),
            FieldKind::Integer => parse_integer(raw)
                .map(Self::Integer)
                .ok_or_else(|| invalid_value(field, "an integer", raw)),
            FieldKind::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Float)
                .ok_or_else(|| invalid_value(field, "a number", raw)),
        }
    }

    /// Converts to `kind`, failing when the value has no faithful reading as that kind.
    pub fn coerce(&self, kind: FieldKind, field: &str) -> Result<Self, CoreError> {
        match (self, kind) {
            (Self::Integer(v), FieldKind::Integer) => Ok(Self::Integer(*v)),
            (Self::Integer(v), FieldKind::Float) => Ok(Self::Float(*v as f64)),
            (Self::Integer(v), FieldKind::Text) => Ok(Self::Text(v.to_string())),
            (Self::Float(v), FieldKind::Integer) => float_to_i64(*v)
                .map(Self::Integer)
                .ok_or_else(|| invalid_value(field, "an integer", &v.to_string())),
            (Self::Float(v), FieldKind::Float) if v.is_finite() => Ok(Self::Float(*v)),
            (Self::Float(v), FieldKind::Float) => {
                Err(invalid_value(field, "a finite number", &v.to_string()))
            }
            (Self::Float(v), FieldKind::Text) => Ok(Self::Text(v.to_string())),
            (Self::Text(raw), kind) => Self::parse(raw, kind, field),
        }
    }

    /// Canonical reading of a stored JSON value, or `None` if it has no reading as `kind`.
    pub fn from_json(value: &JsonValue, kind: FieldKind) -> Option<Self> {
        match kind {
            FieldKind::Integer => json_to_i64(value).map(Self::Integer),
            FieldKind::Float => match value {
                JsonValue::Number(n) => n.as_f64().map(Self::Float),
                _ => None,
            },
            FieldKind::Text => match value {
                JsonValue::String(s) => Some(Self::Text(s.clone())),
                JsonValue::Number(n) => Some(Self::Text(n.to_string())),
                JsonValue::Bool(b) => Some(Self::Text(b.to_string())),
                _ => None,
            },
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Integer(v) => JsonValue::from(*v),
            Self::Float(v) => JsonNumber::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(s) => JsonValue::String(s.clone()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Float(v) => float_to_i64(*v),
            Self::Text(s) => parse_integer(s),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Integer reading of a stored number. Floats truncate toward zero, booleans map to 0/1.
pub fn json_to_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().and_then(float_to_i64)),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(float_to_i64)
    })
}

fn float_to_i64(v: f64) -> Option<i64> {
    if v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

fn invalid_value(field: &str, expected: &str, got: &str) -> CoreError {
    CoreError::new(
        CoreErrorCode::InvalidFieldValue,
        format!("{field}: expected {expected}, got {got:?}"),
    )
}
