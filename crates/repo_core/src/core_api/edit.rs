use std::fmt;
use std::str::FromStr;

use crate::schema::{InstanceField, ItemCounter, ItemKey, PlayerAttribute};

use super::error::{CoreError, CoreErrorCode};

/// A single field a caller wants to change, addressed the way the CLI spells it:
///
/// - `game.<key>`
/// - `player.<playerId>.<attribute>`
/// - `item.<itemId>.<counter>`
/// - `item.<itemId>/<n>.<item|itemStatBattery>` (`n = 0` or no suffix is the bare instance)
///
/// The id is everything between the first and last `.`, so ids may contain dots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    GameInfo {
        key: String,
    },
    Player {
        player_id: String,
        attribute: PlayerAttribute,
    },
    ItemCounter {
        item_id: String,
        counter: ItemCounter,
    },
    ItemInstance {
        item_id: String,
        instance: u32,
        field: InstanceField,
    },
}

impl EditTarget {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (scope, rest) = raw
            .split_once('.')
            .ok_or_else(|| unknown_target(raw, "expected <scope>.<...>"))?;

        match scope {
            "game" if !rest.is_empty() => Ok(Self::GameInfo {
                key: rest.to_string(),
            }),
            "player" => {
                let (player_id, name) = split_id_and_name(raw, rest)?;
                let attribute = PlayerAttribute::from_category(name)
                    .ok_or_else(|| unknown_target(raw, "unknown player attribute"))?;
                Ok(Self::Player {
                    player_id: player_id.to_string(),
                    attribute,
                })
            }
            "item" => {
                let (id, name) = split_id_and_name(raw, rest)?;
                if let Some(counter) = ItemCounter::from_category(name) {
                    return Ok(Self::ItemCounter {
                        item_id: id.to_string(),
                        counter,
                    });
                }
                let field = InstanceField::from_category(name)
                    .ok_or_else(|| unknown_target(raw, "unknown item field"))?;
                let key = match id.strip_suffix("/0") {
                    Some(bare) if !bare.is_empty() => ItemKey::bare(bare),
                    _ => ItemKey::parse(id),
                };
                Ok(Self::ItemInstance {
                    item_id: key.item_id,
                    instance: key.instance,
                    field,
                })
            }
            _ => Err(unknown_target(raw, "scope must be game, player or item")),
        }
    }
}

impl fmt::Display for EditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GameInfo { key } => write!(f, "game.{key}"),
            Self::Player {
                player_id,
                attribute,
            } => write!(f, "player.{player_id}.{}", attribute.category()),
            Self::ItemCounter { item_id, counter } => {
                write!(f, "item.{item_id}.{}", counter.category())
            }
            Self::ItemInstance {
                item_id,
                instance,
                field,
            } => write!(
                f,
                "item.{}.{}",
                ItemKey::new(item_id.as_str(), *instance),
                field.category()
            ),
        }
    }
}

/// Target plus the raw replacement text; coercion happens when the edit is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub target: EditTarget,
    pub raw: String,
}

impl FieldEdit {
    pub fn new(target: EditTarget, raw: impl Into<String>) -> Self {
        Self {
            target,
            raw: raw.into(),
        }
    }
}

impl FromStr for FieldEdit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, raw) = s
            .split_once('=')
            .ok_or_else(|| unknown_target(s, "expected TARGET=VALUE"))?;
        Ok(Self::new(EditTarget::parse(target)?, raw))
    }
}

fn split_id_and_name<'a>(raw: &str, rest: &'a str) -> Result<(&'a str, &'a str), CoreError> {
    match rest.rsplit_once('.') {
        Some((id, name)) if !id.is_empty() && !name.is_empty() => Ok((id, name)),
        _ => Err(unknown_target(raw, "expected <id>.<field>")),
    }
}

fn unknown_target(raw: &str, reason: &str) -> CoreError {
    CoreError::new(
        CoreErrorCode::UnknownTarget,
        format!("invalid edit target {raw:?}: {reason}"),
    )
}
