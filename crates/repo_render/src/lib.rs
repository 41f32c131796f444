use std::fmt::Write as _;

use repo_core::core_api::{Session, Snapshot};
use repo_core::schema::{GAME_INFO_HEADER, InstanceField, ItemCounter, ItemKey, PlayerAttribute};
use repo_core::view::{GameInfo, ItemRecord, PlayerRecord};
use serde_json::{Map as JsonMap, Value as JsonValue};

const SHEET_WIDTH: usize = 76;
const HEADER_COL_WIDTH: usize = 26;
const PLAYER_LABEL_WIDTH: usize = 18;
const ITEM_NAME_WIDTH: usize = 34;
const ITEM_COL_WIDTH: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelection {
    pub game_info: bool,
    pub players: bool,
    pub items: bool,
}

impl FieldSelection {
    pub fn is_any_selected(&self) -> bool {
        self.game_info || self.players || self.items
    }
}

pub fn render_json_full(session: &Session, style: JsonStyle) -> JsonValue {
    let all = FieldSelection {
        game_info: true,
        players: true,
        items: true,
    };
    render_json_selected(session, &all, style)
}

pub fn render_json_selected(
    session: &Session,
    fields: &FieldSelection,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(selected_json(fields, session)),
    }
}

/// `key=value` lines whose keys are valid `--set` targets.
pub fn render_selected_pairs(session: &Session, fields: &FieldSelection) -> Vec<(String, String)> {
    let mut out = Vec::new();

    if fields.game_info {
        for (key, value) in ordered_game_info(session.game_info()) {
            out.push((format!("game.{key}"), value.to_string()));
        }
    }
    if fields.players {
        for player in session.players() {
            for attribute in PlayerAttribute::ALL {
                out.push((
                    format!("player.{}.{}", player.id, attribute.category()),
                    player.get(attribute).to_string(),
                ));
            }
        }
    }
    if fields.items {
        for item in session.items() {
            for counter in ItemCounter::ALL {
                out.push((
                    format!("item.{}.{}", item.id, counter.category()),
                    item.counter(counter).to_string(),
                ));
            }
            for (&n, instance) in &item.instances {
                let key = ItemKey::new(item.id.as_str(), n);
                for field in InstanceField::ALL {
                    out.push((
                        format!("item.{key}.{}", field.category()),
                        instance.get(field).to_string(),
                    ));
                }
            }
        }
    }

    out
}

pub fn render_text(session: &Session) -> String {
    let mut out = String::new();
    let snapshot = session.snapshot();

    push_header(&mut out, &snapshot);

    writeln!(&mut out, " ::: Players :::").expect("writing to String cannot fail");
    if session.players().is_empty() {
        writeln!(&mut out, "  (none)").expect("writing to String cannot fail");
    }
    for player in session.players() {
        push_player(&mut out, player);
    }
    out.push('\n');

    writeln!(&mut out, " ::: Items :::").expect("writing to String cannot fail");
    if session.items().is_empty() {
        writeln!(&mut out, "  (none)").expect("writing to String cannot fail");
    } else {
        push_item_table(&mut out, session.items());
    }

    out
}

fn selected_json(fields: &FieldSelection, session: &Session) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();

    if fields.game_info {
        out.insert(
            "game_info".to_string(),
            game_info_to_json(session.game_info()),
        );
    }
    if fields.players {
        out.insert(
            "players".to_string(),
            JsonValue::Array(session.players().iter().map(player_to_json).collect()),
        );
    }
    if fields.items {
        out.insert(
            "items".to_string(),
            JsonValue::Array(session.items().iter().map(item_to_json).collect()),
        );
    }

    out
}

fn game_info_to_json(info: &GameInfo) -> JsonValue {
    let mut m = JsonMap::new();
    for (key, value) in ordered_game_info(info) {
        m.insert(key.to_string(), value.to_json());
    }

    let names = info
        .player_names
        .iter()
        .map(|p| (p.id.clone(), JsonValue::String(p.name.clone())))
        .collect();
    m.insert("playerNames".to_string(), JsonValue::Object(names));
    JsonValue::Object(m)
}

fn player_to_json(player: &PlayerRecord) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("id".to_string(), JsonValue::String(player.id.clone()));
    m.insert("name".to_string(), JsonValue::String(player.name.clone()));
    for attribute in PlayerAttribute::ALL {
        m.insert(
            attribute.category().to_string(),
            JsonValue::from(player.get(attribute)),
        );
    }
    JsonValue::Object(m)
}

fn item_to_json(item: &ItemRecord) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("id".to_string(), JsonValue::String(item.id.clone()));
    for counter in ItemCounter::ALL {
        m.insert(
            counter.category().to_string(),
            JsonValue::from(item.counter(counter)),
        );
    }

    let instances = item
        .instances
        .iter()
        .map(|(&n, instance)| {
            let mut inst = JsonMap::new();
            inst.insert("instance".to_string(), JsonValue::from(n));
            inst.insert(
                "key".to_string(),
                JsonValue::String(ItemKey::new(item.id.as_str(), n).encode()),
            );
            for field in InstanceField::ALL {
                inst.insert(
                    field.category().to_string(),
                    JsonValue::from(instance.get(field)),
                );
            }
            JsonValue::Object(inst)
        })
        .collect();
    m.insert("instances".to_string(), JsonValue::Array(instances));
    JsonValue::Object(m)
}

// Header keys first, in header order, then everything else alphabetically.
fn ordered_game_info(
    info: &GameInfo,
) -> impl Iterator<Item = (&str, &repo_core::schema::FieldValue)> {
    let header = GAME_INFO_HEADER
        .iter()
        .filter_map(|(key, _)| info.get(key).map(|v| (*key, v)));
    let rest = info
        .entries
        .iter()
        .filter(|(key, _)| !GAME_INFO_HEADER.iter().any(|(h, _)| h == key))
        .map(|(key, v)| (key.as_str(), v));
    header.chain(rest)
}

fn push_header(out: &mut String, snapshot: &Snapshot) {
    let (hours, minutes) = snapshot.time_played_hm();
    let title = format!("R.E.P.O. SAVE: {}", snapshot.team_name);
    let subtitle = format!("{}  {hours}h {minutes:02}m played", snapshot.date);

    writeln!(out).expect("writing to String cannot fail");
    writeln!(out, "{:^SHEET_WIDTH$}", title).expect("writing to String cannot fail");
    writeln!(out, "{:^SHEET_WIDTH$}", subtitle).expect("writing to String cannot fail");
    writeln!(out).expect("writing to String cannot fail");

    let cells = [
        format!("Level: {}", snapshot.level),
        format!("Currency: {}", format_number_with_commas(snapshot.currency)),
        format!("Lives: {}", snapshot.lives),
        format!("Charges: {}", snapshot.charging_station_charge),
        format!("Total Haul: {}", format_number_with_commas(snapshot.total_haul)),
        format!(
            "Players: {}  Items: {}",
            snapshot.player_count, snapshot.item_count
        ),
    ];
    for row in cells.chunks(3) {
        let line: String = row
            .iter()
            .map(|cell| format!("{:<HEADER_COL_WIDTH$}", cell))
            .collect();
        writeln!(out, "  {}", line.trim_end()).expect("writing to String cannot fail");
    }
    writeln!(out).expect("writing to String cannot fail");
}

fn push_player(out: &mut String, player: &PlayerRecord) {
    writeln!(out, "  {} ({})", player.name, player.id).expect("writing to String cannot fail");
    for attribute in PlayerAttribute::ALL {
        writeln!(
            out,
            "    {:<PLAYER_LABEL_WIDTH$}{}",
            format!("{}:", attribute.label()),
            player.get(attribute)
        )
        .expect("writing to String cannot fail");
    }
}

fn push_item_table(out: &mut String, items: &[ItemRecord]) {
    let counters: String = ItemCounter::ALL
        .into_iter()
        .map(|counter| format!("{:>ITEM_COL_WIDTH$}", counter.label()))
        .collect();
    writeln!(out, "  {:<ITEM_NAME_WIDTH$}{}", "Item", counters)
        .expect("writing to String cannot fail");

    for item in items {
        let counts: String = ItemCounter::ALL
            .into_iter()
            .map(|counter| format!("{:>ITEM_COL_WIDTH$}", item.counter(counter)))
            .collect();
        writeln!(out, "  {:<ITEM_NAME_WIDTH$}{}", item.id, counts)
            .expect("writing to String cannot fail");

        for (&n, instance) in &item.instances {
            writeln!(
                out,
                "    -> {:<width$}item={:<6} battery={}",
                ItemKey::new(item.id.as_str(), n).encode(),
                instance.item,
                instance.stat_battery,
                width = ITEM_NAME_WIDTH - 4,
            )
            .expect("writing to String cannot fail");
        }
    }
}

fn format_number_with_commas(n: i64) -> String {
    if n < 0 {
        return format!("-{}", format_number_with_commas(n.saturating_neg()));
    }
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
