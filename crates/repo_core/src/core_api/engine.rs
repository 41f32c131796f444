use std::path::{Path, PathBuf};

use log::debug;

use crate::container::DEFAULT_PASSPHRASE;
use crate::document::SaveDocument;
use crate::schema::{
    FieldKind, FieldValue, GAME_INFO_DATE, GAME_INFO_TEAM_NAME, GAME_INFO_TIME_PLAYED,
};
use crate::storage;
use crate::transform;
use crate::view::{GameInfo, ItemRecord, PlayerRecord, SaveView};

use super::edit::{EditTarget, FieldEdit};
use super::error::{CoreError, CoreErrorCode};
use super::types::Snapshot;

#[derive(Debug, Clone)]
pub struct Engine {
    passphrase: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    passphrase: String,
    document: SaveDocument,
    loaded_view: SaveView,
    view: SaveView,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine using the game's own passphrase.
    pub fn new() -> Self {
        Self::with_passphrase(DEFAULT_PASSPHRASE)
    }

    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, CoreError> {
        let document = SaveDocument::decrypt(bytes.as_ref(), &self.passphrase)?;
        Ok(self.open_document(document))
    }

    pub fn open_path(&self, path: &Path) -> Result<Session, CoreError> {
        let document = storage::load(path, &self.passphrase)?;
        debug!("opened {}", path.display());
        Ok(self.open_document(document))
    }

    pub fn open_document(&self, document: SaveDocument) -> Session {
        let view = transform::to_view(&document);
        Session {
            passphrase: self.passphrase.clone(),
            document,
            loaded_view: view.clone(),
            view,
        }
    }
}

impl Session {
    /// The document as loaded; edits never touch it.
    pub fn document(&self) -> &SaveDocument {
        &self.document
    }

    pub fn view(&self) -> &SaveView {
        &self.view
    }

    pub fn game_info(&self) -> &GameInfo {
        &self.view.game_info
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.view.players
    }

    pub fn player(&self, id: &str) -> Option<&PlayerRecord> {
        self.view.player(id)
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.view.items
    }

    pub fn item(&self, id: &str) -> Option<&ItemRecord> {
        self.view.item(id)
    }

    /// True once any edit has been applied, even one that restates a stored value.
    pub fn is_modified(&self) -> bool {
        self.view != self.loaded_view
    }

    pub fn snapshot(&self) -> Snapshot {
        let info = &self.view.game_info;
        Snapshot {
            team_name: info.text(GAME_INFO_TEAM_NAME),
            date: info.text(GAME_INFO_DATE),
            time_played: info.float(GAME_INFO_TIME_PLAYED),
            level: info.integer("level"),
            currency: info.integer("currency"),
            lives: info.integer("lives"),
            charging_station_charge: info.integer("chargingStationCharge"),
            total_haul: info.integer("totalHaul"),
            player_count: self.view.players.len(),
            item_count: self.view.items.len(),
            instance_count: self.view.instance_count(),
        }
    }

    pub fn apply_edit(&mut self, edit: &FieldEdit) -> Result<(), CoreError> {
        let target = &edit.target;
        match target {
            EditTarget::GameInfo { key } => {
                let value = FieldValue::parse(&edit.raw, FieldKind::for_game_info_key(key), key)?;
                self.view.game_info.set(key.as_str(), value);
            }
            EditTarget::Player {
                player_id,
                attribute,
            } => {
                let value = parse_integer(&edit.raw, target)?;
                self.view
                    .player_mut(player_id)
                    .ok_or_else(|| unknown(target, "no such player"))?
                    .set(*attribute, value);
            }
            EditTarget::ItemCounter { item_id, counter } => {
                let value = parse_integer(&edit.raw, target)?;
                self.view
                    .item_mut(item_id)
                    .ok_or_else(|| unknown(target, "no such item"))?
                    .set_counter(*counter, value);
            }
            EditTarget::ItemInstance {
                item_id,
                instance,
                field,
            } => {
                let value = parse_integer(&edit.raw, target)?;
                let item = self
                    .view
                    .item_mut(item_id)
                    .ok_or_else(|| unknown(target, "no such item"))?;
                if !item.set_instance(*instance, *field, value) {
                    return Err(unknown(target, "no such item instance"));
                }
            }
        }
        debug!("applied edit {target}={}", edit.raw);
        Ok(())
    }

    pub fn apply_edits<'a, I>(&mut self, edits: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = &'a FieldEdit>,
    {
        for edit in edits {
            self.apply_edit(edit)?;
        }
        Ok(())
    }

    /// The loaded document with the current view merged in.
    pub fn to_document(&self) -> Result<SaveDocument, CoreError> {
        transform::from_view(&self.view, &self.document)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        self.to_document()?.encrypt(&self.passphrase)
    }

    /// Writes the edited save to `path`, rotating any existing file to `<path>.bak`.
    pub fn save(&self, path: &Path) -> Result<Option<PathBuf>, CoreError> {
        let bytes = self.to_bytes()?;
        storage::write_with_backup(path, &bytes)
    }
}

fn parse_integer(raw: &str, target: &EditTarget) -> Result<i64, CoreError> {
    let field = target.to_string();
    match FieldValue::parse(raw, FieldKind::Integer, &field)? {
        FieldValue::Integer(v) => Ok(v),
        other => Err(CoreError::new(
            CoreErrorCode::InvalidFieldValue,
            format!("{field}: expected an integer, got {other}"),
        )),
    }
}

fn unknown(target: &EditTarget, reason: &str) -> CoreError {
    CoreError::new(CoreErrorCode::UnknownTarget, format!("{target}: {reason}"))
}
