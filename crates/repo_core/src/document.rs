use log::debug;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::container;
use crate::core_api::{CoreError, CoreErrorCode};
use crate::schema::{CATEGORY_RUN_STATS, FIELD_DICTIONARY_OF_DICTIONARIES, WRAPPER_VALUE};

/// The decrypted save: a map of field name to `{ "value": ... }` wrappers, one of
/// which is the `dictionaryOfDictionaries` category table.
///
/// Read access is public; mutation is crate-private so edits only happen through
/// [`crate::transform::from_view`], which works on a copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDocument {
    fields: JsonMap<String, JsonValue>,
}

impl SaveDocument {
    pub fn from_json_value(value: JsonValue) -> Result<Self, CoreError> {
        let JsonValue::Object(fields) = value else {
            return Err(CoreError::new(
                CoreErrorCode::MalformedJson,
                "save payload is not a JSON object",
            ));
        };

        let categories = fields
            .get(FIELD_DICTIONARY_OF_DICTIONARIES)
            .and_then(|wrapper| wrapper.get(WRAPPER_VALUE));
        if !matches!(categories, Some(JsonValue::Object(_))) {
            return Err(CoreError::new(
                CoreErrorCode::MalformedJson,
                format!("save payload has no {FIELD_DICTIONARY_OF_DICTIONARIES}.{WRAPPER_VALUE} object"),
            ));
        }

        Ok(Self { fields })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let value: JsonValue = serde_json::from_slice(bytes).map_err(|e| {
            CoreError::new(
                CoreErrorCode::MalformedJson,
                format!("save payload is not valid JSON: {e}"),
            )
        })?;
        Self::from_json_value(value)
    }

    /// Decrypts a container and parses the payload.
    pub fn decrypt(container: &[u8], passphrase: &str) -> Result<Self, CoreError> {
        let plaintext = container::decrypt(container, passphrase)?;
        debug!("decrypted container into {} payload bytes", plaintext.len());
        Self::from_slice(&plaintext)
    }

    /// Serializes and encrypts entirely in memory.
    pub fn encrypt(&self, passphrase: &str) -> Result<Vec<u8>, CoreError> {
        let plaintext = self.to_vec()?;
        Ok(container::encrypt(&plaintext, passphrase))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(&self.fields).map_err(|e| {
            CoreError::new(
                CoreErrorCode::MalformedJson,
                format!("failed to serialize save document: {e}"),
            )
        })
    }

    pub fn to_string_pretty(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.fields).map_err(|e| {
            CoreError::new(
                CoreErrorCode::MalformedJson,
                format!("failed to serialize save document: {e}"),
            )
        })
    }

    pub fn fields(&self) -> &JsonMap<String, JsonValue> {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The unwrapped `value` of a top-level field.
    pub fn field_value(&self, name: &str) -> Option<&JsonValue> {
        self.fields.get(name)?.get(WRAPPER_VALUE)
    }

    pub fn categories(&self) -> Option<&JsonMap<String, JsonValue>> {
        self.field_value(FIELD_DICTIONARY_OF_DICTIONARIES)?
            .as_object()
    }

    pub fn category(&self, name: &str) -> Option<&JsonMap<String, JsonValue>> {
        self.categories()?.get(name)?.as_object()
    }

    pub fn entry(&self, category: &str, key: &str) -> Option<&JsonValue> {
        self.category(category)?.get(key)
    }

    pub fn run_stats(&self) -> Option<&JsonMap<String, JsonValue>> {
        self.category(CATEGORY_RUN_STATS)
    }

    pub fn into_json_value(self) -> JsonValue {
        JsonValue::Object(self.fields)
    }

    pub(crate) fn set_field_value(&mut self, name: &str, value: JsonValue) {
        let wrapper = object_slot(&mut self.fields, name);
        wrapper.insert(WRAPPER_VALUE.to_string(), value);
    }

    pub(crate) fn set_entry(&mut self, category: &str, key: &str, value: JsonValue) {
        let wrapper = object_slot(&mut self.fields, FIELD_DICTIONARY_OF_DICTIONARIES);
        let categories = object_slot(wrapper, WRAPPER_VALUE);
        let entries = object_slot(categories, category);
        entries.insert(key.to_string(), value);
    }
}

// Returns the object stored under `key`, inserting (or replacing a non-object
// with) an empty one first.
fn object_slot<'a>(
    map: &'a mut JsonMap<String, JsonValue>,
    key: &str,
) -> &'a mut JsonMap<String, JsonValue> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| JsonValue::Object(JsonMap::new()));
    if !slot.is_object() {
        *slot = JsonValue::Object(JsonMap::new());
    }
    match slot {
        JsonValue::Object(inner) => inner,
        _ => unreachable!("slot was just made an object"),
    }
}
