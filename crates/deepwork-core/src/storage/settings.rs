//! User settings.
//!
//! Settings live as a JSON object under [`SETTINGS_KEY`] in the key-value
//! store. The raw object is kept as-is so that keys this version does not know
//! about survive a load/save cycle and a backup merge. Typed access goes
//! through [`Settings`], which falls back to the default for any key that is
//! missing or malformed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kv::KeyValueStore;
use crate::error::{CoreError, Result, ValidationError};

pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundType {
    #[default]
    Chime,
    Beep,
    Bell,
    Ping,
    Alert,
}

impl std::str::FromStr for SoundType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chime" => Ok(SoundType::Chime),
            "beep" => Ok(SoundType::Beep),
            "bell" => Ok(SoundType::Bell),
            "ping" => Ok(SoundType::Ping),
            "alert" => Ok(SoundType::Alert),
            other => Err(ValidationError::InvalidValue {
                field: "soundType".into(),
                message: format!("unknown sound type '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultDuration {
    pub hours: u32,
    pub minutes: u32,
}

impl DefaultDuration {
    pub fn total_minutes(&self) -> i64 {
        i64::from(self.hours) * 60 + i64::from(self.minutes)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.hours > 23 || self.minutes > 59 {
            return Err(ValidationError::InvalidValue {
                field: "defaultDuration".into(),
                message: format!("{}h {}m is outside 0-23h 0-59m", self.hours, self.minutes),
            });
        }
        Ok(())
    }
}

impl Default for DefaultDuration {
    fn default() -> Self {
        Self {
            hours: 0,
            minutes: 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub sound_enabled: bool,
    /// 0..=100
    pub volume: u8,
    pub sound_type: SoundType,
    pub notifications_enabled: bool,
    pub default_duration: DefaultDuration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            volume: 50,
            sound_type: SoundType::Chime,
            notifications_enabled: false,
            default_duration: DefaultDuration::default(),
        }
    }
}

impl Settings {
    /// Read typed settings out of a raw object, one key at a time.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut settings = Settings::default();

        if let Some(v) = field::<bool>(map, "soundEnabled") {
            settings.sound_enabled = v;
        }
        if let Some(v) = field::<u8>(map, "volume") {
            if v <= 100 {
                settings.volume = v;
            } else {
                tracing::warn!(volume = v, "ignoring out-of-range volume setting");
            }
        }
        if let Some(v) = field::<SoundType>(map, "soundType") {
            settings.sound_type = v;
        }
        if let Some(v) = field::<bool>(map, "notificationsEnabled") {
            settings.notifications_enabled = v;
        }
        if let Some(v) = field::<DefaultDuration>(map, "defaultDuration") {
            if v.validate().is_ok() {
                settings.default_duration = v;
            } else {
                tracing::warn!(?v, "ignoring out-of-range default duration");
            }
        }
        settings
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.volume > 100 {
            return Err(ValidationError::InvalidValue {
                field: "volume".into(),
                message: format!("{} is outside 0-100", self.volume),
            });
        }
        self.default_duration.validate()
    }

    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn field<T: serde::de::DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    let raw = map.get(key)?;
    match serde_json::from_value(raw.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, "ignoring malformed setting: {e}");
            None
        }
    }
}

/// Merge `incoming` over `existing`: incoming values win for matching keys,
/// keys absent from `incoming` are kept.
pub(crate) fn merge_settings(
    existing: &Map<String, Value>,
    incoming: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = existing.clone();
    for (key, value) in incoming {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

pub(crate) fn parse_settings_blob(raw: Option<&str>) -> Map<String, Value> {
    let Some(raw) = raw else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!("stored settings are not a JSON object; using defaults");
            Map::new()
        }
    }
}

/// Typed access to the settings blob in a key-value store.
pub struct SettingsStore<S> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The raw stored object, unknown keys included.
    pub fn raw(&self) -> Result<Map<String, Value>> {
        let blob = self.store.kv_get(SETTINGS_KEY)?;
        Ok(parse_settings_blob(blob.as_deref()))
    }

    pub fn load(&self) -> Result<Settings> {
        Ok(Settings::from_map(&self.raw()?))
    }

    /// Persist typed settings, keeping unknown keys already stored.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        let merged = merge_settings(&self.raw()?, &settings.to_map());
        self.write(&merged)
    }

    /// Set one key from its string form, validating against the typed model.
    pub fn set(&self, key: &str, value: &str) -> Result<Settings> {
        let mut raw = self.raw()?;
        let parsed = match serde_json::from_str::<Value>(value) {
            Ok(v) => v,
            Err(_) => Value::String(value.to_string()),
        };
        let current = Settings::from_map(&raw);
        let mut typed = current.to_map();
        if !typed.contains_key(key) {
            return Err(ValidationError::InvalidValue {
                field: key.into(),
                message: "unknown setting".into(),
            }
            .into());
        }
        typed.insert(key.to_string(), parsed.clone());
        let updated: Settings = serde_json::from_value(Value::Object(typed)).map_err(|e| {
            CoreError::from(ValidationError::InvalidValue {
                field: key.into(),
                message: e.to_string(),
            })
        })?;
        updated.validate()?;

        raw.insert(key.to_string(), parsed);
        self.write(&raw)?;
        Ok(updated)
    }

    pub fn reset(&self) -> Result<()> {
        self.store.kv_remove(SETTINGS_KEY)?;
        Ok(())
    }

    fn write(&self, map: &Map<String, Value>) -> Result<()> {
        let blob = serde_json::to_string(map)?;
        self.store.kv_set(SETTINGS_KEY, &blob)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn defaults_when_nothing_stored() {
        let store = MemoryStore::new();
        let settings = SettingsStore::new(&store).load().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_duration.total_minutes(), 25);
    }

    #[test]
    fn malformed_keys_fall_back_individually() {
        let store = MemoryStore::new();
        store
            .kv_set(
                SETTINGS_KEY,
                &json!({"volume": 300, "soundType": "kazoo", "soundEnabled": false}).to_string(),
            )
            .unwrap();
        let settings = SettingsStore::new(&store).load().unwrap();
        assert_eq!(settings.volume, 50);
        assert_eq!(settings.sound_type, SoundType::Chime);
        assert!(!settings.sound_enabled);
    }

    #[test]
    fn save_keeps_unknown_keys() {
        let store = MemoryStore::new();
        store
            .kv_set(SETTINGS_KEY, &json!({"theme": "dark"}).to_string())
            .unwrap();
        let settings_store = SettingsStore::new(&store);
        let mut settings = settings_store.load().unwrap();
        settings.volume = 80;
        settings_store.save(&settings).unwrap();

        let raw = settings_store.raw().unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["volume"], 80);
    }

    #[test]
    fn set_parses_and_validates() {
        let store = MemoryStore::new();
        let settings_store = SettingsStore::new(&store);

        let updated = settings_store.set("soundType", "bell").unwrap();
        assert_eq!(updated.sound_type, SoundType::Bell);

        let updated = settings_store
            .set("defaultDuration", r#"{"hours":1,"minutes":30}"#)
            .unwrap();
        assert_eq!(updated.default_duration.total_minutes(), 90);

        assert!(settings_store.set("volume", "101").is_err());
        assert!(settings_store.set("defaultDuration", r#"{"hours":24,"minutes":0}"#).is_err());
        assert!(settings_store.set("nope", "1").is_err());
        assert_eq!(settings_store.load().unwrap().volume, 50);
    }

    #[test]
    fn merge_prefers_incoming_and_keeps_absent() {
        let existing = json!({"volume": 20, "theme": "dark"});
        let incoming = json!({"volume": 70, "soundType": "ping"});
        let merged = merge_settings(
            existing.as_object().unwrap(),
            incoming.as_object().unwrap(),
        );
        assert_eq!(merged["volume"], 70);
        assert_eq!(merged["theme"], "dark");
        assert_eq!(merged["soundType"], "ping");
    }
}
