//! Settings persistence collaborator. The store is a generic async
//! key-value surface with two partitions: a size-bounded synced one and a
//! local one that takes the image payload when it would blow the synced
//! quota. Change notifications are delivered for the synced partition
//! only; the engine consumes them as `SettingsPatch` batches.

use std::collections::VecDeque;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::warn;

use crate::settings::{Settings, SettingsPatch};

/// Image payloads longer than this (in bytes of the data URI) move to the
/// local partition to stay clear of the synced-quota ceiling.
pub const SYNC_IMAGE_THRESHOLD: usize = 7000;

const IMAGE_DATA_KEY: &str = "imageData";

pub trait SettingsStore {
    /// Entire synced partition.
    fn get_synced(&self) -> Result<SettingsPatch>;
    /// Selected keys from the local partition.
    fn get_local(&self, keys: &[&str]) -> Result<SettingsPatch>;
    fn set_synced(&mut self, entries: SettingsPatch) -> Result<()>;
    fn set_local(&mut self, entries: SettingsPatch) -> Result<()>;
    fn remove_local(&mut self, key: &str) -> Result<()>;
}

/// Read the merged settings. A local image payload wins over a synced
/// one. Store unavailability is not fatal: the engine starts on the
/// documented defaults.
pub fn load_settings(store: &dyn SettingsStore) -> Settings {
    match try_load(store) {
        Ok(settings) => settings,
        Err(error) => {
            warn!("settings store unavailable, using defaults: {error:#}");
            Settings::default()
        }
    }
}

fn try_load(store: &dyn SettingsStore) -> Result<Settings> {
    let mut merged = store.get_synced().context("failed to read synced settings")?;
    let local = store
        .get_local(&[IMAGE_DATA_KEY])
        .context("failed to read local settings")?;
    if let Some(image) = local.get(IMAGE_DATA_KEY) {
        if image.as_str().is_some_and(|data| !data.is_empty()) {
            merged.insert(IMAGE_DATA_KEY.to_owned(), image.clone());
        }
    }
    Ok(Settings::from_store_object(&merged))
}

/// Write the full snapshot, splitting the image payload out to the local
/// partition when it exceeds the threshold. Below the threshold the local
/// copy is removed so a later small image can't be shadowed by a stale
/// large one.
pub fn persist_settings(store: &mut dyn SettingsStore, settings: &Settings) -> Result<()> {
    let mut object = settings.to_store_object();
    if settings.image_data.len() > SYNC_IMAGE_THRESHOLD {
        let image = object
            .remove(IMAGE_DATA_KEY)
            .unwrap_or(Value::String(settings.image_data.clone()));
        let mut local = SettingsPatch::new();
        local.insert(IMAGE_DATA_KEY.to_owned(), image);
        store
            .set_local(local)
            .context("failed to write local image payload")?;
        store
            .set_synced(object)
            .context("failed to write synced settings")?;
    } else {
        store
            .remove_local(IMAGE_DATA_KEY)
            .context("failed to clear local image payload")?;
        store
            .set_synced(object)
            .context("failed to write synced settings")?;
    }
    Ok(())
}

/// In-memory reference store. Synced writes are recorded as change
/// batches a driver can drain and feed to `Engine::on_settings_patch`,
/// standing in for the platform's change-notification feed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    synced: SettingsPatch,
    local: SettingsPatch,
    changes: VecDeque<SettingsPatch>,
    /// When set, every operation fails; models a missing store backend.
    pub unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain pending synced-partition change batches, oldest first.
    pub fn take_changes(&mut self) -> Vec<SettingsPatch> {
        self.changes.drain(..).collect()
    }

    pub fn synced_contains(&self, key: &str) -> bool {
        self.synced.contains_key(key)
    }

    pub fn local_contains(&self, key: &str) -> bool {
        self.local.contains_key(key)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            bail!("storage backend not reachable");
        }
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    fn get_synced(&self) -> Result<SettingsPatch> {
        self.check_available()?;
        Ok(self.synced.clone())
    }

    fn get_local(&self, keys: &[&str]) -> Result<SettingsPatch> {
        self.check_available()?;
        let mut out = SettingsPatch::new();
        for key in keys {
            if let Some(value) = self.local.get(*key) {
                out.insert((*key).to_owned(), value.clone());
            }
        }
        Ok(out)
    }

    fn set_synced(&mut self, entries: SettingsPatch) -> Result<()> {
        self.check_available()?;
        let mut changed = SettingsPatch::new();
        for (key, value) in entries {
            if self.synced.get(&key) != Some(&value) {
                changed.insert(key.clone(), value.clone());
            }
            self.synced.insert(key, value);
        }
        if !changed.is_empty() {
            self.changes.push_back(changed);
        }
        Ok(())
    }

    fn set_local(&mut self, entries: SettingsPatch) -> Result<()> {
        self.check_available()?;
        for (key, value) in entries {
            self.local.insert(key, value);
        }
        Ok(())
    }

    fn remove_local(&mut self, key: &str) -> Result<()> {
        self.check_available()?;
        self.local.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{load_settings, persist_settings, MemoryStore, SYNC_IMAGE_THRESHOLD};
    use crate::settings::Settings;

    #[test]
    fn large_image_splits_to_local_partition() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.image_data = "x".repeat(SYNC_IMAGE_THRESHOLD + 1);
        persist_settings(&mut store, &settings).expect("persist");

        assert!(!store.synced_contains("imageData"));
        assert!(store.local_contains("imageData"));
        assert_eq!(load_settings(&store), settings);
    }

    #[test]
    fn small_image_stays_synced_and_clears_local() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.image_data = "x".repeat(SYNC_IMAGE_THRESHOLD + 1);
        persist_settings(&mut store, &settings).expect("persist large");

        settings.image_data = "data:image/png;base64,tiny".to_owned();
        persist_settings(&mut store, &settings).expect("persist small");

        assert!(store.synced_contains("imageData"));
        assert!(!store.local_contains("imageData"));
        assert_eq!(load_settings(&store), settings);
    }

    #[test]
    fn unavailable_store_degrades_to_defaults() {
        let mut store = MemoryStore::new();
        store.unavailable = true;
        assert_eq!(load_settings(&store), Settings::default());
    }

    #[test]
    fn synced_writes_produce_change_batches() {
        let mut store = MemoryStore::new();
        let settings = Settings::default();
        persist_settings(&mut store, &settings).expect("persist");
        let batches = store.take_changes();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].contains_key("text"));

        // An identical write produces no batch.
        persist_settings(&mut store, &settings).expect("persist again");
        assert!(store.take_changes().is_empty());
    }
}
