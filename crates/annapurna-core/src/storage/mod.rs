//! Persistent store accessor.
//!
//! Each slice of application state lives under its own key as a JSON
//! document. Slices are written independently; nothing here spans two keys.

mod sqlite;

pub use sqlite::SqliteStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::AnnapurnaConfig;
use crate::error::Result;
use crate::model::{MealEntry, Profile, Recipe};

/// The keys the application persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Profile,
    MealLog,
    WaterIntake,
    SavedRecipes,
}

impl StoreKey {
    pub const ALL: [StoreKey; 4] = [
        StoreKey::Profile,
        StoreKey::MealLog,
        StoreKey::WaterIntake,
        StoreKey::SavedRecipes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::MealLog => "mealLog",
            Self::WaterIntake => "waterIntake",
            Self::SavedRecipes => "savedRecipes",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything hydrated at startup except saved recipes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub profile: Option<Profile>,
    pub meal_log: Vec<MealEntry>,
    pub water_intake: u32,
}

/// Typed JSON access on top of [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct LocalStore {
    inner: SqliteStore,
}

impl LocalStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self { inner }
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(SqliteStore::open_in_memory()?))
    }

    pub fn path(&self) -> &std::path::Path {
        self.inner.path()
    }

    /// Read and decode one key. `Ok(None)` when the key was never written.
    pub async fn load<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>> {
        match self.inner.get(key.as_str()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.inner.set(key.as_str(), &raw).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    /// Write a raw string under `key`, bypassing serialization.
    pub async fn save_raw(&self, key: StoreKey, raw: &str) -> Result<()> {
        self.inner.set(key.as_str(), raw).await
    }

    /// Load profile, meal log and water intake together. If any of them fails
    /// to decode, the whole store is cleared and an empty snapshot returned.
    pub async fn load_snapshot(&self) -> Result<Snapshot> {
        match self.try_load_snapshot().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load stored data, clearing store");
                self.clear().await?;
                Ok(Snapshot::default())
            }
        }
    }

    async fn try_load_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            profile: self.load(StoreKey::Profile).await?,
            meal_log: self.load(StoreKey::MealLog).await?.unwrap_or_default(),
            water_intake: self.load(StoreKey::WaterIntake).await?.unwrap_or_default(),
        })
    }

    /// Saved recipes load on their own; a corrupt value reads as empty and
    /// leaves the rest of the store alone.
    pub async fn load_saved_recipes(&self) -> Vec<Recipe> {
        match self.load(StoreKey::SavedRecipes).await {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable saved recipes");
                Vec::new()
            }
        }
    }
}

/// Open the store at the configured (or default) path.
pub fn open_store(config: &AnnapurnaConfig) -> Result<LocalStore> {
    let path = config.storage_path()?;
    tracing::debug!(path = %path.display(), "opening store");
    Ok(LocalStore::new(SqliteStore::open(&path)?))
}
