//! Self-migrating versioned key-value store.
//!
//! Every value is persisted wrapped in a [`VersionedRecord`] stamped with
//! the running application's semantic version. On read, the stored text is
//! classified into a [`DecodedRecord`] and handled by exhaustive matching:
//! versioned data is migrated across major versions, legacy (pre-versioning)
//! data is migrated wholesale, and anything undecodable degrades to the
//! caller's default. `read` never returns an error.

use semver::Version;
use serde::Serialize;
use serde::de::DeserializeOwned;

use tomte_types::error::StoreError;
use tomte_types::record::{DecodedRecord, VersionedRecord, decode_data};

use super::backend::StorageBackend;

/// Migration from a raw stored payload to the current value shape.
///
/// Must be idempotent: re-migrating already-migrated data is a safe no-op.
pub type Migrate<'a, T> = dyn Fn(serde_json::Value) -> T + Sync + 'a;

/// Versioned store over any [`StorageBackend`].
#[derive(Debug, Clone)]
pub struct VersionedStore<B> {
    backend: B,
    app_version: Version,
}

impl<B: StorageBackend> VersionedStore<B> {
    /// Create a store stamping records with `app_version`.
    pub fn new(backend: B, app_version: Version) -> Self {
        Self {
            backend,
            app_version,
        }
    }

    /// The version stamp applied to new writes.
    pub fn app_version(&self) -> &Version {
        &self.app_version
    }

    /// Access the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Wrap `value` in a [`VersionedRecord`] under the current version and
    /// persist it.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let record = VersionedRecord::new(&self.app_version, value);
        let text =
            serde_json::to_string(&record).map_err(|e| StoreError::Serialize(e.to_string()))?;
        self.backend.set(key, &text).await
    }

    /// Read the value for `key`, migrating or degrading as needed.
    ///
    /// Resolution:
    /// 1. nothing stored -> `default`
    /// 2. legacy data (undecodable record, or structured without the record
    ///    shape) -> run `migrate` and re-persist, else `default`
    /// 3. versioned record under a different major (or an unparseable
    ///    stamp) with `migrate` supplied -> migrate the raw payload,
    ///    re-persist under the current version
    /// 4. otherwise decode the payload directly, opportunistically
    ///    re-stamping the version when it changed (no data transformation)
    ///
    /// Never returns an error: decode and backend failures degrade to
    /// `default`.
    pub async fn read<T>(&self, key: &str, default: T, migrate: Option<&Migrate<'_, T>>) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let stored = match self.backend.get(key).await {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(key, %error, "store read failed, falling back to default");
                return default;
            }
        };

        match DecodedRecord::classify(stored.as_deref()) {
            DecodedRecord::Empty => default,

            DecodedRecord::Legacy(raw) => match migrate {
                Some(migrate) => {
                    let migrated = migrate(raw);
                    self.repersist(key, &migrated).await;
                    migrated
                }
                None => default,
            },

            DecodedRecord::Versioned(record) => {
                let stored_major = record.major();
                let version_changed = record.version != self.app_version.to_string();

                match (stored_major, migrate) {
                    // Differing major (or an unparseable stamp): the payload
                    // may predate the current shape, so migrate the raw JSON.
                    (major, Some(migrate)) if major != Some(self.app_version.major) => {
                        let migrated = migrate(record.data);
                        self.repersist(key, &migrated).await;
                        migrated
                    }
                    _ => match decode_data::<T>(record.data) {
                        Some(value) => {
                            if version_changed {
                                self.repersist(key, &value).await;
                            }
                            value
                        }
                        None => {
                            tracing::warn!(key, "stored payload does not match current shape, falling back to default");
                            default
                        }
                    },
                }
            }
        }
    }

    /// Remove the value for `key`.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(key).await
    }

    async fn repersist<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(error) = self.write(key, value).await {
            tracing::warn!(key, %error, "re-persist under current version failed");
        }
    }
}
